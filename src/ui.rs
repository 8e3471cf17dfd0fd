use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use crate::app::{App, InputMode};
use crate::input::TextInput;
use crate::photo::PhotoField;
use crate::state::{Sender, View};
use crate::strings;

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("**") {
        let after = &rest[start + 2..];
        let Some(end) = after.find("**") else {
            break;
        };
        if end == 0 {
            // "****" is literal
            spans.push(Span::raw(rest[..start + 4].to_string()));
            rest = &after[2..];
            continue;
        }
        if start > 0 {
            spans.push(Span::raw(rest[..start].to_string()));
        }
        spans.push(Span::styled(
            after[..end].to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        rest = &after[end + 2..];
    }

    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    if !app.api_key_ok {
        render_missing_key(frame, body_area);
    } else {
        match app.view {
            View::Chat => render_chat(app, frame, body_area),
            View::PhotoEditor => render_photo_editor(app, frame, body_area),
        }
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let mut spans = vec![
        Span::styled(format!(" {} ", strings::APP_TITLE), Style::default().fg(Color::Cyan).bold()),
        Span::raw(" "),
    ];

    for (i, view) in View::all().iter().enumerate() {
        let style = if *view == app.view {
            Style::default().bg(Color::Cyan).fg(Color::White).bold()
        } else {
            Style::default().fg(Color::Gray)
        };
        spans.push(Span::styled(format!(" {} {} ", i + 1, view.title()), style));
        spans.push(Span::raw(" "));
    }

    spans.push(Span::styled(
        format!("v{}", env!("CARGO_PKG_VERSION")),
        Style::default().fg(Color::DarkGray),
    ));

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let hints = if !app.api_key_ok {
        " q: quitter "
    } else {
        match (app.input_mode, app.view) {
            (InputMode::Editing, View::Chat) => " Entrée: envoyer  Esc: mode normal  Tab: éditeur photo ",
            (InputMode::Editing, View::PhotoEditor) => {
                " Tab: changer de champ  Entrée: valider  Esc: mode normal "
            }
            (InputMode::Normal, _) => " i: saisir  1/2/Tab: vue  j/k: défiler  q: quitter ",
        }
    };

    let mode = match app.input_mode {
        InputMode::Normal => Span::styled(" NORMAL ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => Span::styled(" SAISIE ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    let footer = Paragraph::new(Line::from(vec![
        mode,
        Span::styled(hints, Style::default().fg(Color::DarkGray)),
    ]));
    frame.render_widget(footer, area);
}

fn render_missing_key(frame: &mut Frame, area: Rect) {
    let text = Text::from(vec![
        Line::default(),
        Line::from(Span::styled("⚠", Style::default().fg(Color::Red).bold())),
        Line::default(),
        Line::from(Span::styled(strings::MISSING_KEY_TITLE, Style::default().bold())),
        Line::default(),
        Line::from(Span::styled(strings::MISSING_KEY_BODY, Style::default().fg(Color::Gray))),
    ]);

    let panel = Paragraph::new(text)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Red)));
    frame.render_widget(panel, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    app.chat_area = Some(chat_area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    let height = chat_area.height.saturating_sub(2);
    let width = chat_area.width.saturating_sub(2);
    if (height, width) != (app.chat.view_height, app.chat.view_width) {
        app.chat.view_height = height;
        app.chat.view_width = width;
        app.chat.scroll_to_bottom();
    }

    let spinner = app.spinner();
    let mut lines: Vec<Line> = Vec::new();

    for msg in &app.chat.messages {
        match msg.sender {
            Sender::User => {
                let mut label = vec![Span::styled(
                    "Vous:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )];
                if msg.is_awaiting_response {
                    label.push(Span::styled(format!(" {}", spinner), Style::default().fg(Color::DarkGray)));
                }
                lines.push(Line::from(label));
                for line in msg.text.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            Sender::Ai => {
                lines.push(Line::from(Span::styled(
                    "Issam:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                for line in msg.text.lines() {
                    lines.push(parse_markdown_line(line));
                }
                if msg.is_streaming {
                    lines.push(Line::from(Span::styled(
                        spinner,
                        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                    )));
                }
            }
        }
        lines.push(Line::default());
    }

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" {} ", app.chat_model));

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat.scroll, 0));
    frame.render_widget(chat, chat_area);

    let editing = app.input_mode == InputMode::Editing;
    let title = if app.chat.is_loading {
        format!(" {} {}... ", spinner, strings::LOADING)
    } else {
        " Message ".to_string()
    };
    render_text_input(
        frame,
        input_area,
        &app.chat.input,
        strings::CHAT_PLACEHOLDER,
        &title,
        editing && !app.chat.is_loading,
    );
}

fn render_photo_editor(app: &mut App, frame: &mut Frame, area: Rect) {
    let [path_area, prompt_area, result_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Min(0),
    ])
    .areas(area);

    let editing = app.input_mode == InputMode::Editing && !app.photo.is_loading;
    render_text_input(
        frame,
        path_area,
        &app.photo.path_input,
        strings::PHOTO_PATH_PLACEHOLDER,
        &format!(" {} ", strings::PHOTO_PATH_LABEL),
        editing && app.photo.focus == PhotoField::Path,
    );
    render_text_input(
        frame,
        prompt_area,
        &app.photo.prompt_input,
        strings::PHOTO_PROMPT_PLACEHOLDER,
        &format!(" {} ", strings::PHOTO_PROMPT_LABEL),
        editing && app.photo.focus == PhotoField::Prompt,
    );

    let mut lines: Vec<Line> = Vec::new();
    if app.photo.is_loading {
        lines.push(Line::from(Span::styled(
            format!("{} {}...", app.spinner(), strings::LOADING),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    } else if let Some(error) = app.photo.error {
        lines.push(Line::from(Span::styled(error, Style::default().fg(Color::Red))));
    } else if let Some(result) = &app.photo.result {
        match &result.saved_to {
            Some(path) => lines.push(Line::from(vec![
                Span::styled(format!("{} ", strings::PHOTO_SAVED_TO), Style::default().fg(Color::Green)),
                Span::styled(path.display().to_string(), Style::default().bold()),
            ])),
            None => lines.push(Line::from(Span::styled(
                format!("{} base64", result.image_base64.len()),
                Style::default().fg(Color::DarkGray),
            ))),
        }
        if let Some(text) = &result.text {
            lines.push(Line::default());
            for line in text.lines() {
                lines.push(parse_markdown_line(line));
            }
        }
    } else {
        lines.push(Line::from(Span::styled(
            strings::PHOTO_EMPTY_RESULT,
            Style::default().fg(Color::DarkGray),
        )));
    }

    let result_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" {} ", app.image_model));
    let result = Paragraph::new(Text::from(lines))
        .block(result_block)
        .wrap(Wrap { trim: true });
    frame.render_widget(result, result_area);
}

fn render_text_input(
    frame: &mut Frame,
    area: Rect,
    input: &TextInput,
    placeholder: &str,
    title: &str,
    focused: bool,
) {
    let border_color = if focused { Color::Yellow } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title.to_string());

    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let (visible, cursor_col) = input.visible(inner_width);

    let paragraph = if input.as_str().is_empty() {
        Paragraph::new(Span::styled(placeholder.to_string(), Style::default().fg(Color::DarkGray)))
    } else {
        Paragraph::new(visible).style(Style::default().fg(Color::Cyan))
    };
    frame.render_widget(paragraph.block(block), area);

    if focused {
        frame.set_cursor_position((area.x + cursor_col as u16 + 1, area.y + 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_bold() {
        let line = parse_markdown_line("a **b** c");
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[1].content, "b");
        assert!(line.spans[1].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_markdown_unclosed_is_literal() {
        let line = parse_markdown_line("a **b");
        assert_eq!(line.spans.len(), 1);
        assert_eq!(line.spans[0].content, "a **b");
    }

    #[test]
    fn test_markdown_empty() {
        assert!(parse_markdown_line("").spans.is_empty());
    }
}

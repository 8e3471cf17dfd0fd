use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, InputMode};
use crate::input::TextInput;
use crate::photo::PhotoField;
use crate::state::View;
use crate::tui::AppEvent;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => app.chat.scroll_to_bottom(),
        AppEvent::Tick => app.tick_animation(),
        AppEvent::Chat(update) => app.on_chat_update(update),
        AppEvent::ImageEdit(outcome) => app.on_image_edited(outcome),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // Nothing but quitting while the credential panel is up
    if !app.api_key_ok {
        if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
            app.should_quit = true;
        }
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => match app.view {
            View::Chat => handle_chat_editing(app, key),
            View::PhotoEditor => handle_photo_editing(app, key),
        },
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // View switching
        KeyCode::Char('1') => app.switch_view(View::Chat),
        KeyCode::Char('2') => app.switch_view(View::PhotoEditor),
        KeyCode::Tab => app.switch_view(app.view.next()),

        KeyCode::Char('i') | KeyCode::Enter => app.input_mode = InputMode::Editing,

        // Transcript scrolling
        KeyCode::Char('j') | KeyCode::Down if app.view == View::Chat => app.chat.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up if app.view == View::Chat => app.chat.scroll_up(1),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            let half = (app.chat.view_height / 2).max(1);
            app.chat.scroll_down(half);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            let half = (app.chat.view_height / 2).max(1);
            app.chat.scroll_up(half);
        }
        KeyCode::Char('G') => app.chat.scroll_to_bottom(),
        KeyCode::Char('g') => app.chat.scroll = 0,

        _ => {}
    }
}

fn handle_chat_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Enter => {
            app.submit_chat();
        }
        KeyCode::Tab => {
            app.input_mode = InputMode::Normal;
            app.switch_view(View::PhotoEditor);
        }
        // The field is disabled while a reply is in flight
        _ if app.chat.is_loading => {}
        _ => edit_input(&mut app.chat.input, key),
    }
}

fn handle_photo_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Tab | KeyCode::BackTab => app.photo.toggle_focus(),
        KeyCode::Enter => match app.photo.focus {
            PhotoField::Path => app.photo.focus = PhotoField::Prompt,
            PhotoField::Prompt => {
                app.submit_photo();
            }
        },
        _ if app.photo.is_loading => {}
        _ => edit_input(app.photo.focused_input(), key),
    }
}

fn edit_input(input: &mut TextInput, key: KeyEvent) {
    match key.code {
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Left => input.left(),
        KeyCode::Right => input.right(),
        KeyCode::Home => input.home(),
        KeyCode::End => input.end(),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => input.insert_char(c),
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if app.view != View::Chat || !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.chat.scroll_down(3),
        MouseEventKind::ScrollUp => app.chat.scroll_up(3),
        _ => {}
    }
}

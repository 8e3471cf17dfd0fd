use std::path::PathBuf;
use std::sync::Arc;

use ratatui::layout::Rect;
use tokio::sync::mpsc::UnboundedSender;

use crate::chat::{ChatViewModel, PendingTurn, StreamUpdate};
use crate::config::Config;
use crate::gemini::{AiGateway, GeminiGateway};
use crate::photo::{self, EditedImage, PhotoEditorViewModel};
use crate::state::View;
use crate::tui::AppEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

pub const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub struct App {
    // Core state
    pub should_quit: bool,
    pub view: View,
    pub input_mode: InputMode,
    /// Read once at startup; when false every functional view is blocked.
    pub api_key_ok: bool,

    // View-models
    pub chat: ChatViewModel,
    pub photo: PhotoEditorViewModel,
    pub pending_turn: Option<PendingTurn>,

    // Animation state
    pub animation_frame: usize,

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,

    pub chat_model: String,
    pub image_model: String,
    gateway: Option<Arc<dyn AiGateway>>,
    output_dir: PathBuf,
    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(config: &Config, events: UnboundedSender<AppEvent>) -> Self {
        let gateway: Option<Arc<dyn AiGateway>> = match GeminiGateway::new(config) {
            Ok(gateway) => Some(Arc::new(gateway)),
            Err(e) => {
                tracing::warn!(error = %e, "Gemini gateway unavailable");
                None
            }
        };

        let mut app = Self::with_gateway(gateway, config.output_dir(), events);
        app.chat_model = config.chat_model().to_string();
        app.image_model = config.image_model().to_string();
        app
    }

    /// Build the shell around any gateway. `None` means no credential.
    pub fn with_gateway(
        gateway: Option<Arc<dyn AiGateway>>,
        output_dir: PathBuf,
        events: UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            should_quit: false,
            view: View::Chat,
            input_mode: InputMode::Editing,
            api_key_ok: gateway.is_some(),

            chat: ChatViewModel::new(),
            photo: PhotoEditorViewModel::new(),
            pending_turn: None,

            animation_frame: 0,
            chat_area: None,

            chat_model: String::new(),
            image_model: String::new(),
            gateway,
            output_dir,
            events,
        }
    }

    pub fn switch_view(&mut self, view: View) {
        if self.view != view {
            tracing::debug!(?view, "view switched");
            self.view = view;
        }
    }

    pub fn is_busy(&self) -> bool {
        self.chat.is_loading || self.photo.is_loading
    }

    /// Submit the chat input. Returns whether a request was started.
    pub fn submit_chat(&mut self) -> bool {
        let Some(gateway) = self.gateway.clone() else {
            return false;
        };
        let Some(turn) = self.chat.submit() else {
            return false;
        };

        tokio::spawn(forward_stream(gateway, turn.prompt.clone(), self.events.clone()));
        self.pending_turn = Some(turn);
        true
    }

    pub fn on_chat_update(&mut self, update: StreamUpdate) {
        let Some(mut turn) = self.pending_turn.take() else {
            tracing::debug!("chat update with no turn in flight");
            return;
        };
        if !self.chat.handle_update(&mut turn, update) {
            self.pending_turn = Some(turn);
        }
    }

    /// Submit the photo editor form. Returns whether a request was started.
    pub fn submit_photo(&mut self) -> bool {
        let Some(gateway) = self.gateway.clone() else {
            return false;
        };
        let Some(request) = self.photo.submit() else {
            return false;
        };

        let output_dir = self.output_dir.clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let outcome = photo::run_edit(gateway.as_ref(), &request, &output_dir).await;
            let _ = tx.send(AppEvent::ImageEdit(outcome));
        });
        true
    }

    pub fn on_image_edited(&mut self, outcome: Result<EditedImage, &'static str>) {
        self.photo.finish(outcome);
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % SPINNER_FRAMES.len();
        }
    }

    pub fn spinner(&self) -> &'static str {
        SPINNER_FRAMES[self.animation_frame % SPINNER_FRAMES.len()]
    }
}

/// Relay one reply from the gateway into the UI event queue.
async fn forward_stream(
    gateway: Arc<dyn AiGateway>,
    prompt: String,
    tx: UnboundedSender<AppEvent>,
) {
    let mut chunks = match gateway.send_message_stream(&prompt).await {
        Ok(chunks) => chunks,
        Err(e) => {
            let _ = tx.send(AppEvent::Chat(StreamUpdate::Failed(e)));
            return;
        }
    };

    while let Some(item) = chunks.recv().await {
        let update = match item {
            Ok(chunk) => StreamUpdate::Delta(chunk),
            Err(e) => {
                let _ = tx.send(AppEvent::Chat(StreamUpdate::Failed(e)));
                return;
            }
        };
        if tx.send(AppEvent::Chat(update)).is_err() {
            return;
        }
    }

    let _ = tx.send(AppEvent::Chat(StreamUpdate::Done));
}

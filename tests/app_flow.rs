//! End-to-end flows through the app shell with a scripted gateway.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};
use tokio::sync::mpsc;

use issam::app::App;
use issam::config::Config;
use issam::error::GatewayError;
use issam::gemini::{AiGateway, ChunkReceiver};
use issam::state::{EditedImageResponse, Sender, TextChunk, View};
use issam::tui::AppEvent;
use issam::{handler, strings};

/// Gateway that replays fixed deltas and counts calls.
#[derive(Default)]
struct ScriptedGateway {
    deltas: Vec<&'static str>,
    fail_after: Option<usize>,
    /// Reject the request itself with this status.
    reject_status: Option<u16>,
    chat_calls: AtomicUsize,
    edit_calls: AtomicUsize,
}

#[async_trait]
impl AiGateway for ScriptedGateway {
    async fn send_message_stream(&self, _text: &str) -> Result<ChunkReceiver, GatewayError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = self.reject_status {
            return Err(GatewayError::Api {
                status,
                body: "API key not valid".into(),
            });
        }
        let (tx, rx) = mpsc::channel(16);
        for (i, delta) in self.deltas.iter().enumerate() {
            if self.fail_after == Some(i) {
                let _ = tx.send(Err(GatewayError::Stream("boom".into()))).await;
                break;
            }
            let _ = tx.send(Ok(TextChunk::new(*delta))).await;
        }
        Ok(rx)
    }

    async fn edit_image(
        &self,
        _image_base64: &str,
        _mime_type: &str,
        _prompt: &str,
    ) -> Result<EditedImageResponse, GatewayError> {
        self.edit_calls.fetch_add(1, Ordering::SeqCst);
        Ok(EditedImageResponse {
            image: Some("iVBORw0KGgo=".into()),
            text: Some("Voilà".into()),
        })
    }
}

fn key(code: KeyCode) -> AppEvent {
    AppEvent::Key(KeyEvent {
        code,
        modifiers: KeyModifiers::NONE,
        kind: KeyEventKind::Press,
        state: KeyEventState::NONE,
    })
}

async fn type_text(app: &mut App, text: &str) {
    for c in text.chars() {
        handler::handle_event(app, key(KeyCode::Char(c))).await.unwrap();
    }
}

fn app_with(
    gateway: Arc<ScriptedGateway>,
    output_dir: PathBuf,
) -> (App, mpsc::UnboundedReceiver<AppEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (App::with_gateway(Some(gateway as Arc<dyn AiGateway>), output_dir, tx), rx)
}

/// Feed background events into the handler until `done` holds.
async fn pump(app: &mut App, rx: &mut mpsc::UnboundedReceiver<AppEvent>, done: impl Fn(&App) -> bool) {
    while !done(app) {
        let event = rx.recv().await.unwrap();
        handler::handle_event(app, event).await.unwrap();
    }
}

#[tokio::test]
async fn test_chat_reply_streams_into_transcript() {
    let gateway = Arc::new(ScriptedGateway {
        deltas: vec!["2", " + 2", " = 4"],
        ..Default::default()
    });
    let (mut app, mut rx) = app_with(gateway.clone(), std::env::temp_dir());

    type_text(&mut app, "2+2?").await;
    handler::handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();

    assert!(app.chat.is_loading);
    assert!(app.chat.input.as_str().is_empty());
    assert_eq!(app.chat.messages.len(), 3);
    assert!(app.chat.messages[1].is_awaiting_response);
    assert!(app.chat.messages[2].is_streaming);

    // A second Enter while busy is ignored
    type_text(&mut app, "encore").await;
    handler::handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();
    assert_eq!(app.chat.messages.len(), 3);

    pump(&mut app, &mut rx, |app| app.pending_turn.is_none()).await;

    let user = &app.chat.messages[1];
    let reply = &app.chat.messages[2];
    assert_eq!(user.sender, Sender::User);
    assert_eq!(user.text, "2+2?");
    assert!(!user.is_awaiting_response);
    assert_eq!(reply.sender, Sender::Ai);
    assert_eq!(reply.text, "2 + 2 = 4");
    assert!(!reply.is_streaming);
    assert!(!app.chat.is_loading);
    assert_eq!(gateway.chat_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_stream_shows_apology() {
    let gateway = Arc::new(ScriptedGateway {
        deltas: vec!["partiel", "jamais"],
        fail_after: Some(1),
        ..Default::default()
    });
    let (mut app, mut rx) = app_with(gateway, std::env::temp_dir());

    type_text(&mut app, "Bonjour").await;
    assert!(app.submit_chat());
    pump(&mut app, &mut rx, |app| app.pending_turn.is_none()).await;

    assert_eq!(app.chat.messages[2].text, strings::STREAM_FAILURE);
    assert!(!app.chat.messages[2].is_streaming);
    assert!(!app.chat.messages[1].is_awaiting_response);
    assert!(!app.chat.is_loading);
}

async fn assert_failed_before_any_delta(gateway: ScriptedGateway) {
    let gateway = Arc::new(gateway);
    let (mut app, mut rx) = app_with(gateway.clone(), std::env::temp_dir());

    type_text(&mut app, "Bonjour").await;
    assert!(app.submit_chat());
    pump(&mut app, &mut rx, |app| app.pending_turn.is_none()).await;

    let user = &app.chat.messages[1];
    let reply = &app.chat.messages[2];
    assert_eq!(reply.text, strings::STREAM_FAILURE);
    assert!(!reply.is_streaming);
    assert!(!user.is_awaiting_response);
    assert!(!app.chat.is_loading);
    assert_eq!(gateway.chat_calls.load(Ordering::SeqCst), 1);

    // The next submission goes through again
    type_text(&mut app, "encore").await;
    assert!(app.submit_chat());
}

#[tokio::test]
async fn test_rejected_request_shows_apology() {
    assert_failed_before_any_delta(ScriptedGateway {
        reject_status: Some(403),
        ..Default::default()
    })
    .await;
}

#[tokio::test]
async fn test_error_before_first_delta_shows_apology() {
    assert_failed_before_any_delta(ScriptedGateway {
        deltas: vec!["jamais"],
        fail_after: Some(0),
        ..Default::default()
    })
    .await;
}

#[tokio::test]
async fn test_missing_credential_never_reaches_gateway() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut app = App::new(&Config::new(), tx);
    assert!(!app.api_key_ok);

    app.chat.input.insert_str("Bonjour");
    assert!(!app.submit_chat());
    app.photo.path_input.insert_str("photo.png");
    app.photo.prompt_input.insert_str("ajoute un chapeau");
    assert!(!app.submit_photo());

    assert_eq!(app.chat.messages.len(), 1);
    assert!(!app.photo.is_loading);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_photo_edit_saves_result() {
    let gateway = Arc::new(ScriptedGateway::default());
    let out = tempfile::tempdir().unwrap();
    let source = out.path().join("photo.jpg");
    std::fs::write(&source, [0xFF, 0xD8, 0xFF, 0xE0, 0x00]).unwrap();

    let (mut app, mut rx) = app_with(gateway.clone(), out.path().join("edits"));
    handler::handle_event(&mut app, key(KeyCode::Tab)).await.unwrap();
    assert_eq!(app.view, View::PhotoEditor);
    handler::handle_event(&mut app, key(KeyCode::Char('i'))).await.unwrap();

    type_text(&mut app, &source.display().to_string()).await;
    handler::handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();
    type_text(&mut app, "ajoute un chapeau").await;
    handler::handle_event(&mut app, key(KeyCode::Enter)).await.unwrap();
    assert!(app.photo.is_loading);

    pump(&mut app, &mut rx, |app| !app.photo.is_loading).await;

    assert!(app.photo.error.is_none());
    let result = app.photo.result.as_ref().unwrap();
    assert_eq!(result.text.as_deref(), Some("Voilà"));
    let saved = result.saved_to.as_ref().unwrap();
    assert!(saved.exists());
    assert_eq!(saved.extension().and_then(|e| e.to_str()), Some("png"));
    assert_eq!(gateway.edit_calls.load(Ordering::SeqCst), 1);
    // inputs survive for a retry
    assert_eq!(app.photo.prompt_input.as_str(), "ajoute un chapeau");
}

#[tokio::test]
async fn test_photo_edit_missing_file() {
    let gateway = Arc::new(ScriptedGateway::default());
    let (mut app, mut rx) = app_with(gateway.clone(), std::env::temp_dir());

    app.photo.path_input.insert_str("/definitely/not/here.png");
    app.photo.prompt_input.insert_str("p");
    assert!(app.submit_photo());
    pump(&mut app, &mut rx, |app| !app.photo.is_loading).await;

    assert_eq!(app.photo.error, Some(strings::READ_FAILURE));
    assert_eq!(gateway.edit_calls.load(Ordering::SeqCst), 0);
}

//! UI-agnostic application state types
//!
//! These structures are shared by the terminal UI and the command line and
//! don't depend on any specific UI framework.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a chat turn, assigned in increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who wrote a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

/// A single turn in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender: Sender,
    pub text: String,
    /// More deltas are expected for this turn.
    pub is_streaming: bool,
    /// The AI reply paired with this user turn is still in flight.
    pub is_awaiting_response: bool,
}

impl ChatMessage {
    pub fn user(id: MessageId, text: impl Into<String>) -> Self {
        Self {
            id,
            sender: Sender::User,
            text: text.into(),
            is_streaming: false,
            is_awaiting_response: false,
        }
    }

    pub fn ai(id: MessageId, text: impl Into<String>) -> Self {
        Self {
            id,
            sender: Sender::Ai,
            text: text.into(),
            is_streaming: false,
            is_awaiting_response: false,
        }
    }
}

/// An incremental fragment of generated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub text: String,
}

impl TextChunk {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Result of an image edit request. `image` is base64 without a data-URL prefix.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EditedImageResponse {
    pub image: Option<String>,
    pub text: Option<String>,
}

/// Top-level view selected in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Chat,
    PhotoEditor,
}

impl View {
    pub fn all() -> [View; 2] {
        [View::Chat, View::PhotoEditor]
    }

    pub fn title(&self) -> &'static str {
        match self {
            View::Chat => crate::strings::NAV_CHAT,
            View::PhotoEditor => crate::strings::NAV_PHOTO_EDITOR,
        }
    }

    pub fn next(&self) -> Self {
        match self {
            View::Chat => View::PhotoEditor,
            View::PhotoEditor => View::Chat,
        }
    }
}

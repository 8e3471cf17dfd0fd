pub mod app;
pub mod chat;
pub mod config;
pub mod convert;
pub mod error;
pub mod gemini;
pub mod handler;
pub mod input;
pub mod logging;
pub mod photo;
pub mod sse;
pub mod state;
pub mod strings;
pub mod tui;
pub mod ui;

// Re-export main types for convenience
pub use chat::{ChatViewModel, PendingTurn, StreamUpdate, TurnPhase};
pub use config::Config;
pub use error::{ConvertError, GatewayError};
pub use gemini::{AiGateway, ChatSession, ChunkReceiver, GeminiGateway};
pub use photo::{EditedImage, PhotoEditorViewModel};
pub use state::{ChatMessage, EditedImageResponse, MessageId, Sender, TextChunk, View};

//! Chat view-model: the ordered transcript and the streaming state machine
//! for the reply currently in flight.

use crate::error::GatewayError;
use crate::gemini::ChunkReceiver;
use crate::input::TextInput;
use crate::state::{ChatMessage, MessageId, TextChunk};
use crate::strings;

/// Lifecycle of one submitted turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Submitted,
    Streaming,
    Completed,
    Failed,
}

/// Handle on the reply being streamed for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTurn {
    pub user_id: MessageId,
    pub ai_id: MessageId,
    pub prompt: String,
    pub phase: TurnPhase,
}

/// One update delivered to the chat while a reply is streaming.
#[derive(Debug)]
pub enum StreamUpdate {
    Delta(TextChunk),
    Failed(GatewayError),
    Done,
}

pub struct ChatViewModel {
    pub messages: Vec<ChatMessage>,
    pub input: TextInput,
    pub is_loading: bool,
    pub scroll: u16,
    pub view_height: u16, // Height of chat area for scroll calculations
    pub view_width: u16,  // Width of chat area for wrap calculations
    next_id: u64,
}

impl Default for ChatViewModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatViewModel {
    /// A transcript holding only the greeting.
    pub fn new() -> Self {
        let mut chat = Self {
            messages: Vec::new(),
            input: TextInput::new(),
            is_loading: false,
            scroll: 0,
            view_height: 0,
            view_width: 0,
            next_id: 0,
        };
        let id = chat.allocate_id();
        chat.messages.push(ChatMessage::ai(id, strings::GREETING));
        chat
    }

    fn allocate_id(&mut self) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn can_submit(&self) -> bool {
        !self.is_loading && !self.input.is_blank()
    }

    /// Append the user turn and its AI placeholder.
    ///
    /// Returns `None` without touching any state when the input is blank or
    /// a reply is already in flight.
    pub fn submit(&mut self) -> Option<PendingTurn> {
        if !self.can_submit() {
            return None;
        }

        let prompt = self.input.take();

        let user_id = self.allocate_id();
        let ai_id = self.allocate_id();
        let mut user = ChatMessage::user(user_id, prompt.clone());
        user.is_awaiting_response = true;
        let mut placeholder = ChatMessage::ai(ai_id, String::new());
        placeholder.is_streaming = true;

        self.messages.push(user);
        self.messages.push(placeholder);
        self.is_loading = true;
        self.scroll_to_bottom();

        tracing::debug!(%user_id, %ai_id, "chat turn submitted");

        Some(PendingTurn {
            user_id,
            ai_id,
            prompt,
            phase: TurnPhase::Submitted,
        })
    }

    pub fn message(&self, id: MessageId) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    fn message_mut(&mut self, id: MessageId) -> Option<&mut ChatMessage> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    /// Mark the turn as streaming once the request was accepted.
    pub fn begin_stream(&mut self, turn: &mut PendingTurn) {
        if turn.phase == TurnPhase::Submitted {
            turn.phase = TurnPhase::Streaming;
        }
    }

    /// Append one delta to the placeholder.
    pub fn apply_delta(&mut self, turn: &mut PendingTurn, delta: &str) {
        self.begin_stream(turn);
        if turn.phase != TurnPhase::Streaming || delta.is_empty() {
            return;
        }
        if let Some(msg) = self.message_mut(turn.ai_id) {
            msg.text.push_str(delta);
        }
        self.scroll_to_bottom();
    }

    /// The stream ended cleanly; the accumulated text is final.
    pub fn complete(&mut self, turn: &mut PendingTurn) {
        if matches!(turn.phase, TurnPhase::Completed | TurnPhase::Failed) {
            return;
        }
        turn.phase = TurnPhase::Completed;
        if let Some(msg) = self.message_mut(turn.ai_id) {
            msg.is_streaming = false;
        }
    }

    /// The stream failed; partial text is replaced by the failure message.
    pub fn fail(&mut self, turn: &mut PendingTurn, error: &GatewayError) {
        if matches!(turn.phase, TurnPhase::Completed | TurnPhase::Failed) {
            return;
        }
        tracing::error!(ai_id = %turn.ai_id, error = %error, "chat reply failed");
        turn.phase = TurnPhase::Failed;
        if let Some(msg) = self.message_mut(turn.ai_id) {
            msg.text = strings::STREAM_FAILURE.to_string();
            msg.is_streaming = false;
        }
        self.scroll_to_bottom();
    }

    /// Release the user turn and the busy flag. Runs once per submission,
    /// whatever the outcome.
    pub fn finish(&mut self, turn: &PendingTurn) {
        if let Some(msg) = self.message_mut(turn.user_id) {
            msg.is_awaiting_response = false;
        }
        self.is_loading = false;
    }

    /// Apply one update. Returns `true` once the turn has been finished.
    pub fn handle_update(&mut self, turn: &mut PendingTurn, update: StreamUpdate) -> bool {
        match update {
            StreamUpdate::Delta(chunk) => {
                self.apply_delta(turn, &chunk.text);
                false
            }
            StreamUpdate::Done => {
                self.complete(turn);
                self.finish(turn);
                true
            }
            StreamUpdate::Failed(error) => {
                self.fail(turn, &error);
                self.finish(turn);
                true
            }
        }
    }

    /// Consume a whole reply stream into the transcript.
    pub async fn drive(&mut self, mut turn: PendingTurn, mut chunks: ChunkReceiver) -> PendingTurn {
        self.begin_stream(&mut turn);
        loop {
            let update = match chunks.recv().await {
                Some(Ok(chunk)) => StreamUpdate::Delta(chunk),
                Some(Err(error)) => StreamUpdate::Failed(error),
                None => StreamUpdate::Done,
            };
            if self.handle_update(&mut turn, update) {
                return turn;
            }
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines);
    }

    /// Scroll the transcript so its last line is visible
    pub fn scroll_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.view_width > 0 {
            self.view_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in &self.messages {
            total_lines = total_lines.saturating_add(1); // Sender line
            for line in msg.text.lines() {
                let char_count = line.chars().count();
                let wrapped = if char_count == 0 { 1 } else { char_count / wrap_width + 1 };
                total_lines = total_lines.saturating_add(wrapped as u16);
            }
            if msg.is_streaming {
                total_lines = total_lines.saturating_add(1); // spinner line
            }
            total_lines = total_lines.saturating_add(1); // Blank line after message
        }

        let visible_height = if self.view_height > 0 {
            self.view_height
        } else {
            20
        };

        self.scroll = total_lines.saturating_sub(visible_height);
    }
}

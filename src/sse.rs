//! Server-Sent Events parsing for `streamGenerateContent?alt=sse` bodies.
//!
//! Gemini frames each partial response as one `data:` event:
//!
//! ```text
//! data: {"candidates":[{"content":{"parts":[{"text":"Bon"}]}}]}
//!
//! data: {"candidates":[{"content":{"parts":[{"text":"jour"}]}}]}
//! ```

/// One parsed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event_type: Option<String>,
    /// `data:` lines joined with `\n`.
    pub data: String,
    pub id: Option<String>,
}

impl SseEvent {
    /// Whether this is the `[DONE]` sentinel some proxies append.
    pub fn is_done(&self) -> bool {
        self.data.trim() == "[DONE]"
    }
}

#[derive(Debug, Default)]
struct PendingEvent {
    event_type: Option<String>,
    data_lines: Vec<String>,
    id: Option<String>,
}

impl PendingEvent {
    fn take(&mut self) -> Option<SseEvent> {
        if self.data_lines.is_empty() {
            self.event_type = None;
            self.id = None;
            return None;
        }
        Some(SseEvent {
            event_type: self.event_type.take(),
            data: std::mem::take(&mut self.data_lines).join("\n"),
            id: self.id.take(),
        })
    }

    /// Feed one line; a blank line closes the current event.
    fn line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.take();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => self.data_lines.push(value.to_string()),
            "event" => self.event_type = Some(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            _ => {}
        }
        None
    }
}

/// Parse a complete SSE body.
#[cfg(test)]
fn parse_sse_text(text: &str) -> Vec<SseEvent> {
    let mut parser = SseLineParser::new();
    let mut events = parser.push(text.as_bytes());
    events.extend(parser.flush());
    events
}

/// Incremental parser fed with raw body chunks as they arrive.
///
/// Bytes are buffered until a full line is available, so a multi-byte
/// character split across two network chunks decodes correctly.
#[derive(Debug, Default)]
pub struct SseLineParser {
    buffer: Vec<u8>,
    pending: PendingEvent,
}

impl SseLineParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a chunk and return every event completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw[..raw.len() - 1]);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if let Some(event) = self.pending.line(line) {
                events.push(event);
            }
        }

        events
    }

    /// Emit whatever is left once the body has ended.
    pub fn flush(&mut self) -> Option<SseEvent> {
        if !self.buffer.is_empty() {
            let raw = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&raw);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            if let Some(event) = self.pending.line(line) {
                return Some(event);
            }
        }
        self.pending.take()
    }
}

//! Gemini API gateway: streaming chat sessions and image editing.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::config::Config;
use crate::error::GatewayError;
use crate::sse::{SseEvent, SseLineParser};
use crate::state::{EditedImageResponse, TextChunk};

pub const SYSTEM_INSTRUCTION: &str =
    "You are Issam, a helpful and knowledgeable AI assistant. You can answer any type of question.";

/// Deltas buffered between the HTTP reader and the UI.
const CHUNK_BUFFER: usize = 64;

/// Receiving half of a streamed reply. Closure marks the end of the stream;
/// an `Err` item is always the last one.
pub type ChunkReceiver = mpsc::Receiver<Result<TextChunk, GatewayError>>;

/// The two vendor operations the application depends on.
#[async_trait]
pub trait AiGateway: Send + Sync {
    /// Send one user turn on the conversation and stream the reply.
    async fn send_message_stream(&self, text: &str) -> Result<ChunkReceiver, GatewayError>;

    /// Edit an image (base64, no data-URL prefix) following `prompt`.
    async fn edit_image(
        &self,
        image_base64: &str,
        mime_type: &str,
        prompt: &str,
    ) -> Result<EditedImageResponse, GatewayError>;
}

// Wire types

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part::text(text)],
        }
    }

    pub fn user(text: &str) -> Self {
        Self::text(Some("user"), text)
    }

    pub fn model(text: &str) -> Self {
        Self::text(Some("model"), text)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default, alias = "inline_data")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            inline_data: None,
        }
    }

    pub fn inline(mime_type: &str, data: &str) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: mime_type.to_string(),
                data: data.to_string(),
            }),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default, alias = "mime_type")]
    pub mime_type: String,
    #[serde(default)]
    pub data: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

#[derive(Deserialize, Debug, Default)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
}

/// Thin HTTP client for the `generativelanguage` REST API.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    chat_model: String,
    image_model: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, base_url: &str, chat_model: &str, image_model: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            chat_model: chat_model.to_string(),
            image_model: image_model.to_string(),
        }
    }

    async fn post(
        &self,
        model: &str,
        action: &str,
        request: &GenerateContentRequest,
    ) -> Result<Response, GatewayError> {
        let url = format!("{}/models/{}:{}", self.base_url, model, action);
        tracing::debug!(%url, "gemini request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api { status, body });
        }

        Ok(response)
    }

    async fn generate_stream(&self, request: &GenerateContentRequest) -> Result<Response, GatewayError> {
        self.post(&self.chat_model, "streamGenerateContent?alt=sse", request)
            .await
    }

    async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GatewayError> {
        let response = self.post(model, "generateContent", request).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

/// A conversation with a fixed system instruction and the turns so far.
#[derive(Clone)]
pub struct ChatSession {
    client: GeminiClient,
    system_instruction: String,
    history: Arc<tokio::sync::Mutex<Vec<Content>>>,
}

impl ChatSession {
    pub fn new(client: GeminiClient, system_instruction: &str) -> Self {
        Self {
            client,
            system_instruction: system_instruction.to_string(),
            history: Arc::new(tokio::sync::Mutex::new(Vec::new())),
        }
    }

    pub async fn history(&self) -> Vec<Content> {
        self.history.lock().await.clone()
    }

    /// Send `text` and return a receiver of reply deltas.
    ///
    /// The exchange is added to the history only when the reply streamed to
    /// completion with some text.
    pub async fn send_message_stream(&self, text: &str) -> Result<ChunkReceiver, GatewayError> {
        let user_turn = Content::user(text);
        let mut contents = self.history().await;
        contents.push(user_turn.clone());

        let request = GenerateContentRequest {
            contents,
            system_instruction: Some(Content::text(None, &self.system_instruction)),
            generation_config: None,
        };
        let response = self.client.generate_stream(&request).await?;

        let (tx, rx) = mpsc::channel(CHUNK_BUFFER);
        let history = Arc::clone(&self.history);

        tokio::spawn(async move {
            let Some(reply) = pump_stream(response, &tx).await else {
                return;
            };
            // The API rejects empty model parts, so textless replies stay out.
            if reply.is_empty() {
                tracing::warn!("chat reply carried no text; history left unchanged");
                return;
            }
            let mut history = history.lock().await;
            history.push(user_turn);
            history.push(Content::model(&reply));
        });

        Ok(rx)
    }
}

/// Forward SSE deltas into `tx`. Returns the full reply, or `None` when the
/// stream failed or the receiver went away.
async fn pump_stream(
    response: Response,
    tx: &mpsc::Sender<Result<TextChunk, GatewayError>>,
) -> Option<String> {
    let mut body = response.bytes_stream();
    let mut parser = SseLineParser::new();
    let mut reply = String::new();

    loop {
        let (events, done) = match body.next().await {
            Some(Ok(bytes)) => (parser.push(&bytes), false),
            Some(Err(e)) => {
                tracing::error!(error = %e, "chat stream interrupted");
                let _ = tx.send(Err(GatewayError::Http(e))).await;
                return None;
            }
            None => (parser.flush().into_iter().collect::<Vec<_>>(), true),
        };

        for event in events {
            match chunk_from_event(&event) {
                Ok(Some(chunk)) => {
                    reply.push_str(&chunk.text);
                    if tx.send(Ok(chunk)).await.is_err() {
                        tracing::debug!("chat stream receiver dropped");
                        return None;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(error = %e, "chat stream returned an error payload");
                    let _ = tx.send(Err(e)).await;
                    return None;
                }
            }
        }

        if done {
            return Some(reply);
        }
    }
}

/// Convert one SSE event into a delta. Empty deltas yield `None`.
pub fn chunk_from_event(event: &SseEvent) -> Result<Option<TextChunk>, GatewayError> {
    if event.is_done() || event.data.trim().is_empty() {
        return Ok(None);
    }

    let response: GenerateContentResponse =
        serde_json::from_str(&event.data).map_err(|e| GatewayError::Decode(e.to_string()))?;

    if let Some(error) = response.error {
        return Err(GatewayError::Stream(format!(
            "{} ({})",
            error.message,
            error.code.unwrap_or_default()
        )));
    }

    let text = response.text();
    if text.is_empty() {
        Ok(None)
    } else {
        Ok(Some(TextChunk::new(text)))
    }
}

/// Pull the edited image and caption out of a `generateContent` response.
///
/// When several parts of a kind are present the last one wins, so a trailing
/// empty image part leaves no image.
pub fn parse_edit_response(
    response: &GenerateContentResponse,
) -> Result<EditedImageResponse, GatewayError> {
    let candidate = response
        .candidates
        .first()
        .ok_or_else(|| GatewayError::Decode("response has no candidates".to_string()))?;
    let parts = candidate
        .content
        .as_ref()
        .map(|c| c.parts.as_slice())
        .unwrap_or_default();

    let mut result = EditedImageResponse::default();
    for part in parts {
        if let Some(text) = part.text.as_deref().filter(|t| !t.is_empty()) {
            result.text = Some(text.to_string());
        } else if let Some(inline) = part.inline_data.as_ref() {
            result.image = Some(inline.data.clone());
        }
    }

    if result.image.as_deref().map_or(true, str::is_empty) {
        return Err(GatewayError::NoImage);
    }
    Ok(result)
}

/// Production gateway. Constructing one proves a credential is configured.
pub struct GeminiGateway {
    client: GeminiClient,
    session: Mutex<Option<ChatSession>>,
}

impl GeminiGateway {
    pub fn new(config: &Config) -> Result<Self, GatewayError> {
        let api_key = config.api_key().ok_or(GatewayError::MissingCredential)?;
        let client = GeminiClient::new(
            api_key,
            config.api_base(),
            config.chat_model(),
            config.image_model(),
        );
        Ok(Self {
            client,
            session: Mutex::new(None),
        })
    }

    /// Start a fresh conversation, replacing any previous one.
    pub fn start_session(&self) -> ChatSession {
        let session = ChatSession::new(self.client.clone(), SYSTEM_INSTRUCTION);
        let mut slot = self.session.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(session.clone());
        tracing::info!("chat session started");
        session
    }

    /// The current conversation, started on first use.
    pub fn get_session(&self) -> ChatSession {
        let existing = self
            .session
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        match existing {
            Some(session) => session,
            None => self.start_session(),
        }
    }

    async fn request_edit(
        &self,
        image_base64: &str,
        mime_type: &str,
        prompt: &str,
    ) -> Result<EditedImageResponse, GatewayError> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: None,
                parts: vec![Part::inline(mime_type, image_base64), Part::text(prompt)],
            }],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_modalities: vec!["IMAGE".to_string(), "TEXT".to_string()],
            }),
        };

        let response = self
            .client
            .generate(&self.client.image_model, &request)
            .await?;
        parse_edit_response(&response)
    }
}

#[async_trait]
impl AiGateway for GeminiGateway {
    async fn send_message_stream(&self, text: &str) -> Result<ChunkReceiver, GatewayError> {
        self.get_session().send_message_stream(text).await
    }

    async fn edit_image(
        &self,
        image_base64: &str,
        mime_type: &str,
        prompt: &str,
    ) -> Result<EditedImageResponse, GatewayError> {
        match self.request_edit(image_base64, mime_type, prompt).await {
            Ok(result) => {
                tracing::info!(has_caption = result.text.is_some(), "image edited");
                Ok(result)
            }
            Err(e) => {
                tracing::error!(error = %e, "image edit failed");
                Err(GatewayError::ImageEdit)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(value: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_edit_image_and_text() {
        let resp = response(json!({
            "candidates": [{"content": {"parts": [
                {"text": "Voici"},
                {"inlineData": {"mimeType": "image/png", "data": "AAAA"}}
            ]}}]
        }));
        let result = parse_edit_response(&resp).unwrap();
        assert_eq!(result.image.as_deref(), Some("AAAA"));
        assert_eq!(result.text.as_deref(), Some("Voici"));
    }

    #[test]
    fn test_edit_last_of_each_kind_wins() {
        let resp = response(json!({
            "candidates": [{"content": {"parts": [
                {"text": "first"},
                {"inlineData": {"mimeType": "image/png", "data": "ONE"}},
                {"text": "second"},
                {"inline_data": {"mime_type": "image/png", "data": "TWO"}}
            ]}}]
        }));
        let result = parse_edit_response(&resp).unwrap();
        assert_eq!(result.image.as_deref(), Some("TWO"));
        assert_eq!(result.text.as_deref(), Some("second"));
    }

    #[test]
    fn test_edit_trailing_empty_image_fails() {
        let resp = response(json!({
            "candidates": [{"content": {"parts": [
                {"inlineData": {"mimeType": "image/png", "data": "AAAA"}},
                {"inlineData": {"mimeType": "image/png", "data": ""}}
            ]}}]
        }));
        assert!(matches!(parse_edit_response(&resp), Err(GatewayError::NoImage)));
    }

    #[test]
    fn test_edit_text_only_fails() {
        let resp = response(json!({
            "candidates": [{"content": {"parts": [{"text": "no image for you"}]}}]
        }));
        assert!(matches!(parse_edit_response(&resp), Err(GatewayError::NoImage)));
    }

    #[test]
    fn test_edit_no_candidates_fails() {
        let resp = response(json!({}));
        assert!(matches!(parse_edit_response(&resp), Err(GatewayError::Decode(_))));
    }

    #[test]
    fn test_chunk_text_concatenates_parts() {
        let event = SseEvent {
            event_type: None,
            data: json!({"candidates": [{"content": {"parts": [{"text": "2"}, {"text": " + 2"}]}}]})
                .to_string(),
            id: None,
        };
        let chunk = chunk_from_event(&event).unwrap().unwrap();
        assert_eq!(chunk.text, "2 + 2");
    }

    #[test]
    fn test_chunk_without_text_is_skipped() {
        let event = SseEvent {
            event_type: None,
            data: json!({"candidates": [{"content": {"parts": []}}]}).to_string(),
            id: None,
        };
        assert!(chunk_from_event(&event).unwrap().is_none());
    }

    #[test]
    fn test_chunk_error_payload() {
        let event = SseEvent {
            event_type: None,
            data: json!({"error": {"code": 429, "message": "quota"}}).to_string(),
            id: None,
        };
        let err = chunk_from_event(&event).unwrap_err();
        assert!(matches!(err, GatewayError::Stream(ref m) if m.contains("quota")));
    }

    #[test]
    fn test_chunk_bad_json() {
        let event = SseEvent {
            event_type: None,
            data: "{not json".to_string(),
            id: None,
        };
        assert!(matches!(chunk_from_event(&event), Err(GatewayError::Decode(_))));
    }

    #[test]
    fn test_gateway_requires_key() {
        let config = Config::new();
        assert!(matches!(
            GeminiGateway::new(&config),
            Err(GatewayError::MissingCredential)
        ));
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: None,
                parts: vec![Part::inline("image/png", "AAAA"), Part::text("rends-la bleue")],
            }],
            system_instruction: None,
            generation_config: Some(GenerationConfig {
                response_modalities: vec!["IMAGE".into(), "TEXT".into()],
            }),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["inlineData"]["mimeType"], "image/png");
        assert_eq!(value["generationConfig"]["responseModalities"][0], "IMAGE");
        assert!(value.get("systemInstruction").is_none());
    }

    #[tokio::test]
    async fn test_get_session_reuses_and_start_resets() {
        let mut config = Config::new();
        config.api_key = Some("key".into());
        let gateway = GeminiGateway::new(&config).unwrap();

        let first = gateway.get_session();
        first.history.lock().await.push(Content::user("salut"));

        let again = gateway.get_session();
        assert_eq!(again.history().await.len(), 1);

        let fresh = gateway.start_session();
        assert!(fresh.history().await.is_empty());
        assert!(gateway.get_session().history().await.is_empty());
    }
}

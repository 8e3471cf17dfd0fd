//! Photo editor view-model: image path + instruction in, edited image out.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::convert;
use crate::error::ConvertError;
use crate::gemini::AiGateway;
use crate::input::TextInput;
use crate::strings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhotoField {
    #[default]
    Path,
    Prompt,
}

/// What the user asked for, captured at submission time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    pub path: PathBuf,
    pub prompt: String,
}

/// An edit request with the file already encoded.
#[derive(Debug, Clone)]
pub struct PreparedEdit {
    pub image_base64: String,
    pub mime_type: &'static str,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditedImage {
    pub image_base64: String,
    pub text: Option<String>,
    /// Where the decoded image was written, if saving succeeded.
    pub saved_to: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct PhotoEditorViewModel {
    pub path_input: TextInput,
    pub prompt_input: TextInput,
    pub focus: PhotoField,
    pub is_loading: bool,
    pub result: Option<EditedImage>,
    pub error: Option<&'static str>,
}

impl PhotoEditorViewModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focused_input(&mut self) -> &mut TextInput {
        match self.focus {
            PhotoField::Path => &mut self.path_input,
            PhotoField::Prompt => &mut self.prompt_input,
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            PhotoField::Path => PhotoField::Prompt,
            PhotoField::Prompt => PhotoField::Path,
        };
    }

    pub fn can_submit(&self) -> bool {
        !self.is_loading && !self.path_input.is_blank() && !self.prompt_input.is_blank()
    }

    /// Start an edit. `None` when busy or a field is blank.
    ///
    /// Inputs are kept so the user can tweak the instruction and retry.
    pub fn submit(&mut self) -> Option<EditRequest> {
        if !self.can_submit() {
            return None;
        }
        self.is_loading = true;
        self.result = None;
        self.error = None;

        let request = EditRequest {
            path: resolve_path(self.path_input.as_str()),
            prompt: self.prompt_input.as_str().trim().to_string(),
        };
        tracing::debug!(path = %request.path.display(), "photo edit submitted");
        Some(request)
    }

    /// Store the outcome and release the busy flag.
    pub fn finish(&mut self, outcome: Result<EditedImage, &'static str>) {
        match outcome {
            Ok(image) => {
                self.result = Some(image);
                self.error = None;
            }
            Err(message) => {
                self.result = None;
                self.error = Some(message);
            }
        }
        self.is_loading = false;
    }
}

/// Accept what users paste into a terminal: quotes from drag-and-drop and `~/`.
pub fn resolve_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim().trim_matches(|c| c == '\'' || c == '"');
    if let Some(rest) = trimmed.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(trimmed)
}

pub async fn prepare(request: &EditRequest) -> Result<PreparedEdit, ConvertError> {
    let image_base64 = convert::to_base64(&request.path).await?;
    let mime_type = convert::mime_for_path(&request.path).unwrap_or("image/png");
    Ok(PreparedEdit {
        image_base64,
        mime_type,
        prompt: request.prompt.clone(),
    })
}

/// Convert, send and save. Errors come back as the message to display.
pub async fn run_edit(
    gateway: &dyn AiGateway,
    request: &EditRequest,
    output_dir: &Path,
) -> Result<EditedImage, &'static str> {
    let prepared = prepare(request).await.map_err(|e| e.user_message())?;

    let response = gateway
        .edit_image(&prepared.image_base64, prepared.mime_type, &prepared.prompt)
        .await
        .map_err(|e| e.user_message())?;
    let image_base64 = response.image.ok_or(strings::IMAGE_EDIT_FAILURE)?;

    let saved_to = match save_image(output_dir, &image_base64).await {
        Ok(path) => Some(path),
        Err(e) => {
            tracing::warn!(error = %e, dir = %output_dir.display(), "could not save edited image");
            None
        }
    };

    Ok(EditedImage {
        image_base64,
        text: response.text,
        saved_to,
    })
}

/// Decode and write an edited image as `edited-<millis>.<ext>`.
pub async fn save_image(dir: &Path, image_base64: &str) -> anyhow::Result<PathBuf> {
    let bytes = convert::decode(image_base64)?;
    let ext = convert::extension_for_mime(convert::sniff_mime(&bytes));
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);

    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("edited-{}.{}", millis, ext));
    tokio::fs::write(&path, bytes).await?;
    tracing::info!(path = %path.display(), "edited image saved");
    Ok(path)
}

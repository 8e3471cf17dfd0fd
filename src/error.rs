//! Error types for the gateway and the file converter.

use crate::strings;

/// Failures talking to the Gemini API.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// No API key was found in the environment or the config file.
    #[error("API key not configured")]
    MissingCredential,

    /// Transport-level failure (connect, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status returned by the API.
    #[error("Gemini API error {status}: {body}")]
    Api { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The streamed response broke off or carried an error payload.
    #[error("stream error: {0}")]
    Stream(String),

    /// The edit response carried no image part.
    #[error("{}", strings::NO_IMAGE_RETURNED)]
    NoImage,

    /// Image editing failed. The cause has already been logged.
    #[error("image edit failed")]
    ImageEdit,
}

impl GatewayError {
    /// The fixed message shown to the user for this error.
    pub fn user_message(&self) -> &'static str {
        match self {
            GatewayError::MissingCredential => strings::MISSING_KEY_TITLE,
            GatewayError::ImageEdit | GatewayError::NoImage => strings::IMAGE_EDIT_FAILURE,
            _ => strings::STREAM_FAILURE,
        }
    }
}

/// Failures turning a file into a base64 payload.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("failed to read file: {0}")]
    Read(#[from] std::io::Error),

    /// The read succeeded but produced no payload.
    #[error("file conversion to base64 failed")]
    Conversion,
}

impl ConvertError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConvertError::Read(_) => strings::READ_FAILURE,
            ConvertError::Conversion => strings::CONVERSION_FAILURE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_edit_hides_cause() {
        assert_eq!(GatewayError::ImageEdit.user_message(), strings::IMAGE_EDIT_FAILURE);
    }

    #[test]
    fn test_api_error_maps_to_stream_failure() {
        let err = GatewayError::Api { status: 500, body: "boom".into() };
        assert_eq!(err.user_message(), strings::STREAM_FAILURE);
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn test_convert_messages() {
        assert_eq!(ConvertError::Conversion.user_message(), strings::CONVERSION_FAILURE);
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert_eq!(ConvertError::from(io).user_message(), strings::READ_FAILURE);
    }
}

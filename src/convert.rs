//! File to base64 conversion for inline image uploads.

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::error::ConvertError;

/// Read a whole file and return its contents as plain base64 (no `data:` prefix).
pub async fn to_base64(path: impl AsRef<Path>) -> Result<String, ConvertError> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        tracing::warn!(path = %path.display(), error = %e, "file read failed");
        ConvertError::Read(e)
    })?;

    if bytes.is_empty() {
        tracing::warn!(path = %path.display(), "file produced no payload");
        return Err(ConvertError::Conversion);
    }

    Ok(BASE64.encode(bytes))
}

/// Extract the payload from a `data:<mime>;base64,<payload>` URL.
pub fn payload_from_data_url(data_url: &str) -> Result<&str, ConvertError> {
    match data_url.split_once(',') {
        Some((_, payload)) if !payload.is_empty() => Ok(payload),
        _ => Err(ConvertError::Conversion),
    }
}

pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        _ => None,
    }
}

pub fn extension_for_mime(mime: Option<&str>) -> &'static str {
    let lowered = mime.unwrap_or_default().to_ascii_lowercase();
    if lowered.contains("jpeg") || lowered.contains("jpg") {
        "jpg"
    } else if lowered.contains("webp") {
        "webp"
    } else if lowered.contains("gif") {
        "gif"
    } else {
        "png"
    }
}

/// Guess an image MIME type from its magic bytes.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else if bytes.starts_with(b"GIF8") {
        Some("image/gif")
    } else {
        None
    }
}

/// Decode a base64 payload returned by the API. A `data:` URL is accepted too.
pub fn decode(payload: &str) -> Result<Vec<u8>, ConvertError> {
    let payload = payload.trim();
    let payload = if payload.starts_with("data:") {
        payload_from_data_url(payload)?
    } else {
        payload
    };
    BASE64
        .decode(payload.as_bytes())
        .map_err(|_| ConvertError::Conversion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_small_file_encodes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"hello").unwrap();

        let encoded = to_base64(file.path()).await.unwrap();
        assert_eq!(encoded, "aGVsbG8=");
        assert!(!encoded.starts_with("data:"));
    }

    #[tokio::test]
    async fn test_empty_file_is_conversion_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = to_base64(file.path()).await.unwrap_err();
        assert!(matches!(err, ConvertError::Conversion));
    }

    #[tokio::test]
    async fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = to_base64(dir.path().join("nope.png")).await.unwrap_err();
        assert!(matches!(err, ConvertError::Read(_)));
    }

    #[test]
    fn test_data_url_payload() {
        assert_eq!(payload_from_data_url("data:image/png;base64,AAAA").unwrap(), "AAAA");
        assert!(payload_from_data_url("data:image/png;base64,").is_err());
        assert!(payload_from_data_url("garbage").is_err());
    }

    #[test]
    fn test_decode_accepts_data_url() {
        assert_eq!(decode("data:image/png;base64,aGVsbG8=").unwrap(), b"hello");
        assert_eq!(decode(" aGVsbG8=\n").unwrap(), b"hello");
        assert!(matches!(decode("data:image/png;base64,"), Err(ConvertError::Conversion)));
    }

    #[test]
    fn test_mime_detection() {
        assert_eq!(mime_for_path(Path::new("a/b.PNG")), Some("image/png"));
        assert_eq!(mime_for_path(Path::new("photo.jpeg")), Some("image/jpeg"));
        assert_eq!(mime_for_path(Path::new("notes.txt")), None);
        assert_eq!(mime_for_path(Path::new("noext")), None);
    }

    #[test]
    fn test_extension_for_mime() {
        assert_eq!(extension_for_mime(Some("image/jpeg")), "jpg");
        assert_eq!(extension_for_mime(Some("image/webp")), "webp");
        assert_eq!(extension_for_mime(None), "png");
    }

    #[test]
    fn test_sniff_mime() {
        assert_eq!(sniff_mime(b"\x89PNG\r\n\x1a\nrest"), Some("image/png"));
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(sniff_mime(b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(sniff_mime(b"hello"), None);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(decode("aGVsbG8=").unwrap(), b"hello");
        assert!(decode("!!!").is_err());
    }
}

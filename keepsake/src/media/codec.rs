use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;

const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("media payload is empty")]
    Empty,

    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload is not a recognised image (detected {0})")]
    NotAnImage(String),
}

/// Decode a base64 image payload.
///
/// Uses the standard alphabet with padding. ASCII whitespace (line-wrapped
/// encoders) is ignored. The decoded bytes must start with a known image
/// container signature.
pub fn decode(data: &str) -> Result<Vec<u8>, DecodeError> {
    let trimmed = data.trim();
    if trimmed.is_empty() {
        return Err(DecodeError::Empty);
    }

    let bytes = if trimmed.bytes().any(|b| b.is_ascii_whitespace()) {
        let compact: String = trimmed
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        STANDARD.decode(compact)?
    } else {
        STANDARD.decode(trimmed)?
    };

    if !infer::is_image(&bytes) {
        let detected = infer::get(&bytes)
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_else(|| "unknown content".to_string());
        return Err(DecodeError::NotAnImage(detected));
    }

    Ok(bytes)
}

pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// MIME type of an image byte stream, `application/octet-stream` when unknown.
pub fn content_type(bytes: &[u8]) -> &'static str {
    infer::get(bytes)
        .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
        .map(|kind| kind.mime_type())
        .unwrap_or(OCTET_STREAM)
}

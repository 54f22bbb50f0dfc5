//! Base64 transport encoding for image payloads.

use crate::error::{ImageServiceError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};

pub fn encode_image(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes standard padded base64. ASCII whitespace anywhere in the input is
/// skipped so MIME-style line-wrapped payloads are accepted; any other
/// character outside the alphabet is an error.
pub fn decode_image(data: &str) -> Result<Vec<u8>> {
    let compact: String = data
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    STANDARD
        .decode(compact)
        .map_err(|e| ImageServiceError::DecodingError(e.to_string()))
}

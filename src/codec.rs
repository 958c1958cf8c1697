//! Base64 and JSON transport helpers shared by the form engine and the
//! crypto pipeline. All byte values cross the UI boundary as standard
//! (padded) base64 text.

use base64::{engine::general_purpose, Engine as _};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Invalid base64 value.")]
    Decode(#[from] base64::DecodeError),
    #[error("Invalid JSON encoding.")]
    Parse(#[from] serde_json::Error),
}

/// Encodes raw bytes as standard base64 text.
pub fn bytes_to_base64(data: &[u8]) -> String {
    general_purpose::STANDARD.encode(data)
}

/// Decodes standard base64 text back into raw bytes.
pub fn base64_to_bytes(text: &str) -> Result<Vec<u8>, CodecError> {
    Ok(general_purpose::STANDARD.decode(text)?)
}

/// Serializes a value to JSON, then base64-encodes the JSON text.
pub fn json_to_base64<T: Serialize>(value: &T) -> Result<String, CodecError> {
    let json = serde_json::to_string(value)?;
    Ok(bytes_to_base64(json.as_bytes()))
}

/// Decodes base64 text and parses the result as JSON. Distinguishes
/// transport corruption (`Decode`) from structural corruption (`Parse`).
pub fn base64_to_json(text: &str) -> Result<serde_json::Value, CodecError> {
    let bytes = base64_to_bytes(text)?;
    Ok(serde_json::from_slice(&bytes)?)
}

//! Cipher-mode and key-size vocabulary, the output envelope wire format,
//! and pre-crypto validation of incoming payloads.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec;

/// Salt length in bytes for PBKDF2.
pub const SALT_SIZE: usize = 16;
/// IV length in bytes for AES-GCM and AES-CBC.
pub const IV_SIZE: usize = 16;
/// Counter-block length in bytes for AES-CTR.
pub const COUNTER_SIZE: usize = 16;
/// Default PBKDF2 iteration count.
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 300_000;
/// Iteration counts above this trigger a latency notice.
pub const PBKDF2_ITERATIONS_WARN: u32 = 1_000_000;

/// A categorical value named a mode the pipeline does not implement.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Mode '{0}' is not implemented.")]
pub struct UnsupportedModeError(pub String);

/// Supported AES block cipher modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AesMode {
    Gcm,
    Cbc,
    Ctr,
}

impl AesMode {
    pub const ALL: [AesMode; 3] = [AesMode::Gcm, AesMode::Cbc, AesMode::Ctr];

    /// Name used in the envelope and the mode drop-down.
    pub fn wire_name(&self) -> &'static str {
        match self {
            AesMode::Gcm => "AES-GCM",
            AesMode::Cbc => "AES-CBC",
            AesMode::Ctr => "AES-CTR",
        }
    }

    /// GCM and CBC take an IV; CTR takes a counter block instead.
    pub fn uses_iv(&self) -> bool {
        matches!(self, AesMode::Gcm | AesMode::Cbc)
    }

    pub fn uses_counter(&self) -> bool {
        matches!(self, AesMode::Ctr)
    }
}

impl fmt::Display for AesMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

impl FromStr for AesMode {
    type Err = UnsupportedModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AES-GCM" => Ok(AesMode::Gcm),
            "AES-CBC" => Ok(AesMode::Cbc),
            "AES-CTR" => Ok(AesMode::Ctr),
            other => Err(UnsupportedModeError(other.to_string())),
        }
    }
}

/// Supported AES key sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySize {
    Bits128,
    Bits256,
}

impl KeySize {
    pub const ALL: [KeySize; 2] = [KeySize::Bits128, KeySize::Bits256];

    pub fn bits(&self) -> u32 {
        match self {
            KeySize::Bits128 => 128,
            KeySize::Bits256 => 256,
        }
    }

    pub fn byte_len(&self) -> usize {
        (self.bits() / 8) as usize
    }

    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            128 => Some(KeySize::Bits128),
            256 => Some(KeySize::Bits256),
            _ => None,
        }
    }

    /// Parses a drop-down label ("128" / "256").
    pub fn from_label(label: &str) -> Option<Self> {
        label.parse().ok().and_then(Self::from_bits)
    }
}

impl fmt::Display for KeySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bits())
    }
}

/// The structured output of an encryption, JSON-serialized and then
/// base64-encoded as the primary output. Field names and order are part of
/// the wire format; `iv` is present for GCM/CBC and `counter` for CTR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub ciphertext: String,
    pub salt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iv: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter: Option<String>,
    #[serde(rename = "encMode")]
    pub enc_mode: String,
    #[serde(rename = "encKeySize")]
    pub enc_key_size: u32,
    #[serde(rename = "pbkdf2Iters")]
    pub pbkdf2_iters: serde_json::Number,
}

impl Envelope {
    pub fn new(
        ciphertext: &[u8],
        salt: &[u8],
        iv: Option<&[u8]>,
        counter: Option<&[u8]>,
        mode: AesMode,
        key_size: KeySize,
        iterations: u32,
    ) -> Self {
        Self {
            ciphertext: codec::bytes_to_base64(ciphertext),
            salt: codec::bytes_to_base64(salt),
            iv: iv.map(codec::bytes_to_base64),
            counter: counter.map(codec::bytes_to_base64),
            enc_mode: mode.wire_name().to_string(),
            enc_key_size: key_size.bits(),
            pbkdf2_iters: serde_json::Number::from(iterations),
        }
    }
}

/// Malformed encrypted payload: recoverable, reported as a single alert,
/// and always raised before any crypto call.
#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("{0}")]
    Malformed(String),
    #[error("Invalid base64 in field '{0}'.")]
    Base64(&'static str),
    #[error("Missing '{field}' field for {mode}.")]
    MissingParam {
        field: &'static str,
        mode: AesMode,
    },
    #[error("Invalid AES key size: '{0}'")]
    KeySize(u32),
    #[error("Invalid PBKDF2 iterations setting: {0}")]
    Iterations(serde_json::Number),
    #[error(transparent)]
    Mode(#[from] UnsupportedModeError),
}

/// Fully validated decryption input. Constructing one performs every
/// pre-crypto check; the first violation wins.
#[derive(Debug, Clone)]
pub struct DecryptPayload {
    pub ciphertext: Vec<u8>,
    pub salt: Vec<u8>,
    pub iv: Option<Vec<u8>>,
    pub counter: Option<Vec<u8>>,
    pub mode: AesMode,
    pub key_size: KeySize,
    pub iterations: u32,
}

impl DecryptPayload {
    pub fn from_json(value: serde_json::Value) -> Result<Self, PayloadError> {
        let envelope: Envelope =
            serde_json::from_value(value).map_err(|e| PayloadError::Malformed(e.to_string()))?;
        Self::from_envelope(&envelope)
    }

    pub fn from_envelope(envelope: &Envelope) -> Result<Self, PayloadError> {
        let ciphertext = codec::base64_to_bytes(&envelope.ciphertext)
            .map_err(|_| PayloadError::Base64("ciphertext"))?;
        let salt =
            codec::base64_to_bytes(&envelope.salt).map_err(|_| PayloadError::Base64("salt"))?;
        let mode: AesMode = envelope.enc_mode.parse()?;
        let iv = match (&envelope.iv, mode.uses_iv()) {
            (Some(text), _) => {
                Some(codec::base64_to_bytes(text).map_err(|_| PayloadError::Base64("iv"))?)
            }
            (None, true) => return Err(PayloadError::MissingParam { field: "iv", mode }),
            (None, false) => None,
        };
        let counter = match (&envelope.counter, mode.uses_counter()) {
            (Some(text), _) => {
                Some(codec::base64_to_bytes(text).map_err(|_| PayloadError::Base64("counter"))?)
            }
            (None, true) => {
                return Err(PayloadError::MissingParam {
                    field: "counter",
                    mode,
                })
            }
            (None, false) => None,
        };
        let key_size = KeySize::from_bits(envelope.enc_key_size)
            .ok_or(PayloadError::KeySize(envelope.enc_key_size))?;
        let iterations = match envelope.pbkdf2_iters.as_u64() {
            Some(n) if n >= 1 && n <= u32::MAX as u64 => n as u32,
            _ => return Err(PayloadError::Iterations(envelope.pbkdf2_iters.clone())),
        };
        Ok(Self {
            ciphertext,
            salt,
            iv,
            counter,
            mode,
            key_size,
            iterations,
        })
    }
}

//! msglock - Password-Based Message Encryption TUI/CLI
//!
//! Encrypts short messages with AES (GCM, CBC or CTR) under a key derived
//! from a password with PBKDF2, or a raw key supplied directly. The
//! interactive interface is a pair of tabbed forms whose elements
//! enable and hide themselves based on the current selections.

pub mod codec;
pub mod element;
pub mod form;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod provider;
pub mod screens;
pub mod tabs;
pub mod tui;

pub use element::{Alert, AlertKind, DataType, ElementId, ElementKind, UiError, Value};
pub use form::{ElementParams, Form, FormSnapshot, UiResult};
pub use models::{AesMode, DecryptPayload, Envelope, KeySize, PayloadError};
pub use pipeline::{
    run_decrypt, run_encrypt, DecryptOutcome, DecryptRequest, EncryptOutcome, EncryptRequest,
};
pub use provider::{AesKey, CipherParams, CryptoError, CryptoProvider};
pub use tabs::{FormId, TabList};

/// Application result type
pub type Result<T> = anyhow::Result<T>;

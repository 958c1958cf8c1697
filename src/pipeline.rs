//! Single-shot encryption and decryption operations. Each call is an
//! independent run over plain request data: resolve parameters, obtain a
//! key (derived or imported), dispatch to the mode cipher, and return
//! everything the caller needs to write back into the UI.

use thiserror::Error;

use crate::models::{DecryptPayload, Envelope, COUNTER_SIZE, IV_SIZE, SALT_SIZE};
use crate::models::{AesMode, KeySize};
use crate::provider::{CipherParams, CryptoError, CryptoProvider};

#[derive(Error, Debug)]
pub enum EncryptError {
    /// The supplied raw key could not be imported.
    #[error("{0}")]
    ImportKey(CryptoError),
    /// Derivation or cipher failure.
    #[error("{0}")]
    Crypto(CryptoError),
}

#[derive(Error, Debug)]
pub enum DecryptError {
    /// The supplied raw key could not be imported.
    #[error("{0}")]
    ImportKey(CryptoError),
    /// Derivation or cipher failure.
    #[error("{0}")]
    Crypto(CryptoError),
}

impl DecryptError {
    /// True when the failure is a bare rejection that must surface as the
    /// generic could-not-decrypt message rather than a diagnostic.
    pub fn is_opaque(&self) -> bool {
        matches!(self, DecryptError::Crypto(CryptoError::Rejected))
    }
}

/// Inputs to one encryption run. `fixed_*` parameters override the random
/// defaults; `manual_key` replaces password derivation entirely.
#[derive(Debug, Clone)]
pub struct EncryptRequest {
    pub message: String,
    pub password: String,
    pub iterations: u32,
    pub mode: AesMode,
    pub key_size: KeySize,
    pub manual_key: Option<Vec<u8>>,
    pub fixed_salt: Option<Vec<u8>>,
    pub fixed_iv: Option<Vec<u8>>,
    pub fixed_counter: Option<Vec<u8>>,
}

/// Results of one encryption run, including the resolved parameters so
/// the UI can surface them for audit and reuse.
#[derive(Debug, Clone)]
pub struct EncryptOutcome {
    pub envelope: Envelope,
    pub raw_ciphertext: Vec<u8>,
    pub salt: Vec<u8>,
    pub iv: Option<Vec<u8>>,
    pub counter: Option<Vec<u8>>,
    /// Exported key bytes when derived from a password; absent on the
    /// manual-key path where the user already holds them.
    pub derived_key: Option<Vec<u8>>,
}

/// Inputs to one decryption run over an already-validated payload.
#[derive(Debug, Clone)]
pub struct DecryptRequest {
    pub payload: DecryptPayload,
    pub password: String,
    pub manual_key: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct DecryptOutcome {
    /// Recovered text, decoded lossily so undecodable bytes render as
    /// replacement characters instead of failing the whole operation.
    pub plaintext: String,
    pub derived_key: Option<Vec<u8>>,
}

pub async fn run_encrypt(
    provider: &CryptoProvider,
    request: EncryptRequest,
) -> Result<EncryptOutcome, EncryptError> {
    // The salt is resolved whether or not derivation uses it, so the
    // envelope schema stays stable across key sources.
    let salt = request
        .fixed_salt
        .clone()
        .unwrap_or_else(|| provider.random_bytes(SALT_SIZE));

    let (key, derived_key) = match &request.manual_key {
        Some(raw) => {
            let key = provider
                .import_key(raw, request.mode)
                .map_err(EncryptError::ImportKey)?;
            (key, None)
        }
        None => {
            let key = provider
                .derive_key(
                    &request.password,
                    &salt,
                    request.iterations,
                    request.mode,
                    request.key_size,
                )
                .await
                .map_err(EncryptError::Crypto)?;
            let exported = provider.export_key(&key);
            (key, Some(exported))
        }
    };

    let (params, iv, counter) = if request.mode.uses_iv() {
        let iv = request
            .fixed_iv
            .clone()
            .unwrap_or_else(|| provider.random_bytes(IV_SIZE));
        (CipherParams::iv(iv.clone()), Some(iv), None)
    } else {
        let counter = request
            .fixed_counter
            .clone()
            .unwrap_or_else(|| provider.random_bytes(COUNTER_SIZE));
        (CipherParams::counter(counter.clone()), None, Some(counter))
    };

    tracing::debug!(
        mode = %request.mode,
        key_size = %key.size(),
        iterations = request.iterations,
        "encrypting message"
    );
    let ciphertext = provider
        .encrypt(&key, &params, request.message.as_bytes())
        .await
        .map_err(EncryptError::Crypto)?;

    let envelope = Envelope::new(
        &ciphertext,
        &salt,
        iv.as_deref(),
        counter.as_deref(),
        request.mode,
        key.size(),
        request.iterations,
    );
    Ok(EncryptOutcome {
        envelope,
        raw_ciphertext: ciphertext,
        salt,
        iv,
        counter,
        derived_key,
    })
}

pub async fn run_decrypt(
    provider: &CryptoProvider,
    request: DecryptRequest,
) -> Result<DecryptOutcome, DecryptError> {
    let payload = request.payload;
    let (key, derived_key) = match &request.manual_key {
        Some(raw) => {
            let key = provider
                .import_key(raw, payload.mode)
                .map_err(DecryptError::ImportKey)?;
            (key, None)
        }
        None => {
            let key = provider
                .derive_key(
                    &request.password,
                    &payload.salt,
                    payload.iterations,
                    payload.mode,
                    payload.key_size,
                )
                .await
                .map_err(DecryptError::Crypto)?;
            let exported = provider.export_key(&key);
            (key, Some(exported))
        }
    };

    let params = if payload.mode.uses_iv() {
        CipherParams::iv(payload.iv.clone().unwrap_or_default())
    } else {
        CipherParams::counter(payload.counter.clone().unwrap_or_default())
    };

    tracing::debug!(mode = %payload.mode, key_size = %payload.key_size, "decrypting message");
    let plaintext_bytes = provider
        .decrypt(&key, &params, &payload.ciphertext)
        .await
        .map_err(DecryptError::Crypto)?;

    Ok(DecryptOutcome {
        plaintext: String::from_utf8_lossy(&plaintext_bytes).into_owned(),
        derived_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DEFAULT_PBKDF2_ITERATIONS;

    fn request(mode: AesMode) -> EncryptRequest {
        EncryptRequest {
            message: "the eagle lands at midnight".to_string(),
            password: "hunter2".to_string(),
            iterations: 1000,
            mode,
            key_size: KeySize::Bits256,
            manual_key: None,
            fixed_salt: None,
            fixed_iv: None,
            fixed_counter: None,
        }
    }

    #[tokio::test]
    async fn test_gcm_outcome_carries_iv_not_counter() {
        let provider = CryptoProvider::new();
        let outcome = run_encrypt(&provider, request(AesMode::Gcm)).await.unwrap();
        assert_eq!(outcome.salt.len(), SALT_SIZE);
        assert_eq!(outcome.iv.as_ref().map(Vec::len), Some(IV_SIZE));
        assert_eq!(outcome.counter, None);
        assert!(outcome.envelope.iv.is_some());
        assert!(outcome.envelope.counter.is_none());
        assert_eq!(outcome.envelope.enc_mode, "AES-GCM");
        assert_eq!(outcome.envelope.enc_key_size, 256);
    }

    #[tokio::test]
    async fn test_ctr_outcome_carries_counter_not_iv() {
        let provider = CryptoProvider::new();
        let outcome = run_encrypt(&provider, request(AesMode::Ctr)).await.unwrap();
        assert_eq!(outcome.counter.as_ref().map(Vec::len), Some(COUNTER_SIZE));
        assert_eq!(outcome.iv, None);
        assert!(outcome.envelope.counter.is_some());
        assert!(outcome.envelope.iv.is_none());
    }

    #[tokio::test]
    async fn test_derived_key_is_surfaced_for_audit() {
        let provider = CryptoProvider::new();
        let outcome = run_encrypt(&provider, request(AesMode::Gcm)).await.unwrap();
        assert_eq!(outcome.derived_key.as_ref().map(Vec::len), Some(32));
    }

    #[tokio::test]
    async fn test_manual_key_skips_derivation_and_reports_true_size() {
        let provider = CryptoProvider::new();
        let mut req = request(AesMode::Gcm);
        req.manual_key = Some(vec![0x42; 16]);
        // Drop-down says 256 but the imported key decides.
        req.key_size = KeySize::Bits256;
        let outcome = run_encrypt(&provider, req).await.unwrap();
        assert_eq!(outcome.derived_key, None);
        assert_eq!(outcome.envelope.enc_key_size, 128);
    }

    #[tokio::test]
    async fn test_bad_manual_key_is_an_import_error() {
        let provider = CryptoProvider::new();
        let mut req = request(AesMode::Gcm);
        req.manual_key = Some(vec![0u8; 10]);
        let err = run_encrypt(&provider, req).await.unwrap_err();
        assert!(matches!(err, EncryptError::ImportKey(_)));
    }

    #[tokio::test]
    async fn test_default_iteration_count_round_trips() {
        let provider = CryptoProvider::new();
        let mut req = request(AesMode::Gcm);
        req.iterations = DEFAULT_PBKDF2_ITERATIONS;
        let outcome = run_encrypt(&provider, req).await.unwrap();

        let payload = DecryptPayload::from_envelope(&outcome.envelope).unwrap();
        let decrypted = run_decrypt(
            &provider,
            DecryptRequest {
                payload,
                password: "hunter2".to_string(),
                manual_key: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(decrypted.plaintext, "the eagle lands at midnight");
        assert!(decrypted.derived_key.is_some());
    }
}

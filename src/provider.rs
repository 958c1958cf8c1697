//! Crypto provider wrapping the primitive operations the pipeline
//! consumes: OS randomness, PBKDF2-HMAC-SHA256 key derivation, raw key
//! import/export, and AES encryption/decryption in GCM, CBC and CTR modes.
//!
//! GCM and CBC take a 16-byte IV; CTR takes a 16-byte counter block whose
//! low 64 bits increment big-endian. Authentication and padding rejections
//! are deliberately opaque; every other failure carries a diagnostic.

use aes::cipher::{
    block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit, StreamCipher,
};
use aes::{Aes128, Aes256};
use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{AesGcm, Nonce};
use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroize;

use crate::models::{AesMode, KeySize, COUNTER_SIZE, IV_SIZE};

// 16-byte nonces rather than the usual 12 keep GCM parameters uniform
// with the other modes.
type Aes128Gcm16 = AesGcm<Aes128, U16>;
type Aes256Gcm16 = AesGcm<Aes256, U16>;
type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type Aes128Ctr64 = ctr::Ctr64BE<Aes128>;
type Aes256Ctr64 = ctr::Ctr64BE<Aes256>;

#[derive(Error, Debug)]
pub enum CryptoError {
    /// Authentication-tag or padding rejection. Carries no detail so the
    /// caller cannot distinguish a wrong key from tampered data.
    #[error("ciphertext rejected")]
    Rejected,
    #[error("invalid key length: expected 16 or 32 bytes, got {0}")]
    KeyLength(usize),
    #[error("invalid {name} length: expected {expected}, got {got}")]
    ParamLength {
        name: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("iteration count must be at least 1")]
    Iterations,
    #[error("{0}")]
    Provider(String),
}

/// Symmetric key bound to the mode it was created for. Key bytes are
/// wiped on drop.
#[derive(Debug)]
pub struct AesKey {
    mode: AesMode,
    size: KeySize,
    bytes: Vec<u8>,
}

impl AesKey {
    pub fn mode(&self) -> AesMode {
        self.mode
    }

    pub fn size(&self) -> KeySize {
        self.size
    }
}

impl Drop for AesKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

/// Per-operation cipher parameters: an IV for GCM/CBC, a counter block
/// for CTR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CipherParams {
    Iv(Vec<u8>),
    Counter(Vec<u8>),
}

impl CipherParams {
    pub fn iv(bytes: impl Into<Vec<u8>>) -> Self {
        CipherParams::Iv(bytes.into())
    }

    pub fn counter(bytes: impl Into<Vec<u8>>) -> Self {
        CipherParams::Counter(bytes.into())
    }
}

#[derive(Default)]
pub struct CryptoProvider;

impl CryptoProvider {
    pub fn new() -> Self {
        Self
    }

    /// Cryptographically secure random bytes from the OS.
    pub fn random_bytes(&self, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        OsRng.fill_bytes(&mut buf);
        buf
    }

    /// Derives an AES key from a password with PBKDF2-HMAC-SHA256. Runs on
    /// the blocking pool; high iteration counts take real time.
    pub async fn derive_key(
        &self,
        password: &str,
        salt: &[u8],
        iterations: u32,
        mode: AesMode,
        size: KeySize,
    ) -> Result<AesKey, CryptoError> {
        if iterations == 0 {
            return Err(CryptoError::Iterations);
        }
        let password = password.as_bytes().to_vec();
        let salt = salt.to_vec();
        let key_len = size.byte_len();
        let bytes = tokio::task::spawn_blocking(move || {
            let mut key = vec![0u8; key_len];
            pbkdf2_hmac::<Sha256>(&password, &salt, iterations, &mut key);
            key
        })
        .await
        .map_err(|e| CryptoError::Provider(format!("key derivation task failed: {}", e)))?;
        Ok(AesKey { mode, size, bytes })
    }

    /// Imports raw key bytes, inferring the key size from the length.
    /// Only 128- and 256-bit keys are accepted.
    pub fn import_key(&self, raw: &[u8], mode: AesMode) -> Result<AesKey, CryptoError> {
        let size = match raw.len() {
            16 => KeySize::Bits128,
            32 => KeySize::Bits256,
            n => return Err(CryptoError::KeyLength(n)),
        };
        Ok(AesKey {
            mode,
            size,
            bytes: raw.to_vec(),
        })
    }

    /// Copies out the raw key bytes for display/audit.
    pub fn export_key(&self, key: &AesKey) -> Vec<u8> {
        key.bytes.clone()
    }

    pub async fn encrypt(
        &self,
        key: &AesKey,
        params: &CipherParams,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        match (key.mode, params) {
            (AesMode::Gcm, CipherParams::Iv(iv)) => {
                check_param_len("iv", iv, IV_SIZE)?;
                match key.size {
                    KeySize::Bits128 => gcm_cipher::<Aes128>(&key.bytes)?
                        .encrypt(Nonce::from_slice(iv), plaintext)
                        .map_err(|_| CryptoError::Provider("encryption failure".into())),
                    KeySize::Bits256 => gcm_cipher::<Aes256>(&key.bytes)?
                        .encrypt(Nonce::from_slice(iv), plaintext)
                        .map_err(|_| CryptoError::Provider("encryption failure".into())),
                }
            }
            (AesMode::Cbc, CipherParams::Iv(iv)) => {
                check_param_len("iv", iv, IV_SIZE)?;
                let ciphertext = match key.size {
                    KeySize::Bits128 => Aes128CbcEnc::new_from_slices(&key.bytes, iv)
                        .map_err(|e| CryptoError::Provider(e.to_string()))?
                        .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
                    KeySize::Bits256 => Aes256CbcEnc::new_from_slices(&key.bytes, iv)
                        .map_err(|e| CryptoError::Provider(e.to_string()))?
                        .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
                };
                Ok(ciphertext)
            }
            (AesMode::Ctr, CipherParams::Counter(counter)) => {
                check_param_len("counter", counter, COUNTER_SIZE)?;
                self.ctr_keystream(key, counter, plaintext)
            }
            (mode, params) => Err(param_mismatch(mode, params)),
        }
    }

    pub async fn decrypt(
        &self,
        key: &AesKey,
        params: &CipherParams,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        match (key.mode, params) {
            (AesMode::Gcm, CipherParams::Iv(iv)) => {
                check_param_len("iv", iv, IV_SIZE)?;
                match key.size {
                    KeySize::Bits128 => gcm_cipher::<Aes128>(&key.bytes)?
                        .decrypt(Nonce::from_slice(iv), ciphertext)
                        .map_err(|_| CryptoError::Rejected),
                    KeySize::Bits256 => gcm_cipher::<Aes256>(&key.bytes)?
                        .decrypt(Nonce::from_slice(iv), ciphertext)
                        .map_err(|_| CryptoError::Rejected),
                }
            }
            (AesMode::Cbc, CipherParams::Iv(iv)) => {
                check_param_len("iv", iv, IV_SIZE)?;
                match key.size {
                    KeySize::Bits128 => Aes128CbcDec::new_from_slices(&key.bytes, iv)
                        .map_err(|e| CryptoError::Provider(e.to_string()))?
                        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                        .map_err(|_| CryptoError::Rejected),
                    KeySize::Bits256 => Aes256CbcDec::new_from_slices(&key.bytes, iv)
                        .map_err(|e| CryptoError::Provider(e.to_string()))?
                        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                        .map_err(|_| CryptoError::Rejected),
                }
            }
            (AesMode::Ctr, CipherParams::Counter(counter)) => {
                check_param_len("counter", counter, COUNTER_SIZE)?;
                // CTR is its own inverse.
                self.ctr_keystream(key, counter, ciphertext)
            }
            (mode, params) => Err(param_mismatch(mode, params)),
        }
    }

    fn ctr_keystream(
        &self,
        key: &AesKey,
        counter: &[u8],
        data: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let mut buf = data.to_vec();
        match key.size {
            KeySize::Bits128 => Aes128Ctr64::new_from_slices(&key.bytes, counter)
                .map_err(|e| CryptoError::Provider(e.to_string()))?
                .apply_keystream(&mut buf),
            KeySize::Bits256 => Aes256Ctr64::new_from_slices(&key.bytes, counter)
                .map_err(|e| CryptoError::Provider(e.to_string()))?
                .apply_keystream(&mut buf),
        }
        Ok(buf)
    }
}

fn gcm_cipher<C>(key: &[u8]) -> Result<AesGcm<C, U16>, CryptoError>
where
    AesGcm<C, U16>: KeyInit,
{
    AesGcm::<C, U16>::new_from_slice(key).map_err(|e| CryptoError::Provider(e.to_string()))
}

fn check_param_len(name: &'static str, bytes: &[u8], expected: usize) -> Result<(), CryptoError> {
    if bytes.len() != expected {
        return Err(CryptoError::ParamLength {
            name,
            expected,
            got: bytes.len(),
        });
    }
    Ok(())
}

fn param_mismatch(mode: AesMode, params: &CipherParams) -> CryptoError {
    let given = match params {
        CipherParams::Iv(_) => "an IV",
        CipherParams::Counter(_) => "a counter block",
    };
    CryptoError::Provider(format!("{} does not take {}", mode, given))
}

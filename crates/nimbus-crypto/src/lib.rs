//! # nimbus-crypto
//!
//! Payload cipher for Nimbus message bodies.
//!
//! Messages travel as base64-encoded AES-256-CBC ciphertext. The AES key is
//! derived from the configured cipher key: the first 32 hex characters of
//! its SHA-256 digest, taken as raw bytes. The IV is the fixed ASCII block
//! the service expects, so any client holding the same cipher key can
//! decrypt.
//!
//! [`Cryptor`] is the seam the event layer depends on; [`AesCbcCryptor`] is
//! the production implementation. Content that is not actually encrypted
//! (non-string payloads, invalid base64, bad padding) surfaces as a typed
//! [`CryptoError`] rather than a panic.

#![deny(unsafe_code)]

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::Aes256;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Fixed initialization vector used by the service's payload scheme.
const IV: &[u8; 16] = b"0123456789012345";

/// A payload could not be encrypted or decrypted.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The payload is not a string, so it cannot be ciphertext.
    #[error("payload is not an encrypted string")]
    NotEncrypted,

    /// The ciphertext is not valid base64.
    #[error("ciphertext is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Block decryption failed: wrong key or corrupt ciphertext.
    #[error("block decryption failed: invalid padding or corrupt ciphertext")]
    Decrypt,

    /// The decrypted bytes are not valid UTF-8.
    #[error("plaintext is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// The message could not be serialized for encryption.
    #[error("message serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Symmetric payload cipher used by events that carry a cipher key.
pub trait Cryptor: Send + Sync {
    /// Encrypt a message body into a base64 ciphertext string value.
    fn encrypt(&self, message: &Value) -> Result<Value, CryptoError>;

    /// Decrypt a base64 ciphertext string value back into a message body.
    ///
    /// Plaintext that is not valid JSON is returned as a string value.
    fn decrypt(&self, payload: &Value) -> Result<Value, CryptoError>;
}

/// AES-256-CBC cryptor with SHA-256 key derivation.
pub struct AesCbcCryptor {
    key: [u8; 32],
}

impl AesCbcCryptor {
    /// Derive the AES key from a cipher key string.
    #[must_use]
    pub fn new(cipher_key: &str) -> Self {
        let digest = Sha256::digest(cipher_key.as_bytes());
        let hex: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
        let mut key = [0u8; 32];
        key.copy_from_slice(&hex.as_bytes()[..32]);
        Self { key }
    }
}

impl Cryptor for AesCbcCryptor {
    fn encrypt(&self, message: &Value) -> Result<Value, CryptoError> {
        let plaintext = serde_json::to_string(message)?;
        let cipher =
            Aes256CbcEnc::new_from_slices(&self.key, IV).map_err(|_| CryptoError::Decrypt)?;
        let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());
        Ok(Value::String(BASE64.encode(ciphertext)))
    }

    fn decrypt(&self, payload: &Value) -> Result<Value, CryptoError> {
        let text = payload.as_str().ok_or(CryptoError::NotEncrypted)?;
        let raw = BASE64.decode(text)?;
        let cipher =
            Aes256CbcDec::new_from_slices(&self.key, IV).map_err(|_| CryptoError::Decrypt)?;
        let plaintext = cipher
            .decrypt_padded_vec_mut::<Pkcs7>(&raw)
            .map_err(|_| CryptoError::Decrypt)?;
        let plaintext = String::from_utf8(plaintext)?;
        Ok(serde_json::from_str(&plaintext).unwrap_or(Value::String(plaintext)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

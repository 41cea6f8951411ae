//! Symmetric authenticated encryption for SMS payload bodies (§4.1 of the
//! design: the Encryption Envelope). Keeps plaintext OTPs out of
//! serialized structures, logs, and the Dead Letter Office — callers
//! decrypt only immediately before a dispatch attempt, and the plaintext
//! never outlives the call stack it was decrypted on.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use thiserror::Error;

const NONCE_LEN: usize = 12;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("encryption key must be 32 bytes (64 hex characters)")]
    InvalidKey,
    #[error("invalid_token")]
    InvalidToken,
}

/// Holds a single 256-bit key and performs authenticated encrypt/decrypt.
/// Pure: no state beyond the key, no I/O.
pub struct Envelope {
    cipher: Aes256Gcm,
}

impl Envelope {
    /// Builds an envelope from a 64-character hex-encoded 256-bit key.
    pub fn from_hex_key(hex_key: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(hex_key).map_err(|_| CryptoError::InvalidKey)?;
        Self::from_bytes(&bytes)
    }

    /// Builds an envelope from a base64-encoded 256-bit key, the format
    /// `FERNET_ENCRYPTION_KEY` is documented to carry.
    pub fn from_base64_key(b64_key: &str) -> Result<Self, CryptoError> {
        let bytes = BASE64.decode(b64_key).map_err(|_| CryptoError::InvalidKey)?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(key_bytes: &[u8]) -> Result<Self, CryptoError> {
        if key_bytes.len() != 32 {
            return Err(CryptoError::InvalidKey);
        }
        let key = Key::<Aes256Gcm>::from_slice(key_bytes);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Encrypts `plaintext`, returning a base64 token encoding
    /// `nonce || ciphertext`.
    pub fn encrypt(&self, plaintext: &[u8]) -> String {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .expect("AES-256-GCM encryption over an in-memory buffer cannot fail");

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(nonce.as_slice());
        out.extend_from_slice(&ciphertext);
        BASE64.encode(out)
    }

    /// Decrypts a token produced by `encrypt`. Fails with `InvalidToken`
    /// when the base64 framing is malformed, the token is shorter than a
    /// nonce, or authentication fails (wrong key or tampered ciphertext).
    pub fn decrypt(&self, token: &str) -> Result<Vec<u8>, CryptoError> {
        let raw = BASE64.decode(token).map_err(|_| CryptoError::InvalidToken)?;
        if raw.len() < NONCE_LEN {
            return Err(CryptoError::InvalidToken);
        }
        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);
        let nonce = aes_gcm::Nonce::from_slice(nonce_bytes);
        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CryptoError::InvalidToken)
    }

    pub fn decrypt_to_string(&self, token: &str) -> Result<String, CryptoError> {
        let bytes = self.decrypt(token)?;
        String::from_utf8(bytes).map_err(|_| CryptoError::InvalidToken)
    }
}

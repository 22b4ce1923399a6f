//! Authenticated encryption for the secrets file.
//!
//! AES-256-GCM keyed by a symmetric key string. The key bytes are digested
//! with SHA-256 to form the cipher key, so any non-empty string works. Wire
//! layout: a 12-byte random nonce followed by ciphertext and tag.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("encryption key must not be empty")]
    EmptyKey,

    #[error("authenticated decryption failed")]
    Decrypt,

    #[error("encryption failed")]
    Encrypt,
}

/// AES-256-GCM codec over a derived symmetric key.
pub struct SecretCodec {
    cipher: Aes256Gcm,
}

impl SecretCodec {
    pub fn new(key: &str) -> Result<Self, CodecError> {
        if key.is_empty() {
            return Err(CodecError::EmptyKey);
        }
        let digest = Sha256::digest(key.as_bytes());
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&digest));
        Ok(Self { cipher })
    }

    /// Encrypt `plaintext` under a fresh random nonce.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| CodecError::Encrypt)?;

        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt a `nonce || ciphertext` blob. Fails on truncated input, a
    /// wrong key, or tampered content.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        if data.len() < NONCE_LEN + TAG_LEN {
            return Err(CodecError::Decrypt);
        }
        let (nonce, ciphertext) = data.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CodecError::Decrypt)
    }

    /// Fresh random key: 32 bytes, hex-encoded.
    pub fn generate_key() -> String {
        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }
}

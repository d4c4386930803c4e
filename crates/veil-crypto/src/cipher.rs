//! AES-256-GCM sealing and opening of artifact payloads
//!
//! Ciphertext format (binary):
//! ```text
//! [N bytes: ciphertext][16 bytes: GCM tag]
//! ```
//!
//! The nonce is not stored with the ciphertext; it travels in the object
//! name. No associated data is bound.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm,
};
use rand::RngCore;
use veil_core::{VeilError, VeilResult};

use crate::kdf::DerivedKey;
use crate::{NONCE_SIZE, TAG_SIZE};

/// A 96-bit AES-GCM nonce. Generated fresh for every seal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nonce([u8; NONCE_SIZE]);

impl Nonce {
    pub fn generate() -> Self {
        let mut bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> VeilResult<Self> {
        let arr: [u8; NONCE_SIZE] = bytes.try_into().map_err(|_| {
            VeilError::MalformedName(format!(
                "nonce must be {NONCE_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// Encrypt `plaintext` under `key` with a freshly generated nonce.
///
/// The nonce is chosen here and returned alongside the ciphertext; callers
/// cannot supply one, so a nonce is never reused under a key.
pub fn seal(plaintext: &[u8], key: &DerivedKey) -> VeilResult<(Nonce, Vec<u8>)> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let nonce = Nonce::generate();

    let ciphertext = cipher
        .encrypt(aes_gcm::Nonce::from_slice(nonce.as_bytes()), plaintext)
        .map_err(|e| VeilError::Other(anyhow::anyhow!("AES-GCM encryption failed: {e}")))?;

    Ok((nonce, ciphertext))
}

/// Decrypt and authenticate `ciphertext`.
///
/// The tag is verified before any plaintext is released. A short buffer, a
/// wrong key and a modified ciphertext all yield [`VeilError::TamperOrKey`].
pub fn open(ciphertext: &[u8], key: &DerivedKey, nonce: &Nonce) -> VeilResult<Vec<u8>> {
    if ciphertext.len() < TAG_SIZE {
        return Err(VeilError::TamperOrKey);
    }

    let cipher = Aes256Gcm::new(key.as_bytes().into());
    cipher
        .decrypt(aes_gcm::Nonce::from_slice(nonce.as_bytes()), ciphertext)
        .map_err(|_| VeilError::TamperOrKey)
}

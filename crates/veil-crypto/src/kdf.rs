//! Key derivation: passphrase + salt → 256-bit AES key via PBKDF2-HMAC-SHA256

use hmac::Hmac;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use veil_core::{VeilError, VeilResult};
use zeroize::Zeroize;

use crate::{KEY_SIZE, PBKDF2_ITERATIONS, SALT_SIZE};

/// Random per-artifact salt. Not secret; travels in the object name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Salt([u8; SALT_SIZE]);

impl Salt {
    /// Draw a fresh salt from the OS-seeded CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SALT_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> VeilResult<Self> {
        let arr: [u8; SALT_SIZE] = bytes.try_into().map_err(|_| {
            VeilError::KeyDerivation(format!(
                "salt must be {SALT_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }
}

/// A 256-bit key derived from a secret and a salt.
///
/// Owned by the single operation that derived it and zeroized on drop.
pub struct DerivedKey {
    bytes: [u8; KEY_SIZE],
}

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// PBKDF2 parameters
#[derive(Debug, Clone)]
pub struct KdfParams {
    /// Iteration count (default: 100_000)
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: PBKDF2_ITERATIONS,
        }
    }
}

/// Derive a 256-bit key from `secret` and `salt` using PBKDF2-HMAC-SHA256.
///
/// Deterministic: the downloader rebuilds the uploader's key from the same
/// secret and the salt read back from the object name. The minimum secret
/// length is a caller policy; only an empty secret is refused here.
pub fn derive_key(secret: &SecretString, salt: &Salt, params: &KdfParams) -> VeilResult<DerivedKey> {
    let password = secret.expose_secret().as_bytes();
    if password.is_empty() {
        return Err(VeilError::KeyDerivation("secret must not be empty".into()));
    }
    if params.iterations == 0 {
        return Err(VeilError::KeyDerivation("iteration count must be non-zero".into()));
    }

    let mut key = [0u8; KEY_SIZE];
    pbkdf2::pbkdf2::<Hmac<Sha256>>(password, salt.as_bytes(), params.iterations, &mut key)
        .map_err(|e| VeilError::KeyDerivation(format!("PBKDF2 failed: {e}")))?;

    Ok(DerivedKey::from_bytes(key))
}

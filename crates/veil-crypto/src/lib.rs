//! veil-crypto: self-describing encrypted artifacts for untrusted blob stores
//!
//! Pipeline: plaintext → PBKDF2 key (fresh salt) → AES-256-GCM seal (fresh nonce)
//!           → object name = `<name>_<salt>_<nonce>_<policy>.encrypted`
//!
//! The store never sees plaintext and holds nothing but the ciphertext and
//! its name. Anyone holding the object id and the secret can rebuild the key
//! from the salt carried in the name:
//! ```text
//! Secret (human passphrase, travels only in the share-link fragment)
//!   └── DerivedKey = PBKDF2-HMAC-SHA256(secret, salt, 100_000 rounds, 32 bytes)
//!       └── AES-256-GCM(key, nonce), 16-byte tag appended to the ciphertext
//! ```

pub mod artifact;
pub mod cipher;
pub mod codec;
pub mod kdf;
pub mod locator;
pub mod policy;
pub mod secret;

pub use artifact::{complete_download, inspect, open_artifact, prepare_upload, OpenedArtifact, PreparedUpload};
pub use cipher::{open, seal, Nonce};
pub use codec::{decode, encode, is_encrypted_name, ArtifactMetadata};
pub use kdf::{derive_key, DerivedKey, KdfParams, Salt};
pub use locator::ShareLocator;
pub use policy::{check, AccessContext, Decision};
pub use secret::generate_secret;

/// Size of a derived AES-256 key in bytes
pub const KEY_SIZE: usize = 32;

/// Size of a PBKDF2 salt in bytes
pub const SALT_SIZE: usize = 16;

/// Size of an AES-GCM nonce (96-bit)
pub const NONCE_SIZE: usize = 12;

/// Size of a GCM authentication tag
pub const TAG_SIZE: usize = 16;

/// PBKDF2-HMAC-SHA256 iteration count. Not recorded in the artifact name;
/// changing it makes existing artifacts undecryptable.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

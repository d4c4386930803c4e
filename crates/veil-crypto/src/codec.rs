//! Self-describing object names
//!
//! The store keeps a single free-text name per object, so everything a
//! downloader needs besides the secret is packed into it:
//! ```text
//! <originalName>_<b64(salt)>_<b64(nonce)>_<b64(json(policy))>.encrypted
//! ```
//!
//! The original name passes through untouched and may itself contain `_`.
//! Decoding takes the last three `_`-separated segments as salt, nonce and
//! policy and rejoins everything before them as the name.
//!
//! Segments use the RFC 4648 URL-safe alphabet with `_` replaced by `.`, so
//! an encoded segment can never contain the delimiter. Encoding omits
//! padding; decoding accepts it either way.

use base64::alphabet::Alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use veil_core::{Policy, VeilError, VeilResult};

use crate::cipher::Nonce;
use crate::kdf::Salt;
use crate::SALT_SIZE;

/// Separator between name segments
pub const DELIMITER: char = '_';

/// Marks a name as an encrypted artifact
pub const ENCRYPTED_SUFFIX: &str = ".encrypted";

/// Longest encoded name. `encode` refuses to produce anything longer and
/// `decode` rejects longer input before any parsing.
pub const MAX_ENCODED_LEN: usize = 8192;

const NAME_ALPHABET: Alphabet =
    match Alphabet::new("ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-.") {
        Ok(alphabet) => alphabet,
        Err(_) => panic!("invalid name alphabet"),
    };

const NAME_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &NAME_ALPHABET,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Everything recoverable from an encoded object name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactMetadata {
    pub original_name: String,
    pub salt: Salt,
    pub nonce: Nonce,
    pub policy: Policy,
}

/// Encode artifact metadata into a printable object name.
///
/// Fails with [`VeilError::MalformedName`] if the result would exceed
/// [`MAX_ENCODED_LEN`], since `decode` could not read it back.
pub fn encode(meta: &ArtifactMetadata) -> VeilResult<String> {
    let policy_json = serde_json::to_vec(&meta.policy)
        .map_err(|e| VeilError::Other(anyhow::anyhow!("policy serialization: {e}")))?;

    let encoded = format!(
        "{name}{d}{salt}{d}{nonce}{d}{policy}{suffix}",
        name = meta.original_name,
        d = DELIMITER,
        salt = NAME_ENGINE.encode(meta.salt.as_bytes()),
        nonce = NAME_ENGINE.encode(meta.nonce.as_bytes()),
        policy = NAME_ENGINE.encode(policy_json),
        suffix = ENCRYPTED_SUFFIX,
    );
    if encoded.len() > MAX_ENCODED_LEN {
        return Err(malformed(format!(
            "encoded name would be {} bytes (max {MAX_ENCODED_LEN})",
            encoded.len()
        )));
    }
    Ok(encoded)
}

/// Decode an object name back into artifact metadata.
///
/// The name is untrusted input from a human-editable field: every segment
/// is validated and any failure is [`VeilError::MalformedName`].
pub fn decode(name: &str) -> VeilResult<ArtifactMetadata> {
    if name.len() > MAX_ENCODED_LEN {
        return Err(malformed(format!("name is {} bytes long", name.len())));
    }

    let body = name
        .strip_suffix(ENCRYPTED_SUFFIX)
        .ok_or_else(|| malformed(format!("missing {ENCRYPTED_SUFFIX} suffix")))?;

    let segments: Vec<&str> = body.split(DELIMITER).collect();
    if segments.len() < 4 {
        return Err(malformed(format!(
            "expected at least 4 segments, found {}",
            segments.len()
        )));
    }

    let (name_parts, tail) = segments.split_at(segments.len() - 3);
    let (salt_b64, nonce_b64, policy_b64) = (tail[0], tail[1], tail[2]);

    let salt_bytes = decode_segment("salt", salt_b64)?;
    let salt = Salt::from_slice(&salt_bytes).map_err(|_| {
        malformed(format!(
            "salt must be {SALT_SIZE} bytes, got {}",
            salt_bytes.len()
        ))
    })?;
    let nonce = Nonce::from_slice(&decode_segment("nonce", nonce_b64)?)?;

    let policy_json = decode_segment("policy", policy_b64)?;
    let policy: Policy = serde_json::from_slice(&policy_json)
        .map_err(|e| malformed(format!("policy is not valid JSON: {e}")))?;

    Ok(ArtifactMetadata {
        original_name: name_parts.join(&DELIMITER.to_string()),
        salt,
        nonce,
        policy,
    })
}

/// Cheap check used when scanning a store listing.
pub fn is_encrypted_name(name: &str) -> bool {
    name.ends_with(ENCRYPTED_SUFFIX)
}

fn decode_segment(what: &str, segment: &str) -> VeilResult<Vec<u8>> {
    if segment.is_empty() {
        return Err(malformed(format!("{what} segment is empty")));
    }
    NAME_ENGINE
        .decode(segment)
        .map_err(|e| malformed(format!("{what} segment is not base64: {e}")))
}

fn malformed(msg: String) -> VeilError {
    VeilError::MalformedName(msg)
}

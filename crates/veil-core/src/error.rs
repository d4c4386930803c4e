use thiserror::Error;

use crate::types::DenyReason;

pub type VeilResult<T> = Result<T, VeilError>;

#[derive(Debug, Error)]
pub enum VeilError {
    /// The object name does not decode: not a veil artifact, or corrupted.
    #[error("malformed artifact name: {0}")]
    MalformedName(String),

    /// AEAD tag verification failed. Wrong secret and modified ciphertext
    /// are deliberately reported the same way.
    #[error("wrong key or corrupted file")]
    TamperOrKey,

    #[error("access denied: {0}")]
    PolicyViolation(DenyReason),

    #[error("invalid share link: {0}")]
    InvalidLocator(String),

    #[error("storage error: {0}")]
    Store(String),

    #[error("key derivation error: {0}")]
    KeyDerivation(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VeilError {
    /// True for failures of the external store, the only class a caller
    /// may reasonably retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, VeilError::Store(_) | VeilError::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tamper_message_has_no_detail() {
        assert_eq!(VeilError::TamperOrKey.to_string(), "wrong key or corrupted file");
    }

    #[test]
    fn test_policy_violation_message() {
        let err = VeilError::PolicyViolation(DenyReason::Expired);
        assert_eq!(err.to_string(), "access denied: link expired");
    }

    #[test]
    fn test_only_store_errors_are_transient() {
        assert!(VeilError::Store("503".into()).is_transient());
        assert!(!VeilError::TamperOrKey.is_transient());
        assert!(!VeilError::MalformedName("x".into()).is_transient());
        assert!(!VeilError::PolicyViolation(DenyReason::SelfDestructed).is_transient());
    }
}

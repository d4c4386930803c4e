//! Artifact protocol: seal a payload for upload, open it after download
//!
//! An artifact is either sealed (ciphertext + encoded name, as the store
//! holds it) or opened (plaintext in memory, never written back). The only
//! way from one to the other is [`complete_download`], and only after the
//! policy admits.

use secrecy::SecretString;
use veil_core::{Policy, VeilResult};

use crate::cipher;
use crate::codec::{self, ArtifactMetadata};
use crate::kdf::{derive_key, KdfParams, Salt};
use crate::policy::{self, AccessContext};

/// A sealed artifact ready to hand to the store.
#[derive(Debug)]
pub struct PreparedUpload {
    pub ciphertext: Vec<u8>,
    pub encoded_name: String,
}

/// An opened artifact. Lives only in memory.
#[derive(Debug)]
pub struct OpenedArtifact {
    pub plaintext: Vec<u8>,
    pub original_name: String,
    pub policy: Policy,
}

/// Encrypt `plaintext` and encode its metadata into an object name.
pub fn prepare_upload(
    plaintext: &[u8],
    original_name: &str,
    secret: &SecretString,
    policy: &Policy,
    params: &KdfParams,
) -> VeilResult<PreparedUpload> {
    let salt = Salt::generate();
    let key = derive_key(secret, &salt, params)?;
    let (nonce, ciphertext) = cipher::seal(plaintext, &key)?;

    let encoded_name = codec::encode(&ArtifactMetadata {
        original_name: original_name.to_string(),
        salt,
        nonce,
        policy: policy.clone(),
    })?;

    tracing::debug!(
        name_len = original_name.len(),
        plaintext_len = plaintext.len(),
        ciphertext_len = ciphertext.len(),
        unrestricted = policy.is_unrestricted(),
        "sealed artifact"
    );

    Ok(PreparedUpload {
        ciphertext,
        encoded_name,
    })
}

/// Decode an object name and evaluate its policy.
///
/// Lets a caller refuse access before fetching any ciphertext.
pub fn inspect(encoded_name: &str, ctx: &AccessContext) -> VeilResult<ArtifactMetadata> {
    let meta = codec::decode(encoded_name)?;
    let decision = policy::check(&meta.policy, ctx);
    if let policy::Decision::Deny(reason) = decision {
        tracing::info!(%reason, "policy denied access");
    }
    decision.into_result()?;
    Ok(meta)
}

/// Derive the key from the metadata's salt and open the ciphertext.
pub fn open_artifact(
    meta: ArtifactMetadata,
    ciphertext: &[u8],
    secret: &SecretString,
    params: &KdfParams,
) -> VeilResult<OpenedArtifact> {
    let key = derive_key(secret, &meta.salt, params)?;
    let plaintext = cipher::open(ciphertext, &key, &meta.nonce)?;

    Ok(OpenedArtifact {
        plaintext,
        original_name: meta.original_name,
        policy: meta.policy,
    })
}

/// Decode, check policy, then decrypt. Policy is evaluated before any key
/// derivation so a denied caller learns nothing about key correctness.
pub fn complete_download(
    encoded_name: &str,
    ciphertext: &[u8],
    secret: &SecretString,
    ctx: &AccessContext,
    params: &KdfParams,
) -> VeilResult<OpenedArtifact> {
    let meta = inspect(encoded_name, ctx)?;
    open_artifact(meta, ciphertext, secret, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use veil_core::{DenyReason, VeilError};

    fn fast_params() -> KdfParams {
        KdfParams { iterations: 1_000 }
    }

    #[test]
    fn test_hello_txt_scenario() {
        let plaintext = [0x68, 0x65, 0x6C, 0x6C, 0x6F];
        let secret = SecretString::from("correct-horse-battery");
        let params = KdfParams::default();

        let upload =
            prepare_upload(&plaintext, "hello.txt", &secret, &Policy::default(), &params).unwrap();
        assert!(upload.encoded_name.starts_with("hello.txt_"));

        let meta = codec::decode(&upload.encoded_name).unwrap();
        assert_eq!(meta.original_name, "hello.txt");

        let ctx = AccessContext::new(Utc::now());
        let opened =
            complete_download(&upload.encoded_name, &upload.ciphertext, &secret, &ctx, &params)
                .unwrap();
        assert_eq!(opened.plaintext, plaintext);
        assert_eq!(opened.original_name, "hello.txt");
        assert_eq!(opened.policy, Policy::default());

        let wrong = complete_download(
            &upload.encoded_name,
            &upload.ciphertext,
            &SecretString::from("wrong-secret"),
            &ctx,
            &params,
        );
        assert!(matches!(wrong, Err(VeilError::TamperOrKey)));
    }

    #[test]
    fn test_expired_denied_before_decrypt() {
        let secret = SecretString::from("s3cret-words");
        let policy = Policy {
            expires_at: Some(Utc::now() - Duration::hours(1)),
            ..Policy::default()
        };
        let upload = prepare_upload(b"data", "old.bin", &secret, &policy, &fast_params()).unwrap();

        // Garbage ciphertext: a policy denial must surface, not a tamper error.
        let ctx = AccessContext::new(Utc::now());
        let result = complete_download(&upload.encoded_name, b"garbage", &secret, &ctx, &fast_params());
        assert!(matches!(
            result,
            Err(VeilError::PolicyViolation(DenyReason::Expired))
        ));
    }

    #[test]
    fn test_download_limit_enforced() {
        let secret = SecretString::from("limit-me");
        let policy = Policy {
            max_downloads: Some(2),
            ..Policy::default()
        };
        let upload = prepare_upload(b"data", "f.txt", &secret, &policy, &fast_params()).unwrap();

        let ok_ctx = AccessContext::new(Utc::now()).with_downloads(1);
        assert!(complete_download(&upload.encoded_name, &upload.ciphertext, &secret, &ok_ctx, &fast_params()).is_ok());

        let spent_ctx = AccessContext::new(Utc::now()).with_downloads(2);
        let result =
            complete_download(&upload.encoded_name, &upload.ciphertext, &secret, &spent_ctx, &fast_params());
        assert!(matches!(
            result,
            Err(VeilError::PolicyViolation(DenyReason::DownloadLimitExceeded))
        ));
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let secret = SecretString::from("tamper-test");
        let mut upload =
            prepare_upload(b"important", "doc.txt", &secret, &Policy::default(), &fast_params()).unwrap();
        upload.ciphertext[0] ^= 0x01;

        let ctx = AccessContext::new(Utc::now());
        let result =
            complete_download(&upload.encoded_name, &upload.ciphertext, &secret, &ctx, &fast_params());
        assert!(matches!(result, Err(VeilError::TamperOrKey)));
    }

    #[test]
    fn test_malformed_name_rejected() {
        let ctx = AccessContext::new(Utc::now());
        let result = complete_download(
            "holiday.jpg",
            b"",
            &SecretString::from("x"),
            &ctx,
            &fast_params(),
        );
        assert!(matches!(result, Err(VeilError::MalformedName(_))));
    }

    #[test]
    fn test_fresh_salt_and_nonce_per_upload() {
        let secret = SecretString::from("same");
        let a = prepare_upload(b"same", "same", &secret, &Policy::default(), &fast_params()).unwrap();
        let b = prepare_upload(b"same", "same", &secret, &Policy::default(), &fast_params()).unwrap();

        let ma = codec::decode(&a.encoded_name).unwrap();
        let mb = codec::decode(&b.encoded_name).unwrap();
        assert_ne!(ma.salt, mb.salt);
        assert_ne!(ma.nonce, mb.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }
}

//! Upload and download of artifacts through a [`Store`]
//!
//! Upload:   seal → put_object → set_public_readable → share link
//! Download: get_metadata → decode + policy check → get_bytes → open
//!
//! The policy is checked from the object name alone, before any ciphertext
//! is fetched. Key derivation runs on the blocking pool.

use secrecy::{ExposeSecret, SecretString};
use veil_core::{ObjectId, Policy, VeilError, VeilResult};
use veil_crypto::{
    artifact, codec, AccessContext, ArtifactMetadata, KdfParams, ShareLocator,
};

use crate::store::Store;

#[derive(Debug)]
pub struct UploadResult {
    pub object_id: ObjectId,
    pub encoded_name: String,
    /// Share link carrying the secret in its fragment. Do not log.
    pub locator: String,
}

#[derive(Debug)]
pub struct DownloadResult {
    pub object_id: ObjectId,
    pub plaintext: Vec<u8>,
    pub original_name: String,
    pub policy: Policy,
    /// The object was deleted from the store after opening (self-destruct)
    pub destroyed: bool,
}

#[derive(Debug)]
pub struct ListedArtifact {
    pub object_id: ObjectId,
    pub metadata: ArtifactMetadata,
}

/// Seal `plaintext`, store it, make it publicly readable and return the
/// share link.
///
/// If the object is stored but cannot be published, it is deleted again
/// (best effort) before the error is returned.
pub async fn upload_artifact<S: Store + ?Sized>(
    store: &S,
    plaintext: Vec<u8>,
    original_name: &str,
    secret: &SecretString,
    policy: &Policy,
    params: &KdfParams,
    base_origin: &str,
) -> VeilResult<UploadResult> {
    let prepared = {
        let name = original_name.to_string();
        let secret = SecretString::from(secret.expose_secret().to_owned());
        let policy = policy.clone();
        let params = params.clone();
        tokio::task::spawn_blocking(move || {
            artifact::prepare_upload(&plaintext, &name, &secret, &policy, &params)
        })
        .await
        .map_err(|e| VeilError::Other(anyhow::anyhow!("seal task failed: {e}")))??
    };

    let object_id = store
        .put_object(&prepared.encoded_name, prepared.ciphertext)
        .await?;

    let published = match store.set_public_readable(&object_id).await {
        Ok(()) => ShareLocator::new(
            object_id.clone(),
            SecretString::from(secret.expose_secret().to_owned()),
        )
        .build(base_origin),
        Err(e) => Err(e),
    };
    let locator = match published {
        Ok(locator) => locator,
        Err(e) => {
            // the caller never learns the id, so the object would be orphaned
            if let Err(del) = store.delete_object(&object_id).await {
                tracing::warn!(object_id = %object_id, "cleanup after failed upload: {del}");
            }
            return Err(e);
        }
    };

    tracing::info!(object_id = %object_id, "uploaded artifact");

    Ok(UploadResult {
        object_id,
        encoded_name: prepared.encoded_name,
        locator,
    })
}

/// Fetch and open the artifact a share link points at.
///
/// `ctx.observed_downloads` should come from the caller's ledger. After a
/// self-destructing artifact is opened, the object is deleted; a failed
/// delete is logged and does not fail the download.
pub async fn download_artifact<S: Store + ?Sized>(
    store: &S,
    locator: &ShareLocator,
    ctx: &AccessContext,
    params: &KdfParams,
) -> VeilResult<DownloadResult> {
    let object_id = locator.object_id.clone();

    let meta = store.get_metadata(&object_id).await?;
    let artifact_meta = artifact::inspect(&meta.name, ctx)?;

    let ciphertext = store.get_bytes(&object_id).await?;

    let opened = {
        let secret = SecretString::from(locator.secret.expose_secret().to_owned());
        let params = params.clone();
        tokio::task::spawn_blocking(move || {
            artifact::open_artifact(artifact_meta, &ciphertext, &secret, &params)
        })
        .await
        .map_err(|e| VeilError::Other(anyhow::anyhow!("open task failed: {e}")))??
    };

    let mut destroyed = false;
    if opened.policy.self_destruct {
        match store.delete_object(&object_id).await {
            Ok(()) => {
                destroyed = true;
                tracing::info!(object_id = %object_id, "self-destructed artifact after download");
            }
            Err(e) => {
                tracing::warn!(object_id = %object_id, "self-destruct delete failed: {e}");
            }
        }
    }

    tracing::info!(object_id = %object_id, size = opened.plaintext.len(), "downloaded artifact");

    Ok(DownloadResult {
        object_id,
        plaintext: opened.plaintext,
        original_name: opened.original_name,
        policy: opened.policy,
        destroyed,
    })
}

/// List the store's encrypted artifacts with their decoded metadata.
/// Names carrying the suffix but failing to decode are skipped.
pub async fn list_artifacts<S: Store + ?Sized>(store: &S) -> VeilResult<Vec<ListedArtifact>> {
    let entries = store.list_objects(codec::ENCRYPTED_SUFFIX).await?;

    Ok(entries
        .into_iter()
        .filter(|entry| codec::is_encrypted_name(&entry.name))
        .filter_map(|entry| match codec::decode(&entry.name) {
            Ok(metadata) => Some(ListedArtifact {
                object_id: entry.id,
                metadata,
            }),
            Err(e) => {
                tracing::debug!(object_id = %entry.id, "skipping unrecognized object: {e}");
                None
            }
        })
        .collect())
}

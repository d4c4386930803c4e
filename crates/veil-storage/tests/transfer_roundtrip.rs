//! Integration tests for upload/download through an in-memory store.
//!
//! Verifies that the store only ever sees ciphertext and an encoded name,
//! that share links round-trip, and that policy is enforced from the name
//! before any ciphertext is fetched.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use opendal::Operator;
use secrecy::SecretString;
use tempfile::TempDir;
use veil_core::{DenyReason, ObjectId, Policy, VeilError, VeilResult};
use veil_crypto::{AccessContext, KdfParams, ShareLocator};
use veil_storage::{
    download_artifact, list_artifacts, upload_artifact, DownloadLedger, ObjectMetadata, OpendalStore,
    Store, StoreEntry,
};

const ORIGIN: &str = "https://veil.example";

fn memory_store() -> OpendalStore {
    let op = Operator::new(opendal::services::Memory::default())
        .expect("memory operator")
        .finish();
    OpendalStore::new(op, "shares")
}

fn fast_params() -> KdfParams {
    KdfParams { iterations: 1_000 }
}

fn now() -> AccessContext {
    AccessContext::new(Utc::now())
}

#[tokio::test]
async fn upload_download_roundtrip() {
    let store = memory_store();
    let secret = SecretString::from("correct-horse-battery");
    let original = b"quarterly numbers, do not forward".to_vec();

    let upload = upload_artifact(
        &store,
        original.clone(),
        "q3_report.xlsx",
        &secret,
        &Policy::default(),
        &fast_params(),
        ORIGIN,
    )
    .await
    .expect("upload should succeed");

    assert!(upload.locator.starts_with("https://veil.example/f/"));
    assert!(upload.locator.ends_with("#key=correct-horse-battery"));

    // The store holds ciphertext and a public marker, never plaintext
    let meta = store.get_metadata(&upload.object_id).await.unwrap();
    assert!(meta.public);
    assert_eq!(meta.name, upload.encoded_name);
    let stored = store.get_bytes(&upload.object_id).await.unwrap();
    assert_ne!(stored, original);
    assert!(!meta.name.contains("correct-horse"));

    let locator = ShareLocator::parse(&upload.locator).unwrap();
    let download = download_artifact(&store, &locator, &now(), &fast_params())
        .await
        .expect("download should succeed");

    assert_eq!(download.plaintext, original);
    assert_eq!(download.original_name, "q3_report.xlsx");
    assert!(!download.destroyed);
}

#[tokio::test]
async fn wrong_secret_is_tamper_or_key() {
    let store = memory_store();
    let upload = upload_artifact(
        &store,
        b"hello".to_vec(),
        "hello.txt",
        &SecretString::from("correct-horse-battery"),
        &Policy::default(),
        &fast_params(),
        ORIGIN,
    )
    .await
    .unwrap();

    let locator = ShareLocator::new(upload.object_id, SecretString::from("wrong-secret"));
    let result = download_artifact(&store, &locator, &now(), &fast_params()).await;
    assert!(matches!(result, Err(VeilError::TamperOrKey)));
}

#[tokio::test]
async fn expired_artifact_denied() {
    let store = memory_store();
    let policy = Policy {
        expires_at: Some(Utc::now() + Duration::hours(1)),
        ..Policy::default()
    };
    let upload = upload_artifact(
        &store,
        b"short-lived".to_vec(),
        "temp.txt",
        &SecretString::from("tick-tock"),
        &policy,
        &fast_params(),
        ORIGIN,
    )
    .await
    .unwrap();
    let locator = ShareLocator::parse(&upload.locator).unwrap();

    let later = AccessContext::new(Utc::now() + Duration::hours(2));
    let result = download_artifact(&store, &locator, &later, &fast_params()).await;
    assert!(matches!(
        result,
        Err(VeilError::PolicyViolation(DenyReason::Expired))
    ));

    // still downloadable before expiry
    assert!(download_artifact(&store, &locator, &now(), &fast_params()).await.is_ok());
}

#[tokio::test]
async fn self_destruct_deletes_after_first_download() {
    let store = memory_store();
    let policy = Policy {
        self_destruct: true,
        ..Policy::default()
    };
    let upload = upload_artifact(
        &store,
        b"burn after reading".to_vec(),
        "memo.txt",
        &SecretString::from("ephemeral"),
        &policy,
        &fast_params(),
        ORIGIN,
    )
    .await
    .unwrap();
    let locator = ShareLocator::parse(&upload.locator).unwrap();

    let download = download_artifact(&store, &locator, &now(), &fast_params())
        .await
        .unwrap();
    assert_eq!(download.plaintext, b"burn after reading");
    assert!(download.destroyed);

    let again = download_artifact(&store, &locator, &now(), &fast_params()).await;
    assert!(matches!(again, Err(VeilError::Store(_))));
}

#[tokio::test]
async fn ledger_enforces_download_limit() {
    let tmp = TempDir::new().unwrap();
    let store = memory_store();
    let policy = Policy {
        max_downloads: Some(2),
        ..Policy::default()
    };
    let upload = upload_artifact(
        &store,
        b"twice only".to_vec(),
        "limited.bin",
        &SecretString::from("count-me"),
        &policy,
        &fast_params(),
        ORIGIN,
    )
    .await
    .unwrap();
    let locator = ShareLocator::parse(&upload.locator).unwrap();

    let mut ledger = DownloadLedger::open(&tmp.path().join("ledger.json")).unwrap();
    for _ in 0..2 {
        let ctx = now().with_downloads(ledger.count(&locator.object_id));
        download_artifact(&store, &locator, &ctx, &fast_params())
            .await
            .expect("within limit");
        ledger.record(&locator.object_id);
    }

    let ctx = now().with_downloads(ledger.count(&locator.object_id));
    let result = download_artifact(&store, &locator, &ctx, &fast_params()).await;
    assert!(matches!(
        result,
        Err(VeilError::PolicyViolation(DenyReason::DownloadLimitExceeded))
    ));
}

#[tokio::test]
async fn foreign_objects_are_malformed() {
    let store = memory_store();
    let id = store
        .put_object("holiday_photo.jpg", b"not ours".to_vec())
        .await
        .unwrap();

    let locator = ShareLocator::new(id, SecretString::from("whatever"));
    let result = download_artifact(&store, &locator, &now(), &fast_params()).await;
    assert!(matches!(result, Err(VeilError::MalformedName(_))));
}

#[tokio::test]
async fn list_skips_unrecognized_objects() {
    let store = memory_store();
    let secret = SecretString::from("lister");
    let upload = upload_artifact(
        &store,
        b"a".to_vec(),
        "my_file.txt",
        &secret,
        &Policy::default(),
        &fast_params(),
        ORIGIN,
    )
    .await
    .unwrap();
    store.put_object("plain.txt", b"b".to_vec()).await.unwrap();
    store.put_object("fake_x_y_z.encrypted", b"c".to_vec()).await.unwrap();

    let listed = list_artifacts(&store).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].object_id, upload.object_id);
    assert_eq!(listed[0].metadata.original_name, "my_file.txt");
}

#[tokio::test]
async fn unknown_object_is_store_error() {
    let store = memory_store();
    let locator = ShareLocator::new(ObjectId::from("nope"), SecretString::from("k"));
    let result = download_artifact(&store, &locator, &now(), &fast_params()).await;
    assert!(matches!(result, Err(VeilError::Store(_))));
}

/// Store that accepts writes but refuses to publish them
struct NoPublishStore(OpendalStore);

#[async_trait]
impl Store for NoPublishStore {
    async fn put_object(&self, name: &str, bytes: Vec<u8>) -> VeilResult<ObjectId> {
        self.0.put_object(name, bytes).await
    }

    async fn get_metadata(&self, id: &ObjectId) -> VeilResult<ObjectMetadata> {
        self.0.get_metadata(id).await
    }

    async fn get_bytes(&self, id: &ObjectId) -> VeilResult<Vec<u8>> {
        self.0.get_bytes(id).await
    }

    async fn set_public_readable(&self, _id: &ObjectId) -> VeilResult<()> {
        Err(VeilError::Store("403 Forbidden".into()))
    }

    async fn delete_object(&self, id: &ObjectId) -> VeilResult<()> {
        self.0.delete_object(id).await
    }

    async fn list_objects(&self, name_filter: &str) -> VeilResult<Vec<StoreEntry>> {
        self.0.list_objects(name_filter).await
    }
}

#[tokio::test]
async fn failed_publish_removes_stored_object() {
    let store = NoPublishStore(memory_store());
    let result = upload_artifact(
        &store,
        b"never shared".to_vec(),
        "draft.txt",
        &SecretString::from("unpublished"),
        &Policy::default(),
        &fast_params(),
        ORIGIN,
    )
    .await;

    assert!(matches!(result, Err(VeilError::Store(ref msg)) if msg.contains("403")));
    assert!(store.list_objects("").await.unwrap().is_empty());
}

#[tokio::test]
async fn bad_origin_removes_stored_object() {
    let store = memory_store();
    let result = upload_artifact(
        &store,
        b"never shared".to_vec(),
        "draft.txt",
        &SecretString::from("unpublished"),
        &Policy::default(),
        &fast_params(),
        "not a url",
    )
    .await;

    assert!(matches!(result, Err(VeilError::InvalidLocator(_))));
    assert!(store.list_objects("").await.unwrap().is_empty());
}

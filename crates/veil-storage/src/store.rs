//! The blob-store contract
//!
//! The store is trusted with nothing but ciphertext and one free-text name
//! per object. Every call is fallible I/O and fails with
//! [`VeilError::Store`](veil_core::VeilError::Store).

use async_trait::async_trait;
use veil_core::{ObjectId, VeilResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub name: String,
    pub size: u64,
    pub public: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEntry {
    pub id: ObjectId,
    pub name: String,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Persist `bytes` under `name`; the store assigns the id.
    async fn put_object(&self, name: &str, bytes: Vec<u8>) -> VeilResult<ObjectId>;

    async fn get_metadata(&self, id: &ObjectId) -> VeilResult<ObjectMetadata>;

    async fn get_bytes(&self, id: &ObjectId) -> VeilResult<Vec<u8>>;

    /// Grant anonymous read access to the object.
    async fn set_public_readable(&self, id: &ObjectId) -> VeilResult<()>;

    async fn delete_object(&self, id: &ObjectId) -> VeilResult<()>;

    /// List objects whose name contains `name_filter`.
    async fn list_objects(&self, name_filter: &str) -> VeilResult<Vec<StoreEntry>>;
}

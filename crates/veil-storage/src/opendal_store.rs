//! [`Store`] over an OpenDAL operator
//!
//! Layout:
//! ```text
//! <prefix>/<objectId>/<encodedName>   ciphertext
//! <prefix>/<objectId>/.public         marker written by set_public_readable
//! ```
//!
//! Object ids are random UUIDv4. The name is the last path component, so
//! names containing `/` are refused.

use async_trait::async_trait;
use opendal::Operator;
use veil_core::{ObjectId, VeilError, VeilResult};

use crate::store::{ObjectMetadata, Store, StoreEntry};

const PUBLIC_MARKER: &str = ".public";

/// Longest object name accepted (matches common S3 key limits)
pub const MAX_NAME_LEN: usize = 1024;

pub struct OpendalStore {
    op: Operator,
    prefix: String,
}

impl OpendalStore {
    pub fn new(op: Operator, prefix: &str) -> Self {
        Self {
            op,
            prefix: prefix.trim_matches('/').to_string(),
        }
    }

    pub fn operator(&self) -> &Operator {
        &self.op
    }

    fn root(&self) -> String {
        if self.prefix.is_empty() {
            "/".to_string()
        } else {
            format!("{}/", self.prefix)
        }
    }

    fn object_dir(&self, id: &ObjectId) -> String {
        if self.prefix.is_empty() {
            format!("{id}/")
        } else {
            format!("{}/{id}/", self.prefix)
        }
    }

    /// Return (path, name, public) of the payload stored for `id`.
    async fn locate(&self, id: &ObjectId) -> VeilResult<(String, String, bool)> {
        validate_id(id)?;
        let dir = self.object_dir(id);
        let entries = self
            .op
            .list(&dir)
            .await
            .map_err(|e| store_err(format!("listing {dir}"), e))?;

        let mut payload = None;
        let mut public = false;
        for entry in entries {
            if entry.path().ends_with('/') {
                continue;
            }
            if entry.name() == PUBLIC_MARKER {
                public = true;
            } else {
                payload = Some((entry.path().to_string(), entry.name().to_string()));
            }
        }

        let (path, name) = payload.ok_or_else(|| VeilError::Store(format!("object {id} not found")))?;
        Ok((path, name, public))
    }
}

#[async_trait]
impl Store for OpendalStore {
    async fn put_object(&self, name: &str, bytes: Vec<u8>) -> VeilResult<ObjectId> {
        validate_name(name)?;
        let id = ObjectId::new(uuid::Uuid::new_v4().to_string());
        let path = format!("{}{name}", self.object_dir(&id));
        let size = bytes.len();

        self.op
            .write(&path, bytes)
            .await
            .map_err(|e| store_err(format!("writing {path}"), e))?;

        tracing::debug!(object_id = %id, size, "stored object");
        Ok(id)
    }

    async fn get_metadata(&self, id: &ObjectId) -> VeilResult<ObjectMetadata> {
        let (path, name, public) = self.locate(id).await?;
        let meta = self
            .op
            .stat(&path)
            .await
            .map_err(|e| store_err(format!("stat {path}"), e))?;

        Ok(ObjectMetadata {
            name,
            size: meta.content_length(),
            public,
        })
    }

    async fn get_bytes(&self, id: &ObjectId) -> VeilResult<Vec<u8>> {
        let (path, _, _) = self.locate(id).await?;
        let buf = self
            .op
            .read(&path)
            .await
            .map_err(|e| store_err(format!("reading {path}"), e))?;
        Ok(buf.to_vec())
    }

    async fn set_public_readable(&self, id: &ObjectId) -> VeilResult<()> {
        // fails if the object does not exist
        self.locate(id).await?;
        let marker = format!("{}{PUBLIC_MARKER}", self.object_dir(id));
        self.op
            .write(&marker, Vec::<u8>::new())
            .await
            .map_err(|e| store_err(format!("writing {marker}"), e))?;
        Ok(())
    }

    async fn delete_object(&self, id: &ObjectId) -> VeilResult<()> {
        validate_id(id)?;
        let dir = self.object_dir(id);
        let entries = self
            .op
            .list(&dir)
            .await
            .map_err(|e| store_err(format!("listing {dir}"), e))?;

        let mut deleted = 0usize;
        for entry in entries.iter().filter(|e| !e.path().ends_with('/')) {
            self.op
                .delete(entry.path())
                .await
                .map_err(|e| store_err(format!("deleting {}", entry.path()), e))?;
            deleted += 1;
        }
        if deleted == 0 {
            return Err(VeilError::Store(format!("object {id} not found")));
        }

        tracing::debug!(object_id = %id, "deleted object");
        Ok(())
    }

    async fn list_objects(&self, name_filter: &str) -> VeilResult<Vec<StoreEntry>> {
        let root = self.root();
        let entries = self
            .op
            .list_with(&root)
            .recursive(true)
            .await
            .map_err(|e| store_err(format!("listing {root}"), e))?;

        let strip = if self.prefix.is_empty() { "" } else { root.as_str() };
        let mut out: Vec<StoreEntry> = entries
            .iter()
            .filter_map(|entry| {
                let rel = entry.path().trim_start_matches('/').strip_prefix(strip)?;
                let (id, name) = rel.split_once('/')?;
                if name.is_empty() || name.contains('/') || name == PUBLIC_MARKER {
                    return None;
                }
                name.contains(name_filter).then(|| StoreEntry {
                    id: ObjectId::new(id),
                    name: name.to_string(),
                })
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }
}

fn validate_name(name: &str) -> VeilResult<()> {
    if name.is_empty() || name == PUBLIC_MARKER || name == "." || name == ".." {
        return Err(VeilError::Store(format!("invalid object name {name:?}")));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(VeilError::Store(format!(
            "object name is {} bytes (max {MAX_NAME_LEN})",
            name.len()
        )));
    }
    if name.contains('/') || name.chars().any(char::is_control) {
        return Err(VeilError::Store(
            "object name must not contain '/' or control characters".into(),
        ));
    }
    Ok(())
}

fn validate_id(id: &ObjectId) -> VeilResult<()> {
    let s = id.as_str();
    if s.is_empty() || s.contains('/') || s == "." || s == ".." {
        return Err(VeilError::Store(format!("invalid object id {s:?}")));
    }
    Ok(())
}

fn store_err(context: String, e: opendal::Error) -> VeilError {
    VeilError::Store(format!("{context}: {e}"))
}

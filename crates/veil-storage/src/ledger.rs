//! Local download ledger: how many times this client has opened each object.
//!
//! There is no server to count downloads, so `maxDownloads` and
//! `selfDestruct` are evaluated against this per-client count. It is
//! advisory only: another client, or a wiped ledger, starts from zero.
//!
//! Persisted as JSON, flushed atomically via temp+rename.

use anyhow::Context;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use veil_core::{ObjectId, VeilResult};

pub struct DownloadLedger {
    path: PathBuf,
    counts: HashMap<String, u32>,
    dirty: bool,
}

impl DownloadLedger {
    /// Load the ledger at `path`, or start empty if the file doesn't exist.
    pub fn open(path: &Path) -> VeilResult<Self> {
        let counts = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading download ledger: {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("parsing download ledger: {}", path.display()))?
        } else {
            HashMap::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            counts,
            dirty: false,
        })
    }

    pub fn count(&self, id: &ObjectId) -> u32 {
        self.counts.get(id.as_str()).copied().unwrap_or(0)
    }

    /// Record one more download of `id` and return the new count.
    pub fn record(&mut self, id: &ObjectId) -> u32 {
        let count = self.counts.entry(id.as_str().to_string()).or_insert(0);
        *count = count.saturating_add(1);
        self.dirty = true;
        *count
    }

    /// Drop the entry for an object that no longer exists.
    pub fn forget(&mut self, id: &ObjectId) {
        if self.counts.remove(id.as_str()).is_some() {
            self.dirty = true;
        }
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn flush(&mut self) -> VeilResult<()> {
        if !self.dirty {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating ledger dir: {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(&self.counts).context("serializing download ledger")?;

        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, &json)
            .with_context(|| format!("writing ledger temp: {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("renaming ledger: {}", self.path.display()))?;

        self.dirty = false;
        Ok(())
    }
}

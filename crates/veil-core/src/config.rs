use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{VeilError, VeilResult};

/// Lowest PBKDF2 iteration count accepted from configuration.
pub const MIN_PBKDF2_ITERATIONS: u32 = 100_000;

/// Top-level configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VeilConfig {
    pub crypto: CryptoConfig,
    pub storage: StorageConfig,
    pub share: ShareConfig,
    pub logging: LoggingConfig,
    pub ledger: LedgerConfig,
}

/// Key derivation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// PBKDF2-HMAC-SHA256 iterations. Not carried in the artifact name, so
    /// every uploader and downloader of a deployment must agree on it.
    pub pbkdf2_iterations: u32,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            pbkdf2_iterations: MIN_PBKDF2_ITERATIONS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    S3,
    Fs,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Which OpenDAL service backs the store
    pub backend: StorageBackend,
    /// S3 endpoint
    pub endpoint: String,
    /// S3 region (default: us-east-1)
    pub region: String,
    /// Bucket name
    pub bucket: String,
    /// Root directory for the fs backend
    pub root: PathBuf,
    /// Key prefix under which objects are stored
    pub prefix: String,
    /// Refuse plaintext HTTP endpoints
    pub enforce_tls: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::S3,
            endpoint: "http://localhost:9000".into(),
            region: "us-east-1".into(),
            bucket: "veil".into(),
            root: PathBuf::from("~/.local/share/veil/objects"),
            prefix: "veil".into(),
            enforce_tls: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Origin used when building share links
    pub base_origin: String,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            base_origin: "https://veil.example".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Local JSON file recording observed download counts
    pub path: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("~/.local/share/veil/downloads.json"),
        }
    }
}

impl VeilConfig {
    /// Parse a TOML document and validate it.
    pub fn from_toml(s: &str) -> VeilResult<Self> {
        let config: VeilConfig =
            toml::from_str(s).map_err(|e| VeilError::Config(format!("parsing config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> VeilResult<()> {
        if self.crypto.pbkdf2_iterations < MIN_PBKDF2_ITERATIONS {
            return Err(VeilError::Config(format!(
                "crypto.pbkdf2_iterations = {} is below the minimum of {}",
                self.crypto.pbkdf2_iterations, MIN_PBKDF2_ITERATIONS
            )));
        }
        if !matches!(self.logging.format.as_str(), "json" | "text") {
            return Err(VeilError::Config(format!(
                "logging.format must be \"json\" or \"text\", got {:?}",
                self.logging.format
            )));
        }
        if self.share.base_origin.is_empty() {
            return Err(VeilError::Config("share.base_origin must not be empty".into()));
        }
        Ok(())
    }
}

//! veil-storage: blob-store contract, OpenDAL backend, and the async
//! upload/download glue around the artifact protocol

pub mod ledger;
pub mod opendal_store;
pub mod operator;
pub mod store;
pub mod transfer;

pub use ledger::DownloadLedger;
pub use opendal_store::OpendalStore;
pub use operator::{build_operator, S3Credentials};
pub use store::{ObjectMetadata, Store, StoreEntry};
pub use transfer::{download_artifact, list_artifacts, upload_artifact, DownloadResult, ListedArtifact, UploadResult};

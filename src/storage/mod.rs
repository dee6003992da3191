//! Attachment blobs referenced by a path stored on the owning record.

pub mod disk;

use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;
use thiserror::Error;

pub use disk::DiskStore;

/// URL prefix under which attachments are served and recorded.
pub const UPLOADS_PREFIX: &str = "/uploads";

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("{0}")]
    InvalidPath(String),

    #[error("Attachment I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Persist bytes under a fresh name and return the relative path to store
    /// on the record, e.g. `/uploads/quotes/1714559400000-3f2a9c1d-offer.pdf`.
    async fn put(&self, subdir: &str, original_name: &str, body: Bytes) -> Result<String, AttachmentError>;

    /// Remove a previously stored attachment. Returns `false` when it was already gone.
    async fn delete(&self, path: &str) -> Result<bool, AttachmentError>;

    fn root(&self) -> &Path;
}

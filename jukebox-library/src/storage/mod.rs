use std::pin::Pin;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncRead;

mod fs;
pub use fs::*;

/// A streamed handle on blob contents
pub type BlobReader = Pin<Box<dyn AsyncRead + Send + Sync>>;

#[derive(Debug, Error)]
pub enum StorageError {
    /// The named blob doesn't exist in the store
    #[error("blob {0} doesn't exist")]
    NotFound(String),
    /// The name can't address a blob, such as a path traversal attempt
    #[error("{0} is not a valid blob name")]
    InvalidName(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Storage for large binary objects addressed by a string key.
///
/// Reads support inclusive byte ranges so playback can seek without
/// downloading a whole file.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Persists the bytes under the given name, replacing any previous blob
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Total size of the named blob in bytes
    async fn size(&self, name: &str) -> Result<u64, StorageError>;

    /// Opens the blob for streamed reading. `range` is an inclusive
    /// `(start, end)` pair of byte offsets, `None` reads the whole blob.
    async fn read(&self, name: &str, range: Option<(u64, u64)>)
        -> Result<BlobReader, StorageError>;

    async fn exists(&self, name: &str) -> Result<bool, StorageError>;

    async fn delete(&self, name: &str) -> Result<(), StorageError>;
}

use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::{
    fs::{self, File},
    io::{AsyncReadExt, AsyncSeekExt, SeekFrom},
};

use crate::{BlobReader, BlobStore, StorageError};

/// A blob store backed by a flat directory on disk, one file per blob
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub async fn new(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;

        Ok(Self { root })
    }

    /// Resolves a blob name to its path. Names are plain file names, anything
    /// that could escape the root directory is refused.
    fn resolve(&self, name: &str) -> Result<PathBuf, StorageError> {
        let valid = !name.is_empty()
            && !name.contains(['/', '\\'])
            && name != "."
            && name != "..";

        if !valid {
            return Err(StorageError::InvalidName(name.to_string()));
        }

        Ok(self.root.join(name))
    }
}

fn map_open_error(name: &str, error: std::io::Error) -> StorageError {
    if error.kind() == ErrorKind::NotFound {
        StorageError::NotFound(name.to_string())
    } else {
        StorageError::Io(error)
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.resolve(name)?;
        fs::write(path, bytes).await?;

        Ok(())
    }

    async fn size(&self, name: &str) -> Result<u64, StorageError> {
        let path = self.resolve(name)?;

        let metadata = fs::metadata(path)
            .await
            .map_err(|e| map_open_error(name, e))?;

        Ok(metadata.len())
    }

    async fn read(
        &self,
        name: &str,
        range: Option<(u64, u64)>,
    ) -> Result<BlobReader, StorageError> {
        let path = self.resolve(name)?;

        let mut file = File::open(path)
            .await
            .map_err(|e| map_open_error(name, e))?;

        match range {
            Some((start, end)) => {
                file.seek(SeekFrom::Start(start)).await?;
                let length = end.saturating_sub(start) + 1;

                Ok(Box::pin(file.take(length)))
            }
            None => Ok(Box::pin(file)),
        }
    }

    async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        let path = self.resolve(name)?;

        Ok(fs::try_exists(path).await?)
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        let path = self.resolve(name)?;

        fs::remove_file(path)
            .await
            .map_err(|e| map_open_error(name, e))
    }
}

//! Blob storage for uploaded images.
//!
//! Handlers only see the [`BlobStore`] trait, shared as `web::Data<dyn BlobStore>`.
//! `LocalBlobStore` keeps one file per key under a directory; `MemoryBlobStore`
//! backs the tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::RwLock;

#[derive(Debug)]
pub enum StorageError {
    NotFound(String),
    /// Keys are flat file names; anything that could escape the store is rejected.
    InvalidKey(String),
    Io(io::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StorageError::NotFound(key) => write!(f, "blob {} not found", key),
            StorageError::InvalidKey(key) => write!(f, "invalid blob key {:?}", key),
            StorageError::Io(e) => write!(f, "blob store I/O error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<io::Error> for StorageError {
    fn from(error: io::Error) -> Self {
        StorageError::Io(error)
    }
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<(), StorageError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Deleting a missing key is `NotFound`.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// Accepts `[A-Za-z0-9._-]+` without a leading dot.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let well_formed = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if well_formed {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Creates the root directory if it does not exist yet.
    pub async fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

fn not_found_as(key: &str) -> impl FnOnce(io::Error) -> StorageError + '_ {
    move |e| {
        if e.kind() == io::ErrorKind::NotFound {
            StorageError::NotFound(key.to_string())
        } else {
            StorageError::Io(e)
        }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        tokio::fs::write(&path, data).await?;
        log::debug!("Stored blob {} at {}", key, path.display());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(key)?;
        tokio::fs::read(&path).await.map_err(not_found_as(key))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        tokio::fs::remove_file(&path).await.map_err(not_found_as(key))
    }
}

#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs
            .read()
            .map(|blobs| blobs.contains_key(key))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.blobs.read().map(|blobs| blobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StorageError {
    StorageError::Io(io::Error::new(io::ErrorKind::Other, "blob map lock poisoned"))
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<(), StorageError> {
        validate_key(key)?;
        self.blobs
            .write()
            .map_err(|_| poisoned())?
            .insert(key.to_string(), data);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        validate_key(key)?;
        self.blobs
            .read()
            .map_err(|_| poisoned())?
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        self.blobs
            .write()
            .map_err(|_| poisoned())?
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }
}

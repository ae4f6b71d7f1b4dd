use std::path::{Path, PathBuf};
use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Error;

/// Local materialization of remote bytes.
#[async_trait]
pub trait FileStaging: Send + Sync {
    /// Writes `data` to a fresh scratch file and returns its path.
    async fn stage(&self, data: Bytes) -> Result<PathBuf, Error>;

    /// Downloads `url` into a fresh scratch file.
    async fn download(&self, url: &str) -> Result<PathBuf, Error>;

    /// Extracts every file entry of `archive` under `dest`.
    async fn unzip(&self, archive: &Path, dest: &Path) -> Result<Vec<PathBuf>, Error>;

    async fn delete(&self, path: &Path) -> Result<(), Error>;

    /// A fresh, empty directory for extraction output.
    async fn scratch_dir(&self) -> Result<PathBuf, Error>;
}

// File: src/staging/mod.rs
//
// Scratch files for downloads, archive extraction and playback.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tempfile::TempDir;
use tracing::debug;
use uuid::Uuid;

use greeter_common::error::Error;
use greeter_common::traits::FileStaging;

/// Everything lives under one temporary directory that is removed on drop.
pub struct TempDirStaging {
    root: TempDir,
    http: reqwest::Client,
}

impl TempDirStaging {
    pub fn new() -> Result<Self, Error> {
        let root = tempfile::Builder::new().prefix("greeter-").tempdir()?;
        Ok(Self::with_root(root))
    }

    /// Scratch space under `parent` instead of the system temp dir.
    pub fn in_dir(parent: &Path) -> Result<Self, Error> {
        std::fs::create_dir_all(parent)?;
        let root = tempfile::Builder::new().prefix("greeter-").tempdir_in(parent)?;
        Ok(Self::with_root(root))
    }

    fn with_root(root: TempDir) -> Self {
        debug!("Staging files under {}", root.path().display());
        Self {
            root,
            http: reqwest::Client::new(),
        }
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    fn fresh_path(&self) -> PathBuf {
        self.root.path().join(Uuid::new_v4().to_string())
    }
}

#[async_trait]
impl FileStaging for TempDirStaging {
    async fn stage(&self, data: Bytes) -> Result<PathBuf, Error> {
        let path = self.fresh_path();
        tokio::fs::write(&path, &data).await?;
        Ok(path)
    }

    async fn download(&self, url: &str) -> Result<PathBuf, Error> {
        let resp = self.http.get(url).send().await?.error_for_status()?;
        let data = resp.bytes().await?;
        debug!("Downloaded {} bytes from {}", data.len(), url);
        self.stage(data).await
    }

    async fn unzip(&self, archive: &Path, dest: &Path) -> Result<Vec<PathBuf>, Error> {
        let archive = archive.to_path_buf();
        let dest = dest.to_path_buf();
        tokio::task::spawn_blocking(move || extract_archive(&archive, &dest)).await?
    }

    async fn delete(&self, path: &Path) -> Result<(), Error> {
        let removed = match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(path).await,
            Ok(_) => tokio::fs::remove_file(path).await,
            Err(e) => Err(e),
        };
        match removed {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Staging(format!("removing {}: {}", path.display(), e))),
        }
    }

    async fn scratch_dir(&self) -> Result<PathBuf, Error> {
        let dir = self.fresh_path();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }
}

/// Flat extraction: every file entry becomes `dest/<uuid>.<ext>`.
/// Directory entries, hidden files and macOS resource forks are skipped.
fn extract_archive(archive: &Path, dest: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut zip = zip::ZipArchive::new(File::open(archive)?)?;
    let mut extracted = Vec::new();

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let Some(name) = entry.enclosed_name() else {
            continue;
        };
        if name.components().any(|c| c.as_os_str() == "__MACOSX") {
            continue;
        }
        let hidden = name
            .file_name()
            .and_then(|n| n.to_str())
            .is_none_or(|n| n.starts_with('.'));
        if hidden {
            continue;
        }

        let mut target = dest.join(Uuid::new_v4().to_string());
        if let Some(ext) = name.extension() {
            target.set_extension(ext);
        }
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;
        extracted.push(target);
    }
    Ok(extracted)
}

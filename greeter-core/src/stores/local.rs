// File: src/stores/local.rs

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use greeter_common::error::Error;
use greeter_common::traits::{BlobStore, Document, DocumentStore};

use super::{append_unique, check_relative, remove_values};

/// One JSON file per document at `<root>/<collection>/<key>.json`.
pub struct LocalDocumentStore {
    root: PathBuf,
    // Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl LocalDocumentStore {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, Error> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        debug!("Document store at {}", root.display());
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    fn doc_path(&self, collection: &str, key: &str) -> Result<PathBuf, Error> {
        check_relative(collection)?;
        check_relative(key)?;
        if key.contains('/') || collection.contains('/') {
            return Err(Error::Storage(format!("invalid document id {collection}/{key}")));
        }
        Ok(self.root.join(collection).join(format!("{key}.json")))
    }

    async fn read(&self, path: &Path) -> Result<Option<Document>, Error> {
        match tokio::fs::read(path).await {
            Ok(raw) => match serde_json::from_slice::<Value>(&raw)? {
                Value::Object(doc) => Ok(Some(doc)),
                _ => Err(Error::Storage(format!("{} is not a JSON object", path.display()))),
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, path: &Path, doc: &Document) -> Result<(), Error> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(doc)?).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, Error> {
        let path = self.doc_path(collection, key)?;
        self.read(&path).await
    }

    async fn upsert(&self, collection: &str, key: &str, fields: Document) -> Result<(), Error> {
        let path = self.doc_path(collection, key)?;
        let _guard = self.write_lock.lock().await;
        let mut doc = self.read(&path).await?.unwrap_or_default();
        doc.extend(fields);
        self.write(&path, &doc).await
    }

    async fn array_append(&self, collection: &str, key: &str, field: &str, values: Vec<Value>) -> Result<(), Error> {
        let path = self.doc_path(collection, key)?;
        let _guard = self.write_lock.lock().await;
        let mut doc = self.read(&path).await?.unwrap_or_default();
        append_unique(&mut doc, field, values)?;
        self.write(&path, &doc).await
    }

    async fn array_remove(&self, collection: &str, key: &str, field: &str, values: Vec<Value>) -> Result<(), Error> {
        let path = self.doc_path(collection, key)?;
        let _guard = self.write_lock.lock().await;
        let mut doc = self
            .read(&path)
            .await?
            .ok_or_else(|| Error::NotFound(format!("{collection}/{key}")))?;
        remove_values(&mut doc, field, &values);
        self.write(&path, &doc).await
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), Error> {
        let path = self.doc_path(collection, key)?;
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Blobs as plain files under `root`, served elsewhere at `public_base_url`.
pub struct LocalBlobStore {
    root: PathBuf,
    public_base_url: String,
    upload_url_ttl: Duration,
}

impl LocalBlobStore {
    pub async fn open(
        root: impl Into<PathBuf>,
        public_base_url: impl Into<String>,
        upload_url_ttl: Duration,
    ) -> Result<Self, Error> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            upload_url_ttl,
        })
    }

    fn blob_path(&self, path: &str) -> Result<PathBuf, Error> {
        check_relative(path)?;
        Ok(self.root.join(path))
    }

    fn url_for(&self, path: &str, ttl: Duration) -> String {
        let expires = Utc::now().timestamp() + ttl.as_secs() as i64;
        format!("{}/{}?expires={}", self.public_base_url, path, expires)
    }
}

fn missing_as_not_found(e: io::Error, path: &str) -> Error {
    if e.kind() == io::ErrorKind::NotFound {
        Error::NotFound(format!("blob {path}"))
    } else {
        e.into()
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn download(&self, path: &str) -> Result<Bytes, Error> {
        let file = self.blob_path(path)?;
        let data = tokio::fs::read(&file).await.map_err(|e| missing_as_not_found(e, path))?;
        Ok(Bytes::from(data))
    }

    async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> Result<String, Error> {
        let file = self.blob_path(path)?;
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&file, &data).await?;
        debug!("Stored {} ({}, {} bytes)", path, content_type, data.len());
        Ok(self.url_for(path, self.upload_url_ttl))
    }

    async fn signed_url(&self, path: &str, ttl: Duration) -> Result<String, Error> {
        let file = self.blob_path(path)?;
        tokio::fs::metadata(&file).await.map_err(|e| missing_as_not_found(e, path))?;
        Ok(self.url_for(path, ttl))
    }

    async fn copy(&self, from: &str, to: &str) -> Result<(), Error> {
        let source = self.blob_path(from)?;
        let target = self.blob_path(to)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(&source, &target)
            .await
            .map_err(|e| missing_as_not_found(e, from))?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), Error> {
        let file = self.blob_path(path)?;
        tokio::fs::remove_file(&file).await.map_err(|e| missing_as_not_found(e, path))
    }
}

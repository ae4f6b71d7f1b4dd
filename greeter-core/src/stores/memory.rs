// File: src/stores/memory.rs

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;

use greeter_common::error::Error;
use greeter_common::traits::{BlobStore, Document, DocumentStore};

use super::{append_unique, remove_values};

#[derive(Default)]
pub struct MemoryDocumentStore {
    docs: DashMap<(String, String), Document>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

fn doc_key(collection: &str, key: &str) -> (String, String) {
    (collection.to_string(), key.to_string())
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, Error> {
        Ok(self.docs.get(&doc_key(collection, key)).map(|d| d.value().clone()))
    }

    async fn upsert(&self, collection: &str, key: &str, fields: Document) -> Result<(), Error> {
        let mut doc = self.docs.entry(doc_key(collection, key)).or_default();
        doc.extend(fields);
        Ok(())
    }

    async fn array_append(&self, collection: &str, key: &str, field: &str, values: Vec<Value>) -> Result<(), Error> {
        let mut doc = self.docs.entry(doc_key(collection, key)).or_default();
        append_unique(&mut doc, field, values)
    }

    async fn array_remove(&self, collection: &str, key: &str, field: &str, values: Vec<Value>) -> Result<(), Error> {
        let mut doc = self
            .docs
            .get_mut(&doc_key(collection, key))
            .ok_or_else(|| Error::NotFound(format!("{collection}/{key}")))?;
        remove_values(&mut doc, field, &values);
        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), Error> {
        self.docs.remove(&doc_key(collection, key));
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Blob {
    data: Bytes,
    content_type: String,
}

/// Blobs held in memory. Signed URLs use the `memory://` scheme and are not fetchable.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<String, Blob>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.blobs.contains_key(path)
    }

    pub fn content_type(&self, path: &str) -> Option<String> {
        self.blobs.get(path).map(|b| b.content_type.clone())
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    fn url_for(path: &str, ttl: Duration) -> String {
        let expires = Utc::now().timestamp() + ttl.as_secs() as i64;
        format!("memory://{path}?expires={expires}")
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn download(&self, path: &str) -> Result<Bytes, Error> {
        self.blobs
            .get(path)
            .map(|b| b.data.clone())
            .ok_or_else(|| Error::NotFound(format!("blob {path}")))
    }

    async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> Result<String, Error> {
        self.blobs.insert(
            path.to_string(),
            Blob {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(Self::url_for(path, Duration::from_secs(15 * 60)))
    }

    async fn signed_url(&self, path: &str, ttl: Duration) -> Result<String, Error> {
        if !self.blobs.contains_key(path) {
            return Err(Error::NotFound(format!("blob {path}")));
        }
        Ok(Self::url_for(path, ttl))
    }

    async fn copy(&self, from: &str, to: &str) -> Result<(), Error> {
        let blob = self
            .blobs
            .get(from)
            .map(|b| b.value().clone())
            .ok_or_else(|| Error::NotFound(format!("blob {from}")))?;
        self.blobs.insert(to.to_string(), blob);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), Error> {
        self.blobs
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("blob {path}")))
    }
}

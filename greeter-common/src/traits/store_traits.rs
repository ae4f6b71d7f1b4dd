use std::time::Duration;
use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{Map, Value};

use crate::error::Error;

/// A schemaless document: field name -> JSON value.
pub type Document = Map<String, Value>;

/// Remote key-document store (one document per `(collection, key)`).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns `None` when the document does not exist.
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, Error>;

    /// Creates the document or merges `fields` into the existing one.
    async fn upsert(&self, collection: &str, key: &str, fields: Document) -> Result<(), Error>;

    /// Appends `values` to the array `field`, skipping values already present.
    /// Creates the document and the array if missing.
    async fn array_append(
        &self,
        collection: &str,
        key: &str,
        field: &str,
        values: Vec<Value>,
    ) -> Result<(), Error>;

    /// Removes every element equal to one of `values` from the array `field`.
    async fn array_remove(
        &self,
        collection: &str,
        key: &str,
        field: &str,
        values: Vec<Value>,
    ) -> Result<(), Error>;

    async fn delete(&self, collection: &str, key: &str) -> Result<(), Error>;
}

/// Remote blob storage for track bytes.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn download(&self, path: &str) -> Result<Bytes, Error>;

    /// Stores `data` at `path` and returns a signed download URL for it.
    async fn upload(&self, path: &str, data: Bytes, content_type: &str) -> Result<String, Error>;

    async fn signed_url(&self, path: &str, ttl: Duration) -> Result<String, Error>;

    async fn copy(&self, from: &str, to: &str) -> Result<(), Error>;

    async fn delete(&self, path: &str) -> Result<(), Error>;
}

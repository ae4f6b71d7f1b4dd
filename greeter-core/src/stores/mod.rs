//! src/stores/mod.rs
//!
//! Document and blob store backends: in-memory maps for tests and ephemeral runs,
//! plain files on disk for self-hosting.

pub mod memory;
pub mod local;

use std::path::{Component, Path};

use serde_json::Value;

use greeter_common::error::Error;
use greeter_common::traits::Document;

pub use local::{LocalBlobStore, LocalDocumentStore};
pub use memory::{MemoryBlobStore, MemoryDocumentStore};

/// Appends the values not already in `doc[field]`, creating the array if needed.
pub(crate) fn append_unique(doc: &mut Document, field: &str, values: Vec<Value>) -> Result<(), Error> {
    let slot = doc
        .entry(field.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    let Value::Array(items) = slot else {
        return Err(Error::Storage(format!("field '{field}' is not an array")));
    };
    for value in values {
        if !items.contains(&value) {
            items.push(value);
        }
    }
    Ok(())
}

/// Removes every element of `doc[field]` equal to one of `values`.
pub(crate) fn remove_values(doc: &mut Document, field: &str, values: &[Value]) {
    if let Some(Value::Array(items)) = doc.get_mut(field) {
        items.retain(|item| !values.contains(item));
    }
}

/// Store keys become path segments; reject anything that could escape the root.
pub(crate) fn check_relative(path: &str) -> Result<(), Error> {
    let p = Path::new(path);
    let ok = !path.is_empty() && p.components().all(|c| matches!(c, Component::Normal(_)));
    if ok {
        Ok(())
    } else {
        Err(Error::Storage(format!("invalid store path '{path}'")))
    }
}

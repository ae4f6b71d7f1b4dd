// File: src/services/track_service.rs

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::future::{join_all, try_join_all};
use rand::seq::IndexedRandom;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use greeter_common::error::Error;
use greeter_common::models::{FileKind, TrackCategory, TrackLink, TrackRecord, UploadedFile, UserId};
use greeter_common::traits::{BlobStore, Document, DocumentStore, FileStaging};

/// Signed links handed out in listings stay valid this long by default.
pub const DEFAULT_SIGNED_URL_TTL: Duration = Duration::from_secs(15 * 60);

/// Track documents plus their blobs.
pub struct TrackService {
    documents: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    staging: Arc<dyn FileStaging>,
    url_ttl: Duration,
}

impl TrackService {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        staging: Arc<dyn FileStaging>,
        url_ttl: Duration,
    ) -> Self {
        Self {
            documents,
            blobs,
            staging,
            url_ttl,
        }
    }

    /// Stored records with their raw JSON, in stored order.
    /// A missing document is `NotFound`; a document without the array is empty.
    async fn load(&self, owner: UserId, category: TrackCategory) -> Result<Vec<(TrackRecord, Value)>, Error> {
        let doc = self
            .documents
            .get(category.collection(), &owner.to_string())
            .await?
            .ok_or_else(|| Error::NotFound(format!("no {category} document for user {owner}")))?;

        let Some(Value::Array(items)) = doc.get(category.array_key()) else {
            return Ok(Vec::new());
        };

        let mut records = Vec::with_capacity(items.len());
        for raw in items {
            match serde_json::from_value::<TrackRecord>(raw.clone()) {
                Ok(record) => records.push((record, raw.clone())),
                Err(e) => warn!("Skipping malformed {} record of user {}: {}", category, owner, e),
            }
        }
        Ok(records)
    }

    pub async fn records(&self, owner: UserId, category: TrackCategory) -> Result<Vec<TrackRecord>, Error> {
        Ok(self.load(owner, category).await?.into_iter().map(|(r, _)| r).collect())
    }

    pub async fn track_names(&self, owner: UserId, category: TrackCategory) -> Result<Vec<String>, Error> {
        Ok(self
            .records(owner, category)
            .await?
            .into_iter()
            .map(|r| r.track_name)
            .collect())
    }

    /// Picks one of the user's tracks uniformly at random.
    pub async fn random_track(&self, user: UserId, category: TrackCategory) -> Result<String, Error> {
        let names = self.track_names(user, category).await?;
        names
            .choose(&mut rand::rng())
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("user {user} has no {category} tracks")))
    }

    pub async fn list_links(&self, owner: UserId, category: TrackCategory) -> Result<Vec<TrackLink>, Error> {
        let records = self.records(owner, category).await?;
        let links = records.into_iter().map(|record| async move {
            let signed_url = self
                .blobs
                .signed_url(&TrackRecord::blob_path(&record.track_name), self.url_ttl)
                .await?;
            Ok::<_, Error>(TrackLink {
                track_name: record.track_name,
                signed_url,
            })
        });
        try_join_all(links).await
    }

    pub async fn download(&self, track_name: &str) -> Result<Bytes, Error> {
        self.blobs.download(&TrackRecord::blob_path(track_name)).await
    }

    /// Stores a single clip or every entry of a zip archive under `owner`.
    /// Returns one signed URL per stored track. Staged files are always removed.
    pub async fn upload(
        &self,
        uploader: UserId,
        owner: UserId,
        category: TrackCategory,
        file: &UploadedFile,
    ) -> Result<Vec<String>, Error> {
        let stored = match file.kind() {
            FileKind::Unsupported => {
                return Err(Error::Unsupported(format!(
                    "{} ({}) is not an mp3, m4a or zip file",
                    file.filename, file.content_type
                )));
            }
            FileKind::Audio => {
                let staged = self.staging.download(&file.url).await?;
                let result = self.store_one(&staged, &file.content_type).await;
                self.discard(&staged).await;
                vec![result?]
            }
            FileKind::Archive => self.store_archive(file).await?,
        };

        if stored.is_empty() {
            return Ok(Vec::new());
        }

        let collection = category.collection();
        let key = owner.to_string();
        let mut header = Document::new();
        header.insert("name".into(), Value::String(key.clone()));
        self.documents.upsert(collection, &key, header).await?;

        let records = stored
            .iter()
            .map(|(name, _)| serde_json::to_value(TrackRecord::new(name.clone(), uploader)))
            .collect::<Result<Vec<_>, _>>()?;
        self.documents
            .array_append(collection, &key, category.array_key(), records)
            .await?;

        info!("User {} uploaded {} {} track(s) for {}", uploader, stored.len(), category, owner);
        Ok(stored.into_iter().map(|(_, url)| url).collect())
    }

    async fn store_archive(&self, file: &UploadedFile) -> Result<Vec<(String, String)>, Error> {
        let archive = self.staging.download(&file.url).await?;
        let dest = match self.staging.scratch_dir().await {
            Ok(dir) => dir,
            Err(e) => {
                self.discard(&archive).await;
                return Err(e);
            }
        };

        let result = match self.staging.unzip(&archive, &dest).await {
            Ok(entries) => {
                debug!("Archive {} holds {} entries", file.filename, entries.len());
                let uploads = entries.iter().map(|entry| self.store_one(entry, content_type_for(entry)));
                self.keep_all_or_none(join_all(uploads).await).await
            }
            Err(e) => Err(e),
        };

        self.discard(&archive).await;
        self.discard(&dest).await;
        result
    }

    /// All uploads succeeded, or the ones that did are deleted again and the first error is returned.
    async fn keep_all_or_none(
        &self,
        results: Vec<Result<(String, String), Error>>,
    ) -> Result<Vec<(String, String)>, Error> {
        let (stored, failed): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
        let stored: Vec<(String, String)> = stored.into_iter().filter_map(Result::ok).collect();
        let Some(first_error) = failed.into_iter().find_map(Result::err) else {
            return Ok(stored);
        };

        warn!("Archive upload failed; removing {} blob(s) already stored", stored.len());
        self.remove_blobs(stored.iter().map(|(name, _)| name.as_str())).await;
        Err(first_error)
    }

    async fn remove_blobs<'a>(&self, names: impl Iterator<Item = &'a str>) {
        let deletions = names.map(|name| async move {
            let path = TrackRecord::blob_path(name);
            if let Err(e) = self.blobs.delete(&path).await {
                warn!("Could not delete orphaned blob {}: {:?}", path, e);
            }
        });
        join_all(deletions).await;
    }

    async fn store_one(&self, staged: &Path, content_type: &str) -> Result<(String, String), Error> {
        let data = tokio::fs::read(staged).await?;
        let name = Uuid::now_v7().to_string();
        let url = self
            .blobs
            .upload(&TrackRecord::blob_path(&name), Bytes::from(data), content_type)
            .await?;
        Ok((name, url))
    }

    async fn discard(&self, path: &Path) {
        if let Err(e) = self.staging.delete(path).await {
            warn!("Could not delete staged {}: {:?}", path.display(), e);
        }
    }

    /// Archives and deletes the named tracks. Unknown names are ignored.
    /// Returns how many tracks were removed.
    pub async fn delete_tracks(
        &self,
        owner: UserId,
        category: TrackCategory,
        track_names: &[String],
    ) -> Result<usize, Error> {
        let wanted: HashSet<&str> = track_names.iter().map(String::as_str).collect();
        let doomed: Vec<(TrackRecord, Value)> = self
            .load(owner, category)
            .await?
            .into_iter()
            .filter(|(r, _)| wanted.contains(r.track_name.as_str()))
            .collect();
        if doomed.is_empty() {
            return Ok(0);
        }

        let moves = doomed.iter().map(|(record, _)| async move {
            let source = TrackRecord::blob_path(&record.track_name);
            self.blobs
                .copy(&source, &TrackRecord::archive_path(owner, &record.track_name))
                .await?;
            self.blobs.delete(&source).await
        });
        try_join_all(moves).await?;

        let raw: Vec<Value> = doomed.iter().map(|(_, raw)| raw.clone()).collect();
        self.documents
            .array_remove(category.collection(), &owner.to_string(), category.array_key(), raw)
            .await?;

        info!("Archived {} {} track(s) of user {}", doomed.len(), category, owner);
        Ok(doomed.len())
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("m4a") | Some("mp4") => "audio/mp4",
        _ => "audio/mpeg",
    }
}

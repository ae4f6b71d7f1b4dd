use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use greeter_common::error::Error;
use greeter_common::models::blacklist::BLACKLIST_COLLECTION;
use greeter_common::models::{BlacklistEntry, UserId};
use greeter_common::traits::DocumentStore;

/// Opt-out list: a document in `blacklist` means "never greet this user".
pub struct BlacklistService {
    documents: Arc<dyn DocumentStore>,
}

impl BlacklistService {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }

    pub async fn is_blacklisted(&self, user: UserId) -> Result<bool, Error> {
        Ok(self
            .documents
            .get(BLACKLIST_COLLECTION, &user.to_string())
            .await?
            .is_some())
    }

    /// Returns false if the user was already blacklisted.
    pub async fn add(&self, user: UserId) -> Result<bool, Error> {
        if self.is_blacklisted(user).await? {
            return Ok(false);
        }
        let Value::Object(doc) = serde_json::to_value(BlacklistEntry::now(user))? else {
            return Err(Error::Storage("blacklist entry did not serialize to an object".into()));
        };
        self.documents
            .upsert(BLACKLIST_COLLECTION, &user.to_string(), doc)
            .await?;
        info!("User {} added to the blacklist", user);
        Ok(true)
    }

    /// Returns false if the user was not blacklisted.
    pub async fn remove(&self, user: UserId) -> Result<bool, Error> {
        if !self.is_blacklisted(user).await? {
            return Ok(false);
        }
        self.documents.delete(BLACKLIST_COLLECTION, &user.to_string()).await?;
        info!("User {} removed from the blacklist", user);
        Ok(true)
    }
}

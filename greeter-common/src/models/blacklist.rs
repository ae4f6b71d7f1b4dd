use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ids::UserId;

pub const BLACKLIST_COLLECTION: &str = "blacklist";

/// A user who opted out of intros and outros. Stored as one document keyed by user id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlacklistEntry {
    pub user_id: UserId,
    pub added_on: DateTime<Utc>,
}

impl BlacklistEntry {
    pub fn now(user_id: UserId) -> Self {
        Self {
            user_id,
            added_on: Utc::now(),
        }
    }
}

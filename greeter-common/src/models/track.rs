// File: greeter-common/src/models/track.rs

use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::models::ids::UserId;

/// Which greeting a track is played for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackCategory {
    Intro,
    Outro,
}

impl TrackCategory {
    /// Document collection holding one track list per user.
    pub fn collection(&self) -> &'static str {
        match self {
            TrackCategory::Intro => "welcomeIntros",
            TrackCategory::Outro => "byeOutros",
        }
    }

    /// Array field inside the user's document.
    pub fn array_key(&self) -> &'static str {
        match self {
            TrackCategory::Intro => "intro_array",
            TrackCategory::Outro => "outro_array",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrackCategory::Intro => "intro",
            TrackCategory::Outro => "outro",
        }
    }

    pub fn from_collection(collection: &str) -> Option<Self> {
        match collection {
            "welcomeIntros" => Some(TrackCategory::Intro),
            "byeOutros" => Some(TrackCategory::Outro),
            _ => None,
        }
    }
}

impl fmt::Display for TrackCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrackCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "intro" => Ok(TrackCategory::Intro),
            "outro" => Ok(TrackCategory::Outro),
            other => Err(Error::Parse(format!("unknown track category '{other}'"))),
        }
    }
}

/// One uploaded clip as stored in the owner's track document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub track_name: String,
    pub added_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl TrackRecord {
    pub fn new(track_name: impl Into<String>, added_by: UserId) -> Self {
        Self {
            track_name: track_name.into(),
            added_by,
            created_at: Utc::now(),
        }
    }

    /// Blob path of the playable bytes.
    pub fn blob_path(track_name: &str) -> String {
        format!("voicelines/{track_name}")
    }

    /// Blob path a deleted track is archived under.
    pub fn archive_path(owner: UserId, track_name: &str) -> String {
        format!("archive/{owner}/{track_name}")
    }
}

/// A track name paired with a time-limited download link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackLink {
    pub track_name: String,
    pub signed_url: String,
}

/// An attachment handed to an upload command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Audio,
    Archive,
    Unsupported,
}

impl FileKind {
    pub fn from_content_type(content_type: &str) -> Self {
        // Attachments may carry parameters, e.g. "audio/mpeg; charset=binary".
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        match mime.as_str() {
            "audio/mpeg" | "audio/mp4" => FileKind::Audio,
            "application/zip" | "application/x-zip-compressed" => FileKind::Archive,
            _ => FileKind::Unsupported,
        }
    }
}

impl UploadedFile {
    pub fn kind(&self) -> FileKind {
        FileKind::from_content_type(&self.content_type)
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::id::{AssetId, ProfileId};
use crate::digest::ContentDigest;

/// Media kind, fixed at ingestion.
///
/// Derived from the MIME type when the bytes arrive and immutable after
/// that. The content digest is unique only in combination with the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    /// Derive the kind from a MIME type.
    ///
    /// Returns None for anything that is not `audio/*` or `video/*`.
    #[must_use]
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        if mime_type.starts_with("audio/") {
            Some(Self::Audio)
        } else if mime_type.starts_with("video/") {
            Some(Self::Video)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            _ => Err(format!("Unknown media kind: {s}")),
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content-addressed media file record.
///
/// The physical file lives at `path`, derived from the digest. Assets hold
/// no back-pointer to the endpoints that reference them; membership is
/// discovered by query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaAsset {
    pub id: AssetId,
    pub profile_id: ProfileId,
    pub kind: MediaKind,
    pub file_name: String,
    pub path: String,
    pub digest: ContentDigest,
    pub mime_type: String,
    pub size_bytes: i64,
    pub created_at: DateTime<Utc>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{AssetId, EndpointId, ProfileId};

/// Outbound stream target owned by a profile.
///
/// Invariant: if `video_asset_id` is set, the referenced asset's kind is
/// video; symmetric for audio. Enforced before every write by
/// `EndpointService`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: EndpointId,
    pub profile_id: ProfileId,
    pub name: String,
    pub url: String,
    /// Free-form classification, e.g. "youtube", "twitch", "custom".
    pub service_tag: String,
    pub video_asset_id: Option<AssetId>,
    pub audio_asset_id: Option<AssetId>,
    pub is_active: bool,
    pub last_stream_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating an endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct NewEndpoint {
    pub profile_id: ProfileId,
    pub name: String,
    pub url: String,
    pub service_tag: String,
    #[serde(default)]
    pub video_asset_id: Option<AssetId>,
    #[serde(default)]
    pub audio_asset_id: Option<AssetId>,
    #[serde(default)]
    pub is_active: bool,
}

/// Partial update for an endpoint.
///
/// Asset references are double-optional: the outer `None` leaves the
/// reference untouched, `Some(None)` clears it, `Some(Some(id))` replaces
/// it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndpointUpdate {
    pub name: Option<String>,
    pub url: Option<String>,
    pub service_tag: Option<String>,
    #[serde(default, with = "double_option")]
    pub video_asset_id: Option<Option<AssetId>>,
    #[serde(default, with = "double_option")]
    pub audio_asset_id: Option<Option<AssetId>>,
    pub is_active: Option<bool>,
}

impl EndpointUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.url.is_none()
            && self.service_tag.is_none()
            && self.video_asset_id.is_none()
            && self.audio_asset_id.is_none()
            && self.is_active.is_none()
    }
}

/// Serde helper: a present-but-null field deserializes to `Some(None)`,
/// an absent field stays `None`.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Option::<T>::deserialize(de).map(Some)
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::ProfileId;

/// Streaming profile: the root of the ownership hierarchy.
///
/// A profile owns zero or more endpoints, and transitively the media assets
/// its endpoints reference. Deleting a profile cascades through both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

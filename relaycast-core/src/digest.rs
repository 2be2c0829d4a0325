//! Content digest engine.
//!
//! SHA-256 over the raw bytes of a media file, hex-encoded. The digest is
//! the content address of an asset; together with the media kind it forms
//! the deduplication key. The store never trusts a digest it did not
//! compute itself.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::str::FromStr;

/// Hex-encoded SHA-256 digest length.
pub const DIGEST_HEX_LEN: usize = 64;

/// A validated, lowercase hex-encoded SHA-256 content digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Compute the digest of a full in-memory byte slice.
    #[must_use]
    pub fn compute(bytes: &[u8]) -> Self {
        let mut hasher = DigestHasher::new();
        hasher.update(bytes);
        hasher.finalize()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ContentDigest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != DIGEST_HEX_LEN {
            return Err(format!(
                "digest must be {DIGEST_HEX_LEN} hex characters, got {}",
                s.len()
            ));
        }
        if !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err("digest must be hex-encoded".to_string());
        }
        Ok(Self(s.to_lowercase()))
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Incremental digest computation over a byte stream.
///
/// Used by the upload session (hashing the selected file chunk by chunk)
/// and by the asset store (recomputing over received bytes for integrity).
#[derive(Default)]
pub struct DigestHasher {
    inner: Sha256,
}

impl DigestHasher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.inner.update(chunk);
    }

    #[must_use]
    pub fn finalize(self) -> ContentDigest {
        ContentDigest(hex::encode(self.inner.finalize()))
    }
}

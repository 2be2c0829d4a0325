use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use std::str::FromStr;

use crate::{
    digest::ContentDigest,
    models::{AssetId, MediaAsset, MediaKind, ProfileId},
    Error, Result,
};

/// Parameters for inserting a media asset record
#[derive(Debug, Clone)]
pub struct NewAssetRecord {
    pub profile_id: ProfileId,
    pub kind: MediaKind,
    pub file_name: String,
    pub path: String,
    pub digest: ContentDigest,
    pub mime_type: String,
    pub size_bytes: i64,
}

/// Media asset repository for database operations
#[derive(Clone)]
pub struct AssetRepository {
    pool: SqlitePool,
}

impl AssetRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert an asset record, idempotent on the (digest, kind) unique key.
    ///
    /// Returns `(asset, inserted)`. When a record with the same digest and
    /// kind already exists the existing row is returned and `inserted` is
    /// false — the loser of a concurrent identical upload gets the
    /// winner's record, never an error.
    pub async fn insert_dedup(&self, record: &NewAssetRecord) -> Result<(MediaAsset, bool)> {
        let row = sqlx::query(
            "INSERT INTO media_assets
                (profile_id, kind, file_name, file_path, digest, mime_type, size_bytes, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (digest, kind) DO NOTHING
             RETURNING id, profile_id, kind, file_name, file_path, digest, mime_type, size_bytes, created_at",
        )
        .bind(record.profile_id)
        .bind(record.kind.as_str())
        .bind(&record.file_name)
        .bind(&record.path)
        .bind(&record.digest)
        .bind(&record.mime_type)
        .bind(record.size_bytes)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return Ok((row_to_asset(&row)?, true));
        }

        let existing = self
            .find_by_digest(&record.digest, record.kind)
            .await?
            .ok_or_else(|| {
                Error::Internal("Dedup insert conflicted but no existing record found".to_string())
            })?;

        Ok((existing, false))
    }

    /// Look up an asset by its content address. Read-only.
    pub async fn find_by_digest(
        &self,
        digest: &ContentDigest,
        kind: MediaKind,
    ) -> Result<Option<MediaAsset>> {
        let row = sqlx::query(
            "SELECT id, profile_id, kind, file_name, file_path, digest, mime_type, size_bytes, created_at
             FROM media_assets
             WHERE digest = $1 AND kind = $2",
        )
        .bind(digest)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| row_to_asset(&row)).transpose()
    }

    /// Get asset by ID
    pub async fn get_by_id(&self, asset_id: AssetId) -> Result<Option<MediaAsset>> {
        let row = sqlx::query(
            "SELECT id, profile_id, kind, file_name, file_path, digest, mime_type, size_bytes, created_at
             FROM media_assets
             WHERE id = $1",
        )
        .bind(asset_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| row_to_asset(&row)).transpose()
    }

    /// List assets owned by a profile, newest first
    pub async fn list_by_profile(&self, profile_id: ProfileId) -> Result<Vec<MediaAsset>> {
        let rows = sqlx::query(
            "SELECT id, profile_id, kind, file_name, file_path, digest, mime_type, size_bytes, created_at
             FROM media_assets
             WHERE profile_id = $1
             ORDER BY created_at DESC, id DESC",
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_asset).collect()
    }

    /// IDs of all assets owned by a profile (cascade candidates)
    pub async fn ids_by_profile(&self, profile_id: ProfileId) -> Result<Vec<AssetId>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM media_assets WHERE profile_id = $1")
            .bind(profile_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(ids.into_iter().map(AssetId::new).collect())
    }

    /// Delete an asset record
    pub async fn delete(&self, asset_id: AssetId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM media_assets WHERE id = $1")
            .bind(asset_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_asset(row: &SqliteRow) -> Result<MediaAsset> {
    let kind_str: String = row.try_get("kind")?;
    let kind = MediaKind::from_str(&kind_str)
        .map_err(|e| Error::Internal(format!("Corrupt kind column: {e}")))?;
    let digest_str: String = row.try_get("digest")?;
    let digest = ContentDigest::from_str(&digest_str)
        .map_err(|e| Error::Internal(format!("Corrupt digest column: {e}")))?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    Ok(MediaAsset {
        id: row.try_get("id")?,
        profile_id: row.try_get("profile_id")?,
        kind,
        file_name: row.try_get("file_name")?,
        path: row.try_get("file_path")?,
        digest,
        mime_type: row.try_get("mime_type")?,
        size_bytes: row.try_get("size_bytes")?,
        created_at,
    })
}

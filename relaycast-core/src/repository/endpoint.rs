use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use crate::{
    models::{AssetId, Endpoint, EndpointId, NewEndpoint, ProfileId},
    Result,
};

/// Endpoint repository for database operations
#[derive(Clone)]
pub struct EndpointRepository {
    pool: SqlitePool,
}

impl EndpointRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new endpoint
    pub async fn create(&self, new: &NewEndpoint) -> Result<Endpoint> {
        let now = Utc::now();

        let row = sqlx::query(
            "INSERT INTO endpoints
                (profile_id, name, url, service_tag, video_asset_id, audio_asset_id, is_active, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING id, profile_id, name, url, service_tag, video_asset_id, audio_asset_id,
                       is_active, last_stream_at, created_at, updated_at",
        )
        .bind(new.profile_id)
        .bind(&new.name)
        .bind(&new.url)
        .bind(&new.service_tag)
        .bind(new.video_asset_id)
        .bind(new.audio_asset_id)
        .bind(new.is_active)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        row_to_endpoint(&row)
    }

    /// Get endpoint by ID
    pub async fn get_by_id(&self, endpoint_id: EndpointId) -> Result<Option<Endpoint>> {
        let row = sqlx::query(
            "SELECT id, profile_id, name, url, service_tag, video_asset_id, audio_asset_id,
                    is_active, last_stream_at, created_at, updated_at
             FROM endpoints
             WHERE id = $1",
        )
        .bind(endpoint_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| row_to_endpoint(&row)).transpose()
    }

    /// List endpoints for a profile, newest first
    pub async fn list_by_profile(&self, profile_id: ProfileId) -> Result<Vec<Endpoint>> {
        let rows = sqlx::query(
            "SELECT id, profile_id, name, url, service_tag, video_asset_id, audio_asset_id,
                    is_active, last_stream_at, created_at, updated_at
             FROM endpoints
             WHERE profile_id = $1
             ORDER BY created_at DESC, id DESC",
        )
        .bind(profile_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_endpoint).collect()
    }

    /// Write a fully resolved endpoint row.
    ///
    /// The service layer fetches the current row, applies the partial
    /// update, validates, then persists the result here in one statement.
    pub async fn save(&self, endpoint: &Endpoint) -> Result<Option<Endpoint>> {
        let row = sqlx::query(
            "UPDATE endpoints
             SET name = $2, url = $3, service_tag = $4, video_asset_id = $5,
                 audio_asset_id = $6, is_active = $7, updated_at = $8
             WHERE id = $1
             RETURNING id, profile_id, name, url, service_tag, video_asset_id, audio_asset_id,
                       is_active, last_stream_at, created_at, updated_at",
        )
        .bind(endpoint.id)
        .bind(&endpoint.name)
        .bind(&endpoint.url)
        .bind(&endpoint.service_tag)
        .bind(endpoint.video_asset_id)
        .bind(endpoint.audio_asset_id)
        .bind(endpoint.is_active)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| row_to_endpoint(&row)).transpose()
    }

    /// Delete an endpoint record
    pub async fn delete(&self, endpoint_id: EndpointId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM endpoints WHERE id = $1")
            .bind(endpoint_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete all endpoints under a profile, returning how many went
    pub async fn delete_by_profile(&self, profile_id: ProfileId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM endpoints WHERE profile_id = $1")
            .bind(profile_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Count live references to an asset across all endpoints.
    ///
    /// Computed on demand; no incremental counter exists to drift.
    pub async fn count_references(&self, asset_id: AssetId) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM endpoints WHERE video_asset_id = $1 OR audio_asset_id = $1",
        )
        .bind(asset_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Record that a stream was started on this endpoint
    pub async fn mark_streamed(&self, endpoint_id: EndpointId) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE endpoints SET last_stream_at = $2, updated_at = $2 WHERE id = $1",
        )
        .bind(endpoint_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_endpoint(row: &SqliteRow) -> Result<Endpoint> {
    let last_stream_at: Option<DateTime<Utc>> = row.try_get("last_stream_at")?;

    Ok(Endpoint {
        id: row.try_get("id")?,
        profile_id: row.try_get("profile_id")?,
        name: row.try_get("name")?,
        url: row.try_get("url")?,
        service_tag: row.try_get("service_tag")?,
        video_asset_id: row.try_get("video_asset_id")?,
        audio_asset_id: row.try_get("audio_asset_id")?,
        is_active: row.try_get("is_active")?,
        last_stream_at,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

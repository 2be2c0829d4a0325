use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use crate::{
    models::{Profile, ProfileId},
    Result,
};

/// Profile repository for database operations
#[derive(Clone)]
pub struct ProfileRepository {
    pool: SqlitePool,
}

impl ProfileRepository {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new profile
    pub async fn create(&self, name: &str) -> Result<Profile> {
        let now = Utc::now();

        let row = sqlx::query(
            "INSERT INTO profiles (name, created_at, updated_at)
             VALUES ($1, $2, $3)
             RETURNING id, name, created_at, updated_at",
        )
        .bind(name)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        row_to_profile(&row)
    }

    /// Get profile by ID
    pub async fn get_by_id(&self, profile_id: ProfileId) -> Result<Option<Profile>> {
        let row = sqlx::query(
            "SELECT id, name, created_at, updated_at FROM profiles WHERE id = $1",
        )
        .bind(profile_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| row_to_profile(&row)).transpose()
    }

    /// List all profiles, oldest first
    pub async fn list(&self) -> Result<Vec<Profile>> {
        let rows = sqlx::query(
            "SELECT id, name, created_at, updated_at FROM profiles ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_profile).collect()
    }

    /// Rename a profile; returns None when no such profile exists
    pub async fn update_name(&self, profile_id: ProfileId, name: &str) -> Result<Option<Profile>> {
        let row = sqlx::query(
            "UPDATE profiles
             SET name = $2, updated_at = $3
             WHERE id = $1
             RETURNING id, name, created_at, updated_at",
        )
        .bind(profile_id)
        .bind(name)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| row_to_profile(&row)).transpose()
    }

    /// Delete a profile record.
    ///
    /// Foreign keys cascade the delete to the profile's endpoints.
    pub async fn delete(&self, profile_id: ProfileId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(profile_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Check whether a profile exists
    pub async fn exists(&self, profile_id: ProfileId) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM profiles WHERE id = $1")
            .bind(profile_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count > 0)
    }
}

fn row_to_profile(row: &SqliteRow) -> Result<Profile> {
    Ok(Profile {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

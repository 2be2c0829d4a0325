//! Database pool construction and schema bootstrap.
//!
//! The schema is created imperatively at startup. Kind-correctness of
//! endpoint asset references is enforced in `EndpointService` before every
//! write; the foreign keys and CHECK constraint below are the backstop,
//! not the primary mechanism.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::{config::DatabaseConfig, Result};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS profiles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT UNIQUE NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS media_assets (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        profile_id INTEGER NOT NULL,
        kind TEXT NOT NULL CHECK (kind IN ('audio', 'video')),
        file_name TEXT NOT NULL,
        file_path TEXT NOT NULL,
        digest TEXT NOT NULL,
        mime_type TEXT NOT NULL,
        size_bytes INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        UNIQUE (digest, kind),
        FOREIGN KEY (profile_id) REFERENCES profiles(id) ON DELETE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS endpoints (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        profile_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        url TEXT NOT NULL,
        service_tag TEXT NOT NULL,
        video_asset_id INTEGER,
        audio_asset_id INTEGER,
        is_active INTEGER NOT NULL DEFAULT 0,
        last_stream_at TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        FOREIGN KEY (profile_id) REFERENCES profiles(id) ON DELETE CASCADE,
        FOREIGN KEY (video_asset_id) REFERENCES media_assets(id) ON DELETE SET NULL,
        FOREIGN KEY (audio_asset_id) REFERENCES media_assets(id) ON DELETE SET NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_media_assets_profile_id ON media_assets(profile_id)",
    "CREATE INDEX IF NOT EXISTS idx_media_assets_digest ON media_assets(digest, kind)",
    "CREATE INDEX IF NOT EXISTS idx_endpoints_profile_id ON endpoints(profile_id)",
];

/// Open a connection pool against the configured SQLite database.
///
/// Foreign key enforcement is enabled per connection.
pub async fn connect(config: &DatabaseConfig) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.url)
        .map_err(sqlx::Error::from)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Create tables and indexes if they do not exist yet.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("Database schema ready");
    Ok(())
}

/// In-memory pool for tests.
///
/// A single connection is required: every `sqlite::memory:` connection is
/// its own database.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(sqlx::Error::from)?
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    init_schema(&pool).await?;
    Ok(pool)
}

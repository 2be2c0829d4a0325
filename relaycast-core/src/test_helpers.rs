//! Shared fixtures for relaycast-core tests.
//!
//! Everything runs against an in-memory database and a temp storage root,
//! so the suite needs no external services.

use sqlx::SqlitePool;
use tempfile::TempDir;

use crate::{
    db::connect_in_memory,
    models::{NewEndpoint, Profile, ProfileId},
    repository::ProfileRepository,
    service::{CleanupCoordinator, EndpointService, ProfileService, UploadSession},
    storage::AssetStore,
};

/// A fully wired service stack over an in-memory database
pub struct TestStack {
    pub pool: SqlitePool,
    pub store: AssetStore,
    pub cleanup: CleanupCoordinator,
    pub profiles: ProfileService,
    pub endpoints: EndpointService,
    pub uploads: UploadSession,
    /// Holds the storage root alive for the test's duration
    pub storage_dir: TempDir,
}

pub async fn test_stack() -> TestStack {
    let pool = connect_in_memory().await.expect("in-memory pool");
    let storage_dir = tempfile::tempdir().expect("temp storage root");
    let store = AssetStore::new(pool.clone(), storage_dir.path());
    let cleanup = CleanupCoordinator::new(pool.clone(), store.clone());

    TestStack {
        profiles: ProfileService::new(pool.clone(), store.clone(), cleanup.clone()),
        endpoints: EndpointService::new(pool.clone(), store.clone(), cleanup.clone()),
        uploads: UploadSession::new(store.clone()),
        cleanup,
        store,
        pool,
        storage_dir,
    }
}

/// Create a profile directly through the repository
pub async fn seed_profile(pool: &SqlitePool, name: &str) -> Profile {
    ProfileRepository::new(pool.clone())
        .create(name)
        .await
        .expect("seed profile")
}

/// Fixture builder for NewEndpoint
pub struct EndpointFixture {
    inner: NewEndpoint,
}

impl EndpointFixture {
    pub fn new(profile_id: ProfileId) -> Self {
        Self {
            inner: NewEndpoint {
                profile_id,
                name: "test_endpoint".to_string(),
                url: "rtmp://live.example.com/app/key".to_string(),
                service_tag: "custom".to_string(),
                video_asset_id: None,
                audio_asset_id: None,
                is_active: true,
            },
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.inner.name = name.to_string();
        self
    }

    #[must_use]
    pub fn with_url(mut self, url: &str) -> Self {
        self.inner.url = url.to_string();
        self
    }

    #[must_use]
    pub fn with_video(mut self, asset_id: crate::models::AssetId) -> Self {
        self.inner.video_asset_id = Some(asset_id);
        self
    }

    #[must_use]
    pub fn with_audio(mut self, asset_id: crate::models::AssetId) -> Self {
        self.inner.audio_asset_id = Some(asset_id);
        self
    }

    #[must_use]
    pub fn build(self) -> NewEndpoint {
        self.inner
    }
}

/// Count regular files under a directory, recursively
pub fn count_files(dir: &std::path::Path) -> usize {
    let mut count = 0;
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                count += count_files(&path);
            } else {
                count += 1;
            }
        }
    }
    count
}

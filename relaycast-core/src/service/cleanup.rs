use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::{
    models::AssetId,
    repository::EndpointRepository,
    storage::AssetStore,
    Result,
};

/// Reference-counted asset reclamation.
///
/// An asset is reclaimable only when no endpoint references it as a video
/// or audio source. Reference counts are computed on demand from the
/// endpoints table, so the coordinator is always consistent with the
/// registry state it runs after.
#[derive(Clone)]
pub struct CleanupCoordinator {
    endpoints: EndpointRepository,
    store: AssetStore,
}

impl std::fmt::Debug for CleanupCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupCoordinator").finish()
    }
}

impl CleanupCoordinator {
    pub fn new(pool: SqlitePool, store: AssetStore) -> Self {
        Self {
            endpoints: EndpointRepository::new(pool),
            store,
        }
    }

    /// Delete every candidate asset whose reference count is zero.
    ///
    /// Returns the ids that were actually reclaimed. Candidates that are
    /// still referenced, or that no longer exist, are skipped.
    pub async fn reclaim(&self, candidates: &[AssetId]) -> Result<Vec<AssetId>> {
        let mut reclaimed = Vec::new();

        for &asset_id in candidates {
            if self.store.get(asset_id).await?.is_none() {
                continue;
            }

            let references = self.endpoints.count_references(asset_id).await?;
            if references > 0 {
                debug!(asset_id = %asset_id, references, "Asset still referenced, keeping");
                continue;
            }

            self.store.delete(asset_id).await?;
            reclaimed.push(asset_id);
        }

        if !reclaimed.is_empty() {
            info!(count = reclaimed.len(), "Reclaimed unreferenced assets");
        }
        Ok(reclaimed)
    }

    /// Reclaim a single asset if it is unreferenced
    pub async fn reclaim_one(&self, asset_id: AssetId) -> Result<bool> {
        Ok(!self.reclaim(&[asset_id]).await?.is_empty())
    }

    /// Current reference count for an asset
    pub async fn reference_count(&self, asset_id: AssetId) -> Result<i64> {
        self.endpoints.count_references(asset_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;
    use crate::models::NewEndpoint;
    use crate::repository::ProfileRepository;

    async fn setup() -> (SqlitePool, CleanupCoordinator, AssetStore, crate::models::ProfileId, tempfile::TempDir)
    {
        let pool = connect_in_memory().await.expect("pool");
        let profile = ProfileRepository::new(pool.clone())
            .create("owner")
            .await
            .expect("profile");
        let dir = tempfile::tempdir().expect("tempdir");
        let store = AssetStore::new(pool.clone(), dir.path());
        let coordinator = CleanupCoordinator::new(pool.clone(), store.clone());
        (pool, coordinator, store, profile.id, dir)
    }

    #[tokio::test]
    async fn test_unreferenced_asset_is_reclaimed() {
        let (_pool, coordinator, store, profile_id, _dir) = setup().await;

        let outcome = store
            .store(profile_id, "a.mp4", "video/mp4", None, b"bytes")
            .await
            .expect("store");

        let reclaimed = coordinator.reclaim(&[outcome.asset.id]).await.expect("reclaim");
        assert_eq!(reclaimed, vec![outcome.asset.id]);
        assert!(store.get(outcome.asset.id).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn test_referenced_asset_survives_reclaim() {
        let (pool, coordinator, store, profile_id, _dir) = setup().await;

        let outcome = store
            .store(profile_id, "a.mp4", "video/mp4", None, b"bytes")
            .await
            .expect("store");

        EndpointRepository::new(pool)
            .create(&NewEndpoint {
                profile_id,
                name: "main".to_string(),
                url: "rtmp://live.example.com/app".to_string(),
                service_tag: "custom".to_string(),
                video_asset_id: Some(outcome.asset.id),
                audio_asset_id: None,
                is_active: true,
            })
            .await
            .expect("endpoint");

        let reclaimed = coordinator.reclaim(&[outcome.asset.id]).await.expect("reclaim");
        assert!(reclaimed.is_empty());
        assert!(store.get(outcome.asset.id).await.expect("get").is_some());
    }

    #[tokio::test]
    async fn test_missing_candidate_is_skipped() {
        let (_pool, coordinator, _store, _profile_id, _dir) = setup().await;
        let reclaimed = coordinator.reclaim(&[AssetId::new(999)]).await.expect("reclaim");
        assert!(reclaimed.is_empty());
    }
}

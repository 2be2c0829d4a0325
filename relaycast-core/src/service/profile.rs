use sqlx::SqlitePool;
use tracing::info;

use crate::{
    models::{AssetId, Profile, ProfileId},
    repository::{EndpointRepository, ProfileRepository},
    service::CleanupCoordinator,
    storage::AssetStore,
    validation::ProfileNameValidator,
    Error, Result,
};

/// Summary of a cascading profile deletion
#[derive(Debug, Clone)]
pub struct ProfileDeletion {
    pub profile_id: ProfileId,
    /// Assets reclaimed along with the profile
    pub reclaimed_assets: Vec<AssetId>,
}

/// Profile lifecycle and its cascading cleanup
#[derive(Clone)]
pub struct ProfileService {
    profiles: ProfileRepository,
    endpoints: EndpointRepository,
    store: AssetStore,
    cleanup: CleanupCoordinator,
    name_validator: ProfileNameValidator,
}

impl std::fmt::Debug for ProfileService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileService").finish()
    }
}

impl ProfileService {
    pub fn new(pool: SqlitePool, store: AssetStore, cleanup: CleanupCoordinator) -> Self {
        Self {
            profiles: ProfileRepository::new(pool.clone()),
            endpoints: EndpointRepository::new(pool),
            store,
            cleanup,
            name_validator: ProfileNameValidator::default(),
        }
    }

    /// Create a profile with a unique name
    pub async fn create(&self, name: &str) -> Result<Profile> {
        self.name_validator.validate(name)?;
        let profile = self.profiles.create(name).await?;
        info!(profile_id = %profile.id, name = %profile.name, "Profile created");
        Ok(profile)
    }

    pub async fn get(&self, profile_id: ProfileId) -> Result<Profile> {
        self.profiles
            .get_by_id(profile_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Profile {profile_id} not found")))
    }

    pub async fn list(&self) -> Result<Vec<Profile>> {
        self.profiles.list().await
    }

    /// Rename a profile. The new name must also be unique.
    pub async fn rename(&self, profile_id: ProfileId, name: &str) -> Result<Profile> {
        self.name_validator.validate(name)?;
        self.profiles
            .update_name(profile_id, name)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Profile {profile_id} not found")))
    }

    /// Delete a profile and everything hanging off it.
    ///
    /// Endpoints are removed first so the profile's assets lose their
    /// references, then the cleanup coordinator reclaims whatever is
    /// unreferenced, then the profile row itself goes. The reference check
    /// runs only after the endpoint deletes have committed.
    pub async fn delete(&self, profile_id: ProfileId) -> Result<ProfileDeletion> {
        if !self.profiles.exists(profile_id).await? {
            return Err(Error::NotFound(format!("Profile {profile_id} not found")));
        }

        let candidates = self.store.ids_by_profile(profile_id).await?;
        let endpoints_removed = self.endpoints.delete_by_profile(profile_id).await?;
        let reclaimed_assets = self.cleanup.reclaim(&candidates).await?;
        self.profiles.delete(profile_id).await?;

        info!(
            profile_id = %profile_id,
            endpoints = endpoints_removed,
            reclaimed = reclaimed_assets.len(),
            "Profile deleted"
        );
        Ok(ProfileDeletion {
            profile_id,
            reclaimed_assets,
        })
    }
}

use sqlx::SqlitePool;
use tracing::info;

use crate::{
    models::{AssetId, Endpoint, EndpointId, EndpointUpdate, MediaKind, NewEndpoint, ProfileId},
    repository::{EndpointRepository, ProfileRepository},
    service::CleanupCoordinator,
    storage::AssetStore,
    validation::{validate_service_tag, EndpointNameValidator, StreamUrlValidator},
    Error, Result,
};

/// Result of an endpoint write that may have unbound assets
#[derive(Debug, Clone)]
pub struct EndpointChange {
    pub endpoint: Endpoint,
    /// Assets reclaimed because this write removed their last reference
    pub reclaimed_assets: Vec<AssetId>,
}

/// Result of an endpoint deletion
#[derive(Debug, Clone)]
pub struct EndpointDeletion {
    pub endpoint_id: EndpointId,
    pub reclaimed_assets: Vec<AssetId>,
}

/// Endpoint CRUD with kind-correct asset binding.
///
/// Every asset reference is validated before anything is written: the
/// asset must exist, belong to the same profile, and match the role it is
/// being bound to. A failed validation leaves the endpoint untouched.
#[derive(Clone)]
pub struct EndpointService {
    endpoints: EndpointRepository,
    profiles: ProfileRepository,
    store: AssetStore,
    cleanup: CleanupCoordinator,
    name_validator: EndpointNameValidator,
    url_validator: StreamUrlValidator,
}

impl std::fmt::Debug for EndpointService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointService").finish()
    }
}

impl EndpointService {
    pub fn new(pool: SqlitePool, store: AssetStore, cleanup: CleanupCoordinator) -> Self {
        Self {
            endpoints: EndpointRepository::new(pool.clone()),
            profiles: ProfileRepository::new(pool),
            store,
            cleanup,
            name_validator: EndpointNameValidator::default(),
            url_validator: StreamUrlValidator::default(),
        }
    }

    /// Create an endpoint after validating every field and reference
    pub async fn create(&self, new: &NewEndpoint) -> Result<Endpoint> {
        if !self.profiles.exists(new.profile_id).await? {
            return Err(Error::NotFound(format!(
                "Profile {} not found",
                new.profile_id
            )));
        }

        self.name_validator.validate(&new.name)?;
        self.url_validator.validate(&new.url)?;
        validate_service_tag(&new.service_tag)?;
        self.check_binding(new.profile_id, new.video_asset_id, MediaKind::Video)
            .await?;
        self.check_binding(new.profile_id, new.audio_asset_id, MediaKind::Audio)
            .await?;

        let endpoint = self.endpoints.create(new).await?;
        info!(endpoint_id = %endpoint.id, profile_id = %endpoint.profile_id, "Endpoint created");
        Ok(endpoint)
    }

    pub async fn get(&self, endpoint_id: EndpointId) -> Result<Endpoint> {
        self.endpoints
            .get_by_id(endpoint_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Endpoint {endpoint_id} not found")))
    }

    pub async fn list_by_profile(&self, profile_id: ProfileId) -> Result<Vec<Endpoint>> {
        if !self.profiles.exists(profile_id).await? {
            return Err(Error::NotFound(format!("Profile {profile_id} not found")));
        }
        self.endpoints.list_by_profile(profile_id).await
    }

    /// Apply a partial update, validating only the changed fields.
    ///
    /// When the update unbinds or replaces asset references, the previous
    /// assets are offered to the cleanup coordinator after the row update
    /// has committed.
    pub async fn update(
        &self,
        endpoint_id: EndpointId,
        update: &EndpointUpdate,
    ) -> Result<EndpointChange> {
        let mut endpoint = self.get(endpoint_id).await?;

        if update.is_empty() {
            return Ok(EndpointChange {
                endpoint,
                reclaimed_assets: Vec::new(),
            });
        }

        if let Some(name) = &update.name {
            self.name_validator.validate(name)?;
            endpoint.name = name.clone();
        }
        if let Some(url) = &update.url {
            self.url_validator.validate(url)?;
            endpoint.url = url.clone();
        }
        if let Some(tag) = &update.service_tag {
            validate_service_tag(tag)?;
            endpoint.service_tag = tag.clone();
        }
        if let Some(active) = update.is_active {
            endpoint.is_active = active;
        }

        let mut unbound = Vec::new();
        if let Some(video) = update.video_asset_id {
            self.check_binding(endpoint.profile_id, video, MediaKind::Video)
                .await?;
            if let Some(previous) = endpoint.video_asset_id {
                if video != Some(previous) {
                    unbound.push(previous);
                }
            }
            endpoint.video_asset_id = video;
        }
        if let Some(audio) = update.audio_asset_id {
            self.check_binding(endpoint.profile_id, audio, MediaKind::Audio)
                .await?;
            if let Some(previous) = endpoint.audio_asset_id {
                if audio != Some(previous) {
                    unbound.push(previous);
                }
            }
            endpoint.audio_asset_id = audio;
        }

        let endpoint = self
            .endpoints
            .save(&endpoint)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Endpoint {endpoint_id} not found")))?;

        let reclaimed_assets = self.cleanup.reclaim(&unbound).await?;
        Ok(EndpointChange {
            endpoint,
            reclaimed_assets,
        })
    }

    /// Delete an endpoint and reclaim assets it was the last holder of
    pub async fn delete(&self, endpoint_id: EndpointId) -> Result<EndpointDeletion> {
        let endpoint = self.get(endpoint_id).await?;

        let candidates: Vec<AssetId> = endpoint
            .video_asset_id
            .into_iter()
            .chain(endpoint.audio_asset_id)
            .collect();

        if !self.endpoints.delete(endpoint_id).await? {
            return Err(Error::NotFound(format!("Endpoint {endpoint_id} not found")));
        }

        let reclaimed_assets = self.cleanup.reclaim(&candidates).await?;
        info!(
            endpoint_id = %endpoint_id,
            reclaimed = reclaimed_assets.len(),
            "Endpoint deleted"
        );
        Ok(EndpointDeletion {
            endpoint_id,
            reclaimed_assets,
        })
    }

    /// Record a stream start on an endpoint
    pub async fn mark_streamed(&self, endpoint_id: EndpointId) -> Result<()> {
        if !self.endpoints.mark_streamed(endpoint_id).await? {
            return Err(Error::NotFound(format!("Endpoint {endpoint_id} not found")));
        }
        Ok(())
    }

    async fn check_binding(
        &self,
        profile_id: ProfileId,
        asset_id: Option<AssetId>,
        expected: MediaKind,
    ) -> Result<()> {
        let Some(asset_id) = asset_id else {
            return Ok(());
        };

        let asset = self
            .store
            .get(asset_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Asset {asset_id} not found")))?;

        if asset.profile_id != profile_id {
            return Err(Error::Validation(crate::validation::ValidationError::Field {
                field: format!("{expected}_asset_id"),
                message: format!("asset {asset_id} belongs to a different profile"),
            }));
        }
        if asset.kind != expected {
            return Err(Error::Validation(crate::validation::ValidationError::Field {
                field: format!("{expected}_asset_id"),
                message: format!("asset {asset_id} is {}, expected {expected}", asset.kind),
            }));
        }
        Ok(())
    }
}

// Profile management HTTP handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use relaycast_core::models::{AssetId, Profile, ProfileId};

use super::{AppResult, AppState};

/// Create / rename profile request
#[derive(Debug, Deserialize)]
pub struct ProfileNameRequest {
    pub name: String,
}

/// Profile deletion response
#[derive(Debug, Serialize)]
pub struct ProfileDeletionResponse {
    pub profile_id: ProfileId,
    pub reclaimed_assets: Vec<AssetId>,
}

pub async fn list_profiles(State(state): State<AppState>) -> AppResult<Json<Vec<Profile>>> {
    let profiles = state.profiles.list().await?;
    Ok(Json(profiles))
}

pub async fn create_profile(
    State(state): State<AppState>,
    Json(req): Json<ProfileNameRequest>,
) -> AppResult<Json<Profile>> {
    let profile = state.profiles.create(&req.name).await?;
    Ok(Json(profile))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(profile_id): Path<i64>,
) -> AppResult<Json<Profile>> {
    let profile = state.profiles.get(ProfileId::new(profile_id)).await?;
    Ok(Json(profile))
}

pub async fn rename_profile(
    State(state): State<AppState>,
    Path(profile_id): Path<i64>,
    Json(req): Json<ProfileNameRequest>,
) -> AppResult<Json<Profile>> {
    let profile = state
        .profiles
        .rename(ProfileId::new(profile_id), &req.name)
        .await?;
    Ok(Json(profile))
}

pub async fn delete_profile(
    State(state): State<AppState>,
    Path(profile_id): Path<i64>,
) -> AppResult<Json<ProfileDeletionResponse>> {
    let deletion = state.profiles.delete(ProfileId::new(profile_id)).await?;
    Ok(Json(ProfileDeletionResponse {
        profile_id: deletion.profile_id,
        reclaimed_assets: deletion.reclaimed_assets,
    }))
}

// Endpoint management HTTP handlers

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use relaycast_core::models::{AssetId, Endpoint, EndpointId, EndpointUpdate, NewEndpoint, ProfileId};

use super::{AppResult, AppState};

/// Response for writes that may have reclaimed assets
#[derive(Debug, Serialize)]
pub struct EndpointChangeResponse {
    pub endpoint: Endpoint,
    pub reclaimed_assets: Vec<AssetId>,
}

/// Endpoint deletion response
#[derive(Debug, Serialize)]
pub struct EndpointDeletionResponse {
    pub endpoint_id: EndpointId,
    pub reclaimed_assets: Vec<AssetId>,
}

pub async fn list_endpoints(
    State(state): State<AppState>,
    Path(profile_id): Path<i64>,
) -> AppResult<Json<Vec<Endpoint>>> {
    let endpoints = state
        .endpoints
        .list_by_profile(ProfileId::new(profile_id))
        .await?;
    Ok(Json(endpoints))
}

pub async fn create_endpoint(
    State(state): State<AppState>,
    Json(req): Json<NewEndpoint>,
) -> AppResult<Json<Endpoint>> {
    let endpoint = state.endpoints.create(&req).await?;
    Ok(Json(endpoint))
}

pub async fn get_endpoint(
    State(state): State<AppState>,
    Path(endpoint_id): Path<i64>,
) -> AppResult<Json<Endpoint>> {
    let endpoint = state.endpoints.get(EndpointId::new(endpoint_id)).await?;
    Ok(Json(endpoint))
}

pub async fn update_endpoint(
    State(state): State<AppState>,
    Path(endpoint_id): Path<i64>,
    Json(req): Json<EndpointUpdate>,
) -> AppResult<Json<EndpointChangeResponse>> {
    let change = state
        .endpoints
        .update(EndpointId::new(endpoint_id), &req)
        .await?;
    Ok(Json(EndpointChangeResponse {
        endpoint: change.endpoint,
        reclaimed_assets: change.reclaimed_assets,
    }))
}

pub async fn delete_endpoint(
    State(state): State<AppState>,
    Path(endpoint_id): Path<i64>,
) -> AppResult<Json<EndpointDeletionResponse>> {
    let deletion = state.endpoints.delete(EndpointId::new(endpoint_id)).await?;
    Ok(Json(EndpointDeletionResponse {
        endpoint_id: deletion.endpoint_id,
        reclaimed_assets: deletion.reclaimed_assets,
    }))
}

pub async fn mark_streamed(
    State(state): State<AppState>,
    Path(endpoint_id): Path<i64>,
) -> AppResult<Json<Endpoint>> {
    let endpoint_id = EndpointId::new(endpoint_id);
    state.endpoints.mark_streamed(endpoint_id).await?;
    let endpoint = state.endpoints.get(endpoint_id).await?;
    Ok(Json(endpoint))
}

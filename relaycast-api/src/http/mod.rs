// Module: http
// HTTP/JSON REST API over the profile, endpoint, and media services

pub mod endpoint;
pub mod error;
pub mod health;
pub mod media;
pub mod profile;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use relaycast_core::{
    service::{CleanupCoordinator, EndpointService, ProfileService, UploadSession},
    AssetStore,
};

pub use error::{AppError, AppResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub profiles: Arc<ProfileService>,
    pub endpoints: Arc<EndpointService>,
    pub uploads: Arc<UploadSession>,
    pub cleanup: Arc<CleanupCoordinator>,
    pub store: Arc<AssetStore>,
}

/// Create the HTTP router with all routes
pub fn create_router(
    profiles: Arc<ProfileService>,
    endpoints: Arc<EndpointService>,
    uploads: Arc<UploadSession>,
    cleanup: Arc<CleanupCoordinator>,
    store: Arc<AssetStore>,
    max_upload_bytes: usize,
) -> Router {
    let state = AppState {
        profiles,
        endpoints,
        uploads,
        cleanup,
        store,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(health::create_health_router())
        // Profile routes
        .route("/api/profiles", get(profile::list_profiles))
        .route("/api/profiles", post(profile::create_profile))
        .route("/api/profiles/{profile_id}", get(profile::get_profile))
        .route("/api/profiles/{profile_id}", put(profile::rename_profile))
        .route("/api/profiles/{profile_id}", delete(profile::delete_profile))
        // Endpoint routes
        .route(
            "/api/endpoints/profile/{profile_id}",
            get(endpoint::list_endpoints),
        )
        .route("/api/endpoints", post(endpoint::create_endpoint))
        .route("/api/endpoints/{endpoint_id}", get(endpoint::get_endpoint))
        .route("/api/endpoints/{endpoint_id}", put(endpoint::update_endpoint))
        .route(
            "/api/endpoints/{endpoint_id}",
            delete(endpoint::delete_endpoint),
        )
        .route(
            "/api/endpoints/{endpoint_id}/streamed",
            post(endpoint::mark_streamed),
        )
        // Media routes
        .route("/api/media/check", post(media::check_digest))
        .route("/api/media/upload/{profile_id}", post(media::upload_media))
        .route("/api/media/profile/{profile_id}", get(media::list_media))
        .route("/api/media/{asset_id}", delete(media::delete_media))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

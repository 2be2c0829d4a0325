//! Server lifecycle management.
//!
//! Owns the HTTP server task and handles graceful shutdown on SIGINT or
//! SIGTERM.

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::{error, info};

use relaycast_core::{
    service::{CleanupCoordinator, EndpointService, ProfileService, UploadSession},
    storage::AssetStore,
    Config,
};

/// Container for shared services
#[derive(Clone)]
pub struct Services {
    pub profiles: Arc<ProfileService>,
    pub endpoints: Arc<EndpointService>,
    pub uploads: Arc<UploadSession>,
    pub cleanup: Arc<CleanupCoordinator>,
    pub store: Arc<AssetStore>,
}

impl Services {
    pub fn new(pool: SqlitePool, store: AssetStore, cleanup: CleanupCoordinator) -> Self {
        Self {
            profiles: Arc::new(ProfileService::new(
                pool.clone(),
                store.clone(),
                cleanup.clone(),
            )),
            endpoints: Arc::new(EndpointService::new(
                pool.clone(),
                store.clone(),
                cleanup.clone(),
            )),
            uploads: Arc::new(UploadSession::new(store.clone())),
            cleanup: Arc::new(cleanup),
            store: Arc::new(store),
        }
    }
}

/// `RelayCast` server
pub struct RelayCastServer {
    config: Config,
    services: Services,
}

impl RelayCastServer {
    pub const fn new(config: Config, services: Services) -> Self {
        Self { config, services }
    }

    /// Serve HTTP until a shutdown signal arrives
    pub async fn start(self) -> anyhow::Result<()> {
        let max_upload = usize::try_from(self.config.storage.max_upload_bytes)
            .map_err(|_| anyhow::anyhow!("max_upload_bytes does not fit in usize"))?;

        let router = relaycast_api::create_router(
            self.services.profiles.clone(),
            self.services.endpoints.clone(),
            self.services.uploads.clone(),
            self.services.cleanup.clone(),
            self.services.store.clone(),
            max_upload,
        );

        let http_address = self.config.http_address();
        let addr: std::net::SocketAddr = http_address
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid HTTP address '{http_address}': {e}"))?;

        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("HTTP server listening on {addr}");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("HTTP server shut down gracefully");
        Ok(())
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT/Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("Received Ctrl+C"); }
        () = terminate => { info!("Received SIGTERM"); }
    }
}

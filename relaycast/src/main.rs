mod server;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use relaycast_core::{db, logging, service, storage::AssetStore, Config};

use server::{RelayCastServer, Services};

#[derive(Parser, Debug)]
#[command(name = "relaycast")]
#[command(about = "RelayCast streaming profile server", long_about = None)]
struct Args {
    /// Path to a config file (TOML/YAML); environment variables with the
    /// RELAYCAST_ prefix override it
    #[arg(long, env = "RELAYCAST_CONFIG_PATH")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load configuration
    let config = Config::load(args.config.as_deref())?;

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("RelayCast server starting...");
    info!("HTTP address: {}", config.http_address());
    info!("Database: {}", config.database_url());
    info!("Storage root: {}", config.storage.root);

    // 3. Initialize database and schema
    let pool = db::connect(&config.database).await?;
    db::init_schema(&pool).await?;

    // 4. Wire services
    let store = AssetStore::new(pool.clone(), config.storage.root.clone());
    let cleanup = service::CleanupCoordinator::new(pool.clone(), store.clone());
    let services = Services::new(pool.clone(), store, cleanup);
    info!("Services initialized");

    // 5. Serve until shutdown
    let server = RelayCastServer::new(config, services);
    server.start().await
}

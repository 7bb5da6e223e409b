use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use common::staging::StagingArea;
use common::storage::build_media_store;
use tracing::{Level, info};

use server::config::AppConfig;
use server::database::init_db;
use server::service::PostService;
use server::state::AppState;
use server::store::SeaOrmPostStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = init_db(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    let media = build_media_store(&config.storage)
        .await
        .context("Failed to initialize media store")?;
    info!(backend = ?config.storage.backend, "Media store ready");

    let staging = StagingArea::new(config.staging.dir.clone(), config.staging.max_file_size)
        .await
        .context("Failed to create staging directory")?;

    let posts = PostService::new(
        Arc::new(SeaOrmPostStore::new(db.clone())),
        media,
        Duration::from_secs(config.storage.request_timeout_secs),
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let state = AppState {
        db,
        config: Arc::new(config),
        posts,
        staging,
    };

    let app = server::build_router(state);

    info!("Server running at http://{}", addr);
    info!("Swagger UI at http://{}/swagger-ui", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

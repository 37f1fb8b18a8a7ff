use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use voicelog::session::SessionManager;
use voicelog::{create_router, AppState, Config, TurnStore};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cfg = Config::load("config/voicelog")?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Turn store: {}", cfg.storage.db_path);
    info!("Recordings: {}", cfg.storage.recordings_dir);

    std::fs::create_dir_all(&cfg.storage.recordings_dir)?;
    let store = Arc::new(TurnStore::open(&cfg.storage.db_path)?);
    let manager = Arc::new(SessionManager::new(store));

    let state = AppState::new(manager, Arc::new(cfg.clone()));
    let app = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    info!("HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

//! boardsift API Server
//!
//! Run with: cargo run --bin boardsift-api
//!
//! # Configuration
//!
//! Read from `BOARDSIFT_CONFIG` if set, otherwise from the default locations
//! (`~/.config/boardsift/config.toml`, `./boardsift.toml`), then overridden by
//! environment variables:
//! - `BOARDSIFT_GATEWAY_URL`: Board gateway base URL
//! - `BOARDSIFT_ACCOUNT` / `BOARDSIFT_PASSWORD`: Credentials
//! - `BOARDSIFT_API_HOST`: Host to bind to (default: 127.0.0.1)
//! - `BOARDSIFT_API_PORT`: Port to listen on (default: 8086)
//! - `RUST_LOG`: Log filter (default: boardsift=info,tower_http=info)

use anyhow::Context;
use boardsift::api::{serve, AppState};
use boardsift::config::Config;
use boardsift::logging::init_logging;
use boardsift::query::QueryDispatcher;
use boardsift::source::{self, Credentials};
use std::path::Path;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::var_os("BOARDSIFT_CONFIG") {
        Some(path) => Config::load_with_env(Path::new(&path))?,
        None => Config::load_default(),
    };
    init_logging(&config.logging, false)?;

    tracing::info!("Starting boardsift API server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Board gateway: {}", config.source.base_url);

    let source = source::connect(&config.source)?;
    let credentials = Credentials::resolve(&config.credentials.file)
        .context("no credentials: set BOARDSIFT_ACCOUNT/BOARDSIFT_PASSWORD or a credentials file")?;
    let session = source.login(&credentials).await?;
    tracing::info!("Logged in as {}", session.account);

    let dispatcher = Arc::new(QueryDispatcher::with_policy(
        Arc::clone(&source),
        config.crawl.dispatcher_config(),
        Arc::new(config.crawl.stop_policy()),
    ));
    let state = AppState::new(dispatcher, session, config.api.clone());
    let session = Arc::clone(&state.session);

    let served = serve(state, &config.api).await;

    let session = session.lock().await.clone();
    match source.logout(session).await {
        Ok(()) => tracing::info!("Logged out"),
        Err(e) => tracing::warn!("Logout failed: {}", e),
    }

    served?;
    tracing::info!("boardsift API server stopped");
    Ok(())
}

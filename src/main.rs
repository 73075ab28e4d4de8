use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use focus_tracker::app::{AppState, build_router};
use focus_tracker::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,focus_tracker=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env();
    let addr = config.bind_addr();
    let data_path = config.data_path.clone();
    let app = build_router(AppState::new(config));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!("Server running at http://{addr}");
    info!("API base:     http://{addr}/api");
    info!(data = %data_path.display(), "using JSON store");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

//! Tiny HTTP endpoint that hosting platforms can ping to keep a bot awake.

use axum::{routing::get, Router};
use tokio::net::TcpListener;

use crate::config::KeepAliveConfig;

const BODY: &str = "bot is running";

pub fn router() -> Router {
    Router::new().route("/", get(alive))
}

async fn alive() -> &'static str {
    BODY
}

/// Binds the endpoint and serves it on a background task.
pub async fn spawn(config: &KeepAliveConfig) -> std::io::Result<()> {
    let listener = TcpListener::bind(&config.bind).await?;
    log::info!("keep-alive endpoint listening on {}", listener.local_addr()?);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router()).await {
            log::error!("keep-alive endpoint stopped: {}", e);
        }
    });

    Ok(())
}

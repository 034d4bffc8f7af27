//! Axum HTTP server for the Tier-1 registry and dispatcher.

use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::Result;

use super::handlers;
use super::state::SharedTier1State;

pub fn router(state: SharedTier1State) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route(
            "/api/v1/cloudlets/",
            get(handlers::list_cloudlets).post(handlers::report_cloudlet),
        )
        .route("/api/v1/deploy/{uuid}/{application_key}", post(handlers::deploy))
        .route("/api/v1/recipes/{uuid}", get(handlers::get_recipe))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(state: SharedTier1State, port: u16) -> Result<()> {
    let app = router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "tier1 listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

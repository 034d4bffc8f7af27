//! Axum HTTP server for the Tier-2 cluster adapter.

use std::net::SocketAddr;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::Result;

use super::handlers;
use super::state::SharedTier2State;

pub fn router(state: SharedTier2State) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/api/v1/livez", get(handlers::livez))
        .route("/api/v1/readyz", get(handlers::readyz))
        .route(
            "/api/v1/deploy/{uuid}/{application_key}",
            post(handlers::deploy_post)
                .get(handlers::deploy_get)
                .delete(handlers::deploy_delete),
        )
        .route("/api/v1/carbon", get(handlers::carbon))
        .route(
            "/api/v1/carbon-trace-timestamp",
            post(handlers::set_carbon_trace_timestamp),
        )
        .route("/api/v1/resu", get(handlers::resources))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(state: SharedTier2State, port: u16) -> Result<()> {
    let app = router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "tier2 listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

//! Tier-2 Request Surface (C10): deployment lifecycle, carbon reporting,
//! the experiment clock, and liveness/readiness.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};

use super::state::SharedTier2State;

pub async fn health() -> &'static str {
    "ok"
}

pub async fn metrics(State(state): State<SharedTier2State>) -> String {
    state.metrics.render()
}

pub async fn livez() -> StatusCode {
    StatusCode::OK
}

pub async fn readyz() -> StatusCode {
    StatusCode::OK
}

fn parse_path(uuid: &str, application_key: &str) -> Result<(Uuid, String)> {
    let uuid = Uuid::parse_str(uuid).map_err(|_| Error::BadRequest("malformed uuid".into()))?;
    if application_key.trim().is_empty() {
        return Err(Error::BadRequest("missing application key".into()));
    }
    Ok((uuid, application_key.to_string()))
}

pub async fn deploy_post(
    State(state): State<SharedTier2State>,
    Path((uuid, application_key)): Path<(String, String)>,
) -> Result<Json<Vec<Value>>> {
    let (recipe_uuid, application_key) = parse_path(&uuid, &application_key)?;

    let mut deployment = state
        .cluster
        .get(recipe_uuid, &application_key, true)
        .await?
        .ok_or_else(|| Error::Internal("cluster did not create deployment".into()))?;

    state.cluster.deploy(&mut deployment).await?;
    Ok(Json(vec![deployment.asdict(&state.tier2_url)]))
}

pub async fn deploy_get(
    State(state): State<SharedTier2State>,
    Path((uuid, application_key)): Path<(String, String)>,
) -> Result<Json<Value>> {
    let (recipe_uuid, application_key) = parse_path(&uuid, &application_key)?;
    let deployment = state
        .cluster
        .get(recipe_uuid, &application_key, false)
        .await?
        .ok_or_else(|| Error::NotFound("deployment not found".into()))?;
    Ok(Json(deployment.asdict(&state.tier2_url)))
}

pub async fn deploy_delete(
    State(state): State<SharedTier2State>,
    Path((uuid, application_key)): Path<(String, String)>,
) -> StatusCode {
    if let Ok((recipe_uuid, application_key)) = parse_path(&uuid, &application_key) {
        let _ = state.cluster.expire(recipe_uuid, &application_key).await;
    }
    StatusCode::NO_CONTENT
}

pub async fn carbon(State(state): State<SharedTier2State>) -> Result<Json<Value>> {
    let timestamp = state
        .carbon_trace_timestamp()
        .ok_or_else(|| Error::BadRequest("carbon_trace_timestamp not set".into()))?;
    let report = state
        .reporter
        .report(timestamp, state.rapl_sample_interval_seconds)
        .await?;
    state.metrics.carbon_reports_served.inc();
    Ok(Json(serde_json::to_value(report)?))
}

#[derive(Deserialize)]
pub struct CarbonTraceTimestampQuery {
    pub carbon_trace_timestamp: i64,
}

pub async fn set_carbon_trace_timestamp(
    State(state): State<SharedTier2State>,
    Query(query): Query<CarbonTraceTimestampQuery>,
) -> Result<StatusCode> {
    if query.carbon_trace_timestamp < 0 {
        return Err(Error::BadRequest("carbon_trace_timestamp must be >= 0".into()));
    }
    state.set_carbon_trace_timestamp(query.carbon_trace_timestamp);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn resources(State(state): State<SharedTier2State>) -> Json<Value> {
    let resources = state.cluster.get_resources().await;
    Json(serde_json::to_value(resources.0).unwrap_or_default())
}

//! Tier-1 Request Surface (C9): cloudlet ingest, cloudlet listing, match +
//! dispatch, and recipe lookup.

use std::io::Write;

use std::net::IpAddr;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::dispatch::{self, clamp_max_results};
use crate::error::{Error, Result};
use crate::matching::best_match;
use crate::model::{CloudletReport, CloudletSummary};

use super::state::SharedTier1State;

pub async fn health() -> &'static str {
    "ok"
}

pub async fn metrics(State(state): State<SharedTier1State>) -> String {
    state.metrics.render()
}

pub async fn report_cloudlet(
    State(state): State<SharedTier1State>,
    Json(body): Json<Value>,
) -> Result<axum::http::StatusCode> {
    if !body.is_object() || body.get("uuid").is_none() {
        return Err(Error::BadRequest("missing UUID".into()));
    }
    let report: CloudletReport = serde_json::from_value(body)?;
    report.resources.validate()?;
    let cloudlet = state.registry.upsert(report).await;
    state.metrics.cloudlet_registrations.inc();

    append_carbon_history(&state, &cloudlet).await?;

    Ok(axum::http::StatusCode::NO_CONTENT)
}

async fn append_carbon_history(
    state: &SharedTier1State,
    cloudlet: &crate::model::Cloudlet,
) -> Result<()> {
    let path = state.carbon_history_path.read().await.clone();
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let exists = path.exists();
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(&path)?;
    if !exists {
        writeln!(file, "unix_time,endpoint,carbon_intensity,energy_use,carbon_emission,cpu_ratio")?;
    }

    let r = &cloudlet.resources;
    writeln!(
        file,
        "{},{},{},{},{},{}",
        chrono::Utc::now().timestamp(),
        cloudlet.endpoint,
        r.carbon_intensity_gco2_kwh().map(|v| v.to_string()).unwrap_or_default(),
        r.energy_use_joules().map(|v| v.to_string()).unwrap_or_default(),
        r.carbon_emission_gco2().map(|v| v.to_string()).unwrap_or_default(),
        r.cpu_ratio().map(|v| v.to_string()).unwrap_or_default(),
    )?;
    Ok(())
}

pub async fn list_cloudlets(State(state): State<SharedTier1State>) -> Json<Vec<CloudletSummary>> {
    Json(state.registry.summaries().await)
}

#[derive(Deserialize)]
pub struct DeployQuery {
    #[serde(default)]
    pub results: Option<i64>,
}

/// Edge cloudlet requests arrive through a reverse proxy, so the client's
/// real address comes from `X-Forwarded-For` rather than the TCP peer.
fn client_ip(headers: &HeaderMap) -> IpAddr {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(IpAddr::from([0, 0, 0, 0]))
}

pub async fn deploy(
    State(state): State<SharedTier1State>,
    Path((uuid, application_key)): Path<(String, String)>,
    Query(query): Query<DeployQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<Value>>> {
    let recipe_uuid = Uuid::parse_str(&uuid).map_err(|_| Error::BadRequest("malformed uuid".into()))?;
    if application_key.trim().is_empty() {
        return Err(Error::BadRequest("missing application key".into()));
    }
    let max_results = clamp_max_results(query.results.unwrap_or(1));

    let recipe = state.recipes.from_uuid(recipe_uuid).await?;
    let ipaddress = client_ip(&headers);
    let client_info = crate::model::ClientInfo {
        ipaddress,
        location: state.geolocation.lookup(ipaddress),
        application_key: application_key.clone(),
    };

    let available = state.registry.snapshot().await;
    let candidates = best_match(&state.matchers, &client_info, &recipe, available, max_results);

    let results = dispatch::dispatch(
        &state.http,
        &candidates,
        recipe.uuid,
        &client_info,
        max_results,
        &state.metrics,
    )
    .await?;

    // Only a successful dispatch starts a fresh log, matching the
    // original's placement of this after the "all candidates failed"
    // check.
    if state.rotate_carbon_log {
        let new_path = std::path::PathBuf::from(format!("logs/{}.csv", chrono::Utc::now().timestamp()));
        info!(path = %new_path.display(), "rotating carbon history log");
        *state.carbon_history_path.write().await = new_path;
    }

    Ok(Json(results))
}

pub async fn get_recipe(
    State(state): State<SharedTier1State>,
    Path(uuid): Path<String>,
) -> Result<Json<Value>> {
    let uuid = Uuid::parse_str(&uuid).map_err(|_| Error::BadRequest("malformed uuid".into()))?;
    let recipe = state.recipes.from_uuid(uuid).await?;
    if recipe.restricted {
        return Err(Error::Forbidden("recipe is restricted".into()));
    }
    Ok(Json(recipe.asdict()))
}

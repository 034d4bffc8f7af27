//! Tier-2 background jobs: periodic resource+carbon reporting to every
//! known Tier-1 (C7), and cluster-side deployment expiry.

use std::time::Duration;

use tracing::{info, warn};

use super::state::SharedTier2State;

/// Only scheduled if `tier1_urls` is non-empty (checked by the caller).
pub fn spawn_reporting_job(state: SharedTier2State) {
    let interval_seconds = state.report_to_tier1_interval_seconds.max(1);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_seconds));
        loop {
            interval.tick().await;
            report_tick(&state).await;
        }
    });
}

async fn report_tick(state: &SharedTier2State) {
    let mut resources = state.cluster.get_resources().await;

    if let Some(timestamp) = state.carbon_trace_timestamp() {
        match state.reporter.report(timestamp, state.rapl_sample_interval_seconds).await {
            Ok(report) => {
                resources.merge_carbon_report(&report);
                state.metrics.carbon_reports_served.inc();
            }
            Err(e) => warn!(error = %e, "failed to compute carbon report for this tick"),
        }
    }

    let body = serde_json::json!({
        "uuid": state.uuid,
        "endpoint": state.tier2_url,
        "resources": resources.0,
        "locations": [state.geolocation],
    });

    for tier1_url in &state.tier1_urls {
        let url = format!("{}/api/v1/cloudlets/", tier1_url.trim_end_matches('/'));
        match state.http.post(&url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                info!(tier1 = %tier1_url, "reported resources");
            }
            Ok(response) => {
                warn!(tier1 = %tier1_url, status = %response.status(), "tier1 rejected report");
            }
            Err(e) => {
                warn!(tier1 = %tier1_url, error = %e, "failed to report to tier1");
            }
        }
    }
}

pub fn spawn_expiry_job(state: SharedTier2State) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            state
                .cluster
                .expire_inactive_deployments(chrono::Duration::seconds(300))
                .await;
        }
    });
}

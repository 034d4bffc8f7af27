//! Deployment Dispatcher (C6): fans a deploy request out to the top
//! candidates from the match pipeline and interleaves their results.

use serde_json::Value;
use tracing::warn;

use crate::error::{Error, Result};
use crate::metrics::Metrics;
use crate::model::{Cloudlet, ClientInfo};

pub const MIN_RESULTS: usize = 1;
pub const MAX_RESULTS: usize = 3;

pub fn clamp_max_results(requested: i64) -> usize {
    requested.clamp(MIN_RESULTS as i64, MAX_RESULTS as i64) as usize
}

/// `POST {cloudlet.endpoint}/api/v1/deploy/{uuid}/{application_key}`,
/// returning whatever JSON array of descriptors the cloudlet answers
/// with. A failed call yields an empty list rather than aborting dispatch.
async fn deploy_to_one(
    client: &reqwest::Client,
    cloudlet: &Cloudlet,
    recipe_uuid: uuid::Uuid,
    application_key: &str,
    metrics: &Metrics,
) -> Vec<Value> {
    let url = format!(
        "{}/api/v1/deploy/{}/{}",
        cloudlet.endpoint.trim_end_matches('/'),
        recipe_uuid,
        application_key
    );
    metrics.dispatch_attempts.inc();
    match client.post(&url).send().await {
        Ok(response) if response.status().is_success() => {
            let results = response.json::<Vec<Value>>().await.unwrap_or_default();
            if results.is_empty() {
                metrics.dispatch_failures.inc();
            } else {
                metrics.dispatch_successes.inc();
            }
            results
        }
        Ok(response) => {
            warn!(endpoint = %cloudlet.endpoint, status = %response.status(), "deploy call rejected");
            metrics.dispatch_failures.inc();
            Vec::new()
        }
        Err(e) => {
            warn!(endpoint = %cloudlet.endpoint, error = %e, "deploy call failed");
            metrics.dispatch_failures.inc();
            Vec::new()
        }
    }
}

/// Given the top candidates from the match pipeline, fire concurrent
/// deploy calls and interleave results positionally: result 0 of every
/// candidate, then result 1, etc., dropping candidates that ran dry,
/// truncated to `max_results`.
pub async fn dispatch(
    http: &reqwest::Client,
    candidates: &[Cloudlet],
    recipe_uuid: uuid::Uuid,
    client_info: &ClientInfo,
    max_results: usize,
    metrics: &Metrics,
) -> Result<Vec<Value>> {
    let calls = candidates.iter().map(|cloudlet| {
        deploy_to_one(http, cloudlet, recipe_uuid, &client_info.application_key, metrics)
    });
    let per_candidate: Vec<Vec<Value>> = futures::future::join_all(calls).await;

    let width = per_candidate.iter().map(Vec::len).max().unwrap_or(0);
    let mut interleaved = Vec::new();
    for i in 0..width {
        for results in &per_candidate {
            if let Some(value) = results.get(i) {
                interleaved.push(value.clone());
            }
        }
    }
    interleaved.truncate(max_results);

    if interleaved.is_empty() {
        return Err(Error::Internal("Something went wrong".into()));
    }
    Ok(interleaved)
}

//! Tier-1 background jobs: cloudlet TTL expiry (C4) and the experiment
//! timestamp broadcaster (C8).

use std::time::Duration;

use tracing::{info, warn};

use super::state::SharedTier1State;

pub fn spawn_expiry_job(state: SharedTier1State) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let before = state.registry.len().await;
            state.registry.expire_stale(state.cloudlet_expiry).await;
            let expired = before - state.registry.len().await;
            if expired > 0 {
                state.metrics.cloudlet_expirations.inc_by(expired as u64);
            }
        }
    });
}

/// Broadcasts the current carbon-trace timestamp to every known Tier-2,
/// then advances the timestamp unconditionally, win or lose.
pub fn spawn_broadcaster_job(state: SharedTier1State, interval_seconds: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_seconds.max(1)));
        loop {
            interval.tick().await;
            broadcast_tick(&state).await;
        }
    });
}

async fn broadcast_tick(state: &SharedTier1State) {
    let timestamp = state.current_timestamp();
    let cloudlets = state.registry.snapshot().await;

    for cloudlet in &cloudlets {
        let url = format!(
            "{}/api/v1/carbon-trace-timestamp?carbon_trace_timestamp={}",
            cloudlet.endpoint.trim_end_matches('/'),
            timestamp
        );
        if let Err(e) = state.http.post(&url).send().await {
            warn!(endpoint = %cloudlet.endpoint, error = %e, "failed to broadcast carbon trace timestamp");
        }
    }

    let advanced = state.advance_timestamp() + state.experiment_tick_rate_seconds;
    state.metrics.broadcast_ticks.inc();
    info!(
        broadcast = timestamp,
        next = advanced,
        cloudlets = cloudlets.len(),
        "broadcast carbon trace timestamp"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tier1Args;
    use clap::Parser;

    fn args() -> Tier1Args {
        Tier1Args::parse_from(["tier1"])
    }

    #[tokio::test]
    async fn broadcast_advances_timestamp_unconditionally() {
        let state = std::sync::Arc::new(super::super::state::Tier1State::new(&args()).unwrap());
        let before = state.current_timestamp();
        broadcast_tick(&state).await;
        assert_eq!(state.current_timestamp(), before + state.experiment_tick_rate_seconds);
    }
}

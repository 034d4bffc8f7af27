//! Energy Sampler (C2): average power / cumulative energy over a window,
//! via either RAPL hardware counters or a remote power-monitor endpoint.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerMeasureMethod {
    Rapl,
    Obelix,
}

/// Source of cumulative RAPL package/DRAM energy, abstracted so tests can
/// supply a fake counter instead of reading `/sys/class/powercap`.
#[async_trait]
pub trait RaplSource: Send + Sync {
    async fn snapshot_microjoules(&self) -> Result<u64>;
}

/// Reads the sum of `energy_uj` across every `intel-rapl:*` domain under
/// `/sys/class/powercap`, matching the original's "sum across domains of
/// energy(package, JOULES)".
pub struct SysfsRapl {
    powercap_root: PathBuf,
}

impl SysfsRapl {
    pub fn new() -> Self {
        Self {
            powercap_root: PathBuf::from("/sys/class/powercap"),
        }
    }

    pub fn with_root(powercap_root: PathBuf) -> Self {
        Self { powercap_root }
    }
}

impl Default for SysfsRapl {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RaplSource for SysfsRapl {
    async fn snapshot_microjoules(&self) -> Result<u64> {
        let mut total = 0u64;
        let mut entries = tokio::fs::read_dir(&self.powercap_root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if !name.to_string_lossy().starts_with("intel-rapl:") {
                continue;
            }
            let energy_path = entry.path().join("energy_uj");
            if let Ok(contents) = tokio::fs::read_to_string(&energy_path).await {
                if let Ok(value) = contents.trim().parse::<u64>() {
                    total += value;
                }
            }
        }
        Ok(total)
    }
}

pub struct EnergySampler {
    method: PowerMeasureMethod,
    rapl: Box<dyn RaplSource>,
    http: reqwest::Client,
    obelix_base_url: Option<String>,
    obelix_node_name: String,
}

impl EnergySampler {
    pub fn new(
        method: PowerMeasureMethod,
        obelix_base_url: Option<String>,
        obelix_node_name: String,
    ) -> Self {
        Self {
            method,
            rapl: Box::new(SysfsRapl::new()),
            http: reqwest::Client::new(),
            obelix_base_url,
            obelix_node_name,
        }
    }

    pub fn with_rapl_source(mut self, rapl: Box<dyn RaplSource>) -> Self {
        self.rapl = rapl;
        self
    }

    /// Always non-negative; returns `0.0` (with a logged warning) on
    /// sampling error rather than propagating it, so callers never abort
    /// the reporting loop on a sampling hiccup.
    pub async fn sample(&self, window_seconds: u64) -> f64 {
        let result = match self.method {
            PowerMeasureMethod::Rapl => self.sample_rapl(window_seconds).await,
            PowerMeasureMethod::Obelix => self.sample_obelix(window_seconds).await,
        };

        match result {
            Ok(joules) => joules.max(0.0),
            Err(e) => {
                warn!(error = %e, "energy sampling failed, reporting 0.0");
                0.0
            }
        }
    }

    async fn sample_rapl(&self, window_seconds: u64) -> Result<f64> {
        let before = self.rapl.snapshot_microjoules().await?;
        tokio::time::sleep(Duration::from_secs(window_seconds)).await;
        let after = self.rapl.snapshot_microjoules().await?;
        // Counters can wrap; treat a wrap as a zero-delta sample rather
        // than a huge bogus spike.
        let delta_uj = after.saturating_sub(before);
        Ok(delta_uj as f64 / 1_000_000.0)
    }

    async fn sample_obelix(&self, window_seconds: u64) -> Result<f64> {
        let base = self
            .obelix_base_url
            .as_deref()
            .ok_or_else(|| Error::Internal("obelix power-monitor base url not configured".into()))?;
        let url = format!(
            "{}/api/v1/monitor/{}/energy?tsec={}",
            base.trim_end_matches('/'),
            self.obelix_node_name,
            window_seconds
        );
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Upstream(format!(
                "power-monitor request failed: {}",
                response.status()
            )));
        }
        let body: Value = response.json().await?;
        body.get("data")
            .and_then(|d| d.get("eu"))
            .and_then(Value::as_f64)
            .ok_or_else(|| Error::Upstream("power-monitor response missing data.eu".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    struct FakeRapl {
        values: Arc<AtomicU64>,
        step: u64,
    }

    #[async_trait]
    impl RaplSource for FakeRapl {
        async fn snapshot_microjoules(&self) -> Result<u64> {
            Ok(self.values.fetch_add(self.step, Ordering::SeqCst))
        }
    }

    #[tokio::test]
    async fn rapl_sample_is_nonnegative_delta_in_joules() {
        let sampler = EnergySampler::new(PowerMeasureMethod::Rapl, None, "node".into())
            .with_rapl_source(Box::new(FakeRapl {
                values: Arc::new(AtomicU64::new(0)),
                step: 2_000_000,
            }));
        let joules = sampler.sample(0).await;
        assert!(joules >= 0.0);
        assert!((joules - 2.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn obelix_without_base_url_degrades_to_zero() {
        let sampler = EnergySampler::new(PowerMeasureMethod::Obelix, None, "node".into());
        assert_eq!(sampler.sample(5).await, 0.0);
    }
}

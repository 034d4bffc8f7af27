//! Process-wide state for the Tier-2 binary: the carbon trace/energy
//! pipeline, the cluster adapter, the recipe catalog, and this node's
//! static identity (uuid, endpoint, geolocation, zone).

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::carbon::{CarbonReporter, CarbonTraceStore, EnergySampler};
use crate::cluster::{ClusterAdapter, InMemoryCluster};
use crate::config::Tier2Args;
use crate::error::Result;
use crate::metrics::Metrics;
use crate::model::GeoPoint;

pub struct Tier2State {
    pub uuid: Uuid,
    pub tier2_url: String,
    pub tier1_urls: Vec<String>,
    pub geolocation: GeoPoint,
    pub zone: String,
    pub http: reqwest::Client,
    pub metrics: Metrics,
    pub trace: Arc<CarbonTraceStore>,
    pub reporter: CarbonReporter,
    pub cluster: Box<dyn ClusterAdapter>,
    /// `None` until the first `POST /api/v1/carbon-trace-timestamp`.
    pub carbon_trace_timestamp: AtomicI64,
    pub carbon_trace_timestamp_set: std::sync::atomic::AtomicBool,
    pub rapl_sample_interval_seconds: u64,
    pub report_to_tier1_interval_seconds: u64,
}

impl Tier2State {
    /// Fetches the carbon trace for `args.tier2_zone`, which is a fatal
    /// boot error on failure (see §11's Tier-2 config validation note).
    pub async fn bootstrap(args: &Tier2Args) -> Result<Self> {
        let geolocation = args.geolocation()?;
        let tier2_url = args
            .tier2_url
            .clone()
            .ok_or_else(|| crate::error::Error::Internal("SINFONIA_TIER2_URL is required".into()))?;

        let trace = Arc::new(CarbonTraceStore::empty());
        trace.fetch(&args.tier2_zone, &args.trace_github_repo_url).await?;

        let energy = EnergySampler::new(
            args.power_measure_method,
            args.prometheus.clone(),
            args.obelix_node_name.clone(),
        );
        let reporter = CarbonReporter::new(trace.clone(), energy);

        Ok(Self {
            uuid: Uuid::new_v4(),
            tier2_url,
            tier1_urls: args.tier1_urls.clone(),
            geolocation,
            zone: args.tier2_zone.clone(),
            http: reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?,
            metrics: Metrics::new(),
            trace,
            reporter,
            cluster: Box::new(InMemoryCluster::new(0.0)),
            carbon_trace_timestamp: AtomicI64::new(0),
            carbon_trace_timestamp_set: std::sync::atomic::AtomicBool::new(false),
            rapl_sample_interval_seconds: args.rapl_sample_interval_seconds,
            report_to_tier1_interval_seconds: args.report_to_tier1_interval_seconds,
        })
    }

    pub fn set_carbon_trace_timestamp(&self, timestamp: i64) {
        self.carbon_trace_timestamp.store(timestamp, Ordering::SeqCst);
        self.carbon_trace_timestamp_set.store(true, Ordering::SeqCst);
    }

    pub fn carbon_trace_timestamp(&self) -> Option<i64> {
        if self.carbon_trace_timestamp_set.load(Ordering::SeqCst) {
            Some(self.carbon_trace_timestamp.load(Ordering::SeqCst))
        } else {
            None
        }
    }

    /// Whether the reporting loop (C7) should run at all.
    pub fn reporting_enabled(&self) -> bool {
        !self.tier1_urls.is_empty()
    }
}

pub type SharedTier2State = Arc<Tier2State>;

//! Process-wide state for the Tier-1 binary: the cloudlet registry, the
//! configured match pipeline, the recipe catalog, and the shared HTTP
//! client and metrics registry. Built once in `main` and handed to every
//! request handler and background job by reference.

use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::config::Tier1Args;
use crate::error::Result;
use crate::geolocation::{GeoLookup, NoGeoLookup};
use crate::matching::{matcher_by_name, Matcher};
use crate::metrics::Metrics;
use crate::recipe::{RecipeCatalog, RecipeDirectory};
use crate::registry::CloudletRegistry;

pub struct Tier1State {
    pub registry: CloudletRegistry,
    pub matchers: Vec<Box<dyn Matcher>>,
    pub recipes: Box<dyn RecipeCatalog>,
    pub geolocation: Box<dyn GeoLookup>,
    pub http: reqwest::Client,
    pub metrics: Metrics,
    pub cloudlet_expiry: Duration,
    pub carbon_history_path: RwLock<PathBuf>,
    pub rotate_carbon_log: bool,
    pub carbon_trace_timestamp: AtomicI64,
    pub experiment_tick_rate_seconds: i64,
}

impl Tier1State {
    pub fn new(args: &Tier1Args) -> Result<Self> {
        let matchers = args
            .matchers
            .iter()
            .map(|name| matcher_by_name(name, args.log_carbon_intensity_decisions))
            .collect::<Result<Vec<_>>>()?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        let registry = match &args.cloudlets {
            Some(path) => {
                let body = std::fs::read_to_string(path)?;
                let preseeded: Vec<crate::model::Cloudlet> = serde_json::from_str(&body)?;
                CloudletRegistry::from_cloudlets(preseeded)
            }
            None => CloudletRegistry::new(),
        };

        Ok(Self {
            registry,
            matchers,
            recipes: Box::new(RecipeDirectory::new(args.recipes.clone())),
            geolocation: Box::new(NoGeoLookup),
            http,
            metrics: Metrics::new(),
            cloudlet_expiry: Duration::from_secs(args.cloudlet_expiry_seconds),
            carbon_history_path: RwLock::new(PathBuf::from("logs/cloudlets_carbon_history.csv")),
            rotate_carbon_log: args.rotate_carbon_log,
            carbon_trace_timestamp: AtomicI64::new(args.carbon_trace_timestamp),
            experiment_tick_rate_seconds: args.experiment_tick_rate_seconds,
        })
    }

    pub fn current_timestamp(&self) -> i64 {
        self.carbon_trace_timestamp.load(Ordering::SeqCst)
    }

    pub fn advance_timestamp(&self) -> i64 {
        self.carbon_trace_timestamp
            .fetch_add(self.experiment_tick_rate_seconds, Ordering::SeqCst)
    }
}

pub type SharedTier1State = Arc<Tier1State>;

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[tokio::test]
    async fn cloudlets_file_preseeds_the_registry() {
        let dir = tempfile::tempdir().unwrap();
        let cloudlet_uuid = uuid::Uuid::new_v4();
        let cloudlets_path = dir.path().join("cloudlets.json");
        tokio::fs::write(
            &cloudlets_path,
            format!(
                r#"[{{"uuid":"{cloudlet_uuid}","name":"seed","endpoint":"http://seed","last_update":"2024-01-01T00:00:00Z","local_networks":[],"accepted_clients":[],"rejected_clients":[],"locations":[],"resources":{{}}}}]"#
            ),
        )
        .await
        .unwrap();

        let args = Tier1Args::parse_from([
            "tier1",
            "--cloudlets",
            cloudlets_path.to_str().unwrap(),
            "--recipes",
            dir.path().to_str().unwrap(),
        ]);
        let state = Tier1State::new(&args).unwrap();
        assert_eq!(state.registry.len().await, 1);
        assert!(state.registry.get(cloudlet_uuid).await.is_some());
    }
}

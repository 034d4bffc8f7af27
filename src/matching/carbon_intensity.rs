//! Carbon-intensity matcher: yields cloudlets ordered from lowest to
//! highest reported carbon intensity. Optionally appends each decision to
//! a debug log for offline analysis.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use tracing::{debug, warn};

use super::Matcher;
use crate::model::{Cloudlet, ClientInfo, DeploymentRecipe};

const DECISION_LOG_PATH: &str = "logs/carbon_intensity.csv";
const DECISION_LOG_HEADER: &str = "timestamp,names,carbon_intensity_gco2_per_kwh";

pub struct CarbonIntensityMatcher {
    log_decisions: bool,
    log_path: PathBuf,
}

impl CarbonIntensityMatcher {
    pub fn new(log_decisions: bool) -> Self {
        Self {
            log_decisions,
            log_path: PathBuf::from(DECISION_LOG_PATH),
        }
    }

    fn log_decision(&self, cloudlets: &[Cloudlet]) {
        if !self.log_decisions {
            return;
        }
        if let Some(parent) = self.log_path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(error = %e, "could not create carbon-intensity log directory");
                return;
            }
        }

        let is_new = !self.log_path.exists();
        let file = OpenOptions::new().create(true).append(true).open(&self.log_path);
        let Ok(mut file) = file else {
            warn!("could not open carbon-intensity decision log");
            return;
        };
        if is_new {
            let _ = writeln!(file, "{DECISION_LOG_HEADER}");
        }

        let timestamp = chrono::Utc::now().timestamp();
        let names: Vec<&str> = cloudlets.iter().map(|c| c.name.as_str()).collect();
        let intensities: Vec<String> = cloudlets
            .iter()
            .map(|c| {
                c.resources
                    .carbon_intensity_gco2_kwh()
                    .map(|v| v.to_string())
                    .unwrap_or_default()
            })
            .collect();
        let _ = writeln!(
            file,
            "{timestamp},\"{}\",\"{}\"",
            names.join(";"),
            intensities.join(";")
        );
    }
}

impl Matcher for CarbonIntensityMatcher {
    fn run(
        &self,
        _client: &ClientInfo,
        _recipe: &DeploymentRecipe,
        candidates: &mut Vec<Cloudlet>,
    ) -> Vec<Cloudlet> {
        debug!("carbon intensity matcher");
        let mut sorted = std::mem::take(candidates);
        sorted.sort_by(|a, b| {
            let ai = a.resources.carbon_intensity_gco2_kwh().unwrap_or(f64::INFINITY);
            let bi = b.resources.carbon_intensity_gco2_kwh().unwrap_or(f64::INFINITY);
            ai.partial_cmp(&bi).unwrap_or(std::cmp::Ordering::Equal)
        });
        self.log_decision(&sorted);
        sorted
    }
}

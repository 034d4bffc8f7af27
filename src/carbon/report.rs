//! Carbon Reporter (C3): combines a trace lookup (C1) with an energy
//! sample (C2) into the `{carbon_intensity, energy_use, carbon_emission}`
//! triple Tier-2 attaches to its resource reports.

use std::sync::Arc;

use crate::carbon::energy::EnergySampler;
use crate::carbon::trace::CarbonTraceStore;
use crate::error::Result;
use crate::model::CarbonReport;

pub struct CarbonReporter {
    trace: Arc<CarbonTraceStore>,
    energy: EnergySampler,
}

impl CarbonReporter {
    pub fn new(trace: Arc<CarbonTraceStore>, energy: EnergySampler) -> Self {
        Self { trace, energy }
    }

    /// `timestamp` is the synthetic experiment clock (see the Tier-1
    /// broadcaster, C8), not wall-clock time; `window_seconds` bounds the
    /// energy sample.
    pub async fn report(&self, timestamp: i64, window_seconds: u64) -> Result<CarbonReport> {
        let carbon_intensity_gco2_kwh = self.trace.average_intensity(timestamp).await?;
        let energy_use_joules = self.energy.sample(window_seconds).await;
        Ok(CarbonReport::new(carbon_intensity_gco2_kwh, energy_use_joules))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::carbon::energy::PowerMeasureMethod;

    #[tokio::test]
    async fn report_combines_trace_and_energy() {
        let trace = Arc::new(CarbonTraceStore::empty());
        trace
            .load_csv("timestamp,carbon_intensity_avg\n0,100.0\n100,200.0\n")
            .await
            .unwrap();
        let energy = EnergySampler::new(PowerMeasureMethod::Obelix, None, "node".into());

        let report = CarbonReporter::new(trace, energy).report(0, 1).await.unwrap();
        assert_eq!(report.carbon_intensity_gco2_kwh, 100.0);
        assert_eq!(report.energy_use_joules, 0.0);
        assert_eq!(report.carbon_emission_gco2, 0.0);
    }
}

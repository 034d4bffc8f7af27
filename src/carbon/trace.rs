//! Carbon Trace Store (C1): an in-memory, zone-scoped, time-indexed table
//! of historical carbon intensity, loaded once from an upstream CSV.

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TraceRow {
    pub timestamp_unix: i64,
    pub carbon_intensity_gco2_kwh: f64,
}

/// Per-process carbon trace cache. Empty until `fetch` succeeds; every
/// read before that returns `Error::NotFound`.
pub struct CarbonTraceStore {
    rows: RwLock<Vec<TraceRow>>,
}

impl CarbonTraceStore {
    pub fn empty() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Replace the in-memory table from `{repo_url}/{zone}.csv`. Expects a
    /// header row containing `timestamp` and either
    /// `carbon_intensity_gco2_kwh_direct` or `carbon_intensity_avg`.
    pub async fn fetch(&self, zone: &str, repo_url: &str) -> Result<()> {
        let url = format!("{}/{}.csv", repo_url.trim_end_matches('/'), zone);
        let response = reqwest::get(&url).await?;
        if !response.status().is_success() {
            return Err(Error::Upstream(format!(
                "carbon trace fetch for zone {zone} failed: {}",
                response.status()
            )));
        }
        let body = response.text().await?;
        let rows = parse_trace_csv(&body)?;
        if rows.is_empty() {
            return Err(Error::Upstream(format!("carbon trace for zone {zone} is empty")));
        }

        info!(zone, rows = rows.len(), "loaded carbon trace");
        *self.rows.write().await = rows;
        Ok(())
    }

    /// Load directly from a local CSV body (used by tests and by
    /// deployments that mirror the trace to disk instead of fetching it
    /// per boot).
    pub async fn load_csv(&self, body: &str) -> Result<()> {
        let rows = parse_trace_csv(body)?;
        if rows.is_empty() {
            return Err(Error::Upstream("carbon trace is empty".into()));
        }
        *self.rows.write().await = rows;
        Ok(())
    }

    pub async fn bounds(&self) -> Result<(i64, i64)> {
        let rows = self.rows.read().await;
        let first = rows.first().ok_or_else(|| Error::NotFound("carbon trace not loaded".into()))?;
        let last = rows.last().expect("non-empty checked by first");
        Ok((first.timestamp_unix, last.timestamp_unix))
    }

    /// Average carbon intensity for the row whose timestamp is the
    /// greatest `<= timestamp`, after normalizing `timestamp` into the
    /// trace's range. Matches the original's
    /// `incr = timestamp % (end - start); timestamp = start + incr`.
    pub async fn average_intensity(&self, timestamp: i64) -> Result<f64> {
        let rows = self.rows.read().await;
        if rows.is_empty() {
            return Err(Error::NotFound("carbon trace not loaded".into()));
        }

        let start = rows.first().unwrap().timestamp_unix;
        let end = rows.last().unwrap().timestamp_unix;
        let span = end - start;

        let normalized = if span <= 0 {
            start
        } else {
            start + timestamp.rem_euclid(span)
        };

        // Greatest row with timestamp <= normalized; partition_point finds
        // the first row with timestamp > normalized.
        let idx = rows.partition_point(|r| r.timestamp_unix <= normalized);
        let row = if idx == 0 {
            warn!(timestamp, normalized, "timestamp before trace start, using first row");
            rows.first().unwrap()
        } else {
            &rows[idx - 1]
        };

        Ok(row.carbon_intensity_gco2_kwh)
    }
}

fn parse_trace_csv(body: &str) -> Result<Vec<TraceRow>> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(body.as_bytes());
    let headers = reader.headers()?.clone();

    let ts_idx = headers
        .iter()
        .position(|h| h == "timestamp")
        .ok_or_else(|| Error::Upstream("carbon trace missing 'timestamp' column".into()))?;
    let ci_idx = headers
        .iter()
        .position(|h| h == "carbon_intensity_gco2_kwh_direct" || h == "carbon_intensity_avg")
        .ok_or_else(|| Error::Upstream("carbon trace missing carbon intensity column".into()))?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let timestamp_unix: i64 = record
            .get(ts_idx)
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| Error::Upstream("carbon trace row has invalid timestamp".into()))?;
        let carbon_intensity_gco2_kwh: f64 = record
            .get(ci_idx)
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| Error::Upstream("carbon trace row has invalid intensity".into()))?;
        rows.push(TraceRow {
            timestamp_unix,
            carbon_intensity_gco2_kwh,
        });
    }
    rows.sort_by_key(|r| r.timestamp_unix);
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "timestamp,carbon_intensity_gco2_kwh_direct\n100,50.0\n200,80.0\n300,120.0\n";

    #[tokio::test]
    async fn lookup_wraps_timestamp_not_offset_from_start() {
        let store = CarbonTraceStore::empty();
        store.load_csv(SAMPLE).await.unwrap();

        // span = 200; normalized = start + (timestamp mod span), so the
        // timestamp itself wraps mod span rather than its offset from
        // start. timestamp 0 -> normalized 100 + (0 mod 200) = 100.
        assert_eq!(store.average_intensity(0).await.unwrap(), 50.0);
        // timestamp 100 -> normalized 100 + (100 mod 200) = 200.
        assert_eq!(store.average_intensity(100).await.unwrap(), 80.0);
        // timestamp 300 -> normalized 100 + (300 mod 200) = 200.
        assert_eq!(store.average_intensity(300).await.unwrap(), 80.0);
    }

    #[tokio::test]
    async fn lookup_wraps_before_start() {
        let store = CarbonTraceStore::empty();
        store.load_csv(SAMPLE).await.unwrap();

        // timestamp 50 -> normalized 100 + (50 mod 200) = 150 -> row at 100.
        assert_eq!(store.average_intensity(50).await.unwrap(), 50.0);
    }

    #[tokio::test]
    async fn bounds_reports_first_and_last() {
        let store = CarbonTraceStore::empty();
        store.load_csv(SAMPLE).await.unwrap();
        assert_eq!(store.bounds().await.unwrap(), (100, 300));
    }

    #[tokio::test]
    async fn empty_store_is_not_found() {
        let store = CarbonTraceStore::empty();
        assert!(store.average_intensity(0).await.is_err());
    }
}

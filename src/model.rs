//! Core data model shared across both tiers: cloudlets, client requests,
//! deployment recipes, and carbon reports.

use std::collections::BTreeMap;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};

/// A latitude/longitude pair, validated on construction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(Error::BadRequest(format!("latitude {lat} out of range")));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(Error::BadRequest(format!("longitude {lon} out of range")));
        }
        Ok(Self { lat, lon })
    }

    /// Great-circle distance in kilometers (haversine formula, mean Earth
    /// radius 6371 km).
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        const EARTH_RADIUS_KM: f64 = 6371.0;

        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = (other.lat - self.lat).to_radians();
        let dlon = (other.lon - self.lon).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();
        EARTH_RADIUS_KM * c
    }
}

/// Free-form resource bundle. Always carries the well-known carbon/CPU
/// fields when they are known, but preserves any other key a Tier-2 chose
/// to report.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Resources(pub BTreeMap<String, Value>);

impl Resources {
    pub fn cpu_ratio(&self) -> Option<f64> {
        self.0.get("cpu_ratio").and_then(Value::as_f64)
    }

    pub fn carbon_intensity_gco2_kwh(&self) -> Option<f64> {
        self.0.get("carbon_intensity_gco2_kwh").and_then(Value::as_f64)
    }

    pub fn energy_use_joules(&self) -> Option<f64> {
        self.0.get("energy_use_joules").and_then(Value::as_f64)
    }

    pub fn carbon_emission_gco2(&self) -> Option<f64> {
        self.0.get("carbon_emission_gco2").and_then(Value::as_f64)
    }

    pub fn merge_carbon_report(&mut self, report: &CarbonReport) {
        self.0.insert(
            "carbon_intensity_gco2_kwh".to_string(),
            Value::from(report.carbon_intensity_gco2_kwh),
        );
        self.0.insert(
            "energy_use_joules".to_string(),
            Value::from(report.energy_use_joules),
        );
        self.0.insert(
            "carbon_emission_gco2".to_string(),
            Value::from(report.carbon_emission_gco2),
        );
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(ratio) = self.cpu_ratio() {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(Error::BadRequest(format!(
                    "cpu_ratio {ratio} out of range [0,1]"
                )));
            }
        }
        Ok(())
    }
}

/// A Tier-2 edge node as known to a Tier-1 registry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cloudlet {
    pub uuid: Uuid,
    #[serde(default)]
    pub name: String,
    pub endpoint: String,
    #[serde(default = "Utc::now")]
    pub last_update: DateTime<Utc>,
    #[serde(default)]
    pub local_networks: Vec<IpNet>,
    #[serde(default)]
    pub accepted_clients: Vec<IpNet>,
    #[serde(default)]
    pub rejected_clients: Vec<IpNet>,
    #[serde(default)]
    pub locations: Vec<GeoPoint>,
    #[serde(default)]
    pub resources: Resources,
}

impl Cloudlet {
    /// Nearest reported location to `point`, if the cloudlet reported any.
    pub fn distance_from(&self, point: &GeoPoint) -> Option<f64> {
        self.locations
            .iter()
            .map(|loc| loc.distance_km(point))
            .fold(None, |acc, d| match acc {
                None => Some(d),
                Some(best) if d < best => Some(d),
                Some(best) => Some(best),
            })
    }

    /// The projection returned by `GET /api/v1/cloudlets/`.
    pub fn summary(&self) -> CloudletSummary {
        CloudletSummary {
            uuid: self.uuid,
            endpoint: self.endpoint.clone(),
            locations: self.locations.clone(),
            resources: self.resources.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CloudletSummary {
    pub uuid: Uuid,
    pub endpoint: String,
    pub locations: Vec<GeoPoint>,
    pub resources: Resources,
}

/// Body of `POST /api/v1/cloudlets/`.
#[derive(Clone, Debug, Deserialize)]
pub struct CloudletReport {
    pub uuid: Uuid,
    #[serde(default)]
    pub name: String,
    pub endpoint: String,
    #[serde(default)]
    pub resources: Resources,
    #[serde(default)]
    pub locations: Vec<GeoPoint>,
    #[serde(default)]
    pub local_networks: Vec<IpNet>,
    #[serde(default)]
    pub accepted_clients: Vec<IpNet>,
    #[serde(default)]
    pub rejected_clients: Vec<IpNet>,
}

/// A client deployment request, derived from the incoming HTTP request.
#[derive(Clone, Debug)]
pub struct ClientInfo {
    pub ipaddress: IpAddr,
    pub location: Option<GeoPoint>,
    pub application_key: String,
}

/// An immutable, catalog-loaded deployment recipe (C11).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeploymentRecipe {
    pub uuid: Uuid,
    pub restricted: bool,
    pub chart_ref: String,
}

impl DeploymentRecipe {
    pub fn asdict(&self) -> Value {
        serde_json::json!({
            "uuid": self.uuid,
            "restricted": self.restricted,
            "chart_ref": self.chart_ref,
        })
    }
}

/// `{carbon_intensity, energy_use, carbon_emission}` triple (C3's output).
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CarbonReport {
    pub carbon_intensity_gco2_kwh: f64,
    pub energy_use_joules: f64,
    pub carbon_emission_gco2: f64,
}

impl CarbonReport {
    /// `ce = ci * joules_to_kwh(eu)`, with `joules_to_kwh(j) = j / 3.6e6`.
    pub fn new(carbon_intensity_gco2_kwh: f64, energy_use_joules: f64) -> Self {
        Self {
            carbon_intensity_gco2_kwh,
            energy_use_joules,
            carbon_emission_gco2: carbon_intensity_gco2_kwh * joules_to_kwh(energy_use_joules),
        }
    }
}

pub fn joules_to_kwh(joules: f64) -> f64 {
    joules / 3.6e6
}

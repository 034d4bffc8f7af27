//! Location matcher: yields cloudlets ordered by proximity to the client,
//! dropping anything further than `MAX_DISTANCE_KM` and leaving cloudlets
//! with no reported location untouched for later stages.

use tracing::warn;

use super::Matcher;
use crate::model::{Cloudlet, ClientInfo, DeploymentRecipe};

const MAX_DISTANCE_KM: f64 = 1000.0;

pub struct LocationMatcher;

impl Matcher for LocationMatcher {
    fn run(
        &self,
        client: &ClientInfo,
        _recipe: &DeploymentRecipe,
        candidates: &mut Vec<Cloudlet>,
    ) -> Vec<Cloudlet> {
        let Some(location) = client.location else {
            warn!("client has no location, location matcher yields nothing");
            return Vec::new();
        };

        let mut by_distance: Vec<(f64, Cloudlet)> = candidates
            .iter()
            .filter_map(|c| c.distance_from(&location).map(|d| (d, c.clone())))
            .collect();

        if by_distance.is_empty() {
            return Vec::new();
        }

        by_distance.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

        let mut yielded = Vec::new();
        let mut consumed = std::collections::HashSet::new();
        for (distance_km, cloudlet) in by_distance {
            consumed.insert(cloudlet.uuid);
            if distance_km > MAX_DISTANCE_KM {
                continue;
            }
            yielded.push(cloudlet);
        }

        candidates.retain(|c| !consumed.contains(&c.uuid));
        yielded
    }
}

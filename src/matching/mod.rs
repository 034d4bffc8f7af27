//! Match-function pipeline (C5): an ordered sequence of stages that
//! filter, reorder, and winnow a shared candidate list down to the
//! cloudlets a deployment request should be dispatched to.
//!
//! Each stage owns the candidate list for its turn: it removes whichever
//! cloudlets it yields or rejects, and leaves the rest for the next
//! stage. Order between stages matters; so does order within a stage's
//! output, since the dispatcher (C6) treats earlier candidates as
//! higher-priority.

pub mod carbon_intensity;
pub mod location;
pub mod network;
pub mod random;

use crate::error::{Error, Result};
use crate::model::{Cloudlet, ClientInfo, DeploymentRecipe};

pub trait Matcher: Send + Sync {
    /// Consume whichever of `candidates` this stage has an opinion about
    /// and return the ones it yields, in priority order. Cloudlets that
    /// are neither yielded nor rejected stay in `candidates` for the next
    /// stage.
    fn run(
        &self,
        client: &ClientInfo,
        recipe: &DeploymentRecipe,
        candidates: &mut Vec<Cloudlet>,
    ) -> Vec<Cloudlet>;
}

pub fn matcher_by_name(
    name: &str,
    log_carbon_intensity_decisions: bool,
) -> Result<Box<dyn Matcher>> {
    match name {
        "network" => Ok(Box::new(network::NetworkMatcher)),
        "location" => Ok(Box::new(location::LocationMatcher)),
        "carbon-intensity" => Ok(Box::new(carbon_intensity::CarbonIntensityMatcher::new(
            log_carbon_intensity_decisions,
        ))),
        "random" => Ok(Box::new(random::RandomMatcher)),
        other => Err(Error::Internal(format!("unknown match function '{other}'"))),
    }
}

/// Run every matcher in order against `candidates`, stopping once enough
/// results have been produced to satisfy `max_results`.
pub fn best_match(
    matchers: &[Box<dyn Matcher>],
    client: &ClientInfo,
    recipe: &DeploymentRecipe,
    mut candidates: Vec<Cloudlet>,
    max_results: usize,
) -> Vec<Cloudlet> {
    let mut results = Vec::new();
    for matcher in matchers {
        if results.len() >= max_results {
            break;
        }
        let yielded = matcher.run(client, recipe, &mut candidates);
        results.extend(yielded);
    }
    results.truncate(max_results);
    results
}

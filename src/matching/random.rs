//! Random matcher: shuffles whatever is left and yields it all, usually
//! placed last in the pipeline as a tie-breaker.

use rand::seq::SliceRandom;
use tracing::debug;

use super::Matcher;
use crate::model::{Cloudlet, ClientInfo, DeploymentRecipe};

pub struct RandomMatcher;

impl Matcher for RandomMatcher {
    fn run(
        &self,
        _client: &ClientInfo,
        _recipe: &DeploymentRecipe,
        candidates: &mut Vec<Cloudlet>,
    ) -> Vec<Cloudlet> {
        debug!("random matcher");
        let mut remaining = std::mem::take(candidates);
        remaining.shuffle(&mut rand::thread_rng());
        remaining
    }
}

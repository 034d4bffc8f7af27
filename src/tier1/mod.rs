//! Tier-1: cloudlet registry, match + dispatch request surface (C9),
//! and its background jobs (C4 expiry, C8 broadcaster).

pub mod handlers;
pub mod jobs;
pub mod server;
pub mod state;

pub use state::{SharedTier1State, Tier1State};

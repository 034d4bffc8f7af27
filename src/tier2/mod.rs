//! Tier-2: deployment lifecycle + carbon request surface (C10), and its
//! background jobs (C7 reporting loop, deployment expiry).

pub mod handlers;
pub mod jobs;
pub mod server;
pub mod state;

pub use state::{SharedTier2State, Tier2State};

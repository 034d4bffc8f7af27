//! Tier-1 registry and dispatcher entry point.

use std::sync::Arc;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cloudlet_mesh::config::Tier1Args;
use cloudlet_mesh::tier1::{self, Tier1State};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let args = Tier1Args::parse();
    info!(port = args.port, matchers = ?args.matchers, "starting cloudlet-mesh tier1");

    let state = Arc::new(Tier1State::new(&args)?);

    tier1::jobs::spawn_expiry_job(state.clone());
    tier1::jobs::spawn_broadcaster_job(state.clone(), args.experiment_broadcast_interval_seconds);

    tier1::server::run(state, args.port).await?;
    Ok(())
}

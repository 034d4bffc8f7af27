//! Tier-2 cluster adapter entry point.

use std::sync::Arc;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cloudlet_mesh::config::Tier2Args;
use cloudlet_mesh::tier2::{self, Tier2State};

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

    let args = Tier2Args::parse();
    info!(port = args.port, zone = %args.tier2_zone, "starting cloudlet-mesh tier2");

    let state = Arc::new(Tier2State::bootstrap(&args).await?);
    info!("loaded carbon trace for zone {}", args.tier2_zone);

    tier2::jobs::spawn_expiry_job(state.clone());
    if state.reporting_enabled() {
        tier2::jobs::spawn_reporting_job(state.clone());
    } else {
        info!("no tier1_urls configured, reporting loop disabled");
    }

    tier2::server::run(state, args.port).await?;
    Ok(())
}

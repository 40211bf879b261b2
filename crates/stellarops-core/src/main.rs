//! Entry point for the StellarOps control-plane core: loads configuration,
//! bootstraps every component, and runs until signaled to stop.

use clap::Parser;
use std::sync::Arc;
use stellarops_core::config::AppConfig;
use stellarops_core::System;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "stellarops-core", about = "StellarOps space-operations control plane")]
struct Args {
    /// Path to a config file, without extension (searched as `<name>.toml`).
    /// Unused for now: `AppConfig::load` always looks for `StellarOps.toml`
    /// in the working directory; kept as recognized CLI surface for when a
    /// configurable search path lands.
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("stellarops=info".parse()?))
        .init();

    let config = AppConfig::load()?;
    tracing::info!(?config, "configuration loaded");

    let (system, readiness) = System::bootstrap(config);
    for (component, ready) in &readiness.entries {
        tracing::info!(component, ready, "component started");
    }
    if !readiness.all_ready() {
        anyhow::bail!("one or more components failed to start");
    }

    let system = Arc::new(system);
    let handles = system.spawn_background_tasks();
    tracing::info!(tasks = handles.len(), "background tasks running");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");

    for handle in handles {
        handle.abort();
    }

    Ok(())
}

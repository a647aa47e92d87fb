//! Rightsguard daemon.
//!
//! Runs the compliance monitor and the inbound event consumer until
//! interrupted.
//!
//! Usage:
//!   rightsguardd --config rightsguard.toml
//!   rightsguardd --generate-seed

use anyhow::{Context, Result};
use clap::Parser;
use rightsguard_license::{generate_seed, Ed25519Sealer};
use rightsguard_service::{init_tracing, GuardConfig, Rightsguard};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "rightsguardd")]
#[command(about = "Rightsguard license monitoring daemon")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "rightsguard.toml")]
    config: PathBuf,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Print a fresh Ed25519 signing seed and its public key, then exit
    #[arg(long)]
    generate_seed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if args.generate_seed {
        let seed = generate_seed();
        let sealer = Ed25519Sealer::from_seed(&seed);
        println!("seed_hex   = \"{}\"", hex::encode(seed));
        println!("public_key = \"{}\"", hex::encode(sealer.public_key()));
        return Ok(());
    }

    let logging = init_tracing(if args.verbose { "debug" } else { "info" });
    let config = GuardConfig::load_from(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(logging) = logging.filter(|_| !args.verbose) {
        logging.set_filter(&config.logging.filter);
    }

    let mut service = Rightsguard::from_config(&config).context("starting service")?;
    service.start_monitor();
    info!("Platforms: {:?}", service.platforms());

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("Shutting down...");
    service.shutdown().await;
    Ok(())
}

// src/main.rs
//
// CLI entry point. Three subcommands mirror the three independent
// processes that share the store and alerts file: `tail` runs only the
// ingester, `monitor` runs only the periodic scheduler, `analyze` runs a
// single on-demand pass. None of this process's failure modes are fatal
// to a long-running deployment — configuration errors are the only thing
// that exit non-zero.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use beaconwatch::alerts::AlertsFile;
use beaconwatch::config::AppConfig;
use beaconwatch::enrich::IpNeighResolver;
use beaconwatch::ingest::FlowIngester;
use beaconwatch::scheduler::AnalysisScheduler;
use beaconwatch::store::postgres::PostgresStore;

#[derive(Debug, Parser)]
#[command(name = "beaconwatch", about = "C2 beacon detection over flow records")]
struct Cli {
    /// Path to the INI configuration file.
    #[arg(short, long, default_value = "/etc/beaconwatch/config.ini")]
    config: PathBuf,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Tail the conn log and ingest new flow records forever.
    Tail,
    /// Run the periodic analysis scheduler forever.
    Monitor,
    /// Run a single analysis pass over the trailing window and exit.
    Analyze {
        /// Window length in seconds, overriding the configured default.
        #[arg(long)]
        window_secs: Option<i64>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,beaconwatch=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;

    match cli.mode {
        Mode::Tail => run_tail(&config).await,
        Mode::Monitor => run_monitor(&config).await,
        Mode::Analyze { window_secs } => run_analyze(&config, window_secs).await,
    }
}

async fn run_tail(config: &AppConfig) -> Result<()> {
    info!(path = %config.paths.conn_log.display(), "starting flow ingester");
    let store = Arc::new(PostgresStore::connect(&config.database).await?);
    let ingester = FlowIngester::new(config.paths.conn_log.clone());
    ingester
        .run(store, Duration::from_secs(1))
        .await
        .context("flow ingester exited")?;
    Ok(())
}

async fn run_monitor(config: &AppConfig) -> Result<()> {
    info!(interval_secs = config.analysis.interval_secs, "starting analysis scheduler");
    let store = Arc::new(PostgresStore::connect(&config.database).await?);
    let alerts = AlertsFile::new(config.paths.alerts_file.clone());
    let scheduler =
        AnalysisScheduler::new(store.clone(), store, alerts).with_resolver(Arc::new(IpNeighResolver));
    scheduler.run_forever(&config.analysis).await
}

async fn run_analyze(config: &AppConfig, window_secs: Option<i64>) -> Result<()> {
    let store = Arc::new(PostgresStore::connect(&config.database).await?);
    let alerts = AlertsFile::new(config.paths.alerts_file.clone());
    let scheduler =
        AnalysisScheduler::new(store.clone(), store, alerts).with_resolver(Arc::new(IpNeighResolver));
    // 5-minute default window for the on-demand pass.
    let window = window_secs.unwrap_or(5 * 60);
    let detections = scheduler.run_once(window).await?;
    let detected = detections.iter().filter(|d| d.detected).count();
    info!(hosts = detections.len(), detected, "analysis pass complete");
    Ok(())
}

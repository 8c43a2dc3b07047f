//! devstatus: track engineering-readiness checklists from developer-tool events
//!
//! Drives the dashboard service from the command line:
//! - Replay recorded events and watch statuses move
//! - Record manual updates and comments
//! - Show the board for an environment and export reports

mod cli;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{debug, info};

use checklist::Catalog;
use devstatus_agent::AnalyzerSettings;
use devstatus_engine::{DashboardService, EngineConfig};

use cli::Commands;

#[derive(Parser)]
#[command(name = "devstatus")]
#[command(about = "Engineering-readiness checklist tracker")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "DEVSTATUS_CONFIG", default_value = "devstatus.yaml")]
    config: PathBuf,

    /// Data directory (state is kept in memory when unset)
    #[arg(short, long, env = "DEVSTATUS_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// API key for the completion analyzer
    #[arg(long, env = "DEVSTATUS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Environment id or name to work in (overrides config file)
    #[arg(short, long)]
    env: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("devstatus={}", config.general.log_level).parse()?),
        )
        .init();

    // Apply CLI overrides
    if let Some(data_dir) = cli.data_dir {
        config.persistence.data_dir = Some(data_dir);
    }
    if let Some(env) = cli.env {
        config.initial_environment = env;
    }
    if let Some(key) = cli.api_key {
        if let AnalyzerSettings::Completion { api_key, .. } = &mut config.analyzer {
            *api_key = Some(key);
        }
    }

    match &config.persistence.data_dir {
        Some(dir) => info!("Data dir: {}", dir.display()),
        None => info!("No data dir configured, state will not outlive this run"),
    }

    let catalog = Arc::new(load_catalog(config.catalog_path.as_deref())?);
    debug!(fingerprint = %catalog.fingerprint(), "Catalog loaded");

    let (service, worker) = DashboardService::start(&config, catalog.clone()).await?;

    let result = cli::execute(&service, &catalog, cli.command).await;

    // Let the worker flush and stop before reporting.
    drop(service);
    if let Err(e) = worker.await {
        tracing::error!(error = %e, "Dashboard worker panicked");
    }

    print!("{}", result?);
    Ok(())
}

fn load_config(path: &Path) -> anyhow::Result<EngineConfig> {
    if !path.exists() {
        return Ok(EngineConfig::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    EngineConfig::from_yaml(&content).with_context(|| format!("parsing config {}", path.display()))
}

fn load_catalog(path: Option<&Path>) -> anyhow::Result<Catalog> {
    let Some(path) = path else {
        return Ok(Catalog::builtin());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading catalog {}", path.display()))?;
    Catalog::from_yaml(&content).with_context(|| format!("parsing catalog {}", path.display()))
}

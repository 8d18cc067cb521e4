//! breed-mirror - Keeps a local mirror of an upstream breed catalog in sync
//!
//! This is the command-line entry point: it runs the sync scheduler, a single
//! pass, or reads from the local catalog.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};

use breed_mirror::cache::MemoryCache;
use breed_mirror::catalog::BreedCatalog;
use breed_mirror::config::Config;
use breed_mirror::database::SqliteStore;
use breed_mirror::sync::{Reconciler, SchedulerConfig, SyncScheduler, UpstreamClient};
use breed_mirror::telemetry::init_tracing;

/// breed-mirror - Keeps a local mirror of an upstream breed catalog in sync
#[derive(Parser, Debug)]
#[command(name = "breed-mirror")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "BREED_MIRROR_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Sync at startup and on every interval until interrupted (default)
    Run,
    /// Run one sync pass and print its result
    Sync,
    /// Print one page of the local catalog
    List {
        /// Page number, starting at 1
        #[arg(short, long, default_value_t = 1)]
        page: u32,
    },
    /// Print one breed from the local catalog
    Show {
        /// Breed name
        breed: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = load_config(&args)?;

    init_tracing(&config.logging.level, &config.logging.format)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting breed-mirror");

    let store = Arc::new(SqliteStore::new(&config.database.path).await?);
    info!(path = %config.database.path, "Database initialized");

    match args.command.unwrap_or(Command::Run) {
        Command::Run => run(&config, store).await,
        Command::Sync => sync_once(&config, store).await,
        Command::List { page } => list(&config, store, page).await,
        Command::Show { breed } => show(&config, store, &breed).await,
    }
}

/// Run the scheduler until Ctrl+C or SIGTERM
async fn run(config: &Config, store: Arc<SqliteStore>) -> anyhow::Result<()> {
    let client = UpstreamClient::new(&config.upstream)?;
    let reconciler = Arc::new(Reconciler::new(client, store, &config.sync));

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let scheduler = SyncScheduler::new(SchedulerConfig::from(&config.sync), reconciler, shutdown_rx);

    info!(
        upstream = %config.upstream.base_url,
        resource = %config.upstream.resource,
        interval_secs = config.sync.interval_secs,
        "Starting sync scheduler"
    );
    let handle = tokio::spawn(scheduler.run());

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    if let Err(e) = handle.await {
        error!(error = %e, "Sync scheduler task failed");
    }

    info!("breed-mirror shutdown complete");
    Ok(())
}

/// Run exactly one pass and print the result
async fn sync_once(config: &Config, store: Arc<SqliteStore>) -> anyhow::Result<()> {
    let client = UpstreamClient::new(&config.upstream)?;
    let reconciler = Reconciler::new(client, store, &config.sync);

    let result = reconciler.run_pass().await?;
    print_json(&result)
}

async fn list(config: &Config, store: Arc<SqliteStore>, page: u32) -> anyhow::Result<()> {
    let catalog = BreedCatalog::new(store, Arc::new(MemoryCache::new()), &config.catalog);
    let page = catalog.get_page(page).await?;
    print_json(&page)
}

async fn show(config: &Config, store: Arc<SqliteStore>, breed: &str) -> anyhow::Result<()> {
    let catalog = BreedCatalog::new(store, Arc::new(MemoryCache::new()), &config.catalog);
    match catalog.find(breed).await? {
        Some(found) => print_json(&found),
        None => anyhow::bail!("Breed '{}' not found", breed),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Load configuration from file or environment
fn load_config(args: &Args) -> anyhow::Result<Config> {
    match &args.config {
        Some(path) => {
            // Use eprintln! since tracing is not yet initialized
            eprintln!("Loading configuration from file: {}", path);
            Config::from_file(path).map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
        }
        None => {
            eprintln!("Loading configuration from environment variables");
            Config::from_env().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
        }
    }
}

/// Create a future that resolves when a shutdown signal is received
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

use anyhow::{Context, Result};
use astra::Server;
use clap::{Parser, Subcommand};
use offer_tracker::config::AppConfig;
use offer_tracker::db::connection::{init_db, Database};
use offer_tracker::ingest::{ingest_snapshot, JsonSnapshotSource};
use offer_tracker::responses::error_to_response;
use offer_tracker::router::handle;
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "offer_tracker")]
#[command(about = "Auction offer ingestion and query service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the read-only offers API
    Serve,

    /// Reconcile a JSON snapshot into the offer history
    Ingest {
        /// Path to a JSON array of listings
        snapshot: PathBuf,

        /// Only reconcile these regions (repeatable). Requested regions missing from the
        /// snapshot have all their offers removed.
        #[arg(long = "uf")]
        partitions: Vec<String>,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("loading configuration")?;

    let db = Database::new(config.db_path.clone());
    init_db(&db).with_context(|| format!("initializing database at {}", config.db_path))?;

    match cli.cmd {
        Commands::Serve => serve(db, config),
        Commands::Ingest {
            snapshot,
            partitions,
        } => {
            let mut source = JsonSnapshotSource::new(&snapshot);
            let reports = ingest_snapshot(&db, &mut source, &partitions, |partition, event| {
                debug!(partition, ?event, "progress");
            })
            .with_context(|| format!("ingesting {}", snapshot.display()))?;

            println!("{}", serde_json::to_string_pretty(&reports)?);
            Ok(())
        }
    }
}

fn serve(db: Database, config: AppConfig) -> Result<()> {
    info!(addr = %config.addr, workers = config.max_workers, "starting server");

    let server = Server::bind(&config.addr).max_workers(config.max_workers);
    let addr = config.addr;

    // Each worker thread opens its own connection on first use.
    server
        .serve(move |req, _info| match handle(req, &db, &config) {
            Ok(resp) => resp,
            Err(err) => error_to_response(err),
        })
        .with_context(|| format!("server on {addr} stopped"))?;

    info!("server shut down cleanly");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

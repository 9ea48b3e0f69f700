//! Revenue Aggregator Server
//!
//! Ingests revenue events over HTTP or from a replay log and keeps a running
//! per-user revenue balance in PostgreSQL.

mod api;
mod config;
mod replay;
mod server;
mod shutdown;
mod state;

use clap::{Parser, Subcommand, ValueEnum};
use config::{ConfigLoader, LoadedConfig, require_database_url};
use replay::run_replay;
use revenue_core::config::{DatabaseConfig, StorageFailurePolicy};
use revenue_core::processors::AggregationEngine;
use revenue_core::store::{BalanceStore, MemoryBalanceStore, PgBalanceStore};
use revenue_core::strategies::StrategyRegistry;
use server::{build_router, run_server};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Revenue Aggregator - per-user revenue balances from event streams
#[derive(Parser, Debug)]
#[command(name = "revenue-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "./revenue-config.toml")]
    config: PathBuf,

    /// PostgreSQL connection URL
    #[arg(long, global = true, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server for live ingestion and balance queries
    Serve {
        /// Override the listen address (e.g., 0.0.0.0:3000)
        #[arg(short, long)]
        listen: Option<SocketAddr>,

        /// Run database migrations on startup
        #[arg(long, default_value = "false")]
        migrate: bool,

        /// Keep balances in memory instead of PostgreSQL (lost on exit)
        #[arg(long, default_value = "false")]
        memory: bool,
    },

    /// Replay an event log into the balance store once, then exit
    Replay {
        /// Event log to replay (defaults to `replay.log_path` from the config)
        log: Option<PathBuf>,

        /// What to do when one event fails to apply: continue or abort
        #[arg(long)]
        on_storage_error: Option<StorageFailurePolicy>,

        /// Run database migrations before replaying
        #[arg(long, default_value = "false")]
        migrate: bool,

        /// Replay into an in-memory store to validate a log without writing
        #[arg(long, default_value = "false")]
        dry_run: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing
    init_tracing(args.log_format);

    tracing::info!("Starting revenue-server v{}", env!("CARGO_PKG_VERSION"));

    let listen_override = match &args.command {
        Command::Serve { listen, .. } => *listen,
        Command::Replay { .. } => None,
    };

    // Load configuration; replay never authenticates, so it skips [auth]
    let mut config_loader = ConfigLoader::new(&args.config, listen_override);
    if matches!(args.command, Command::Replay { .. }) {
        config_loader = config_loader.without_auth();
    }
    let loaded_config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    match args.command {
        Command::Serve {
            migrate, memory, ..
        } => serve(loaded_config, args.database_url.as_deref(), migrate, memory).await,
        Command::Replay {
            log,
            on_storage_error,
            migrate,
            dry_run,
        } => {
            let log = log.unwrap_or_else(|| loaded_config.replay.log_path.clone());
            let policy = on_storage_error.unwrap_or(loaded_config.replay.on_storage_error);
            replay(
                loaded_config,
                args.database_url.as_deref(),
                &log,
                policy,
                migrate,
                dry_run,
            )
            .await
        }
    }
}

/// `serve`: run the HTTP server until SIGTERM/SIGINT.
async fn serve(
    loaded_config: LoadedConfig,
    database_url: Option<&str>,
    migrate: bool,
    memory: bool,
) -> anyhow::Result<()> {
    let listen_addr = loaded_config.server.listen;
    let auth = loaded_config
        .auth
        .ok_or_else(|| anyhow::anyhow!("serve requires an [auth] section"))?;

    let (store, db_pool): (Arc<dyn BalanceStore>, Option<PgPool>) = if memory {
        tracing::warn!("Using in-memory balance store, balances will be lost on exit");
        (Arc::new(MemoryBalanceStore::new()), None)
    } else {
        let pool = connect_database(database_url, &loaded_config.database, migrate).await?;
        (Arc::new(PgBalanceStore::new(pool.clone())), Some(pool))
    };

    let engine = build_engine(store);
    let state = AppState::new(engine, auth);
    let router = build_router(state);

    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    if let Some(pool) = db_pool {
        tracing::info!("Closing database connections...");
        pool.close().await;
    }
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// `replay`: drain one event log and print the summary.
async fn replay(
    loaded_config: LoadedConfig,
    database_url: Option<&str>,
    log: &std::path::Path,
    policy: StorageFailurePolicy,
    migrate: bool,
    dry_run: bool,
) -> anyhow::Result<()> {
    let (store, db_pool): (Arc<dyn BalanceStore>, Option<PgPool>) = if dry_run {
        tracing::info!("Dry run: replaying into an in-memory store");
        (Arc::new(MemoryBalanceStore::new()), None)
    } else {
        let pool = connect_database(database_url, &loaded_config.database, migrate).await?;
        (Arc::new(PgBalanceStore::new(pool.clone())), Some(pool))
    };

    let engine = build_engine(store);
    let result = run_replay(&engine, log, policy).await;

    if let Some(pool) = db_pool {
        pool.close().await;
    }

    match result {
        Ok(summary) => {
            println!("{}", serde_json::to_string(&summary)?);
            Ok(())
        }
        Err(replay::ReplayError::Batch(e)) => {
            println!("{}", serde_json::to_string(e.summary())?);
            tracing::error!("Replay did not complete: {}", e);
            Err(e.into())
        }
        Err(e) => {
            tracing::error!("Replay failed: {}", e);
            Err(e.into())
        }
    }
}

fn build_engine(store: Arc<dyn BalanceStore>) -> AggregationEngine {
    let registry = StrategyRegistry::with_defaults();
    tracing::info!(kinds = ?registry.kinds(), "Strategy registry initialized");
    AggregationEngine::new(store, registry)
}

/// Create the connection pool and optionally run migrations.
async fn connect_database(
    database_url: Option<&str>,
    database: &DatabaseConfig,
    migrate: bool,
) -> anyhow::Result<PgPool> {
    let database_url = require_database_url(database_url).map_err(|e| {
        tracing::error!("DATABASE_URL environment variable not set");
        e
    })?;

    tracing::info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(database.max_connections)
        .acquire_timeout(database.acquire_timeout)
        .connect(database_url)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to database: {}", e);
            e
        })?;
    tracing::info!("Database connection established");

    if migrate {
        tracing::info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&db_pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to run migrations: {}", e);
                e
            })?;
        tracing::info!("Migrations completed successfully");
    }

    Ok(db_pool)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

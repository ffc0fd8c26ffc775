//! daylimitd - The daylimit service
//!
//! This is the main entry point for the daylimitd service.
//! It wires together all the components:
//! - Configuration loading
//! - Store initialization (and seeding from config defaults)
//! - Core engine
//! - Line protocol on stdin/stdout

use anyhow::{Context, Result};
use clap::Parser;
use daylimit_config::load_config_or_default;
use daylimit_core::CoreEngine;
use daylimit_store::{AuditEvent, AuditEventType, SqliteStore, Store};
use daylimit_util::{default_config_path, SETTINGS_DB_FILENAME};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// daylimitd - Day-limit policy service
#[derive(Parser, Debug)]
#[command(name = "daylimitd")]
#[command(about = "Day-limit policy service speaking a JSON line protocol on stdin/stdout", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/daylimit/config.toml)
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set DAYLIMIT_DATA_DIR env var)
    #[arg(short, long, env = "DAYLIMIT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log level (overrides the config file; RUST_LOG overrides both)
    #[arg(short, long)]
    log_level: Option<String>,
}

/// Main service state
struct Service {
    engine: CoreEngine,
    store: Arc<dyn Store>,
}

impl Service {
    fn new(args: &Args, config: daylimit_config::ServiceConfig) -> Result<Self> {
        let data_dir = args.data_dir.clone().unwrap_or(config.data_dir);

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

        let db_path = data_dir.join(SETTINGS_DB_FILENAME);
        let store: Arc<dyn Store> = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open database {:?}", db_path))?,
        );

        info!(db_path = %db_path.display(), "Store initialized");

        if let Some(initial) = &config.initial_settings {
            let seeded = store
                .seed_settings(initial)
                .context("Failed to seed settings from config")?;
            if seeded {
                info!(
                    enabled = initial.enabled,
                    day_limit = initial.day_limit,
                    "Settings seeded from config defaults"
                );
            }
        }

        store.append_audit(AuditEvent::new(AuditEventType::ServiceStarted))?;

        let engine = CoreEngine::new(store.clone()).context("Failed to load settings")?;

        Ok(Self { engine, store })
    }

    async fn run(mut self) -> Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        let mut sigterm = signal(SignalKind::terminate())
            .context("Failed to create SIGTERM handler")?;
        let mut sigint = signal(SignalKind::interrupt())
            .context("Failed to create SIGINT handler")?;

        info!("Service running");

        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break;
                }

                line = lines.next_line() => {
                    let line = match line.context("Failed to read request")? {
                        Some(line) => line,
                        None => {
                            debug!("Host closed stdin");
                            break;
                        }
                    };

                    let now = daylimit_util::now();
                    let Some(response) = daylimitd::handle_line(&mut self.engine, &line, now) else {
                        continue;
                    };

                    let mut json = serde_json::to_string(&response)?;
                    json.push('\n');
                    stdout.write_all(json.as_bytes()).await.context("Failed to write response")?;
                    stdout.flush().await?;
                }
            }
        }

        info!("Shutting down daylimitd");

        if let Err(e) = self.store.append_audit(AuditEvent::new(AuditEventType::ServiceStopped)) {
            warn!(error = %e, "Failed to log service shutdown");
        }

        info!("Shutdown complete");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config_or_default(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    // Logs go to stderr; stdout carries the protocol.
    let level = args.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        config_path = %args.config.display(),
        "daylimitd starting"
    );

    if daylimit_util::is_mock_time_active() {
        warn!(
            now = %daylimit_util::format_datetime_full(&daylimit_util::now()),
            "Mock time is active"
        );
    }

    let service = Service::new(&args, config)?;
    service.run().await
}

//! Vigil entry point: settings, storage, relay connection, shutdown.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use vigil_assets::{AssetFetcher, ContentStore, FetcherConfig, PassThrough, RateLimiter};
use vigil_bot::connection::{ConnectionManager, RelayConfig};
use vigil_bot::coordinator::IngestionCoordinator;
use vigil_bot::handlers;
use vigil_bot::outbound::OutboundSender;
use vigil_store::{ArchiveStore, ConnectionConfig, ReportClock};

/// How long in-flight background tasks get to finish after the pump stops.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

#[derive(Debug, Parser)]
#[command(name = "vigil", about = "Chat-relay archival and stats bot")]
struct Args {
    /// Path to the JSON settings file.
    #[arg(long, default_value = "vigil.json")]
    config: PathBuf,

    /// Override the database path from settings.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = vigil_settings::load_settings(&args.config)
        .with_context(|| format!("loading settings from {}", args.config.display()))?;
    if let Some(db_path) = args.db_path {
        settings.storage.db_path = db_path.display().to_string();
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "vigil starting");

    let pool = vigil_store::new_file(
        Path::new(&settings.storage.db_path),
        ConnectionConfig::default(),
    )
    .with_context(|| format!("opening database at {}", settings.storage.db_path))?;
    {
        let mut conn = pool.get()?;
        vigil_store::run_migrations(&mut conn).context("running schema migrations")?;
    }
    let clock = ReportClock::from_setting(settings.report_timezone.as_deref());
    let store = ArchiveStore::new(pool, clock);

    let content = ContentStore::open(&settings.storage.image_dir)
        .with_context(|| format!("opening image store at {}", settings.storage.image_dir))?;
    let fetcher = Arc::new(
        AssetFetcher::new(
            FetcherConfig {
                concurrency: settings.downloads.concurrency,
                max_attempts: settings.downloads.max_attempts,
                base_delay: Duration::from_millis(settings.downloads.base_delay_ms),
                connect_timeout: Duration::from_secs(settings.downloads.connect_timeout_secs),
                total_timeout: Duration::from_secs(settings.downloads.total_timeout_secs),
            },
            content,
            Arc::new(PassThrough),
        )
        .context("building HTTP client")?,
    );

    let limiter = Arc::new(RateLimiter::new(
        settings.outbound.max_calls,
        Duration::from_secs(settings.outbound.period_secs),
    ));

    let (manager, outbound_tx, _state) =
        ConnectionManager::new(RelayConfig::from_settings(&settings.relay));
    let outbound = OutboundSender::new(limiter, outbound_tx);

    let registry = Arc::new(handlers::build_registry(&store, &settings.commands.prefix));
    let coordinator = IngestionCoordinator::new(
        store,
        fetcher,
        registry,
        outbound,
        settings.groups.clone(),
        settings.commands.prefix.clone(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    drop(tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("shutdown requested"),
            Err(error) => tracing::warn!(error = %error, "ctrl-c handler failed"),
        }
        let _ = shutdown_tx.send(true);
    }));

    manager
        .run(move |event| coordinator.on_event(event), shutdown_rx)
        .await;

    tracing::info!(grace = ?SHUTDOWN_GRACE, "pump stopped, draining background tasks");
    tokio::time::sleep(SHUTDOWN_GRACE).await;
    tracing::info!("vigil stopped");
    Ok(())
}

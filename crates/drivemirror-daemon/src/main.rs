//! drivemirror daemon - one-way mirror of a local tree into Google Drive
//!
//! Handles:
//! - Configuration from YAML, environment and command-line flags
//! - Credential bootstrap (interactive on first run) and periodic renewal
//! - Startup checks of the source folder and the destination folder
//! - Periodic passes executed by a fixed pool of folder workers
//! - Graceful shutdown on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! The daemon resolves the mirror root, spawns the worker pool and the
//! credential renewal task, then hands control to the [`MirrorScheduler`].
//! Everything is stopped through one `CancellationToken` that is cancelled
//! on receipt of SIGTERM or SIGINT.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use drivemirror_core::{config::Config, ports::transport};
use drivemirror_drive::auth::CredentialManager;
use drivemirror_sync::{
    bootstrap::bootstrap,
    pool::{WorkQueue, WorkerPool},
    scheduler::MirrorScheduler,
    stats::MirrorStats,
    MirrorContext,
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Command line
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "drivemirrord",
    version,
    about = "Mirror a local folder tree into Google Drive"
)]
struct Args {
    /// Use alternate config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Local folder to mirror (overrides mirror.source)
    #[arg(long)]
    source: Option<PathBuf>,

    /// Destination folder name under the drive root (overrides mirror.destination)
    #[arg(long = "dest")]
    destination: Option<String>,

    /// Number of concurrent folder workers
    #[arg(long)]
    workers: Option<usize>,

    /// Seconds between the start of two passes
    #[arg(long = "interval")]
    interval_secs: Option<u64>,

    /// Run a single pass and exit once it has drained
    #[arg(long)]
    once: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    /// Applies flags on top of file and environment settings
    fn apply(&self, config: &mut Config) {
        if let Some(source) = &self.source {
            config.mirror.source = source.clone();
        }
        if let Some(destination) = &self.destination {
            config.mirror.destination = destination.trim().to_string();
        }
        if let Some(workers) = self.workers {
            config.mirror.workers = workers;
        }
        if let Some(interval) = self.interval_secs {
            config.mirror.interval_secs = interval;
        }
    }
}

/// Builds the effective configuration: file, then environment, then flags
///
/// An explicit `--config` must exist; the default location falls back to
/// built-in defaults.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load_or_default(&Config::default_path()),
    };
    config.apply_env_overrides();
    args.apply(&mut config);

    let errors = config.validate();
    if !errors.is_empty() {
        let details = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        anyhow::bail!("Invalid configuration: {details}");
    }
    Ok(config)
}

/// `RUST_LOG` wins over `logging.level`
fn init_tracing(level: &str, json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

// ============================================================================
// DaemonService
// ============================================================================

/// Wires credentials, the remote transport and the mirror engine together
struct DaemonService {
    config: Config,
    once: bool,
    shutdown: CancellationToken,
}

impl DaemonService {
    fn new(config: Config, once: bool, shutdown: CancellationToken) -> Self {
        Self {
            config,
            once,
            shutdown,
        }
    }

    /// Runs until shutdown, or until the single pass drains with `--once`
    ///
    /// 1. Obtains credentials and builds the initial remote store
    /// 2. Validates the source and resolves the destination folder
    /// 3. Starts the worker pool and the credential renewal task
    /// 4. Runs the scheduler, then stops everything in order
    async fn run(&self) -> Result<()> {
        let mirror = &self.config.mirror;

        let credentials = CredentialManager::from_config(&self.config)
            .context("Failed to set up Drive credentials")?;
        let tokens = tokio::select! {
            tokens = credentials.initial_tokens() => {
                tokens.context("Failed to obtain Drive credentials")?
            }
            _ = self.shutdown.cancelled() => {
                info!("Shutdown requested during authentication");
                return Ok(());
            }
        };

        let (swap, handle) = transport(credentials.build_store(&tokens)?);

        let store = handle.current();
        let root = bootstrap(&*store, &mirror.source, &mirror.destination)
            .await
            .context("Startup checks failed")?;
        drop(store);

        let stats = Arc::new(MirrorStats::new());
        let ctx = MirrorContext::new(handle, Arc::clone(&stats), self.shutdown.clone());
        let queue = WorkQueue::new();
        let pool = WorkerPool::spawn(mirror.workers, ctx, queue.clone());

        let renewal_shutdown = self.shutdown.child_token();
        let renewal = {
            let shutdown = renewal_shutdown.clone();
            let interval = Duration::from_secs(self.config.auth.renew_interval_secs);
            tokio::spawn(async move {
                credentials
                    .renewal_loop(tokens, swap, interval, shutdown)
                    .await;
            })
        };

        let scheduler = MirrorScheduler::new(
            root,
            queue.clone(),
            Duration::from_secs(mirror.interval_secs),
            Arc::clone(&stats),
            self.shutdown.clone(),
        );
        if self.once {
            scheduler.run_once().await;
        } else {
            scheduler.run().await;
        }

        queue.close();
        info!(
            running = pool.running(),
            queued = queue.depth(),
            "Stopping worker pool"
        );
        pool.join().await;

        renewal_shutdown.cancel();
        if let Err(e) = renewal.await {
            warn!(error = %e, "Credential renewal task ended abnormally");
        }

        info!(stats = %stats.snapshot(), "Mirror stopped");
        Ok(())
    }
}

// ============================================================================
// Graceful shutdown
// ============================================================================

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    init_tracing(&config.logging.level, args.json_logs);
    info!(
        source = %config.mirror.source.display(),
        destination = %config.mirror.destination,
        workers = config.mirror.workers,
        interval_secs = config.mirror.interval_secs,
        once = args.once,
        "drivemirror daemon starting (drivemirrord)"
    );

    let shutdown_token = CancellationToken::new();

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let service = DaemonService::new(config, args.once, shutdown_token);
    let result = service.run().await;

    match &result {
        Ok(()) => info!("drivemirror daemon shut down gracefully"),
        Err(e) => error!(error = %format!("{e:#}"), "drivemirror daemon exiting with error"),
    }

    result
}

// ============================================================================
// Tests
// ============================================================================

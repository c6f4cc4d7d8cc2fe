//! dpa-reconcile - Archive reconciliation job runner
//!
//! Cross-validates the legacy archive extract against the catalog extract
//! and writes the four reconciliation reports (verified, mismatch, missing in
//! legacy, orphan) into the output directory.
//!
//! Exit status is zero whenever the run completes, regardless of how many
//! records need review; I/O failures, configuration errors and cancellation
//! exit non-zero.

use std::fs::{File, OpenOptions};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use clap::Parser;
use dpa_common::config::{self, ChecksumSource, LoggingConfig, TomlConfig};
use dpa_reconcile::{ReconcileError, ReconcileOptions, ReconciliationEngine};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for dpa-reconcile
#[derive(Parser, Debug)]
#[command(name = "dpa-reconcile")]
#[command(about = "Reconcile legacy archive extract against catalog extract")]
#[command(version)]
struct Args {
    /// Legacy archive extract (`##`-separated lines)
    #[arg(
        short,
        long,
        env = "DPA_LEGACY_EXTRACT",
        required_unless_present = "write_default_config"
    )]
    legacy: Option<PathBuf>,

    /// Catalog extract (`;`-separated KEY:VALUE lines)
    #[arg(
        short,
        long,
        env = "DPA_CATALOG_EXTRACT",
        required_unless_present = "write_default_config"
    )]
    catalog: Option<PathBuf>,

    /// Directory receiving the four report files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, env = "DPA_CONFIG")]
    config: Option<PathBuf>,

    /// Catalog checksum compared with the legacy checksum (archive-md5, master-md5)
    #[arg(long)]
    checksum_source: Option<ChecksumSource>,

    /// Compare checksums ignoring ASCII case
    #[arg(long)]
    ignore_checksum_case: bool,

    /// Print the run summary as JSON on stdout
    #[arg(long)]
    summary_json: bool,

    /// Write a default configuration file to the config path and exit
    #[arg(long)]
    write_default_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = match &args.config {
        Some(path) => path.clone(),
        None => config::default_config_path()?,
    };

    if args.write_default_config {
        config::write_toml_config(&TomlConfig::default(), &config_path)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        println!("Wrote default configuration to {}", config_path.display());
        return Ok(());
    }

    // Config is read before logging exists; report how it resolved afterwards
    let loaded = config::load_toml_config(&config_path)?;
    let config_found = loaded.is_some();
    let toml_config = loaded.unwrap_or_default();
    init_tracing(&toml_config.logging)?;

    info!("Starting dpa-reconcile");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    if config_found {
        info!("Loaded configuration from {}", config_path.display());
    } else {
        warn!(
            "Config file not found: {} (using built-in defaults)",
            config_path.display()
        );
    }

    let mut options = ReconcileOptions::from(&toml_config.reconcile);
    if let Some(source) = args.checksum_source {
        options.checksum_source = source;
    }
    if args.ignore_checksum_case {
        options.ignore_checksum_case = true;
    }

    let output_dir = config::resolve_output_dir(
        args.output_dir.as_deref(),
        config::OUTPUT_DIR_ENV,
        &toml_config,
    );

    let legacy_path = args.legacy.context("--legacy is required")?;
    let catalog_path = args.catalog.context("--catalog is required")?;
    info!("Legacy extract: {}", legacy_path.display());
    info!("Catalog extract: {}", catalog_path.display());
    info!("Output directory: {}", output_dir.display());

    let legacy = open_extract(&legacy_path)?;
    let catalog = open_extract(&catalog_path)?;

    let cancel = CancellationToken::new();
    let engine = ReconciliationEngine::create(&output_dir, options)
        .context("Failed to create report channels")?
        .with_cancellation(cancel.clone());

    // Cancel between records on Ctrl+C / SIGTERM
    let signal_cancel = cancel.clone();
    let signal_task = tokio::spawn(async move {
        shutdown_signal().await;
        signal_cancel.cancel();
    });

    // The engine does blocking file I/O; keep it off the async workers
    let result = tokio::task::spawn_blocking(move || engine.run(legacy, catalog))
        .await
        .context("Reconciliation task failed")?;
    signal_task.abort();

    let summary = match result {
        Ok(summary) => summary,
        Err(ReconcileError::Cancelled) => {
            warn!("Reconciliation cancelled; partial reports left in {}", output_dir.display());
            bail!("reconciliation cancelled");
        }
        Err(e) => {
            error!("Reconciliation failed: {}", e);
            return Err(e.into());
        }
    };

    if args.summary_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    if summary.requires_review() {
        warn!(
            "Records require review, see reports in {}",
            output_dir.display()
        );
    } else {
        info!("All catalog records verified against the legacy archive");
    }

    Ok(())
}

fn open_extract(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open extract {}", path.display()))?;
    Ok(BufReader::new(file))
}

/// Initialize tracing from the `[logging]` section
///
/// `RUST_LOG` overrides the configured level.
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "dpa_reconcile={level}",
            level = logging.level
        ))
    });

    match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}

/// Resolves when Ctrl+C or SIGTERM is received
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, cancelling reconciliation");
        },
        _ = terminate => {
            info!("Received terminate signal, cancelling reconciliation");
        },
    }
}

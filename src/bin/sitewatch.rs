use clap::Parser;
use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use sitewatch::config::AppConfig;
use sitewatch::logging::init_logging;
use sitewatch::monitoring::checkers::CertInspector;
use sitewatch::monitoring::targets_file::load_targets;
use sitewatch::monitoring::MonitorService;
use sitewatch::notifications::NotificationService;
use sitewatch::version::VERSION;

#[derive(Parser, Debug)]
#[command(author, version = VERSION, about, long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Targets file, overriding the configured one
    #[arg(short, long)]
    targets: Option<PathBuf>,

    /// Seconds between cycles, overriding the configured interval
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    interval: Option<u64>,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();
    dotenv().ok();

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(targets) = args.targets {
        config.targets_file = targets;
    }
    if let Some(interval) = args.interval {
        config.interval_seconds = interval;
    }

    init_logging(&config.log_dir);
    info!(version = VERSION, "Starting sitewatch.");
    if config.notifier_defaulted {
        warn!("No notifier configured and Telegram credentials missing; notifications go to the log.");
    }

    let targets = match load_targets(&config.targets_file) {
        Ok(targets) => targets,
        Err(e) => {
            error!(path = ?config.targets_file, error = %e, "Failed to load targets. Exiting.");
            return Err(e.into());
        }
    };
    if targets.is_empty() {
        warn!(path = ?config.targets_file, "No targets loaded; cycles will be empty.");
    }

    let inspector = Arc::new(CertInspector::new()?);
    let notifier = match NotificationService::from_config(&config.notifier) {
        Ok(service) => Arc::new(service),
        Err(e) => {
            error!(error = %e, "Failed to set up notification channel. Exiting.");
            return Err(e.into());
        }
    };

    let mut service = MonitorService::new(
        targets,
        inspector,
        notifier,
        config.interval(),
    );

    if args.once {
        let summary = service.run_cycle().await;
        info!(up = summary.up, down = summary.down, "Single cycle complete.");
        service.shutdown().await;
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(());
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        let _ = shutdown_tx.send(());
    });

    service.run(shutdown_rx).await;
    info!("sitewatch stopped.");
    Ok(())
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = signal::ctrl_c();
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to register SIGTERM handler.");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("SIGINT (Ctrl+C) received, initiating graceful shutdown."),
        _ = terminate => info!("SIGTERM received, initiating graceful shutdown."),
    }
}

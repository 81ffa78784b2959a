use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_FILE_PREFIX: &str = "sitewatch.log";

/// Installs the process-wide subscriber: JSON lines rotated daily under
/// `log_dir`, plus human-readable output on stdout.
///
/// `RUST_LOG` controls the filter and defaults to `info`.
pub fn init_logging(log_dir: &str) {
    let file_appender = rolling::daily(log_dir, LOG_FILE_PREFIX);
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

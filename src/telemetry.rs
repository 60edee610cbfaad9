//! Tracing setup for binaries built on this crate.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing, filtered by `RUST_LOG` (default `info`).
///
/// Output goes to stderr, or to `{path}.{timestamp}.{pid}` when
/// `UNIDIRECT_LOG` names a file path. Library code never calls this.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let Some(log_path) = std::env::var("UNIDIRECT_LOG").ok() else {
        init_stderr(filter);
        return;
    };

    let pid = std::process::id();
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let unique_path = format!("{}.{}.{}", log_path, timestamp, pid);

    let file = match std::fs::File::create(&unique_path) {
        Ok(file) => file,
        Err(error) => {
            init_stderr(filter);
            tracing::warn!(path = %unique_path, %error, "failed to create log file; logging to stderr");
            return;
        }
    };

    let file_layer = fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .init();
}

fn init_stderr(filter: EnvFilter) {
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .init();
}

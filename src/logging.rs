//! Tracing setup for the CLI.
//!
//! Human-readable events go to stderr, filtered by `RUST_LOG` or the
//! verbosity flag. When a log directory is available, JSON events are also
//! written to a daily rolling file there.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

pub const LOG_FILE_PREFIX: &str = "leadsflow.log";

/// Default filter when `RUST_LOG` is unset.
pub fn default_level(verbose: bool) -> &'static str {
    if verbose { "leadsflow=debug,info" } else { "leadsflow=info,warn" }
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level(verbose)))
}

/// Install the global subscriber. Returns the file writer guard, which must
/// be held until exit so buffered lines are flushed.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init(verbose: bool, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_filter(env_filter(verbose));

    let (file_layer, guard) = match log_dir.filter(|dir| std::fs::create_dir_all(dir).is_ok()) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(EnvFilter::new("leadsflow=debug,info"));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .ok();

    guard
}

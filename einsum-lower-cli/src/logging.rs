//! Log output for the command-line tools.
//!
//! Logs are written to stderr using `tracing-subscriber`, so that reports
//! printed on stdout can be piped to other tools. The `RUST_LOG` environment
//! variable controls filtering using the usual
//! [`EnvFilter`](tracing_subscriber::EnvFilter) syntax, eg.
//! `RUST_LOG=einsum_lower=debug`.

use std::sync::OnceLock;

use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INITIALIZED: OnceLock<()> = OnceLock::new();

/// Errors that occur when configuring logging.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    InvalidFilter(String),
}

/// Return the default filter directive.
///
/// `verbose` enables debug logs for the lowering pass and the tools.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}

fn build_env_filter(verbose: bool) -> Result<EnvFilter, LoggingError> {
    match std::env::var("RUST_LOG") {
        Ok(filter) if !filter.is_empty() => {
            EnvFilter::try_new(filter).map_err(|err| LoggingError::InvalidFilter(err.to_string()))
        }
        _ => Ok(EnvFilter::new(default_filter(verbose))),
    }
}

/// Initialize logging. Calls after the first have no effect.
pub fn init(verbose: bool) -> Result<(), LoggingError> {
    if INITIALIZED.get().is_some() {
        return Ok(());
    }

    let env_filter = build_env_filter(verbose)?;
    let layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    // `try_init` fails if another subscriber was installed, eg. by a test
    // harness. Logs then go to that subscriber instead.
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init();
    let _ = INITIALIZED.set(());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{default_filter, init};

    #[test]
    fn test_default_filter() {
        assert_eq!(default_filter(false), "info");
        assert_eq!(default_filter(true), "debug");
    }

    #[test]
    fn test_init_is_idempotent() {
        // Fails only if `RUST_LOG` is set to an invalid filter.
        if init(false).is_ok() {
            assert!(init(true).is_ok());
        }
    }
}

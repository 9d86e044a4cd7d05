use std::{io::IsTerminal, sync::OnceLock};
use tracing::Level;
use tracing_subscriber::reload;

use crate::{CliArgs, config::Config};

/// Environment variable checked before `RUST_LOG` for a log filter expression.
pub(crate) const LOG_ENV_VAR: &str = "DSFETCH_LOG";

/// Default tracing filter expression for verbose logging.
const DEFAULT_TRACING_FILTER: &str = "info";

/// Handle for reloading the tracing filter once the config file has been read.
type ReloadHandle = reload::Handle<tracing_subscriber::EnvFilter, tracing_subscriber::Registry>;

static RELOAD_HANDLE: OnceLock<ReloadHandle> = OnceLock::new();

/// Initialize tracing/logging based on the contents of the parsed CLI args.
///
/// # Verbosity levels
///
/// - `0`: WARN and ERROR only, simple format with color (silent on happy path)
/// - `1`: INFO level, structured format with timestamp/target
/// - `2`: DEBUG level, structured format
/// - `3+`: TRACE level, structured format
///
/// `DSFETCH_LOG`, then `RUST_LOG`, override the verbosity-derived filter when set.
///
/// # Panics
///
/// Panics if called more than once in the same process, as the global tracing subscriber can
/// only be initialized once.
pub(crate) fn init(args: &CliArgs) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let (level, use_simple_format) = match args.verbose {
        0 => (Level::WARN, true),
        1 => (Level::INFO, false),
        2 => (Level::DEBUG, false),
        _ => (Level::TRACE, false),
    };

    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| {
            if args.verbose == 0 {
                EnvFilter::new("warn")
            } else {
                EnvFilter::new(format!("{},{}", DEFAULT_TRACING_FILTER, level))
            }
        });

    let (filter, reload_handle) = reload::Layer::new(filter);
    let _ = RELOAD_HANDLE.set(reload_handle);

    let use_ansi = std::io::stderr().is_terminal();

    if use_simple_format {
        // Just the message, one per line; this should not look very "loggy"
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_level(true)
                    .with_ansi(use_ansi)
                    .without_time(),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true)
                    .with_ansi(use_ansi),
            )
            .init();
    }
}

/// Apply the `log_level` from the config file, unless the CLI or the environment already chose
/// a level.
///
/// Priority, highest first: `DSFETCH_LOG`, `RUST_LOG`, `-v` flags, `log_level` in the config
/// file, the built-in default.
pub(crate) fn apply_config(config: &Config, args: &CliArgs) {
    use tracing_subscriber::EnvFilter;

    if args.verbose > 0 {
        tracing::debug!("Not applying config log_level: CLI verbosity flag takes precedence");
        return;
    }

    if std::env::var(LOG_ENV_VAR).is_ok() || std::env::var("RUST_LOG").is_ok() {
        tracing::debug!("Not applying config log_level: environment variable takes precedence");
        return;
    }

    let Some(ref log_level) = config.log_level else {
        return;
    };

    let new_filter = match EnvFilter::try_new(log_level) {
        Ok(filter) => filter,
        Err(e) => {
            tracing::warn!("Invalid log_level in config file: {}: {}", log_level, e);
            return;
        }
    };

    if let Some(handle) = RELOAD_HANDLE.get() {
        match handle.reload(new_filter) {
            Ok(()) => tracing::debug!("Applied log level from config: {}", log_level),
            Err(e) => tracing::warn!("Failed to reload log filter: {}", e),
        }
    }
}

/// Initialize tracing for tests.
///
/// Output goes through the test writer so it only shows up for failing tests.  Defaults to DEBUG;
/// `DSFETCH_LOG` or `RUST_LOG` override it.  Safe to call from every test.
#[cfg(test)]
pub(crate) fn init_test_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    static INIT: OnceLock<()> = OnceLock::new();

    INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("debug"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_level(true)
            .init();
    });
}

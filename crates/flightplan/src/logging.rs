//! Diagnostic logging for the `fplan` binary and the library.
//!
//! Events from the adapter and the stores go through `tracing`. The binary
//! installs a stderr subscriber whose level comes from the `-q`/`-v` flags,
//! unless `FLIGHTPLAN_LOG` or `RUST_LOG` names a filter explicitly.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding a filter directive for this crate's logs.
pub const LOG_ENV_VAR: &str = "FLIGHTPLAN_LOG";

/// How much diagnostic output to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Filings, amendments, withdrawals and warnings.
    #[default]
    Normal,
    /// Adds per-document store activity.
    Verbose,
    /// Everything.
    Trace,
}

impl Verbosity {
    /// Pick a verbosity from the `-q` flag and the `-v` count.
    ///
    /// `quiet` wins over any number of `-v`.
    #[must_use]
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Trace,
        }
    }

    /// The most detailed level shown at this verbosity.
    #[must_use]
    pub fn to_level_filter(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Filter directive used when no environment override is set.
    #[must_use]
    pub fn directive(&self) -> String {
        format!("flightplan={}", self.to_level_filter())
    }
}

/// Install the stderr subscriber.
///
/// `FLIGHTPLAN_LOG` takes precedence, then `RUST_LOG`, then `verbosity`.
/// Calling it again after a subscriber is installed does nothing.
///
/// # Examples
///
/// ```no_run
/// use flightplan::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::Verbose);
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let env_filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));

    // stdout carries command output
    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_file(false)
            .with_line_number(false),
    );

    let _ = subscriber.try_init();
}

/// Route warnings and errors through the test harness's captured output.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("flightplan=warn")
        .with_test_writer()
        .try_init();
}

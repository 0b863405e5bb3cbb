//! Logging utilities with zkattest segment prefixes.
//!
//! Provides consistent logging setup across zkattest binaries.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing with zkattest defaults.
///
/// Sets up tracing-subscriber with:
/// - Environment filter (RUST_LOG wins over the default)
/// - Compact format suitable for terminal output
pub fn init() {
    init_with_filter("info");
}

/// Initialize tracing with a custom default filter.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_with_filter(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(false))
        .try_init();
}

/// zkattest segment prefixes for logging.
pub mod prefix {
    /// Proof pipeline prefix
    pub const PULSE: &str = "꩜";
    /// Graceful startup prefix
    pub const PULSE_OPEN: &str = "✿";
    /// Graceful shutdown prefix
    pub const PULSE_CLOSE: &str = "❀";
    /// Ledger I/O prefix
    pub const LEDGER: &str = "⊔";
}

//! # Witness-Chain Telemetry
//!
//! Structured logging for every subsystem. Subsystems log through the
//! `tracing` macros with structured fields; the node (or a test harness)
//! calls [`init_telemetry`] once to install the subscriber.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wc_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(TelemetryConfig::from_env())?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `WC_SERVICE_NAME` | `witness-chain` | Service name in log lines |
//! | `WC_LOG_LEVEL` | `info` | Log level filter |
//! | `WC_SUBSYSTEM_ID` | `00` | Subsystem identifier |
//! | `WC_JSON_LOGS` | `false` | JSON output |

mod config;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use tracing_setup::{init_tracing, TracingGuard};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracerInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging.
///
/// Returns a guard that should be held for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let tracing_guard = init_tracing(&config)?;
    Ok(TelemetryGuard {
        _tracing: tracing_guard,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _tracing: TracingGuard,
}

/// Convenience macro for creating a span with subsystem context.
///
/// ```rust,ignore
/// let _span = wc_telemetry::subsystem_span!("push_block", subsystem = "chain", block_num = 12345);
/// ```
#[macro_export]
macro_rules! subsystem_span {
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}

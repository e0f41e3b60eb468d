//! Logging setup using tracing.
//!
//! Structured logs go to stderr. `RUST_LOG` wins over the level passed in,
//! so single modules can be turned up without touching the CLI:
//!
//! - `RUST_LOG=debug` - everything at debug and above
//! - `RUST_LOG=camvisor::broker=trace,info` - broker internals at trace, rest at info

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber; `default_level` applies when `RUST_LOG` is unset.
///
/// # Errors
/// Returns an error if a global subscriber has already been installed.
pub fn init(default_level: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(true),
        )
        .try_init()
}

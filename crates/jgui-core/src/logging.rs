#![forbid(unsafe_code)]

//! Structured JSON logging setup.
//!
//! Library code only emits `tracing` events; binaries and test harnesses
//! opt into a subscriber here. The filter is read from `JGUI_LOG` and falls
//! back to `info`.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directive.
pub const LOG_ENV: &str = "JGUI_LOG";

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install a global JSON subscriber.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init() -> bool {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter())
        .with_current_span(true)
        .try_init()
        .is_ok()
}

/// Install a compact human-readable subscriber writing to the test writer.
pub fn init_for_tests() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_test_writer()
        .try_init()
        .is_ok()
}

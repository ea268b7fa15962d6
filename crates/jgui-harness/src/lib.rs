#![forbid(unsafe_code)]

//! Test harness and reference fixtures for jgui.
//!
//! - [`fake_env::FakeEnvironment`] records environment calls and replays
//!   scripted responses, immediately or on demand.
//! - [`fixtures`] builds the reference two-service store.
//! - [`simulate`] dispatches user input at elements.
//! - [`recorder::BusRecorder`] captures bus traffic.
//! - [`assert_snapshot!`] compares element trees with stored snapshots.

pub mod fake_env;
pub mod fixtures;
pub mod recorder;
pub mod simulate;
pub mod snapshot;
pub mod strategies;

pub use fake_env::{Call, FakeEnvironment};
pub use fixtures::{Fixture, page_shell, sample, sample_with};
pub use recorder::{BusRecorder, Recorded};

/// Route `tracing` output to the test writer, filtered by `JGUI_LOG`.
///
/// Safe to call from every test; only the first call installs.
pub fn init_logging() {
    let _ = jgui_core::logging::init_for_tests();
}

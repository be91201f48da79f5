//! Loudcheck Core - Known-answer conformance testing for EBU R128 meters
//!
//! This library drives a loudness measurement library through a fixed battery
//! of synthetic test vectors and compares its momentary, short-term,
//! integrated, loudness-range, and peak readings against reference values
//! derived from ITU-R BS.1770 and EBU Tech 3341/3342.
//!
//! The library under test is reached only through the [`meter::MeterBackend`]
//! and [`meter::Meter`] traits, so the same battery can be pointed at any
//! conforming implementation.

pub mod audio;
pub mod config;
pub mod harness;
pub mod meter;
pub mod stats;

pub use audio::signal::{ChannelLayout, SignalSpec, Step};
pub use config::{BackendKind, HarnessConfig};
pub use harness::battery::standard_battery;
pub use harness::compare::{ComparisonMismatch, Tolerance};
pub use harness::runner::{cross_validate, HarnessError, Runner};
pub use harness::vector::{Expectation, Feed, MetricCheck, TestVector};
pub use meter::{Meter, MeterBackend, MeterConfig, MetricKind, MetricSet};
pub use stats::summary::{
    report, write_report, Failure, Measurement, ResultRecord, Summary, Verdict,
};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Date the core crate was built, set by `build.rs`
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Default sample rate for generated test vectors
pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

/// Default relative tolerance for cross-vector and cross-backend comparisons
pub const DEFAULT_RELATIVE_TOLERANCE: f64 = 1e-4;

/// Process exit code when every vector passed
pub const EXIT_SUCCESS: i32 = 0;

/// Process exit code when at least one vector failed
pub const EXIT_FAILURE: i32 = 1;

/// Process exit code for invalid arguments or configuration
pub const EXIT_USAGE: i32 = 2;

/// Process exit code when the library under test broke its contract
pub const EXIT_CONTRACT_VIOLATION: i32 = 3;

//! Loudcheck - Known-answer conformance harness for EBU R128 loudness meters
//!
//! This library re-exports the capability seam, signal generation, test
//! battery, and runner from `loudcheck-core`.

pub use loudcheck_core::audio;
pub use loudcheck_core::config;
pub use loudcheck_core::harness;
pub use loudcheck_core::meter;
pub use loudcheck_core::stats;

pub use loudcheck_core::{
    cross_validate, report, standard_battery, write_report, BackendKind, HarnessConfig,
    HarnessError, MetricKind, ResultRecord, Runner, SignalSpec, Summary, TestVector, Tolerance,
    Verdict,
};
pub use loudcheck_core::{
    BUILD_DATE, DEFAULT_RELATIVE_TOLERANCE, DEFAULT_SAMPLE_RATE, EXIT_CONTRACT_VIOLATION,
    EXIT_FAILURE, EXIT_SUCCESS, EXIT_USAGE, VERSION,
};

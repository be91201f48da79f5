//! E2E tests for analyzer lifecycle
//!
//! Every meter the harness creates must be released exactly once, whether
//! or not any frames were fed, and configurations the library refuses must
//! leave nothing behind.

use loudcheck::harness::vector::Expectation;
use loudcheck::meter::ebur128_rs::Ebur128Backend;
use loudcheck::meter::ledger::{HandleLedger, MeterHandle};
use loudcheck::meter::{MeterBackend, MeterConfig, MetricSet, SetupError};
use loudcheck::{standard_battery, Runner};

/// Test create/destroy without samples for every valid battery configuration
#[test]
fn test_acquire_release_without_samples() {
    let backend = Ebur128Backend::new();
    let ledger = HandleLedger::new();
    let mut expected = 0;

    for vector in standard_battery() {
        if vector.expectation == Expectation::SetupError {
            continue;
        }
        let handle = MeterHandle::acquire(&backend, &vector.meter_config(), &ledger);
        assert!(handle.is_ok(), "{} should be accepted", vector.name);
        expected += 1;
        drop(handle);
        assert_eq!(ledger.live(), 0, "{} left a meter alive", vector.name);
        assert_eq!(backend.live_meters(), 0, "{} left library state behind", vector.name);
    }

    assert_eq!(ledger.acquired(), expected);
    assert_eq!(ledger.released(), expected);
    assert!(ledger.is_balanced());
}

/// Test that the library refuses invalid channel counts without leaving state
#[test]
fn test_invalid_channels_are_setup_errors() {
    let backend = Ebur128Backend::new();
    let ledger = HandleLedger::new();

    for channels in [0, 65, 1000] {
        let config = MeterConfig::new(channels, 48000, MetricSet::all());
        let result = MeterHandle::acquire(&backend, &config, &ledger);
        assert!(
            matches!(result, Err(SetupError::Rejected(_))),
            "{} channels should be refused",
            channels
        );
    }

    assert_eq!(ledger.acquired(), 0);
    assert_eq!(ledger.rejected(), 3);
    assert!(ledger.is_balanced());
    assert_eq!(backend.live_meters(), 0);
}

/// Test that the library refuses invalid sample rates without leaving state
#[test]
fn test_invalid_sample_rates_are_setup_errors() {
    let backend = Ebur128Backend::new();
    let ledger = HandleLedger::new();

    for rate in [0, 15, 2_822_401] {
        let config = MeterConfig::new(2, rate, MetricSet::all());
        let result = MeterHandle::acquire(&backend, &config, &ledger);
        assert!(
            matches!(result, Err(SetupError::Rejected(_))),
            "{} Hz should be refused",
            rate
        );
    }

    assert_eq!(ledger.acquired(), 0);
    assert_eq!(backend.live_meters(), 0);
}

/// Test that running every vector through one ledger leaves it balanced
#[test]
fn test_battery_leaves_ledger_balanced() {
    let backend = Ebur128Backend::new();
    let runner = Runner::new(&backend).with_filter("-");
    let ledger = HandleLedger::new();
    let mut records = Vec::new();

    for vector in runner.vectors() {
        let record = runner.run_vector(vector, &records, &ledger).unwrap();
        records.push(record);
        assert!(ledger.is_balanced());
        assert_eq!(backend.live_meters(), 0);
    }

    assert_eq!(ledger.rejected(), 2);
    assert_eq!(ledger.acquired() + ledger.rejected(), records.len() as u64);
}

/// Test that many meters can be alive at once and are all released
#[test]
fn test_concurrent_handles_release_in_any_order() {
    let backend = Ebur128Backend::new();
    let ledger = HandleLedger::new();
    let config = MeterConfig::new(2, 48000, MetricSet::all());

    let mut handles: Vec<MeterHandle> = (0..8)
        .map(|_| MeterHandle::acquire(&backend, &config, &ledger).unwrap())
        .collect();
    assert_eq!(ledger.live(), 8);

    handles.swap(0, 7);
    handles.truncate(3);
    assert_eq!(ledger.live(), 3);
    assert_eq!(backend.live_meters(), 3);

    drop(handles);
    assert!(ledger.is_balanced());
    assert_eq!(backend.live_meters(), 0);
}

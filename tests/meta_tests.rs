//! Meta-tests that verify test suite integrity
//!
//! These tests ensure that:
//! - No tests are ignored
//! - Sources use plain `// ====` section rules
//! - E2E test files exist
//! - The standard battery keeps covering every metric and edge case

use loudcheck::harness::vector::{Expectation, Feed};
use loudcheck::{standard_battery, MetricKind};

/// Rust sources under `dirs` whose text contains `marker`
fn sources_containing(dirs: &[&str], marker: &str) -> Vec<String> {
    let mut offenders = Vec::new();

    for dir in dirs {
        let mut stack = vec![std::path::PathBuf::from(dir)];
        while let Some(path) = stack.pop() {
            if path.is_dir() {
                for entry in std::fs::read_dir(&path).expect("Failed to read directory") {
                    stack.push(entry.expect("Failed to read entry").path());
                }
            } else if path.extension().is_some_and(|e| e == "rs") {
                let text = std::fs::read_to_string(&path).expect("Failed to read source");
                if text.contains(marker) {
                    offenders.push(path.display().to_string());
                }
            }
        }
    }

    offenders
}

/// Verify no test source carries an ignore attribute
///
/// Ignored tests can hide regressions. All tests must run.
#[test]
fn no_ignored_tests() {
    let offenders = sources_containing(
        &["tests", "crates/loudcheck-core/src"],
        concat!("#[", "ignore"),
    );

    assert!(
        offenders.is_empty(),
        "Found ignored tests in: {}",
        offenders.join(", ")
    );
}

/// Verify section comments use `// ====` rules, not box-drawing banners
#[test]
fn no_box_drawing_banners() {
    let offenders = sources_containing(
        &["src", "tests", "benches", "crates/loudcheck-core/src"],
        "\u{2500}",
    );

    assert!(
        offenders.is_empty(),
        "Found box-drawing banners in: {}",
        offenders.join(", ")
    );
}

/// Verify E2E test files exist and are not empty
#[test]
fn e2e_tests_exist() {
    let test_files = [
        "e2e_battery.rs",
        "e2e_cli.rs",
        "e2e_failures.rs",
        "e2e_lifecycle.rs",
        "e2e_properties.rs",
        "e2e_reference.rs",
    ];

    for file in test_files {
        let path = format!("tests/{}", file);
        let full_path = std::path::Path::new(&path);

        assert!(
            full_path.exists(),
            "Missing E2E test file: {}. All E2E tests must be present.",
            file
        );

        let metadata = std::fs::metadata(full_path).expect("Failed to get file metadata");
        assert!(
            metadata.len() > 100,
            "E2E test file {} appears to be empty or too small ({} bytes)",
            file,
            metadata.len()
        );
    }
}

// ============================================================================
// BATTERY COVERAGE
// ============================================================================

/// Verify every metric has at least one known-answer check
#[test]
fn battery_checks_every_metric() {
    let battery = standard_battery();
    for metric in MetricKind::ALL {
        let checked = battery
            .iter()
            .any(|v| v.checks().iter().any(|c| c.metric == metric));
        assert!(checked, "No known-answer check for {}", metric);
    }
}

/// Verify the edge cases stay in the battery
#[test]
fn battery_covers_edge_cases() {
    let battery = standard_battery();

    assert!(
        battery.iter().any(|v| v.frames() == 0 && v.channels > 0),
        "Battery needs a zero-length vector"
    );
    assert!(
        battery.iter().any(|v| v.sample_rate != 48000 && v.sample_rate > 0),
        "Battery needs a vector at another sample rate"
    );
    assert!(
        battery
            .iter()
            .filter(|v| v.expectation == Expectation::SetupError)
            .count()
            >= 2,
        "Battery needs invalid-configuration vectors"
    );
    assert!(
        battery
            .iter()
            .any(|v| v.consistent_with.is_some() && v.feed != Feed::Whole),
        "Battery needs a chunk-invariance vector"
    );
    assert!(
        battery
            .iter()
            .any(|v| v.consistent_with.is_some() && v.feed == Feed::Whole),
        "Battery needs a mode-independence vector"
    );
}

/// Verify silence checks use -inf rather than a finite floor
#[test]
fn battery_silence_is_negative_infinity() {
    let battery = standard_battery();
    let silence = battery
        .iter()
        .find(|v| v.name == "stereo-silence")
        .expect("Battery lost its silence vector");
    let integrated = silence
        .checks()
        .iter()
        .find(|c| c.metric == MetricKind::Integrated)
        .expect("Silence vector lost its integrated check");
    assert_eq!(integrated.expected, f64::NEG_INFINITY);
}

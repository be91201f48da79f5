//! Conformance runner
//!
//! Executes test vectors one at a time against a [`MeterBackend`]. Each
//! vector gets a fresh meter that is released before the next one starts.
//! Mismatches and library errors are recorded and the run continues; a NaN
//! reading or a meter whose library state outlives its release aborts the run.

use crate::audio::signal::render;
use crate::harness::battery::standard_battery;
use crate::harness::compare::Tolerance;
use crate::harness::vector::{Expectation, TestVector};
use crate::meter::ledger::{HandleLedger, MeterHandle};
use crate::meter::{MeterBackend, SetupError};
use crate::stats::summary::{Failure, Measurement, ResultRecord, Summary, Verdict};
use crate::DEFAULT_RELATIVE_TOLERANCE;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that stop a harness run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HarnessError {
    /// The library under test broke an invariant the harness relies on
    #[error("Contract violation: {0}")]
    ContractViolation(String),
}

/// What happened between acquiring and releasing a vector's meter
enum Outcome {
    Rejected(SetupError),
    Created {
        measurements: Vec<Measurement>,
        failures: Vec<Failure>,
    },
}

/// Runs a battery of vectors against one backend
pub struct Runner<'b> {
    backend: &'b dyn MeterBackend,
    vectors: Vec<TestVector>,
    consistency: Tolerance,
}

impl<'b> Runner<'b> {
    /// Runner over the standard battery
    pub fn new(backend: &'b dyn MeterBackend) -> Self {
        Self::with_vectors(backend, standard_battery())
    }

    /// Runner over a custom vector table
    pub fn with_vectors(backend: &'b dyn MeterBackend, vectors: Vec<TestVector>) -> Self {
        Self {
            backend,
            vectors,
            consistency: Tolerance::relative(DEFAULT_RELATIVE_TOLERANCE),
        }
    }

    /// Relative tolerance for `consistent_with` comparisons
    pub fn with_relative_tolerance(mut self, fraction: f64) -> Self {
        self.consistency = Tolerance::relative(fraction);
        self
    }

    /// Keep only vectors whose name contains `pattern`
    ///
    /// Vectors they are checked against are kept as well. Order is preserved.
    pub fn with_filter(mut self, pattern: &str) -> Self {
        let mut keep: HashSet<String> = self
            .vectors
            .iter()
            .filter(|v| v.name.contains(pattern))
            .map(|v| v.name.clone())
            .collect();

        loop {
            let referenced: Vec<String> = self
                .vectors
                .iter()
                .filter(|v| keep.contains(&v.name))
                .filter_map(|v| v.consistent_with.clone())
                .filter(|r| !keep.contains(r))
                .collect();
            if referenced.is_empty() {
                break;
            }
            keep.extend(referenced);
        }

        self.vectors.retain(|v| keep.contains(&v.name));
        self
    }

    pub fn vectors(&self) -> &[TestVector] {
        &self.vectors
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Run every vector in order with a fresh ledger
    pub fn run_all_tests(&self) -> Result<Summary, HarnessError> {
        let ledger = HandleLedger::new();
        let mut summary = Summary::new(self.backend.name());

        info!(
            backend = self.backend.name(),
            vectors = self.vectors.len(),
            "Starting conformance run"
        );

        for vector in &self.vectors {
            let record = self.run_vector(vector, &summary.records, &ledger)?;
            summary.records.push(record);
        }

        info!(
            passed = summary.passed(),
            failed = summary.failed(),
            meters = ledger.acquired(),
            rejected = ledger.rejected(),
            "Conformance run finished"
        );
        Ok(summary)
    }

    /// Run one vector; `prior` holds the records of vectors already run
    pub fn run_vector(
        &self,
        vector: &TestVector,
        prior: &[ResultRecord],
        ledger: &HandleLedger,
    ) -> Result<ResultRecord, HarnessError> {
        debug!(
            vector = %vector.name,
            channels = vector.channels,
            sample_rate = vector.sample_rate,
            signal = %vector.signal,
            "Running vector"
        );

        let live_before = self.backend.live_meters();
        let outcome = self.measure(vector, ledger);

        let live_after = self.backend.live_meters();
        if live_after != live_before {
            return Err(HarnessError::ContractViolation(format!(
                "{}: {} library meters still alive after release",
                vector.name,
                live_after.saturating_sub(live_before)
            )));
        }

        let (measurements, mut failures) = match (outcome, &vector.expectation) {
            (Outcome::Rejected(_), Expectation::SetupError) => (Vec::new(), Vec::new()),
            (Outcome::Rejected(e), Expectation::Metrics(_)) => (Vec::new(), vec![Failure::Setup(e)]),
            (Outcome::Created { measurements, .. }, Expectation::SetupError) => {
                (measurements, vec![Failure::UnexpectedSetup])
            }
            (
                Outcome::Created {
                    measurements,
                    failures,
                },
                Expectation::Metrics(_),
            ) => (measurements, failures),
        };

        if let Some(m) = measurements.iter().find(|m| m.value.is_nan()) {
            return Err(HarnessError::ContractViolation(format!(
                "{}: {} is NaN",
                vector.name, m.metric
            )));
        }

        for check in vector.checks() {
            let Some(actual) = measurements.iter().find(|m| m.metric == check.metric) else {
                // The query failure is already recorded
                continue;
            };
            if let Err(mismatch) = check.tolerance.check(check.metric, check.expected, actual.value)
            {
                failures.push(Failure::Mismatch(mismatch));
            }
        }

        if let Some(reference) = &vector.consistent_with {
            failures.extend(self.compare_with(reference, &measurements, prior));
        }

        let record = ResultRecord {
            name: vector.name.clone(),
            measurements,
            verdict: Verdict::from_failures(failures),
        };

        if let Verdict::Fail(failures) = &record.verdict {
            for failure in failures {
                warn!(vector = %record.name, "{}", failure);
            }
        }

        Ok(record)
    }

    /// Run the battery `passes` times and require identical records
    ///
    /// Returns the summary of the first pass.
    pub fn run_passes(&self, passes: usize) -> Result<Summary, HarnessError> {
        let first = self.run_all_tests()?;

        for pass in 2..=passes {
            let next = self.run_all_tests()?;
            let differing = first
                .records
                .iter()
                .zip(&next.records)
                .find(|(a, b)| a != b)
                .map(|(a, _)| a.name.clone());
            if let Some(name) = differing {
                return Err(HarnessError::ContractViolation(format!(
                    "pass {} disagrees with pass 1 on {}",
                    pass, name
                )));
            }
            debug!(pass, "Pass matches the first one");
        }

        Ok(first)
    }

    /// Acquire, feed and query; the handle is released before returning
    fn measure(&self, vector: &TestVector, ledger: &HandleLedger) -> Outcome {
        let mut handle = match MeterHandle::acquire(self.backend, &vector.meter_config(), ledger) {
            Ok(handle) => handle,
            Err(e) => {
                debug!(vector = %vector.name, error = %e, "Meter creation refused");
                return Outcome::Rejected(e);
            }
        };

        let channels = (vector.channels as usize).max(1);
        let samples = render(
            &vector.signal,
            vector.layout,
            vector.channels,
            vector.sample_rate,
        );

        let mut offset = 0;
        for frames in vector.feed.split(samples.len() / channels) {
            let end = offset + frames * channels;
            if let Err(e) = handle.add_frames(&samples[offset..end]) {
                return Outcome::Created {
                    measurements: Vec::new(),
                    failures: vec![Failure::Processing(e)],
                };
            }
            offset = end;
        }

        let mut measurements = Vec::with_capacity(vector.metrics.len());
        let mut failures = Vec::new();
        for metric in vector.metrics.iter() {
            match handle.query(metric) {
                Ok(value) => measurements.push(Measurement { metric, value }),
                Err(e) => failures.push(Failure::Query(e)),
            }
        }

        Outcome::Created {
            measurements,
            failures,
        }
    }

    /// Compare every reading against the same metric of an earlier record
    ///
    /// A reading the reference never took is a failure, so a reference that
    /// failed before measuring cannot vouch for anything.
    fn compare_with(
        &self,
        reference: &str,
        measurements: &[Measurement],
        prior: &[ResultRecord],
    ) -> Vec<Failure> {
        let Some(record) = prior.iter().find(|r| r.name == reference) else {
            return vec![Failure::MissingReference(reference.to_string())];
        };

        measurements
            .iter()
            .filter_map(|m| {
                let Some(expected) = record.value(m.metric) else {
                    return Some(Failure::MissingReference(format!(
                        "{} for {}",
                        reference, m.metric
                    )));
                };
                self.consistency
                    .check(m.metric, expected, m.value)
                    .err()
                    .map(|mismatch| Failure::Inconsistent {
                        reference: reference.to_string(),
                        mismatch,
                    })
            })
            .collect()
    }
}

/// Run `vectors` on both backends and compare every candidate reading
/// against the reference reading of the same vector
///
/// Each record passes when the candidate reproduces every reference reading
/// within `tolerance` and takes no reading the reference lacks.
pub fn cross_validate(
    reference: &dyn MeterBackend,
    candidate: &dyn MeterBackend,
    vectors: &[TestVector],
    tolerance: Tolerance,
) -> Result<Summary, HarnessError> {
    let expected = Runner::with_vectors(reference, vectors.to_vec()).run_all_tests()?;
    let actual = Runner::with_vectors(candidate, vectors.to_vec()).run_all_tests()?;

    let mut summary = Summary::new(&format!("{} vs {}", candidate.name(), reference.name()));

    for (want, got) in expected.records.iter().zip(&actual.records) {
        let mut failures = Vec::new();
        for m in &got.measurements {
            match want.value(m.metric) {
                Some(value) => {
                    if let Err(mismatch) = tolerance.check(m.metric, value, m.value) {
                        failures.push(Failure::Inconsistent {
                            reference: reference.name().to_string(),
                            mismatch,
                        });
                    }
                }
                None => failures.push(Failure::MissingReference(format!(
                    "{} for {}",
                    reference.name(),
                    m.metric
                ))),
            }
        }
        if want.measurements.len() > got.measurements.len() {
            for m in &want.measurements {
                if got.value(m.metric).is_none() {
                    failures.push(Failure::MissingReference(format!(
                        "{} for {}",
                        candidate.name(),
                        m.metric
                    )));
                }
            }
        }

        summary.records.push(ResultRecord {
            name: got.name.clone(),
            measurements: got.measurements.clone(),
            verdict: Verdict::from_failures(failures),
        });
    }

    info!(
        reference = reference.name(),
        candidate = candidate.name(),
        passed = summary.passed(),
        failed = summary.failed(),
        "Cross-validation finished"
    );
    Ok(summary)
}

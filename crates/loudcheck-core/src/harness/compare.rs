//! Tolerance-based comparison of metric values
//!
//! Loudness values live on a decibel scale, so the harness mixes an absolute
//! bound (LU or dB) for known-answer checks with a relative bound for
//! comparing two measurements of the same material.

use crate::meter::MetricKind;
use serde::Serialize;
use std::fmt;

/// Allowed deviation between an expected and an actual value
///
/// A value passes when `|actual - expected| <= max(absolute, relative * |expected|)`.
/// Infinities pass only when both sides are the same infinity; NaN never passes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tolerance {
    /// Bound in the metric's own unit
    pub absolute: f64,
    /// Bound as a fraction of the expected magnitude
    pub relative: f64,
}

impl Tolerance {
    /// Purely absolute bound
    pub fn absolute(bound: f64) -> Self {
        Self {
            absolute: bound,
            relative: 0.0,
        }
    }

    /// Relative bound with a tiny absolute floor so exact zeros still compare
    pub fn relative(fraction: f64) -> Self {
        Self {
            absolute: 1e-9,
            relative: fraction,
        }
    }

    /// Largest deviation allowed around `expected`
    pub fn bound(&self, expected: f64) -> f64 {
        self.absolute.max(self.relative * expected.abs())
    }

    /// Whether `actual` is within tolerance of `expected`
    pub fn allows(&self, expected: f64, actual: f64) -> bool {
        if expected.is_nan() || actual.is_nan() {
            return false;
        }
        if expected.is_infinite() || actual.is_infinite() {
            return expected == actual;
        }
        (actual - expected).abs() <= self.bound(expected)
    }

    /// Compare one metric reading, producing a mismatch record on failure
    pub fn check(
        &self,
        metric: MetricKind,
        expected: f64,
        actual: f64,
    ) -> Result<(), ComparisonMismatch> {
        if self.allows(expected, actual) {
            Ok(())
        } else {
            Err(ComparisonMismatch {
                metric,
                expected,
                actual,
                tolerance: *self,
            })
        }
    }
}

/// A metric reading outside its tolerance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonMismatch {
    pub metric: MetricKind,
    pub expected: f64,
    pub actual: f64,
    pub tolerance: Tolerance,
}

impl fmt::Display for ComparisonMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {:.4} {} (±{:.4}), got {:.4}",
            self.metric,
            self.expected,
            self.metric.unit(),
            self.tolerance.bound(self.expected),
            self.actual
        )
    }
}

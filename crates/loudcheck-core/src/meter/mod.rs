//! Capability seam between the harness and the loudness library under test
//!
//! The harness only ever talks to a library through two traits:
//! - [`MeterBackend`] creates analyzer instances for a channel/rate/metric configuration
//! - [`Meter`] accepts interleaved frames and answers metric queries
//!
//! Releasing a meter is its `Drop`. Backends:
//! - [`ebur128_rs::Ebur128Backend`] wraps the `ebur128` crate (default)
//! - [`libebur128::LibEbur128Backend`] links the system C library (`libebur128` feature)

pub mod ebur128_rs;
pub mod ledger;
#[cfg(feature = "libebur128")]
pub mod libebur128;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A single reading the harness can request from a meter
///
/// Loudness windows are reported in LUFS, loudness range in LU, and peak
/// readings in dBTP/dBFS (maximum over all channels, `-inf` for silence).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// 400 ms sliding window
    Momentary,
    /// 3 s sliding window
    ShortTerm,
    /// Gated program loudness
    Integrated,
    /// Statistical spread of short-term loudness
    LoudnessRange,
    /// Oversampled peak
    TruePeak,
    /// Raw sample peak
    SamplePeak,
}

impl MetricKind {
    /// Every metric, in reporting order
    pub const ALL: [MetricKind; 6] = [
        MetricKind::Momentary,
        MetricKind::ShortTerm,
        MetricKind::Integrated,
        MetricKind::LoudnessRange,
        MetricKind::TruePeak,
        MetricKind::SamplePeak,
    ];

    /// Short label used in report lines
    pub fn label(&self) -> &'static str {
        match self {
            MetricKind::Momentary => "momentary",
            MetricKind::ShortTerm => "short-term",
            MetricKind::Integrated => "integrated",
            MetricKind::LoudnessRange => "range",
            MetricKind::TruePeak => "true-peak",
            MetricKind::SamplePeak => "sample-peak",
        }
    }

    /// Unit the metric is reported in
    pub fn unit(&self) -> &'static str {
        match self {
            MetricKind::Momentary | MetricKind::ShortTerm | MetricKind::Integrated => "LUFS",
            MetricKind::LoudnessRange => "LU",
            MetricKind::TruePeak => "dBTP",
            MetricKind::SamplePeak => "dBFS",
        }
    }

    fn bit(&self) -> u8 {
        1 << (*self as u8)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Set of metrics requested from a meter at creation time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MetricSet(u8);

impl MetricSet {
    /// No metrics
    pub fn empty() -> Self {
        Self(0)
    }

    /// Every metric in [`MetricKind::ALL`]
    pub fn all() -> Self {
        Self::of(&MetricKind::ALL)
    }

    /// Set containing exactly the given metrics
    pub fn of(kinds: &[MetricKind]) -> Self {
        kinds.iter().fold(Self::empty(), |set, kind| set.with(*kind))
    }

    /// Copy of this set with `kind` added
    pub fn with(self, kind: MetricKind) -> Self {
        Self(self.0 | kind.bit())
    }

    pub fn contains(&self, kind: MetricKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterate the contained metrics in reporting order
    pub fn iter(&self) -> impl Iterator<Item = MetricKind> + '_ {
        MetricKind::ALL.into_iter().filter(|kind| self.contains(*kind))
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }
}

/// Configuration an analyzer instance is created for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeterConfig {
    /// Number of interleaved channels
    pub channels: u32,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Metrics the meter must be able to answer
    pub metrics: MetricSet,
}

impl MeterConfig {
    pub fn new(channels: u32, sample_rate: u32, metrics: MetricSet) -> Self {
        Self {
            channels,
            sample_rate,
            metrics,
        }
    }

    /// Reject configurations no library mode can express
    ///
    /// Channel and rate limits are left to the library under test.
    pub fn validate(&self) -> Result<(), SetupError> {
        if self.metrics.is_empty() {
            return Err(SetupError::NoMetrics);
        }
        Ok(())
    }
}

/// The library rejected an analyzer configuration
///
/// No resource exists when this is returned, so there is nothing to release.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum SetupError {
    #[error("No metrics requested")]
    NoMetrics,

    #[error("Library rejected configuration: {0}")]
    Rejected(String),
}

/// Feeding frames into a meter failed
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum ProcessingError {
    #[error("Buffer of {samples} samples is not a whole number of {channels}-channel frames")]
    PartialFrame { samples: usize, channels: u32 },

    #[error("Library failed to process frames: {0}")]
    Rejected(String),
}

/// A metric could not be read from a meter
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
pub enum QueryError {
    #[error("Metric {0} was not requested at creation")]
    NotRequested(MetricKind),

    #[error("Library failed to report {metric}: {reason}")]
    Rejected { metric: MetricKind, reason: String },
}

/// A live analyzer instance owned by one test vector
pub trait Meter {
    /// Feed interleaved frames; the slice length must be a multiple of the channel count
    fn add_frames(&mut self, interleaved: &[f32]) -> Result<(), ProcessingError>;

    /// Read one metric from the current state
    fn query(&self, kind: MetricKind) -> Result<f64, QueryError>;
}

/// Factory for analyzer instances of one loudness library
pub trait MeterBackend {
    /// Stable name used in reports
    fn name(&self) -> &str;

    /// Create an analyzer for the given configuration
    fn create(&self, config: &MeterConfig) -> Result<Box<dyn Meter>, SetupError>;

    /// Library states created by this backend that have not been destroyed yet
    fn live_meters(&self) -> usize;
}

/// Convert a linear peak amplitude to decibels
pub fn linear_to_db(value: f64) -> f64 {
    if value <= 0.0 {
        f64::NEG_INFINITY
    } else {
        20.0 * value.log10()
    }
}

/// Check that an interleaved buffer holds whole frames
pub(crate) fn check_whole_frames(samples: usize, channels: u32) -> Result<(), ProcessingError> {
    if channels == 0 || samples % channels as usize != 0 {
        return Err(ProcessingError::PartialFrame { samples, channels });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_set_membership() {
        let set = MetricSet::of(&[MetricKind::Integrated, MetricKind::TruePeak]);
        assert!(set.contains(MetricKind::Integrated));
        assert!(set.contains(MetricKind::TruePeak));
        assert!(!set.contains(MetricKind::Momentary));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_metric_set_all_iterates_in_order() {
        let kinds: Vec<MetricKind> = MetricSet::all().iter().collect();
        assert_eq!(kinds, MetricKind::ALL.to_vec());
    }

    #[test]
    fn test_config_validation() {
        let metrics = MetricSet::all();
        assert!(MeterConfig::new(2, 48000, metrics).validate().is_ok());
        // Out-of-range channels and rates are the library's call
        assert!(MeterConfig::new(0, 48000, metrics).validate().is_ok());
        assert!(MeterConfig::new(2, 0, metrics).validate().is_ok());
        assert_eq!(
            MeterConfig::new(2, 48000, MetricSet::empty()).validate(),
            Err(SetupError::NoMetrics)
        );
    }

    #[test]
    fn test_linear_to_db() {
        assert_eq!(linear_to_db(1.0), 0.0);
        assert_eq!(linear_to_db(0.0), f64::NEG_INFINITY);
        assert!((linear_to_db(0.5) - -6.0206).abs() < 1e-4);
    }

    #[test]
    fn test_whole_frames() {
        assert!(check_whole_frames(6, 2).is_ok());
        assert!(check_whole_frames(0, 2).is_ok());
        assert_eq!(
            check_whole_frames(5, 2),
            Err(ProcessingError::PartialFrame {
                samples: 5,
                channels: 2
            })
        );
    }
}

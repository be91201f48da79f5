//! Test vector records
//!
//! A [`TestVector`] describes one scenario end to end: the analyzer
//! configuration, the programme material, how it is chunked on the way into
//! the meter, and what the readings must be.

use crate::audio::signal::{frame_count, ChannelLayout, SignalSpec};
use crate::harness::compare::Tolerance;
use crate::meter::{MeterConfig, MetricKind, MetricSet};

/// Frame counts cycled through by [`Feed::irregular`]
pub const IRREGULAR_PATTERN: [usize; 6] = [1, 7, 64, 333, 1000, 4801];

/// How rendered frames are handed to the meter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feed {
    /// One call with every frame
    Whole,
    /// Fixed-size chunks of this many frames (the last one may be shorter)
    Chunks(usize),
    /// Chunk sizes cycled from the pattern
    Irregular(Vec<usize>),
}

impl Feed {
    /// Irregular feed using [`IRREGULAR_PATTERN`]
    pub fn irregular() -> Self {
        Feed::Irregular(IRREGULAR_PATTERN.to_vec())
    }

    /// Frame counts of each call for `total_frames` frames
    ///
    /// Always yields at least one entry, so zero-length material still
    /// produces one (empty) call into the meter.
    pub fn split(&self, total_frames: usize) -> Vec<usize> {
        let pattern: Vec<usize> = match self {
            Feed::Whole => return vec![total_frames],
            Feed::Chunks(0) => return vec![total_frames],
            Feed::Chunks(n) => vec![*n],
            Feed::Irregular(pattern) => pattern.iter().copied().filter(|&n| n > 0).collect(),
        };
        if pattern.is_empty() || total_frames == 0 {
            return vec![total_frames];
        }

        let mut sizes = Vec::new();
        let mut remaining = total_frames;
        for &size in pattern.iter().cycle() {
            if remaining == 0 {
                break;
            }
            let take = size.min(remaining);
            sizes.push(take);
            remaining -= take;
        }
        sizes
    }
}

/// One known-answer check on a metric
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricCheck {
    pub metric: MetricKind,
    pub expected: f64,
    pub tolerance: Tolerance,
}

/// What a vector must produce
#[derive(Debug, Clone, PartialEq)]
pub enum Expectation {
    /// The meter is created and every listed check holds
    Metrics(Vec<MetricCheck>),
    /// The library refuses the configuration
    SetupError,
}

/// An immutable test scenario
#[derive(Debug, Clone, PartialEq)]
pub struct TestVector {
    /// Unique name used in reports and filters
    pub name: String,
    /// Interleaved channel count
    pub channels: u32,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Programme material
    pub signal: SignalSpec,
    /// Which channels carry the signal
    pub layout: ChannelLayout,
    /// Chunking strategy
    pub feed: Feed,
    /// Metrics requested at creation and read after feeding
    pub metrics: MetricSet,
    /// Required outcome
    pub expectation: Expectation,
    /// Earlier vector whose readings this one must reproduce
    pub consistent_with: Option<String>,
}

impl TestVector {
    /// A vector requesting every metric, fed whole, with no checks yet
    pub fn new(name: &str, channels: u32, sample_rate: u32, signal: SignalSpec) -> Self {
        Self {
            name: name.to_string(),
            channels,
            sample_rate,
            signal,
            layout: ChannelLayout::All,
            feed: Feed::Whole,
            metrics: MetricSet::all(),
            expectation: Expectation::Metrics(Vec::new()),
            consistent_with: None,
        }
    }

    pub fn layout(mut self, layout: ChannelLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn feed(mut self, feed: Feed) -> Self {
        self.feed = feed;
        self
    }

    /// Request only these metrics
    pub fn metrics(mut self, metrics: &[MetricKind]) -> Self {
        self.metrics = MetricSet::of(metrics);
        self
    }

    /// Add a known-answer check; the metric is requested if it was not already
    pub fn expect(mut self, metric: MetricKind, expected: f64, tolerance: Tolerance) -> Self {
        self.metrics = self.metrics.with(metric);
        let check = MetricCheck {
            metric,
            expected,
            tolerance,
        };
        match &mut self.expectation {
            Expectation::Metrics(checks) => checks.push(check),
            Expectation::SetupError => self.expectation = Expectation::Metrics(vec![check]),
        }
        self
    }

    /// Require the library to reject this configuration
    pub fn expect_setup_error(mut self) -> Self {
        self.expectation = Expectation::SetupError;
        self
    }

    /// Require every reading to match the named earlier vector
    pub fn consistent_with(mut self, reference: &str) -> Self {
        self.consistent_with = Some(reference.to_string());
        self
    }

    pub fn meter_config(&self) -> MeterConfig {
        MeterConfig::new(self.channels, self.sample_rate, self.metrics)
    }

    /// Known-answer checks, empty for setup-error vectors
    pub fn checks(&self) -> &[MetricCheck] {
        match &self.expectation {
            Expectation::Metrics(checks) => checks,
            Expectation::SetupError => &[],
        }
    }

    /// Frames the signal renders to at this vector's rate
    pub fn frames(&self) -> usize {
        frame_count(&self.signal, self.sample_rate)
    }
}

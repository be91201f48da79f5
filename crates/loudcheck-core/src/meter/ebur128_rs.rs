//! Backend over the `ebur128` crate

use super::{
    check_whole_frames, linear_to_db, Meter, MeterBackend, MeterConfig, MetricKind, MetricSet,
    ProcessingError, QueryError, SetupError,
};
use super::ledger::{LiveMeters, LiveToken};
use ::ebur128::{EbuR128, Mode};

/// Backend name used in reports
pub const BACKEND_NAME: &str = "ebur128";

/// Creates meters backed by [`EbuR128`]
///
/// Clones share one live-meter count.
#[derive(Debug, Default, Clone)]
pub struct Ebur128Backend {
    live: LiveMeters,
}

impl Ebur128Backend {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Library mode flags needed to answer every metric in `metrics`
pub fn mode_for(metrics: MetricSet) -> Mode {
    metrics.iter().fold(Mode::empty(), |mode, kind| {
        mode | match kind {
            MetricKind::Momentary => Mode::M,
            MetricKind::ShortTerm => Mode::S,
            MetricKind::Integrated => Mode::I,
            MetricKind::LoudnessRange => Mode::LRA,
            MetricKind::TruePeak => Mode::TRUE_PEAK,
            MetricKind::SamplePeak => Mode::SAMPLE_PEAK,
        }
    })
}

impl MeterBackend for Ebur128Backend {
    fn name(&self) -> &str {
        BACKEND_NAME
    }

    fn create(&self, config: &MeterConfig) -> Result<Box<dyn Meter>, SetupError> {
        config.validate()?;

        let state = EbuR128::new(config.channels, config.sample_rate, mode_for(config.metrics))
            .map_err(|e| SetupError::Rejected(e.to_string()))?;

        tracing::trace!(
            channels = config.channels,
            sample_rate = config.sample_rate,
            "Created ebur128 meter"
        );

        Ok(Box::new(Ebur128Meter {
            state,
            channels: config.channels,
            metrics: config.metrics,
            _live: self.live.track(),
        }))
    }

    fn live_meters(&self) -> usize {
        self.live.count()
    }
}

/// One [`EbuR128`] state; dropping it releases all library buffers
pub struct Ebur128Meter {
    state: EbuR128,
    channels: u32,
    metrics: MetricSet,
    // Declared after `state` so it drops after the buffers are gone
    _live: LiveToken,
}

impl Ebur128Meter {
    /// Largest per-channel peak in dB
    fn peak_db<F>(&self, kind: MetricKind, read: F) -> Result<f64, QueryError>
    where
        F: Fn(&EbuR128, u32) -> Result<f64, ::ebur128::Error>,
    {
        let mut peak = 0.0f64;
        for channel in 0..self.channels {
            let value = read(&self.state, channel).map_err(|e| rejected(kind, e))?;
            peak = peak.max(value);
        }
        Ok(linear_to_db(peak))
    }
}

impl Meter for Ebur128Meter {
    fn add_frames(&mut self, interleaved: &[f32]) -> Result<(), ProcessingError> {
        check_whole_frames(interleaved.len(), self.channels)?;
        if interleaved.is_empty() {
            return Ok(());
        }
        self.state
            .add_frames_f32(interleaved)
            .map_err(|e| ProcessingError::Rejected(format!("{:?}", e)))
    }

    fn query(&self, kind: MetricKind) -> Result<f64, QueryError> {
        if !self.metrics.contains(kind) {
            return Err(QueryError::NotRequested(kind));
        }

        let value = match kind {
            MetricKind::Momentary => self.state.loudness_momentary(),
            MetricKind::ShortTerm => self.state.loudness_shortterm(),
            MetricKind::Integrated => self.state.loudness_global(),
            MetricKind::LoudnessRange => self.state.loudness_range(),
            MetricKind::TruePeak => return self.peak_db(kind, |s, c| s.true_peak(c)),
            MetricKind::SamplePeak => return self.peak_db(kind, |s, c| s.sample_peak(c)),
        };
        value.map_err(|e| rejected(kind, e))
    }
}

fn rejected(metric: MetricKind, error: ::ebur128::Error) -> QueryError {
    QueryError::Rejected {
        metric,
        reason: format!("{:?}", error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sine(channels: usize, sample_rate: u32, amplitude: f32, seconds: f32) -> Vec<f32> {
        let frames = (sample_rate as f32 * seconds) as usize;
        let mut out = Vec::with_capacity(frames * channels);
        for i in 0..frames {
            let phase = 2.0 * std::f64::consts::PI * 1000.0 * i as f64 / sample_rate as f64;
            let sample = amplitude * phase.sin() as f32;
            out.extend(std::iter::repeat(sample).take(channels));
        }
        out
    }

    #[test]
    fn test_mode_for_subset() {
        let mode = mode_for(MetricSet::of(&[MetricKind::Integrated]));
        assert!(mode.contains(Mode::I));
        assert!(!mode.contains(Mode::LRA));
        assert!(!mode.contains(Mode::TRUE_PEAK));
    }

    #[test]
    fn test_library_rejects_zero_channels() {
        let backend = Ebur128Backend::new();
        let result = backend.create(&MeterConfig::new(0, 48000, MetricSet::all()));
        assert!(matches!(result, Err(SetupError::Rejected(_))));
        assert_eq!(backend.live_meters(), 0);
    }

    #[test]
    fn test_library_rejects_out_of_range_configs() {
        let backend = Ebur128Backend::new();
        for (channels, rate) in [(65, 48000), (2, 0), (2, 15), (2, 2_822_401)] {
            let result = backend.create(&MeterConfig::new(channels, rate, MetricSet::all()));
            assert!(
                matches!(result, Err(SetupError::Rejected(_))),
                "{} channels at {} Hz should be refused",
                channels,
                rate
            );
        }
        assert_eq!(backend.live_meters(), 0);
    }

    #[test]
    fn test_empty_metric_set_is_refused() {
        let backend = Ebur128Backend::new();
        let result = backend.create(&MeterConfig::new(2, 48000, MetricSet::empty()));
        assert!(matches!(result, Err(SetupError::NoMetrics)));
    }

    #[test]
    fn test_drop_destroys_state() {
        let backend = Ebur128Backend::new();
        let meter = backend
            .create(&MeterConfig::new(2, 48000, MetricSet::all()))
            .unwrap();
        assert_eq!(backend.live_meters(), 1);
        drop(meter);
        assert_eq!(backend.live_meters(), 0);
    }

    #[test]
    fn test_stereo_sine_integrated() {
        let backend = Ebur128Backend::new();
        let mut meter = backend
            .create(&MeterConfig::new(2, 48000, MetricSet::all()))
            .unwrap();

        let amplitude = 10f32.powf(-23.0 / 20.0);
        meter.add_frames(&sine(2, 48000, amplitude, 5.0)).unwrap();

        let integrated = meter.query(MetricKind::Integrated).unwrap();
        assert_abs_diff_eq!(integrated, -23.0, epsilon = 0.1);
    }

    #[test]
    fn test_unrequested_metric() {
        let backend = Ebur128Backend::new();
        let meter = backend
            .create(&MeterConfig::new(
                1,
                48000,
                MetricSet::of(&[MetricKind::Integrated]),
            ))
            .unwrap();

        assert_eq!(
            meter.query(MetricKind::LoudnessRange),
            Err(QueryError::NotRequested(MetricKind::LoudnessRange))
        );
    }

    #[test]
    fn test_partial_frame_rejected() {
        let backend = Ebur128Backend::new();
        let mut meter = backend
            .create(&MeterConfig::new(2, 48000, MetricSet::all()))
            .unwrap();

        let result = meter.add_frames(&[0.0, 0.0, 0.0]);
        assert!(matches!(result, Err(ProcessingError::PartialFrame { .. })));
    }

    #[test]
    fn test_fresh_meter_reports_silence() {
        let backend = Ebur128Backend::new();
        let meter = backend
            .create(&MeterConfig::new(2, 48000, MetricSet::all()))
            .unwrap();

        assert_eq!(
            meter.query(MetricKind::Integrated).unwrap(),
            f64::NEG_INFINITY
        );
        assert_eq!(meter.query(MetricKind::TruePeak).unwrap(), f64::NEG_INFINITY);
    }
}

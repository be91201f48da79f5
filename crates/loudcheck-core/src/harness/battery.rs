//! The standard known-answer battery
//!
//! Reference values follow from the ITU-R BS.1770 definition of loudness
//! and the EBU Tech 3341 (loudness) and Tech 3342 (loudness range) minimum
//! requirement cases:
//! - a 1 kHz sine with peak amplitude `A` in one front channel measures
//!   `20*log10(A) - 3.01` LUFS; the same sine in both stereo channels measures
//!   `20*log10(A)` LUFS
//! - surround channels carry a +1.5 dB weight and the LFE slot is excluded
//! - Tech 3341/3342 tolerances are ±0.1 LU for loudness and ±1 LU for range
//!
//! Order matters only for reports: vectors that name a `consistent_with`
//! reference always come after it.

use crate::audio::noise::DEFAULT_NOISE_SEED;
use crate::audio::signal::{ChannelLayout, SignalSpec, Step};
use crate::harness::compare::Tolerance;
use crate::harness::vector::{Feed, TestVector};
use crate::DEFAULT_SAMPLE_RATE as RATE;
use crate::meter::MetricKind::{
    Integrated, LoudnessRange, Momentary, SamplePeak, ShortTerm, TruePeak,
};

/// Loudness tolerance from EBU Tech 3341 (LU)
pub const LOUDNESS_TOLERANCE_LU: f64 = 0.1;

/// Loudness range tolerance from EBU Tech 3342 (LU)
pub const RANGE_TOLERANCE_LU: f64 = 1.0;

/// True-peak tolerance (dB)
pub const TRUE_PEAK_TOLERANCE_DB: f64 = 0.2;

/// Sample-peak tolerance (dB), only covers f32 rounding of the generator
pub const SAMPLE_PEAK_TOLERANCE_DB: f64 = 0.05;

/// Loudness of a full-scale 1 kHz sine in a single front channel (LUFS)
pub const MONO_FULL_SCALE_SINE_LUFS: f64 = -3.01;

/// Measured loudness of the default-seed stereo noise vector at -6.02 dBFS (LUFS)
pub const STEREO_NOISE_LUFS: f64 = -4.64;

/// Peak level giving a linear amplitude of one half (dBFS)
const HALF_SCALE_DBFS: f64 = -6.0206;

fn loudness() -> Tolerance {
    Tolerance::absolute(LOUDNESS_TOLERANCE_LU)
}

fn range() -> Tolerance {
    Tolerance::absolute(RANGE_TOLERANCE_LU)
}

fn stereo_steps(name: &str, steps: &[(f64, f64)]) -> TestVector {
    let steps = steps
        .iter()
        .map(|&(level, seconds)| Step::new(level, seconds))
        .collect();
    TestVector::new(name, 2, RATE, SignalSpec::Steps(steps))
}

fn lra_vector(name: &str, steps: &[(f64, f64)], expected: f64) -> TestVector {
    stereo_steps(name, steps)
        .metrics(&[LoudnessRange])
        .expect(LoudnessRange, expected, range())
}

/// Build the full battery in its fixed execution order
pub fn standard_battery() -> Vec<TestVector> {
    let mono_sine = SignalSpec::tone(0.0, 20.0);
    let stereo_sine = SignalSpec::tone(-23.0, 20.0);
    let quarter_rate_sine = SignalSpec::Sine {
        freq_hz: 12000.0,
        level_dbfs: HALF_SCALE_DBFS,
        phase_deg: 45.0,
        seconds: 2.0,
    };
    let noise = SignalSpec::Noise {
        level_dbfs: HALF_SCALE_DBFS,
        seconds: 10.0,
        seed: DEFAULT_NOISE_SEED,
    };

    vec![
        // Single front channel, full scale
        TestVector::new("mono-sine-full-scale", 1, RATE, mono_sine.clone())
            .expect(Integrated, MONO_FULL_SCALE_SINE_LUFS, loudness())
            .expect(Momentary, MONO_FULL_SCALE_SINE_LUFS, loudness())
            .expect(ShortTerm, MONO_FULL_SCALE_SINE_LUFS, loudness())
            .expect(TruePeak, 0.0, Tolerance::absolute(TRUE_PEAK_TOLERANCE_DB))
            .expect(SamplePeak, 0.0, Tolerance::absolute(SAMPLE_PEAK_TOLERANCE_DB)),
        TestVector::new("mono-sine-full-scale-chunked", 1, RATE, mono_sine.clone())
            .feed(Feed::Chunks(1024))
            .consistent_with("mono-sine-full-scale"),
        TestVector::new("mono-sine-full-scale-irregular", 1, RATE, mono_sine)
            .feed(Feed::irregular())
            .consistent_with("mono-sine-full-scale"),
        // Tech 3341 case 1
        TestVector::new("stereo-sine-23", 2, RATE, stereo_sine.clone())
            .expect(Integrated, -23.0, loudness())
            .expect(Momentary, -23.0, loudness())
            .expect(ShortTerm, -23.0, loudness()),
        TestVector::new("stereo-sine-23-integrated-only", 2, RATE, stereo_sine)
            .metrics(&[Integrated])
            .consistent_with("stereo-sine-23"),
        // Tech 3341 case 2
        TestVector::new("stereo-sine-33", 2, RATE, SignalSpec::tone(-33.0, 20.0))
            .metrics(&[Integrated])
            .expect(Integrated, -33.0, loudness()),
        // Tech 3341 case 3, relative gate
        stereo_steps(
            "stereo-relative-gate",
            &[(-36.0, 10.0), (-23.0, 60.0), (-36.0, 10.0)],
        )
        .metrics(&[Integrated])
        .expect(Integrated, -23.0, loudness()),
        // Tech 3341 case 4, absolute and relative gate
        stereo_steps(
            "stereo-absolute-gate",
            &[
                (-72.0, 10.0),
                (-36.0, 10.0),
                (-23.0, 60.0),
                (-36.0, 10.0),
                (-72.0, 10.0),
            ],
        )
        .metrics(&[Integrated])
        .expect(Integrated, -23.0, loudness()),
        // Tech 3341 case 5
        stereo_steps(
            "stereo-level-steps",
            &[(-26.0, 20.0), (-20.0, 20.1), (-26.0, 20.0)],
        )
        .metrics(&[Integrated])
        .expect(Integrated, -23.0, loudness()),
        TestVector::new("stereo-sine-23-44k1", 2, 44100, SignalSpec::tone(-23.0, 20.0))
            .metrics(&[Integrated])
            .expect(Integrated, -23.0, loudness()),
        // 5.1 order: L R C LFE Ls Rs
        TestVector::new("surround-left-surround-only", 6, RATE, SignalSpec::tone(-20.0, 10.0))
            .layout(ChannelLayout::Only(4))
            .metrics(&[Integrated])
            .expect(Integrated, -21.51, loudness()),
        TestVector::new("surround-lfe-only", 6, RATE, SignalSpec::tone(-20.0, 10.0))
            .layout(ChannelLayout::Only(3))
            .metrics(&[Integrated])
            .expect(Integrated, f64::NEG_INFINITY, loudness()),
        // Tech 3342 cases 1-4
        lra_vector("range-20-30", &[(-20.0, 20.0), (-30.0, 20.0)], 10.0),
        lra_vector("range-20-15", &[(-20.0, 20.0), (-15.0, 20.0)], 5.0),
        lra_vector("range-40-20", &[(-40.0, 20.0), (-20.0, 20.0)], 20.0),
        lra_vector(
            "range-five-steps",
            &[
                (-50.0, 20.0),
                (-35.0, 20.0),
                (-20.0, 20.0),
                (-35.0, 20.0),
                (-50.0, 20.0),
            ],
            15.0,
        ),
        // Peak falls between samples: sample peak is 3 dB under the true peak
        TestVector::new("true-peak-inter-sample", 2, RATE, quarter_rate_sine.clone())
            .metrics(&[TruePeak, SamplePeak, Integrated])
            .expect(TruePeak, HALF_SCALE_DBFS, Tolerance::absolute(TRUE_PEAK_TOLERANCE_DB))
            .expect(
                SamplePeak,
                HALF_SCALE_DBFS - 3.0103,
                Tolerance::absolute(SAMPLE_PEAK_TOLERANCE_DB),
            ),
        TestVector::new("true-peak-only", 2, RATE, quarter_rate_sine)
            .metrics(&[TruePeak])
            .consistent_with("true-peak-inter-sample"),
        TestVector::new("stereo-noise", 2, RATE, noise.clone())
            .expect(Integrated, STEREO_NOISE_LUFS, loudness()),
        TestVector::new("stereo-noise-chunked", 2, RATE, noise)
            .feed(Feed::Chunks(4800))
            .consistent_with("stereo-noise"),
        // Silence is unmeasurable: integrated and peaks are -inf, range is 0
        TestVector::new("stereo-silence", 2, RATE, SignalSpec::Silence { seconds: 10.0 })
            .expect(Integrated, f64::NEG_INFINITY, loudness())
            .expect(LoudnessRange, 0.0, range())
            .expect(TruePeak, f64::NEG_INFINITY, loudness()),
        TestVector::new("stereo-zero-length", 2, RATE, SignalSpec::Silence { seconds: 0.0 })
            .expect(Integrated, f64::NEG_INFINITY, loudness())
            .expect(TruePeak, f64::NEG_INFINITY, loudness()),
        TestVector::new("invalid-zero-channels", 0, RATE, SignalSpec::tone(-23.0, 1.0))
            .expect_setup_error(),
        TestVector::new("invalid-zero-sample-rate", 2, 0, SignalSpec::tone(-23.0, 1.0))
            .expect_setup_error(),
    ]
}

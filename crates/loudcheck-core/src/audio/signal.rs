//! Synthetic programme material for known-answer vectors
//!
//! Signals are described by a [`SignalSpec`] and rendered into interleaved
//! `f32` frames. Levels are peak levels in dBFS, so a full-scale sine is
//! `0.0` and a sine at `-23.0` has amplitude `10^(-23/20)`.

use crate::audio::noise::NoiseGenerator;
use std::f64::consts::PI;
use std::fmt;

/// Default tone frequency for loudness vectors (Hz)
pub const REFERENCE_TONE_HZ: f64 = 1000.0;

/// One constant-level segment of a [`SignalSpec::Steps`] signal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    /// Peak level in dBFS
    pub level_dbfs: f64,
    /// Duration in seconds
    pub seconds: f64,
}

impl Step {
    pub fn new(level_dbfs: f64, seconds: f64) -> Self {
        Self {
            level_dbfs,
            seconds,
        }
    }
}

/// Rule for generating the samples of one channel
#[derive(Debug, Clone, PartialEq)]
pub enum SignalSpec {
    /// Digital silence
    Silence { seconds: f64 },
    /// Steady sine tone
    Sine {
        freq_hz: f64,
        level_dbfs: f64,
        phase_deg: f64,
        seconds: f64,
    },
    /// Reference-frequency sine stepping through levels; phase is continuous
    Steps(Vec<Step>),
    /// Deterministic white noise scaled to a peak level
    Noise {
        level_dbfs: f64,
        seconds: f64,
        seed: u32,
    },
}

impl SignalSpec {
    /// A reference-frequency sine at zero phase
    pub fn tone(level_dbfs: f64, seconds: f64) -> Self {
        SignalSpec::Sine {
            freq_hz: REFERENCE_TONE_HZ,
            level_dbfs,
            phase_deg: 0.0,
            seconds,
        }
    }

    /// Total duration in seconds
    pub fn seconds(&self) -> f64 {
        match self {
            SignalSpec::Silence { seconds }
            | SignalSpec::Sine { seconds, .. }
            | SignalSpec::Noise { seconds, .. } => *seconds,
            SignalSpec::Steps(steps) => steps.iter().map(|s| s.seconds).sum(),
        }
    }

    /// Render one channel of this signal
    pub fn render_mono(&self, sample_rate: u32) -> Vec<f32> {
        match self {
            SignalSpec::Silence { seconds } => vec![0.0; frames_for(*seconds, sample_rate)],
            SignalSpec::Sine {
                freq_hz,
                level_dbfs,
                phase_deg,
                seconds,
            } => {
                let amplitude = db_to_amplitude(*level_dbfs);
                let phase = phase_deg.to_radians();
                (0..frames_for(*seconds, sample_rate))
                    .map(|n| sine_sample(*freq_hz, amplitude, phase, n, sample_rate))
                    .collect()
            }
            SignalSpec::Steps(steps) => {
                let mut out = Vec::with_capacity(frame_count(self, sample_rate));
                for step in steps {
                    let amplitude = db_to_amplitude(step.level_dbfs);
                    let start = out.len();
                    let end = start + frames_for(step.seconds, sample_rate);
                    out.extend(
                        (start..end)
                            .map(|n| sine_sample(REFERENCE_TONE_HZ, amplitude, 0.0, n, sample_rate)),
                    );
                }
                out
            }
            SignalSpec::Noise {
                level_dbfs,
                seconds,
                seed,
            } => {
                let amplitude = db_to_amplitude(*level_dbfs) as f32;
                let mut gen = NoiseGenerator::new(*seed);
                let mut out = vec![0.0f32; frames_for(*seconds, sample_rate)];
                gen.fill_buffer(&mut out);
                for sample in out.iter_mut() {
                    *sample *= amplitude;
                }
                out
            }
        }
    }
}

impl fmt::Display for SignalSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalSpec::Silence { seconds } => write!(f, "silence {}s", seconds),
            SignalSpec::Sine {
                freq_hz,
                level_dbfs,
                phase_deg,
                seconds,
            } => write!(
                f,
                "sine {}Hz {}dBFS {}deg {}s",
                freq_hz, level_dbfs, phase_deg, seconds
            ),
            SignalSpec::Steps(steps) => {
                let parts: Vec<String> = steps
                    .iter()
                    .map(|s| format!("{}dBFS/{}s", s.level_dbfs, s.seconds))
                    .collect();
                write!(f, "steps {}", parts.join(" "))
            }
            SignalSpec::Noise {
                level_dbfs,
                seconds,
                seed,
            } => write!(f, "noise {}dBFS {}s seed={:#x}", level_dbfs, seconds, seed),
        }
    }
}

/// Which channels carry the signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    /// Identical signal in every channel
    All,
    /// Signal in one channel (0-based), silence elsewhere
    Only(u32),
}

/// Number of frames `spec` renders to at `sample_rate`
pub fn frame_count(spec: &SignalSpec, sample_rate: u32) -> usize {
    match spec {
        SignalSpec::Steps(steps) => steps
            .iter()
            .map(|s| frames_for(s.seconds, sample_rate))
            .sum(),
        other => frames_for(other.seconds(), sample_rate),
    }
}

/// Render `spec` into interleaved frames for `channels` channels
///
/// A layout naming a channel outside `0..channels` renders silence.
pub fn render(spec: &SignalSpec, layout: ChannelLayout, channels: u32, sample_rate: u32) -> Vec<f32> {
    let mono = spec.render_mono(sample_rate);
    let channels = channels as usize;
    let mut out = vec![0.0f32; mono.len() * channels];

    for (frame, &sample) in out.chunks_exact_mut(channels.max(1)).zip(&mono) {
        match layout {
            ChannelLayout::All => frame.fill(sample),
            ChannelLayout::Only(index) => {
                if let Some(slot) = frame.get_mut(index as usize) {
                    *slot = sample;
                }
            }
        }
    }

    out
}

/// Convert a peak level in dBFS to linear amplitude
pub fn db_to_amplitude(level_dbfs: f64) -> f64 {
    10f64.powf(level_dbfs / 20.0)
}

fn frames_for(seconds: f64, sample_rate: u32) -> usize {
    (seconds * sample_rate as f64).round().max(0.0) as usize
}

fn sine_sample(freq_hz: f64, amplitude: f64, phase: f64, n: usize, sample_rate: u32) -> f32 {
    (amplitude * (2.0 * PI * freq_hz * n as f64 / sample_rate as f64 + phase).sin()) as f32
}

//! Backend over the system libebur128 C library
//!
//! The library is linked by name and resolved by the platform's dynamic
//! loader, exactly as a C consumer built against `libebur128.pc` would be.

use super::{
    check_whole_frames, linear_to_db, Meter, MeterBackend, MeterConfig, MetricKind, MetricSet,
    ProcessingError, QueryError, SetupError,
};
use super::ledger::{LiveMeters, LiveToken};
use std::ffi::{c_int, c_uint, c_ulong};
use std::ptr::NonNull;

/// Backend name used in reports
pub const BACKEND_NAME: &str = "libebur128";

// ============================================================================
// FFI BINDINGS
// ============================================================================

const EBUR128_SUCCESS: c_int = 0;

const EBUR128_MODE_M: c_int = 1 << 0;
const EBUR128_MODE_S: c_int = (1 << 1) | EBUR128_MODE_M;
const EBUR128_MODE_I: c_int = (1 << 2) | EBUR128_MODE_M;
const EBUR128_MODE_LRA: c_int = (1 << 3) | EBUR128_MODE_S;
const EBUR128_MODE_SAMPLE_PEAK: c_int = (1 << 4) | EBUR128_MODE_M;
const EBUR128_MODE_TRUE_PEAK: c_int = (1 << 5) | EBUR128_MODE_M | EBUR128_MODE_SAMPLE_PEAK;

/// Opaque `ebur128_state`
#[repr(C)]
struct RawState {
    _private: [u8; 0],
}

unsafe extern "C" {
    fn ebur128_init(channels: c_uint, samplerate: c_ulong, mode: c_int) -> *mut RawState;
    fn ebur128_destroy(st: *mut *mut RawState);
    fn ebur128_add_frames_float(st: *mut RawState, src: *const f32, frames: usize) -> c_int;
    fn ebur128_loudness_global(st: *mut RawState, out: *mut f64) -> c_int;
    fn ebur128_loudness_momentary(st: *mut RawState, out: *mut f64) -> c_int;
    fn ebur128_loudness_shortterm(st: *mut RawState, out: *mut f64) -> c_int;
    fn ebur128_loudness_range(st: *mut RawState, out: *mut f64) -> c_int;
    fn ebur128_sample_peak(st: *mut RawState, channel_number: c_uint, out: *mut f64) -> c_int;
    fn ebur128_true_peak(st: *mut RawState, channel_number: c_uint, out: *mut f64) -> c_int;
}

// ============================================================================
// BACKEND
// ============================================================================

/// Library mode flags needed to answer every metric in `metrics`
fn mode_for(metrics: MetricSet) -> c_int {
    metrics.iter().fold(0, |mode, kind| {
        mode | match kind {
            MetricKind::Momentary => EBUR128_MODE_M,
            MetricKind::ShortTerm => EBUR128_MODE_S,
            MetricKind::Integrated => EBUR128_MODE_I,
            MetricKind::LoudnessRange => EBUR128_MODE_LRA,
            MetricKind::TruePeak => EBUR128_MODE_TRUE_PEAK,
            MetricKind::SamplePeak => EBUR128_MODE_SAMPLE_PEAK,
        }
    })
}

/// Creates meters backed by `ebur128_state` instances
#[derive(Debug, Default, Clone)]
pub struct LibEbur128Backend {
    live: LiveMeters,
}

impl LibEbur128Backend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MeterBackend for LibEbur128Backend {
    fn name(&self) -> &str {
        BACKEND_NAME
    }

    fn create(&self, config: &MeterConfig) -> Result<Box<dyn Meter>, SetupError> {
        config.validate()?;

        // SAFETY: plain value arguments; a NULL return owns nothing
        let raw = unsafe {
            ebur128_init(
                config.channels as c_uint,
                config.sample_rate as c_ulong,
                mode_for(config.metrics),
            )
        };
        let state = NonNull::new(raw)
            .ok_or_else(|| SetupError::Rejected("ebur128_init returned NULL".to_string()))?;

        Ok(Box::new(LibEbur128Meter {
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

/// One `ebur128_state`, destroyed exactly once in `Drop`
pub struct LibEbur128Meter {
    state: NonNull<RawState>,
    channels: u32,
    metrics: MetricSet,
    // Fields drop after `ebur128_destroy` has run
    _live: LiveToken,
}

impl LibEbur128Meter {
    fn read(
        &self,
        kind: MetricKind,
        call: unsafe extern "C" fn(*mut RawState, *mut f64) -> c_int,
    ) -> Result<f64, QueryError> {
        let mut out = 0.0f64;
        // SAFETY: state is live until Drop and `out` outlives the call
        let code = unsafe { call(self.state.as_ptr(), &mut out) };
        check(kind, code)?;
        Ok(out)
    }

    fn peak_db(
        &self,
        kind: MetricKind,
        call: unsafe extern "C" fn(*mut RawState, c_uint, *mut f64) -> c_int,
    ) -> Result<f64, QueryError> {
        let mut peak = 0.0f64;
        for channel in 0..self.channels {
            let mut out = 0.0f64;
            // SAFETY: channel index is below the count the state was created with
            let code = unsafe { call(self.state.as_ptr(), channel as c_uint, &mut out) };
            check(kind, code)?;
            peak = peak.max(out);
        }
        Ok(linear_to_db(peak))
    }
}

impl Meter for LibEbur128Meter {
    fn add_frames(&mut self, interleaved: &[f32]) -> Result<(), ProcessingError> {
        check_whole_frames(interleaved.len(), self.channels)?;
        let frames = interleaved.len() / self.channels as usize;
        if frames == 0 {
            return Ok(());
        }

        // SAFETY: the slice holds exactly `frames * channels` samples
        let code = unsafe {
            ebur128_add_frames_float(self.state.as_ptr(), interleaved.as_ptr(), frames)
        };
        if code != EBUR128_SUCCESS {
            return Err(ProcessingError::Rejected(format!("error code {}", code)));
        }
        Ok(())
    }

    fn query(&self, kind: MetricKind) -> Result<f64, QueryError> {
        if !self.metrics.contains(kind) {
            return Err(QueryError::NotRequested(kind));
        }

        match kind {
            MetricKind::Momentary => self.read(kind, ebur128_loudness_momentary),
            MetricKind::ShortTerm => self.read(kind, ebur128_loudness_shortterm),
            MetricKind::Integrated => self.read(kind, ebur128_loudness_global),
            MetricKind::LoudnessRange => self.read(kind, ebur128_loudness_range),
            MetricKind::TruePeak => self.peak_db(kind, ebur128_true_peak),
            MetricKind::SamplePeak => self.peak_db(kind, ebur128_sample_peak),
        }
    }
}

impl Drop for LibEbur128Meter {
    fn drop(&mut self) {
        let mut raw = self.state.as_ptr();
        // SAFETY: created by ebur128_init and never freed before; the library
        // nulls the pointer it is handed
        unsafe { ebur128_destroy(&mut raw) };
        debug_assert!(raw.is_null());
    }
}

fn check(metric: MetricKind, code: c_int) -> Result<(), QueryError> {
    if code == EBUR128_SUCCESS {
        Ok(())
    } else {
        Err(QueryError::Rejected {
            metric,
            reason: format!("error code {}", code),
        })
    }
}

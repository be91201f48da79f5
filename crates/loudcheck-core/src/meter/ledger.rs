//! Scoped ownership of analyzer instances
//!
//! Every meter the harness creates goes through [`MeterHandle::acquire`],
//! which registers it in a [`HandleLedger`]. The handle releases the meter
//! and records the release in `Drop`, so a vector that returns early on any
//! error still leaves the ledger balanced.
//!
//! Backends keep their own [`LiveMeters`] count, bumped when the library
//! state is created and dropped only after the library has destroyed it.
//! The runner compares that count before and after each vector, so a meter
//! whose release frees nothing in the library is caught.

use super::{Meter, MeterBackend, MeterConfig, MetricKind, ProcessingError, QueryError, SetupError};
use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Library states a backend has created and not yet destroyed
#[derive(Debug, Default, Clone)]
pub struct LiveMeters(Arc<AtomicUsize>);

impl LiveMeters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a new library state; dropping the token uncounts it
    pub fn track(&self) -> LiveToken {
        self.0.fetch_add(1, Ordering::SeqCst);
        LiveToken(Arc::clone(&self.0))
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Held by a meter next to its library state; must drop after the state
#[derive(Debug)]
pub struct LiveToken(Arc<AtomicUsize>);

impl Drop for LiveToken {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Counts meter acquisitions and releases for one harness run
#[derive(Debug, Default)]
pub struct HandleLedger {
    acquired: Cell<u64>,
    released: Cell<u64>,
    rejected: Cell<u64>,
}

impl HandleLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Meters created so far
    pub fn acquired(&self) -> u64 {
        self.acquired.get()
    }

    /// Meters released so far
    pub fn released(&self) -> u64 {
        self.released.get()
    }

    /// Creation attempts the backend refused
    pub fn rejected(&self) -> u64 {
        self.rejected.get()
    }

    /// Meters currently alive
    pub fn live(&self) -> u64 {
        self.acquired.get().saturating_sub(self.released.get())
    }

    /// True when every acquired meter was released exactly once
    pub fn is_balanced(&self) -> bool {
        self.acquired.get() == self.released.get()
    }
}

/// An owned meter that releases itself exactly once
pub struct MeterHandle<'a> {
    meter: Box<dyn Meter>,
    ledger: &'a HandleLedger,
}

impl<'a> MeterHandle<'a> {
    /// Create a meter through `backend` and register it in `ledger`
    ///
    /// A refused configuration produces no handle and nothing to release.
    pub fn acquire(
        backend: &dyn MeterBackend,
        config: &MeterConfig,
        ledger: &'a HandleLedger,
    ) -> Result<Self, SetupError> {
        match backend.create(config) {
            Ok(meter) => {
                ledger.acquired.set(ledger.acquired.get() + 1);
                Ok(Self { meter, ledger })
            }
            Err(e) => {
                ledger.rejected.set(ledger.rejected.get() + 1);
                Err(e)
            }
        }
    }

    pub fn add_frames(&mut self, interleaved: &[f32]) -> Result<(), ProcessingError> {
        self.meter.add_frames(interleaved)
    }

    pub fn query(&self, kind: MetricKind) -> Result<f64, QueryError> {
        self.meter.query(kind)
    }
}

impl Drop for MeterHandle<'_> {
    fn drop(&mut self) {
        self.ledger.released.set(self.ledger.released.get() + 1);
    }
}

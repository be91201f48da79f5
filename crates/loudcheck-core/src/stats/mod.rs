//! Result records and run summaries
//!
//! Collects what each test vector measured and why it failed, and renders
//! the per-vector report and the JSON run report.

pub mod summary;

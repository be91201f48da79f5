//! Conformance harness
//!
//! - [`vector`]: test vector records and chunking strategies
//! - [`compare`]: tolerance checks on metric values
//! - [`battery`]: the standard known-answer table
//! - [`runner`]: executes vectors against a backend and cross-checks results

pub mod battery;
pub mod compare;
pub mod runner;
pub mod vector;

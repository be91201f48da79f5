//! Test signal generation
//!
//! This module renders the synthetic programme material fed to meters:
//! - Sine tones, level steps, and silence ([`signal`])
//! - Deterministic white noise ([`noise`])

pub mod noise;
pub mod signal;

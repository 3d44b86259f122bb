//! Shared utilities for integration tests

#![allow(dead_code)]

pub use approx::assert_relative_eq;

use qeb_core::NullSink;
use qeb_fit::HistogramAnalysisBuilder;

/// Relative tolerance for recovering coefficients from noisy data
pub const RECOVERY_TOLERANCE: f64 = 0.05;

/// Builder that discards diagnostics
pub fn quiet_builder() -> HistogramAnalysisBuilder {
    qeb_fit::HistogramAnalysis::builder().sink(NullSink)
}

/// Seeds used by the statistical tests
pub fn seeds() -> Vec<u64> {
    vec![1, 7, 42, 1234, 98765]
}

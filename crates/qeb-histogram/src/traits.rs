//! Core traits for histogram consumers

use crate::types::HistogramWithErrorBars;

/// A histogram that can be fed to the fitting pipeline
///
/// Implementors expose bin centers, bin values and per-bin uncertainties, and
/// know how to produce a normalized probability-density copy of themselves.
pub trait DensityHistogram {
    /// Bin centers on the figure-of-merit axis
    fn centers(&self) -> Vec<f64>;

    /// Bin values (counts or densities)
    fn densities(&self) -> &[f64];

    /// Per-bin uncertainties, same length as [`densities`](Self::densities)
    fn uncertainties(&self) -> &[f64];

    /// A copy normalized to a probability density
    fn to_normalized(&self) -> HistogramWithErrorBars;

    fn num_bins(&self) -> usize {
        self.densities().len()
    }
}

impl DensityHistogram for HistogramWithErrorBars {
    fn centers(&self) -> Vec<f64> {
        self.values_center()
    }

    fn densities(&self) -> &[f64] {
        self.bins()
    }

    fn uncertainties(&self) -> &[f64] {
        self.delta()
    }

    fn to_normalized(&self) -> HistogramWithErrorBars {
        self.normalized()
    }

    fn num_bins(&self) -> usize {
        HistogramWithErrorBars::num_bins(self)
    }
}

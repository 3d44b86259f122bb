//! Histogram building strategies
//!
//! Independent random walks each produce a histogram without error bars.
//! [`AveragedHistogramBuilder`] combines them into a single
//! [`HistogramWithErrorBars`] whose error bars are the standard error of the
//! mean across runs.

use crate::types::{HistogramParams, HistogramWithErrorBars};
use qeb_core::{Error, Result};

/// Averages several histograms sharing the same parameters
#[derive(Debug, Clone)]
pub struct AveragedHistogramBuilder {
    params: HistogramParams,
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
    off_chart: f64,
    num_histograms: usize,
}

impl AveragedHistogramBuilder {
    /// Create a new builder for histograms with the given parameters
    pub fn new(params: HistogramParams) -> Self {
        Self {
            params,
            sum: vec![0.0; params.num_bins],
            sum_sq: vec![0.0; params.num_bins],
            off_chart: 0.0,
            num_histograms: 0,
        }
    }

    /// Add one run's bin values and off-chart amount
    pub fn add_run(&mut self, bins: &[f64], off_chart: f64) -> Result<()> {
        if bins.len() != self.params.num_bins {
            return Err(Error::size_mismatch(
                self.params.num_bins,
                bins.len(),
                "averaged histogram run",
            ));
        }
        if bins.iter().any(|v| !v.is_finite()) || !off_chart.is_finite() {
            return Err(Error::non_finite("averaged histogram run"));
        }

        for ((s, s2), &v) in self.sum.iter_mut().zip(self.sum_sq.iter_mut()).zip(bins) {
            *s += v;
            *s2 += v * v;
        }
        self.off_chart += off_chart;
        self.num_histograms += 1;
        Ok(())
    }

    /// Add a histogram, ignoring its error bars
    pub fn add_histogram(&mut self, histogram: &HistogramWithErrorBars) -> Result<()> {
        if histogram.params() != &self.params {
            return Err(Error::InvalidInput(format!(
                "cannot average histogram {} with histograms {}",
                histogram.params(),
                self.params
            )));
        }
        self.add_run(histogram.bins(), histogram.off_chart())
    }

    /// Number of runs added so far
    pub fn num_histograms(&self) -> usize {
        self.num_histograms
    }

    /// Produce the averaged histogram
    ///
    /// `delta = sqrt((<X^2> - <X>^2) / (n - 1))` for each bin; at least two
    /// runs are required.
    pub fn finalize(&self) -> Result<HistogramWithErrorBars> {
        if self.num_histograms < 2 {
            return Err(Error::InsufficientData {
                expected: 2,
                actual: self.num_histograms,
            });
        }

        let n = self.num_histograms as f64;
        let bins: Vec<f64> = self.sum.iter().map(|s| s / n).collect();
        let delta: Vec<f64> = bins
            .iter()
            .zip(&self.sum_sq)
            .map(|(mean, s2)| ((s2 / n - mean * mean).max(0.0) / (n - 1.0)).sqrt())
            .collect();

        HistogramWithErrorBars::from_parts(self.params, bins, delta, self.off_chart / n)
    }
}

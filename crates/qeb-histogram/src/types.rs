//! Core types for histogram representation

use qeb_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Range and bin count of a histogram with uniform bins
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramParams {
    /// Left edge of the first bin
    pub min: f64,
    /// Right edge of the last bin
    pub max: f64,
    /// Number of bins
    pub num_bins: usize,
}

impl HistogramParams {
    /// Create validated histogram parameters
    pub fn new(min: f64, max: f64, num_bins: usize) -> Result<Self> {
        if num_bins == 0 {
            return Err(Error::InvalidParameter(
                "histogram must have at least one bin".to_string(),
            ));
        }
        if !min.is_finite() || !max.is_finite() {
            return Err(Error::non_finite("histogram range"));
        }
        if max <= min {
            return Err(Error::InvalidParameter(format!(
                "histogram range is empty: min={min}, max={max}"
            )));
        }
        Ok(Self { min, max, num_bins })
    }

    /// Width of a single bin
    pub fn bin_resolution(&self) -> f64 {
        (self.max - self.min) / self.num_bins as f64
    }

    /// Left edge of bin `index`
    pub fn bin_lower_value(&self, index: usize) -> f64 {
        self.min + index as f64 * self.bin_resolution()
    }

    /// Center of bin `index`
    pub fn bin_center_value(&self, index: usize) -> f64 {
        self.min + (index as f64 + 0.5) * self.bin_resolution()
    }

    /// Right edge of bin `index`
    pub fn bin_upper_value(&self, index: usize) -> f64 {
        self.min + (index + 1) as f64 * self.bin_resolution()
    }

    /// Centers of all bins
    pub fn values_center(&self) -> Vec<f64> {
        (0..self.num_bins).map(|i| self.bin_center_value(i)).collect()
    }

    /// Left edges of all bins
    pub fn values_lower(&self) -> Vec<f64> {
        (0..self.num_bins).map(|i| self.bin_lower_value(i)).collect()
    }

    /// Right edges of all bins
    pub fn values_upper(&self) -> Vec<f64> {
        (0..self.num_bins).map(|i| self.bin_upper_value(i)).collect()
    }

    /// Check if a value lies in `[min, max)`
    pub fn is_within_bounds(&self, value: f64) -> bool {
        value >= self.min && value < self.max
    }

    /// Index of the bin containing `value`, if any
    pub fn bin_index(&self, value: f64) -> Option<usize> {
        if !self.is_within_bounds(value) {
            return None;
        }
        let index = ((value - self.min) / self.bin_resolution()) as usize;
        Some(index.min(self.num_bins - 1))
    }
}

impl fmt::Display for HistogramParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.4}, {:.4}) in {} bins of width {:.4}",
            self.min,
            self.max,
            self.num_bins,
            self.bin_resolution()
        )
    }
}

/// A histogram with uniform bins, per-bin error bars and an off-chart amount
///
/// Bin values may be raw counts or densities; [`normalized`](Self::normalized)
/// turns either into a probability density.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramWithErrorBars {
    params: HistogramParams,
    bins: Vec<f64>,
    delta: Vec<f64>,
    off_chart: f64,
}

impl HistogramWithErrorBars {
    /// Create an empty histogram (all bins zero)
    pub fn new(min: f64, max: f64, num_bins: usize) -> Result<Self> {
        Ok(Self::with_params(HistogramParams::new(min, max, num_bins)?))
    }

    /// Create an empty histogram from already validated parameters
    pub fn with_params(params: HistogramParams) -> Self {
        Self {
            params,
            bins: vec![0.0; params.num_bins],
            delta: vec![0.0; params.num_bins],
            off_chart: 0.0,
        }
    }

    /// Create a histogram from its bin values and error bars
    pub fn from_parts(
        params: HistogramParams,
        bins: Vec<f64>,
        delta: Vec<f64>,
        off_chart: f64,
    ) -> Result<Self> {
        let mut histogram = Self::with_params(params);
        histogram.load(&bins, &delta, off_chart)?;
        Ok(histogram)
    }

    /// Replace bin values, error bars and off-chart amount
    pub fn load(&mut self, bins: &[f64], delta: &[f64], off_chart: f64) -> Result<()> {
        let n = self.params.num_bins;
        if bins.len() != n {
            return Err(Error::size_mismatch(n, bins.len(), "histogram bins"));
        }
        if delta.len() != n {
            return Err(Error::size_mismatch(n, delta.len(), "histogram error bars"));
        }
        validate_non_negative(bins, "histogram bins")?;
        validate_non_negative(delta, "histogram error bars")?;
        if !off_chart.is_finite() || off_chart < 0.0 {
            return Err(Error::InvalidInput(format!(
                "off-chart amount must be finite and non-negative, got {off_chart}"
            )));
        }

        self.bins.copy_from_slice(bins);
        self.delta.copy_from_slice(delta);
        self.off_chart = off_chart;
        Ok(())
    }

    /// Reset all bins, error bars and the off-chart amount to zero
    pub fn reset(&mut self) {
        self.bins.iter_mut().for_each(|b| *b = 0.0);
        self.delta.iter_mut().for_each(|d| *d = 0.0);
        self.off_chart = 0.0;
    }

    pub fn params(&self) -> &HistogramParams {
        &self.params
    }

    pub fn min(&self) -> f64 {
        self.params.min
    }

    pub fn max(&self) -> f64 {
        self.params.max
    }

    pub fn num_bins(&self) -> usize {
        self.params.num_bins
    }

    pub fn bin_resolution(&self) -> f64 {
        self.params.bin_resolution()
    }

    /// Bin values
    pub fn bins(&self) -> &[f64] {
        &self.bins
    }

    /// Per-bin error bars
    pub fn delta(&self) -> &[f64] {
        &self.delta
    }

    pub fn off_chart(&self) -> f64 {
        self.off_chart
    }

    /// Value of bin `index`
    pub fn count(&self, index: usize) -> Option<f64> {
        self.bins.get(index).copied()
    }

    /// Error bar of bin `index`
    pub fn error_bar(&self, index: usize) -> Option<f64> {
        self.delta.get(index).copied()
    }

    pub fn values_center(&self) -> Vec<f64> {
        self.params.values_center()
    }

    pub fn values_lower(&self) -> Vec<f64> {
        self.params.values_lower()
    }

    pub fn values_upper(&self) -> Vec<f64> {
        self.params.values_upper()
    }

    /// Largest bin value
    pub fn max_value(&self) -> f64 {
        self.bins.iter().copied().fold(0.0, f64::max)
    }

    /// Index of the largest bin value (first one on ties)
    pub fn argmax(&self) -> usize {
        let mut best = 0;
        for (i, &v) in self.bins.iter().enumerate() {
            if v > self.bins[best] {
                best = i;
            }
        }
        best
    }

    /// Sum of all bin values
    pub fn total_counts(&self) -> f64 {
        self.bins.iter().sum()
    }

    /// Factor dividing the bins to obtain a probability density
    ///
    /// `off_chart + bin_resolution * sum(bins)`
    pub fn normalization(&self) -> f64 {
        self.off_chart + self.bin_resolution() * self.total_counts()
    }

    /// Create a normalized copy whose bins form a probability density
    ///
    /// Error bars and the off-chart amount are scaled by the same factor. A
    /// histogram whose normalization is zero is returned unchanged.
    pub fn normalized(&self) -> Self {
        let mut normalized = self.clone();
        let factor = self.normalization();
        if factor > 0.0 {
            normalized.bins.iter_mut().for_each(|b| *b /= factor);
            normalized.delta.iter_mut().for_each(|d| *d /= factor);
            normalized.off_chart /= factor;
        }
        normalized
    }
}

impl fmt::Display for HistogramWithErrorBars {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "HistogramWithErrorBars({} bins, range=[{:.4}, {:.4}], off_chart={:.4})",
            self.num_bins(),
            self.min(),
            self.max(),
            self.off_chart
        )
    }
}

fn validate_non_negative(values: &[f64], context: &str) -> Result<()> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(Error::non_finite(context));
    }
    if let Some(v) = values.iter().find(|&&v| v < 0.0) {
        return Err(Error::InvalidInput(format!(
            "{context} must be non-negative, found {v}"
        )));
    }
    Ok(())
}

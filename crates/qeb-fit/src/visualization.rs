//! Plot data for a fitted histogram
//!
//! Rendering is left to a [`FitVisualizer`] implementation; this module only
//! computes the series to draw: the histogram with its error bars, the
//! smooth fit curve and optionally the deskewed Gaussian.

use qeb_core::Result;
use serde::{Deserialize, Serialize};

/// What to include in a plot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotOptions {
    /// Use a logarithmic y axis
    pub log_scale: bool,
    /// Label of the figure-of-merit axis
    pub xlabel: String,
    /// Also draw `exp(-(x - x0)^2 / Delta^2 + y0)`
    pub plot_deskewed_gaussian: bool,
    /// Number of points of the smooth curves
    pub curve_npts: usize,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            log_scale: false,
            xlabel: "Distribution of values".to_string(),
            plot_deskewed_gaussian: true,
            curve_npts: 200,
        }
    }
}

impl PlotOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log_scale(mut self, log_scale: bool) -> Self {
        self.log_scale = log_scale;
        self
    }

    pub fn xlabel(mut self, xlabel: impl Into<String>) -> Self {
        self.xlabel = xlabel.into();
        self
    }

    pub fn plot_deskewed_gaussian(mut self, plot: bool) -> Self {
        self.plot_deskewed_gaussian = plot;
        self
    }

    pub fn curve_npts(mut self, curve_npts: usize) -> Self {
        self.curve_npts = curve_npts;
        self
    }
}

/// One series of points on the figure-of-merit axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotSeries {
    pub label: String,
    pub f: Vec<f64>,
    pub p: Vec<f64>,
    /// Error bars, for data series
    pub err: Option<Vec<f64>>,
}

/// Everything needed to draw a fitted histogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotData {
    pub xlabel: String,
    pub ylabel: String,
    pub log_scale: bool,
    pub data: PlotSeries,
    pub fit: PlotSeries,
    pub deskewed_gaussian: Option<PlotSeries>,
}

/// Draws [`PlotData`]
pub trait FitVisualizer {
    fn render(&self, plot: &PlotData) -> Result<()>;
}

/// Visualizer that draws nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NullFitVisualizer;

impl FitVisualizer for NullFitVisualizer {
    fn render(&self, _plot: &PlotData) -> Result<()> {
        Ok(())
    }
}

/// `npts` evenly spaced values from `start` to `end` inclusive
pub(crate) fn linspace(start: f64, end: f64, npts: usize) -> Vec<f64> {
    match npts {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (npts - 1) as f64;
            (0..npts).map(|i| start + step * i as f64).collect()
        }
    }
}

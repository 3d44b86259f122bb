//! Quantum error bars from a log-density histogram fit
//!
//! This crate fits the logarithm of a probability-density histogram with a
//! skewed peak model and converts the fitted coefficients into **quantum
//! error bars**: the peak location `f0`, the width `Delta` of the best local
//! Gaussian approximation, the skewness `gamma` and the log peak height `y0`.
//!
//! # Pipeline
//!
//! 1. Map the figure of merit `f` to the fit coordinate `x = s (f - h)`
//! 2. Normalize the histogram and drop bins that cannot be log-transformed
//! 3. Guess a seed graphically from the peak and its `1/e` crossings
//! 4. Fit `ln p` with weights `p / err_p` by bounded L-BFGS (argmin)
//! 5. Report the reduced chi-squared and warn on a poor fit
//!
//! # Key Features
//!
//! - **Two built-in models**: the canonical `(a2, a1, m, c)` model and the
//!   peak-centered `(a, x0, y0, m)` reparametrization
//! - **Custom models**: any `Fn(x, &[f64]) -> f64`, without error-bar
//!   conversion
//! - **Injectable diagnostics**: warnings go through a
//!   [`DiagnosticSink`](qeb_core::DiagnosticSink)
//! - **Pluggable solver**: anything implementing [`LeastSquaresSolver`]
//!
//! # Examples
//!
//! ```rust
//! use qeb_fit::HistogramAnalysis;
//! use qeb_histogram::HistogramWithErrorBars;
//!
//! // log density -250 x^2 - 100 x + 20 ln(x)
//! let mut histogram = HistogramWithErrorBars::new(0.02, 0.32, 40).unwrap();
//! let bins: Vec<f64> = histogram
//!     .values_center()
//!     .iter()
//!     .map(|&x| (-250.0 * x * x - 100.0 * x + 20.0 * x.ln()).exp())
//!     .collect();
//! let delta: Vec<f64> = bins.iter().map(|p| 0.01 * p).collect();
//! histogram.load(&bins, &delta, 0.0).unwrap();
//!
//! let analysis = HistogramAnalysis::builder()
//!     .ftox(0.0, 1.0)
//!     .analyze(&histogram)
//!     .unwrap();
//!
//! let q = analysis.quantum_error_bars().unwrap();
//! assert!((q.f0 - 0.1236).abs() < 1e-3);
//! analysis.print_quantum_error_bars(|s| print!("{s}")).unwrap();
//! ```

pub mod analysis;
pub mod batch;
pub mod converter;
pub mod diagnostic;
pub mod driver;
pub mod guess;
pub mod model;
pub mod params;
pub mod report;
pub mod solver;
pub mod transform;
pub mod visualization;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_data;

// Re-exports
pub use analysis::{HistogramAnalysis, HistogramAnalysisBuilder};
pub use batch::analyze_many;
pub use converter::{
    A2Converter, DirectConverter, ErrorBarConverter, QuantumErrorBars, QuantumErrorBarsX,
    GENERIC_A2_SEED,
};
pub use diagnostic::{FitDiagnostic, DEFAULT_REDCHI2_WARN_THRESHOLD};
pub use driver::{fit_histogram, initial_guess, retained_indices, FitHistogramResult, FitOptions};
pub use guess::guess_error_bars_x;
pub use model::{fit_fn_a2, fit_fn_direct, zm, BuiltinModel, CustomModel, FitModel, ModelFn};
pub use params::FitParameters;
pub use report::{format_fit_parameters, format_general, format_quantum_error_bars};
pub use solver::{
    Bounds, BoundedLbfgs, LeastSquaresProblem, LeastSquaresSolver, SolverOptions,
    SolverOutput,
};
pub use transform::FtoX;
pub use visualization::{FitVisualizer, NullFitVisualizer, PlotData, PlotOptions, PlotSeries};

pub use qeb_core::{Error, Result};

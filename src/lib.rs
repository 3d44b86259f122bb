//! Quantum error bars for figure-of-merit histograms
//!
//! Umbrella crate re-exporting the workspace:
//!
//! - [`core`]: error type and diagnostic sinks
//! - [`histogram`]: histograms with error bars and the histogram file format
//! - [`fit`]: model fitting, error-bar conversion and reporting
//!
//! # Example
//!
//! ```rust,no_run
//! use quantum_error_bars::prelude::*;
//!
//! let histogram = load_csv_histogram("fidelities.dat").unwrap();
//! let analysis = HistogramAnalysis::builder()
//!     .ftox(1.0, -1.0)
//!     .analyze(&histogram)
//!     .unwrap();
//! analysis.display_fit_parameters(true);
//! analysis.display_quantum_error_bars().unwrap();
//! ```

pub use qeb_core as core;
pub use qeb_fit as fit;
pub use qeb_histogram as histogram;

pub use qeb_core::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use qeb_core::prelude::*;
    pub use qeb_core::{CollectingSink, NullSink, TracingSink};
    pub use qeb_fit::{
        analyze_many, Bounds, CustomModel, FitModel, FitParameters, HistogramAnalysis,
        HistogramAnalysisBuilder, PlotOptions, QuantumErrorBars, QuantumErrorBarsX,
        SolverOptions,
    };
    pub use qeb_histogram::{
        load_csv_histogram, read_csv_histogram, save_csv_histogram, AveragedHistogramBuilder,
        DensityHistogram, HistogramParams, HistogramWithErrorBars,
    };
}

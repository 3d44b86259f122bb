//! Uniform-bin histograms with error bars
//!
//! This crate provides the histogram container consumed by the fitting
//! pipeline: a fixed range split into equally wide bins, each bin carrying a
//! value and an error bar, plus an off-chart amount for samples that fell
//! outside the range.
//!
//! # Key Features
//!
//! - **Normalization**: turn counts into a probability density, off-chart
//!   samples included
//! - **Averaging**: combine independent runs into one histogram whose error
//!   bars are the standard error of the mean
//! - **File format**: read and write the tab-separated files produced by the
//!   command-line sampler
//! - **Text rendering**: quick ASCII bar charts for terminals and logs
//!
//! # Examples
//!
//! ```rust
//! use qeb_histogram::{read_csv_histogram, DensityHistogram};
//!
//! let text = "x\tp\terr\n0.0\t10\t1\n0.2\t20\t2\n0.4\t30\t3\n0.6\t40\t4\n0.8\t50\t5\n";
//! let histogram = read_csv_histogram(text.as_bytes()).unwrap();
//! assert_eq!(histogram.num_bins(), 5);
//!
//! let density = histogram.to_normalized();
//! assert!((density.normalization() - 1.0).abs() < 1e-12);
//! println!("{}", density.pretty_print(60));
//! ```

pub mod builders;
pub mod loader;
pub mod pretty;
pub mod traits;
pub mod types;

// Re-export main types and traits
pub use builders::AveragedHistogramBuilder;
pub use loader::{load_csv_histogram, read_csv_histogram, save_csv_histogram, write_csv_histogram};
pub use pretty::pretty_print;
pub use traits::DensityHistogram;
pub use types::{HistogramParams, HistogramWithErrorBars};

pub use qeb_core::Result;

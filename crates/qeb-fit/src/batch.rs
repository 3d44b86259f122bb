//! Analyzing several histograms with one configuration

use crate::analysis::{HistogramAnalysis, HistogramAnalysisBuilder};
use qeb_core::Result;
use qeb_histogram::DensityHistogram;

/// Run an independent analysis on each histogram
///
/// Results are returned in input order; one failing histogram does not stop
/// the others. With the `parallel` feature the analyses run on the rayon
/// thread pool.
pub fn analyze_many<H>(
    histograms: &[H],
    config: &HistogramAnalysisBuilder,
) -> Vec<Result<HistogramAnalysis>>
where
    H: DensityHistogram + Sync,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        histograms.par_iter().map(|h| config.analyze(h)).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        histograms.iter().map(|h| config.analyze(h)).collect()
    }
}

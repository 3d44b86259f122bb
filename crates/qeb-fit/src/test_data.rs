//! Synthetic histograms for testing and benchmarks
//!
//! All generators are seeded so that every test sees the same data.

use crate::model::fit_fn_a2;
use qeb_core::Result;
use qeb_histogram::{AveragedHistogramBuilder, HistogramParams, HistogramWithErrorBars};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

/// Coefficients `(a2, a1, m, c)` of the reference distribution
pub const REFERENCE_PARAMS: [f64; 4] = [250.0, 100.0, 20.0, 0.0];

/// Standard synthetic histograms of the canonical model
pub struct SyntheticHistograms;

impl SyntheticHistograms {
    /// Exact density of the canonical model on uniform bins, with relative
    /// error bars `rel_err`
    pub fn exact(
        params: [f64; 4],
        min: f64,
        max: f64,
        num_bins: usize,
        rel_err: f64,
    ) -> Result<HistogramWithErrorBars> {
        let hist_params = HistogramParams::new(min, max, num_bins)?;
        let bins: Vec<f64> = hist_params
            .values_center()
            .iter()
            .map(|&x| canonical_density(x, &params))
            .collect();
        let delta: Vec<f64> = bins.iter().map(|b| rel_err * b).collect();
        HistogramWithErrorBars::from_parts(hist_params, bins, delta, 0.0)
    }

    /// Canonical density with independent Gaussian relative noise
    ///
    /// Each bin is `p (1 + rel_noise * N(0, 1))`, reported with the error bar
    /// `rel_noise * p`.
    pub fn noisy(
        params: [f64; 4],
        min: f64,
        max: f64,
        num_bins: usize,
        rel_noise: f64,
        seed: u64,
    ) -> Result<HistogramWithErrorBars> {
        let hist_params = HistogramParams::new(min, max, num_bins)?;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let normal = standard_normal();

        let exact: Vec<f64> = hist_params
            .values_center()
            .iter()
            .map(|&x| canonical_density(x, &params))
            .collect();
        let bins: Vec<f64> = exact
            .iter()
            .map(|p| (p * (1.0 + rel_noise * normal.sample(&mut rng))).max(0.0))
            .collect();
        let delta: Vec<f64> = exact.iter().map(|p| rel_noise * p).collect();
        HistogramWithErrorBars::from_parts(hist_params, bins, delta, 0.0)
    }

    /// Average of `runs` noisy copies, error bars from the spread of the runs
    pub fn averaged(
        params: [f64; 4],
        min: f64,
        max: f64,
        num_bins: usize,
        rel_noise: f64,
        runs: usize,
        seed: u64,
    ) -> Result<HistogramWithErrorBars> {
        let hist_params = HistogramParams::new(min, max, num_bins)?;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let normal = standard_normal();

        let exact: Vec<f64> = hist_params
            .values_center()
            .iter()
            .map(|&x| canonical_density(x, &params))
            .collect();

        let mut builder = AveragedHistogramBuilder::new(hist_params);
        for _ in 0..runs {
            let run: Vec<f64> = exact
                .iter()
                .map(|p| (p * (1.0 + rel_noise * normal.sample(&mut rng))).max(0.0))
                .collect();
            builder.add_run(&run, 0.0)?;
        }
        builder.finalize()
    }

    /// The reference distribution on 40 bins over `[0.02, 0.32]` with 0.5%
    /// noise
    pub fn reference() -> Result<HistogramWithErrorBars> {
        Self::noisy(REFERENCE_PARAMS, 0.02, 0.32, 40, 0.005, 42)
    }
}

fn canonical_density(x: f64, p: &[f64; 4]) -> f64 {
    fit_fn_a2(x, p[0], p[1], p[2], p[3]).exp()
}

fn standard_normal() -> Normal<f64> {
    Normal::new(0.0, 1.0).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generators_are_reproducible() {
        let a = SyntheticHistograms::reference().unwrap();
        let b = SyntheticHistograms::reference().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.num_bins(), 40);
        assert!(a.bins().iter().all(|&v| v > 0.0));
    }

    #[test]
    fn test_averaged_error_bars_shrink() {
        let h =
            SyntheticHistograms::averaged(REFERENCE_PARAMS, 0.02, 0.32, 40, 0.05, 25, 7).unwrap();
        let peak = h.argmax();
        let rel = h.delta()[peak] / h.bins()[peak];
        // standard error of the mean: about 0.05 / 5
        assert!(rel > 0.003 && rel < 0.03, "rel={rel}");
    }
}

//! Goodness of fit

use crate::driver::FitHistogramResult;
use crate::model::FitModel;
use qeb_core::{DiagnosticSink, Error, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Reduced chi-squared above which a fit is reported as poor
pub const DEFAULT_REDCHI2_WARN_THRESHOLD: f64 = 2.0;

/// Reduced chi-squared of a fit and whether it passed the threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitDiagnostic {
    pub chi2: f64,
    pub num_points: usize,
    pub num_params: usize,
    pub red_chi2: f64,
    pub warn_threshold: f64,
}

impl FitDiagnostic {
    /// Evaluate `model` with the fitted coefficients on the retained points
    ///
    /// `sum(((logp_i - model(x_i)) / err_logp_i)^2) / (N - k)`. A value above
    /// `warn_threshold` is reported through `sink` as a warning; the
    /// diagnostic is returned either way.
    pub fn compute(
        result: &FitHistogramResult,
        model: &FitModel,
        warn_threshold: f64,
        sink: &dyn DiagnosticSink,
    ) -> Result<Self> {
        let n = result.fit_x.len();
        let k = result.params.len();
        if n <= k {
            return Err(Error::InsufficientData {
                expected: k + 1,
                actual: n,
            });
        }

        let params = result.params.values();
        let chi2: f64 = result
            .fit_x
            .iter()
            .zip(result.fit_logp.iter().zip(&result.fit_err_logp))
            .map(|(&x, (&logp, &err))| {
                let r = (logp - model.evaluate(x, params)) / err;
                r * r
            })
            .sum();
        let red_chi2 = chi2 / (n - k) as f64;

        let diagnostic = Self {
            chi2,
            num_points: n,
            num_params: k,
            red_chi2,
            warn_threshold,
        };
        if diagnostic.is_poor_fit() {
            sink.warning(&format!(
                "Poor fit: reduced chi-squared is {red_chi2:.4} (threshold {warn_threshold})"
            ));
        }
        Ok(diagnostic)
    }

    pub fn degrees_of_freedom(&self) -> usize {
        self.num_points - self.num_params
    }

    /// Whether the reduced chi-squared exceeds the warning threshold
    pub fn is_poor_fit(&self) -> bool {
        !(self.red_chi2 <= self.warn_threshold)
    }

    /// Probability of a chi-squared at least this large for a correct model
    pub fn p_value(&self) -> f64 {
        match ChiSquared::new(self.degrees_of_freedom() as f64) {
            Ok(dist) => 1.0 - dist.cdf(self.chi2),
            Err(_) => f64::NAN,
        }
    }
}

//! Fitting a log-density model to a histogram
//!
//! The histogram values `p` are fitted in log space: `ln p` against the
//! model, with the first-order uncertainty `err_p / p`. Bins that cannot be
//! log-transformed or weighted are dropped before the solver sees them.

use crate::guess::guess_error_bars_x;
use crate::model::FitModel;
use crate::params::FitParameters;
use crate::solver::{Bounds, LeastSquaresProblem, LeastSquaresSolver, SolverOptions};
use crate::transform::FtoX;
use qeb_core::{DiagnosticSink, Error, Result};
use qeb_histogram::HistogramWithErrorBars;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Options of a single fit
#[derive(Debug, Clone, Default)]
pub struct FitOptions {
    /// Bins below this fraction of the maximum are not fitted
    pub threshold_fraction: f64,
    /// Coefficient bounds; the model's defaults when `None`
    pub bounds: Option<Bounds>,
    /// Seed for the solver; guessed from the histogram when `None`
    pub p0: Option<Vec<f64>>,
    pub solver_options: SolverOptions,
}

impl FitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold_fraction(mut self, threshold_fraction: f64) -> Self {
        self.threshold_fraction = threshold_fraction;
        self
    }

    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_p0(mut self, p0: Vec<f64>) -> Self {
        self.p0 = Some(p0);
        self
    }

    pub fn with_solver_options(mut self, solver_options: SolverOptions) -> Self {
        self.solver_options = solver_options;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.threshold_fraction) {
            return Err(Error::Configuration(format!(
                "threshold_fraction must be in [0, 1), got {}",
                self.threshold_fraction
            )));
        }
        Ok(())
    }
}

/// The data that went into a fit and what came out of it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitHistogramResult {
    /// Bin centers on the figure-of-merit axis
    pub f: Vec<f64>,
    /// Bin centers in the fit coordinate
    pub x: Vec<f64>,
    /// Bin values
    pub p: Vec<f64>,
    /// Bin error bars
    pub err_p: Vec<f64>,
    /// Indices of the bins retained for the fit
    pub indices: Vec<usize>,
    pub fit_f: Vec<f64>,
    pub fit_x: Vec<f64>,
    pub fit_logp: Vec<f64>,
    pub fit_err_logp: Vec<f64>,
    pub threshold_fraction: f64,
    pub params: FitParameters,
    pub iterations: usize,
    /// Weighted sum of squared residuals at the solution
    pub chi2: f64,
    pub covariance_estimated: bool,
}

impl FitHistogramResult {
    /// Number of data points the fit used
    pub fn num_points(&self) -> usize {
        self.indices.len()
    }
}

/// Indices of the bins that take part in a fit
///
/// A bin is kept when its value is strictly positive, strictly above
/// `threshold_fraction * max(p)`, and its log-space uncertainty
/// `err_p / p` is positive and finite.
pub fn retained_indices(p: &[f64], err_p: &[f64], threshold_fraction: f64) -> Vec<usize> {
    let cutoff = threshold_cutoff(p, threshold_fraction);
    p.iter()
        .zip(err_p)
        .enumerate()
        .filter(|(_, (&pv, &ev))| above_cutoff(pv, cutoff) && has_usable_error(pv, ev))
        .map(|(i, _)| i)
        .collect()
}

/// Bins that pass the threshold but cannot be weighted
pub fn unweighted_indices(p: &[f64], err_p: &[f64], threshold_fraction: f64) -> Vec<usize> {
    let cutoff = threshold_cutoff(p, threshold_fraction);
    p.iter()
        .zip(err_p)
        .enumerate()
        .filter(|(_, (&pv, &ev))| above_cutoff(pv, cutoff) && !has_usable_error(pv, ev))
        .map(|(i, _)| i)
        .collect()
}

fn threshold_cutoff(p: &[f64], threshold_fraction: f64) -> f64 {
    threshold_fraction * p.iter().copied().fold(0.0, f64::max)
}

fn above_cutoff(pv: f64, cutoff: f64) -> bool {
    pv > 0.0 && pv > cutoff
}

fn has_usable_error(pv: f64, ev: f64) -> bool {
    let err_logp = ev / pv;
    err_logp.is_finite() && err_logp > 0.0
}

/// Seed for the solver derived from the histogram shape
///
/// Only models with a converter can be seeded this way.
pub fn initial_guess(
    histogram: &HistogramWithErrorBars,
    model: &FitModel,
    ftox: &FtoX,
    sink: &dyn DiagnosticSink,
) -> Result<Vec<f64>> {
    let converter = model.converter().ok_or_else(|| {
        Error::Configuration(format!(
            "fit model '{}' cannot be seeded automatically; supply an initial guess p0",
            model.name()
        ))
    })?;
    let guess = guess_error_bars_x(histogram, ftox, sink)?;
    Ok(converter.guess_fit_params(&guess, sink))
}

/// Fit `model` to the (normalized) `histogram`
#[instrument(skip_all, fields(model = model.name(), num_bins = histogram.num_bins()))]
pub fn fit_histogram(
    histogram: &HistogramWithErrorBars,
    model: &FitModel,
    ftox: &FtoX,
    options: &FitOptions,
    solver: &dyn LeastSquaresSolver,
    sink: &dyn DiagnosticSink,
) -> Result<FitHistogramResult> {
    options.validate()?;
    let k = model.num_params();

    let bounds = match &options.bounds {
        Some(bounds) => bounds.clone(),
        None => model.default_bounds(),
    };
    if bounds.len() != k {
        return Err(Error::Configuration(format!(
            "bounds describe {} parameters, fit model '{}' has {k}",
            bounds.len(),
            model.name()
        )));
    }

    let p0 = match &options.p0 {
        Some(p0) => p0.clone(),
        None => initial_guess(histogram, model, ftox, sink)?,
    };
    if p0.len() != k {
        return Err(Error::Configuration(format!(
            "initial guess has {} values, fit model '{}' has {k} parameters",
            p0.len(),
            model.name()
        )));
    }

    let f = histogram.values_center();
    let x = ftox.ftox_all(&f);
    let p = histogram.bins().to_vec();
    let err_p = histogram.delta().to_vec();

    for i in unweighted_indices(&p, &err_p, options.threshold_fraction) {
        sink.warning(&format!(
            "Bin {i} at f={} has no usable error bar (err_p={}); excluded from the fit",
            f[i], err_p[i]
        ));
    }
    let indices = retained_indices(&p, &err_p, options.threshold_fraction);
    // the reduced chi-squared needs at least one degree of freedom
    if indices.len() <= k {
        return Err(Error::InsufficientData {
            expected: k + 1,
            actual: indices.len(),
        });
    }

    let fit_f: Vec<f64> = indices.iter().map(|&i| f[i]).collect();
    let fit_x: Vec<f64> = indices.iter().map(|&i| x[i]).collect();
    let fit_logp: Vec<f64> = indices.iter().map(|&i| p[i].ln()).collect();
    let fit_err_logp: Vec<f64> = indices.iter().map(|&i| err_p[i] / p[i]).collect();

    debug!(
        retained = indices.len(),
        threshold_fraction = options.threshold_fraction,
        ?p0,
        "fitting log-density"
    );

    let evaluate = |xv: f64, params: &[f64]| model.evaluate(xv, params);
    let problem = LeastSquaresProblem {
        x: &fit_x,
        y: &fit_logp,
        sigma: &fit_err_logp,
        model: &evaluate,
    };
    let output = solver
        .solve(&problem, &p0, &bounds, &options.solver_options)
        .map_err(|e| match e {
            Error::FitFailed(_) | Error::Configuration(_) | Error::InsufficientData { .. } => e,
            other => Error::FitFailed(other.to_string()),
        })?;

    if !output.covariance_estimated {
        sink.warning("Covariance of the parameters could not be estimated");
    }
    debug!(iterations = output.iterations, chi2 = output.chi2, "fit finished");

    let params = FitParameters::new(model.param_names(), output.params, &output.covariance);

    Ok(FitHistogramResult {
        f,
        x,
        p,
        err_p,
        indices,
        fit_f,
        fit_x,
        fit_logp,
        fit_err_logp,
        threshold_fraction: options.threshold_fraction,
        params,
        iterations: output.iterations,
        chi2: output.chi2,
        covariance_estimated: output.covariance_estimated,
    })
}

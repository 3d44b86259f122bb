//! Weighted nonlinear least squares with box constraints
//!
//! The fitting pipeline only depends on the [`LeastSquaresSolver`] contract:
//! minimize `sum(((y_i - f(x_i; p)) / sigma_i)^2)` subject to
//! `lower <= p <= upper`, starting from a seed, and return the best
//! coefficients with their covariance `(J^T J)^-1`. The sigmas are taken as
//! absolute uncertainties, so the covariance is not rescaled by the reduced
//! chi-squared.
//!
//! [`BoundedLbfgs`] is the bundled implementation. It hands the problem to
//! argmin's L-BFGS in coordinates whitened by `J^T J` at the seed, so that the
//! canonical model (linear in its coefficients) becomes an isotropic
//! quadratic. Bounds are enforced by clamping, with the gradient projected
//! at an active bound.

use argmin::core::{
    CostFunction, Executor, Gradient, State, TerminationReason, TerminationStatus,
};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use nalgebra::{DMatrix, DVector};
use qeb_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use tracing::debug;

/// Box constraints on the coefficients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl Bounds {
    /// Create bounds, checking that they describe a non-empty box
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Result<Self> {
        if lower.len() != upper.len() {
            return Err(Error::Configuration(format!(
                "bounds have mismatched lengths: {} lower vs {} upper",
                lower.len(),
                upper.len()
            )));
        }
        for (i, (lo, hi)) in lower.iter().zip(&upper).enumerate() {
            if lo.is_nan() || hi.is_nan() || lo > hi {
                return Err(Error::FitFailed(format!(
                    "infeasible bounds for parameter {i}: [{lo}, {hi}]"
                )));
            }
        }
        Ok(Self { lower, upper })
    }

    /// No constraint on any of the `n` coefficients
    pub fn unbounded(n: usize) -> Self {
        Self {
            lower: vec![f64::NEG_INFINITY; n],
            upper: vec![f64::INFINITY; n],
        }
    }

    /// Lower bounds only; the upper bounds are `+inf`
    pub fn with_lower(lower: Vec<f64>) -> Self {
        let upper = vec![f64::INFINITY; lower.len()];
        Self { lower, upper }
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    /// Whether `p` lies inside the box (bounds included)
    pub fn contains(&self, p: &[f64]) -> bool {
        p.len() == self.len()
            && p
                .iter()
                .zip(self.lower.iter().zip(&self.upper))
                .all(|(v, (lo, hi))| *v >= *lo && *v <= *hi)
    }

    /// Project `p` onto the box
    pub fn clamp(&self, p: &mut [f64]) {
        for (v, (lo, hi)) in p.iter_mut().zip(self.lower.iter().zip(&self.upper)) {
            *v = v.max(*lo).min(*hi);
        }
    }
}

/// Solver tolerances and limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverOptions {
    /// Maximum number of L-BFGS iterations
    pub max_iterations: u64,
    /// Gradient norm, in whitened coordinates, considered zero
    ///
    /// Whitened units are standard errors of the coefficients, so the
    /// default stops within `1e-6` standard errors of the optimum.
    pub gradient_tolerance: f64,
    /// Change of `chi2 / 2` between iterations considered negligible
    pub cost_tolerance: f64,
    /// Number of correction pairs kept by L-BFGS
    pub history_size: usize,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            gradient_tolerance: 1e-6,
            cost_tolerance: 1e-9,
            history_size: 10,
        }
    }
}

impl SolverOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max_iterations: u64) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_gradient_tolerance(mut self, gradient_tolerance: f64) -> Self {
        self.gradient_tolerance = gradient_tolerance;
        self
    }

    pub fn with_cost_tolerance(mut self, cost_tolerance: f64) -> Self {
        self.cost_tolerance = cost_tolerance;
        self
    }

    pub fn with_history_size(mut self, history_size: usize) -> Self {
        self.history_size = history_size;
        self
    }
}

/// Data points and model of one weighted least-squares problem
pub struct LeastSquaresProblem<'a> {
    pub x: &'a [f64],
    pub y: &'a [f64],
    /// Absolute uncertainty of each `y`
    pub sigma: &'a [f64],
    pub model: &'a (dyn Fn(f64, &[f64]) -> f64 + Sync),
}

impl LeastSquaresProblem<'_> {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    fn validate(&self, num_params: usize) -> Result<()> {
        if self.y.len() != self.x.len() {
            return Err(Error::size_mismatch(self.x.len(), self.y.len(), "fit data"));
        }
        if self.sigma.len() != self.x.len() {
            return Err(Error::size_mismatch(
                self.x.len(),
                self.sigma.len(),
                "fit uncertainties",
            ));
        }
        if self.x.len() < num_params {
            return Err(Error::InsufficientData {
                expected: num_params,
                actual: self.x.len(),
            });
        }
        if self.sigma.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(Error::InvalidInput(
                "uncertainties must be positive and finite".to_string(),
            ));
        }
        Ok(())
    }

    /// Weighted residuals `(y_i - f(x_i; p)) / sigma_i`
    fn residuals(&self, p: &[f64]) -> DVector<f64> {
        DVector::from_iterator(
            self.len(),
            (0..self.len()).map(|i| (self.y[i] - (self.model)(self.x[i], p)) / self.sigma[i]),
        )
    }

    /// Central-difference Jacobian of the weighted residuals
    fn jacobian(&self, p: &[f64]) -> DMatrix<f64> {
        let mut jac = DMatrix::zeros(self.len(), p.len());
        let mut shifted = p.to_vec();

        for j in 0..p.len() {
            let h = f64::EPSILON.cbrt() * p[j].abs().max(1.0);
            shifted[j] = p[j] + h;
            let forward = self.residuals(&shifted);
            shifted[j] = p[j] - h;
            let backward = self.residuals(&shifted);
            jac.set_column(j, &((forward - backward) / (2.0 * h)));
            shifted[j] = p[j];
        }
        jac
    }
}

/// Result of a successful solve
#[derive(Debug, Clone)]
pub struct SolverOutput {
    pub params: Vec<f64>,
    /// `(J^T J)^-1` at the solution, filled with `inf` when not estimable
    pub covariance: DMatrix<f64>,
    pub iterations: usize,
    /// Final weighted sum of squared residuals
    pub chi2: f64,
    pub covariance_estimated: bool,
}

/// A bounded weighted least-squares solver
pub trait LeastSquaresSolver: Send + Sync + fmt::Debug {
    fn solve(
        &self,
        problem: &LeastSquaresProblem<'_>,
        p0: &[f64],
        bounds: &Bounds,
        options: &SolverOptions,
    ) -> Result<SolverOutput>;
}

/// Smallest eigenvalue of `J^T J` kept by the whitening, relative to the largest
const WHITENING_FLOOR: f64 = 1e-12;

/// A line search that breaks down this close to the optimum, in whitened
/// units, is taken as having hit floating-point resolution
const STALL_GRADIENT_FACTOR: f64 = 1e3;

/// The least-squares cost `chi2 / 2` in whitened coordinates `u`,
/// with `p = clamp(p0 + S u)`
struct WhitenedCost<'a> {
    problem: &'a LeastSquaresProblem<'a>,
    bounds: &'a Bounds,
    p0: &'a [f64],
    scaling: &'a DMatrix<f64>,
    lowest: &'a Mutex<Option<(f64, Vec<f64>)>>,
}

impl WhitenedCost<'_> {
    fn params(&self, u: &[f64]) -> Vec<f64> {
        let step = self.scaling * DVector::from_column_slice(u);
        let mut p: Vec<f64> = self.p0.iter().zip(step.iter()).map(|(a, b)| a + b).collect();
        self.bounds.clamp(&mut p);
        p
    }

    fn half_chi2(&self, p: &[f64]) -> f64 {
        let chi2 = self.problem.residuals(p).norm_squared();
        if chi2.is_finite() {
            0.5 * chi2
        } else {
            f64::INFINITY
        }
    }

    /// Gradient in whitened coordinates, with components that push an
    /// active bound outward set to zero
    fn projected_gradient(&self, u: &[f64]) -> Option<Vec<f64>> {
        let p = self.params(u);
        let r = self.problem.residuals(&p);
        let jac = self.problem.jacobian(&p);
        let mut g = jac.transpose() * r;
        for (j, gj) in g.iter_mut().enumerate() {
            if (p[j] <= self.bounds.lower()[j] && *gj > 0.0)
                || (p[j] >= self.bounds.upper()[j] && *gj < 0.0)
            {
                *gj = 0.0;
            }
        }
        let gu = self.scaling.transpose() * g;
        gu.iter().all(|v| v.is_finite()).then(|| gu.iter().copied().collect())
    }

    fn record(&self, cost: f64, u: &[f64]) {
        let mut lowest = match self.lowest.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if lowest.as_ref().map_or(true, |(c, _)| cost < *c) {
            *lowest = Some((cost, u.to_vec()));
        }
    }
}

impl CostFunction for WhitenedCost<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, u: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
        let cost = self.half_chi2(&self.params(u));
        self.record(cost, u);
        Ok(cost)
    }
}

impl Gradient for WhitenedCost<'_> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(
        &self,
        u: &Self::Param,
    ) -> std::result::Result<Self::Gradient, argmin::core::Error> {
        self.projected_gradient(u)
            .ok_or_else(|| argmin::core::Error::msg("gradient is not finite"))
    }
}

/// L-BFGS on the whitened least-squares cost, backed by argmin
#[derive(Debug, Default, Clone, Copy)]
pub struct BoundedLbfgs;

impl BoundedLbfgs {
    pub fn new() -> Self {
        Self
    }

    /// `S = V diag(1 / sqrt(lambda))` from the eigen-decomposition of `J^T J`
    fn whitening(jac: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        let eigen = (jac.transpose() * jac).symmetric_eigen();
        let largest = eigen.eigenvalues.max();
        if !(largest.is_finite() && largest > 0.0) {
            return Err(Error::FitFailed(
                "the model does not depend on its parameters at the initial guess".to_string(),
            ));
        }
        let floor = largest * WHITENING_FLOOR;
        let mut scaling = eigen.eigenvectors;
        for (j, lambda) in eigen.eigenvalues.iter().enumerate() {
            let factor = 1.0 / lambda.max(floor).sqrt();
            scaling.column_mut(j).scale_mut(factor);
        }
        Ok(scaling)
    }

    fn covariance(jac: &DMatrix<f64>) -> (DMatrix<f64>, bool) {
        let k = jac.ncols();
        let jtj = jac.transpose() * jac;
        match jtj.cholesky() {
            Some(chol) => {
                let cov = chol.inverse();
                if cov.iter().all(|v| v.is_finite()) {
                    return (cov, true);
                }
                (DMatrix::from_element(k, k, f64::INFINITY), false)
            }
            None => (DMatrix::from_element(k, k, f64::INFINITY), false),
        }
    }

    fn finish(
        problem: &LeastSquaresProblem<'_>,
        params: Vec<f64>,
        iterations: usize,
    ) -> SolverOutput {
        let chi2 = problem.residuals(&params).norm_squared();
        let (covariance, covariance_estimated) = Self::covariance(&problem.jacobian(&params));
        SolverOutput {
            params,
            covariance,
            iterations,
            chi2,
            covariance_estimated,
        }
    }
}

impl LeastSquaresSolver for BoundedLbfgs {
    fn solve(
        &self,
        problem: &LeastSquaresProblem<'_>,
        p0: &[f64],
        bounds: &Bounds,
        options: &SolverOptions,
    ) -> Result<SolverOutput> {
        let k = p0.len();
        if bounds.len() != k {
            return Err(Error::Configuration(format!(
                "bounds describe {} parameters but the seed has {k}",
                bounds.len()
            )));
        }
        problem.validate(k)?;
        if !bounds.contains(p0) {
            return Err(Error::FitFailed(format!(
                "initial guess {p0:?} is outside the bounds"
            )));
        }
        if problem.residuals(p0).iter().any(|v| !v.is_finite()) {
            return Err(Error::FitFailed(format!(
                "residuals are not finite at the initial guess {p0:?}"
            )));
        }
        let seed_jacobian = problem.jacobian(p0);
        if seed_jacobian.iter().any(|v| !v.is_finite()) {
            return Err(Error::FitFailed(format!(
                "Jacobian is not finite at the initial guess {p0:?}"
            )));
        }

        let scaling = Self::whitening(&seed_jacobian)?;
        let lowest = Mutex::new(None);
        let cost = WhitenedCost {
            problem,
            bounds,
            p0,
            scaling: &scaling,
            lowest: &lowest,
        };

        let origin = vec![0.0; k];
        let seed_gradient = cost.projected_gradient(&origin).ok_or_else(|| {
            Error::FitFailed(format!("gradient is not finite at the initial guess {p0:?}"))
        })?;
        if l2_norm(&seed_gradient) < options.gradient_tolerance {
            debug!("initial guess is already optimal");
            return Ok(Self::finish(problem, cost.params(&origin), 0));
        }

        let solver = LBFGS::new(MoreThuenteLineSearch::new(), options.history_size)
            .with_tolerance_grad(options.gradient_tolerance)?
            .with_tolerance_cost(options.cost_tolerance)?;

        let run = Executor::new(cost, solver)
            .configure(|state| state.param(origin).max_iters(options.max_iterations))
            .run();

        let cost = WhitenedCost {
            problem,
            bounds,
            p0,
            scaling: &scaling,
            lowest: &lowest,
        };

        let res = match run {
            Ok(res) => res,
            Err(err) => {
                // Re-evaluate at the lowest point the line search visited
                let recorded = match lowest.lock() {
                    Ok(guard) => guard.clone(),
                    Err(poisoned) => poisoned.into_inner().clone(),
                };
                let Some((_, u)) = recorded else {
                    return Err(Error::Other(err));
                };
                let stalled = cost.projected_gradient(&u).map_or(false, |g| {
                    l2_norm(&g) < STALL_GRADIENT_FACTOR * options.gradient_tolerance
                });
                if !stalled {
                    return Err(Error::Other(err));
                }
                debug!(%err, "line search stalled at the optimum");
                return Ok(Self::finish(problem, cost.params(&u), 0));
            }
        };

        let state = res.state();
        let iterations = state.get_iter() as usize;
        let converged = matches!(
            state.get_termination_status(),
            TerminationStatus::Terminated(TerminationReason::SolverConverged)
                | TerminationStatus::Terminated(TerminationReason::TargetCostReached)
        );
        if !converged {
            return Err(Error::FitFailed(format!(
                "no convergence after {iterations} iterations ({}), chi2={}",
                state.get_termination_status(),
                2.0 * state.get_best_cost()
            )));
        }

        let u = state
            .get_best_param()
            .ok_or_else(|| Error::FitFailed("the solver returned no parameters".to_string()))?;
        let params = cost.params(u);
        debug!(iterations, "converged");
        Ok(Self::finish(problem, params, iterations))
    }
}

fn l2_norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

//! Conversion between fit coefficients and quantum error bars
//!
//! The canonical model `y(x) = -a2 x^2 - a1 x + m ln(x) + c` peaks at `x0`
//! where `y'(x0) = 0`. Its best local quadratic approximation there (the
//! "deskewed" curve) has curvature `a = a2 + m / (2 x0^2)`, which defines the
//! width `Delta = 1/sqrt(a)`. The skew is `gamma = m / (6 a^2 x0^3)`.
//!
//! ```text
//!   (a2, a1, m, c)  <-->  (x0, Delta, gamma, y0)
//! ```

use crate::model::fit_fn_a2;
use crate::solver::Bounds;
use crate::transform::FtoX;
use qeb_core::{DiagnosticSink, Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Below this `a2` the canonical model is treated as having no quadratic term
const A2_LINEAR_THRESHOLD: f64 = 1e-6;

/// Seed used when no graphical guess gives valid canonical coefficients
pub const GENERIC_A2_SEED: [f64; 4] = [500.0, 100.0, 20.0, 0.0];

const MAX_GUESS_ATTEMPTS: usize = 10;

/// Quantum error bars in the fit coordinate `x`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantumErrorBarsX {
    /// Peak location
    pub x0: f64,
    /// Width of the deskewed Gaussian
    pub delta: f64,
    /// Leading skewness coefficient
    pub gamma: f64,
    /// Log of the peak height
    pub y0: f64,
}

impl QuantumErrorBarsX {
    /// Map the peak location back to the figure of merit
    pub fn to_f(&self, ftox: &FtoX) -> QuantumErrorBars {
        QuantumErrorBars {
            f0: ftox.xtof(self.x0),
            delta: self.delta,
            gamma: self.gamma,
            y0: self.y0,
        }
    }
}

/// Quantum error bars on the figure-of-merit axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantumErrorBars {
    /// Peak location
    pub f0: f64,
    /// Width of the deskewed Gaussian
    pub delta: f64,
    /// Leading skewness coefficient
    pub gamma: f64,
    /// Log of the peak height
    pub y0: f64,
}

impl QuantumErrorBars {
    pub fn to_x(&self, ftox: &FtoX) -> QuantumErrorBarsX {
        QuantumErrorBarsX {
            x0: ftox.ftox(self.f0),
            delta: self.delta,
            gamma: self.gamma,
            y0: self.y0,
        }
    }
}

impl fmt::Display for QuantumErrorBars {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "f0={:.4}, Delta={:.4}, gamma={:.4}",
            self.f0, self.delta, self.gamma
        )
    }
}

/// Converts a model's coefficients to and from quantum error bars
pub trait ErrorBarConverter: Send + Sync + fmt::Debug {
    /// Bounds the coefficients are constrained to by default
    fn param_bounds(&self) -> Bounds;

    /// Coefficients describing the curve with the given error bars
    fn fit_params_from_error_bars_x(&self, q: &QuantumErrorBarsX) -> Vec<f64>;

    /// Coefficients to seed the optimizer with, given rough error bars
    fn guess_fit_params(&self, q: &QuantumErrorBarsX, _sink: &dyn DiagnosticSink) -> Vec<f64> {
        self.fit_params_from_error_bars_x(q)
    }

    /// Quantum error bars of the curve with the given coefficients
    fn error_bars_x(&self, params: &[f64], sink: &dyn DiagnosticSink) -> Result<QuantumErrorBarsX>;
}

/// Converter for the canonical `(a2, a1, m, c)` model
#[derive(Debug, Default, Clone, Copy)]
pub struct A2Converter;

impl ErrorBarConverter for A2Converter {
    fn param_bounds(&self) -> Bounds {
        Bounds::with_lower(vec![0.0, f64::NEG_INFINITY, 0.0, f64::NEG_INFINITY])
    }

    fn fit_params_from_error_bars_x(&self, q: &QuantumErrorBarsX) -> Vec<f64> {
        let x0 = q.x0;
        let a = 1.0 / (q.delta * q.delta);
        let m = q.gamma * 6.0 * a * a * x0.powi(3);

        let a2 = a - m / (2.0 * x0 * x0);
        let a1 = (a2 * m - 2.0 * a2 * a2 * x0 * x0) / (a2 * x0);
        let c = q.y0 + a2 * x0 * x0 + a1 * x0 - m * x0.ln();

        vec![a2, a1, m, c]
    }

    fn guess_fit_params(&self, q: &QuantumErrorBarsX, sink: &dyn DiagnosticSink) -> Vec<f64> {
        let mut attempt = *q;

        // A badly guessed gamma is the usual culprit; shrink it and retry
        for _ in 0..MAX_GUESS_ATTEMPTS {
            let params = self.fit_params_from_error_bars_x(&attempt);
            sink.debug(&format!(
                "guessing canonical coefficients: x0={}, Delta={}, gamma={} \
                 -> a2={}, a1={}, m={}, c={}",
                attempt.x0,
                attempt.delta,
                attempt.gamma,
                params[0],
                params[1],
                params[2],
                params[3]
            ));
            if params.iter().all(|v| v.is_finite()) && params[0] > 0.0 && params[2] > 0.0 {
                return params;
            }
            attempt.gamma /= 2.0;
        }

        sink.info("Having trouble guessing fit parameters graphically, resorting to generic guess");
        GENERIC_A2_SEED.to_vec()
    }

    fn error_bars_x(
        &self,
        params: &[f64],
        _sink: &dyn DiagnosticSink,
    ) -> Result<QuantumErrorBarsX> {
        check_len(params)?;
        let (a2, a1, m, c) = (params[0], params[1], params[2], params[3]);

        if a2 < 0.0 {
            return Err(Error::InvalidCurvature(format!(
                "Invalid value of a2: {a2} < 0"
            )));
        }

        let x0 = if a2 < A2_LINEAR_THRESHOLD {
            m / a1
        } else {
            ((a1 * a1 + 8.0 * a2 * m).sqrt() - a1) / (4.0 * a2)
        };
        if !x0.is_finite() || x0 <= 0.0 {
            return Err(Error::Computation(format!(
                "peak location x0={x0} is not a positive number (a2={a2}, a1={a1}, m={m})"
            )));
        }

        let y0 = fit_fn_a2(x0, a2, a1, m, c);
        let a = a2 + m / (2.0 * x0 * x0);
        if !(a > 0.0) {
            return Err(Error::Computation(format!(
                "effective curvature a={a} must be positive"
            )));
        }

        Ok(QuantumErrorBarsX {
            x0,
            delta: 1.0 / a.sqrt(),
            gamma: m / (6.0 * a * a * x0.powi(3)),
            y0,
        })
    }
}

/// Converter for the peak-centered `(a, x0, y0, m)` model
///
/// This parametrization cannot express `a2 >= 0` as a box constraint. A
/// negative derived `a2 = a - m / (2 x0^2)` is reported as a warning and the
/// error bars are still returned.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectConverter;

impl ErrorBarConverter for DirectConverter {
    fn param_bounds(&self) -> Bounds {
        Bounds::with_lower(vec![0.0, 0.0, f64::NEG_INFINITY, 0.0])
    }

    fn fit_params_from_error_bars_x(&self, q: &QuantumErrorBarsX) -> Vec<f64> {
        let a = 1.0 / (q.delta * q.delta);
        vec![a, q.x0, q.y0, q.gamma * 6.0 * a * a * q.x0.powi(3)]
    }

    fn error_bars_x(&self, params: &[f64], sink: &dyn DiagnosticSink) -> Result<QuantumErrorBarsX> {
        check_len(params)?;
        let (a, x0, y0, m) = (params[0], params[1], params[2], params[3]);

        if !(a > 0.0) {
            return Err(Error::InvalidCurvature(format!(
                "curvature a={a} must be positive"
            )));
        }
        if !(x0 > 0.0) || !x0.is_finite() {
            return Err(Error::Computation(format!(
                "peak location x0={x0} is not a positive number"
            )));
        }

        let a2 = a - m / (2.0 * x0 * x0);
        if a2 < 0.0 {
            sink.warning(&format!(
                "Fit parameters: invalid value for a={a}; corresponding a2={a2} should be >= 0"
            ));
        }

        Ok(QuantumErrorBarsX {
            x0,
            delta: 1.0 / a.sqrt(),
            gamma: m / (6.0 * a * a * x0.powi(3)),
            y0,
        })
    }
}

fn check_len(params: &[f64]) -> Result<()> {
    if params.len() != 4 {
        return Err(Error::size_mismatch(4, params.len(), "fit coefficients"));
    }
    Ok(())
}

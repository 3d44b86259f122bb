//! Graphical initial guess for the quantum error bars
//!
//! Reads the peak and its `1/e` crossings off the histogram. The result is a
//! rough seed for the optimizer with no accuracy guarantee.

use crate::converter::QuantumErrorBarsX;
use crate::transform::FtoX;
use qeb_core::{DiagnosticSink, Error, Result};
use qeb_histogram::HistogramWithErrorBars;

/// Estimate `(x0, Delta, gamma, y0)` from the shape of `histogram`
pub fn guess_error_bars_x(
    histogram: &HistogramWithErrorBars,
    ftox: &FtoX,
    sink: &dyn DiagnosticSink,
) -> Result<QuantumErrorBarsX> {
    let p = histogram.bins();
    let n = p.len();
    if n < 2 {
        return Err(Error::InsufficientData {
            expected: 2,
            actual: n,
        });
    }

    let idxmax = histogram.argmax();
    let pmax = p[idxmax];
    if !(pmax > 0.0) || !pmax.is_finite() {
        return Err(Error::InvalidInput(format!(
            "cannot guess error bars from a histogram with maximum value {pmax}"
        )));
    }

    let x = ftox.ftox_all(&histogram.values_center());
    let x0 = x[idxmax];
    let y0 = pmax.ln();
    let threshold = pmax * (-1.0f64).exp();

    // the maximum is above the threshold, so both searches succeed
    let first_above = p.iter().position(|&v| v > threshold).unwrap_or(idxmax).max(1);
    let last_above = p.iter().rposition(|&v| v > threshold).unwrap_or(idxmax).min(n - 2);

    let (outer, inner) = (first_above - 1, first_above);
    let x0m = crossing(x[outer], p[outer], x[inner], p[inner], threshold);
    let (outer, inner) = (last_above + 1, last_above);
    let x0p = crossing(x[outer], p[outer], x[inner], p[inner], threshold);

    let delta = ((x0p - x0m) / 2.0).abs();
    let gamma = 2.0 * ((x0p + x0m) / 2.0 - x0).abs();

    sink.debug(&format!(
        "guess_error_bars_x(): first_above={first_above}, last_above={last_above}, \
         x0m={x0m}, x0p={x0p}, x0={x0}, Delta={delta}, gamma={gamma}"
    ));

    Ok(QuantumErrorBarsX {
        x0,
        delta,
        gamma,
        y0,
    })
}

/// Where the segment from the outer point `(xo, po)` to the inner point
/// `(xi, pi)` reaches `threshold`
fn crossing(xo: f64, po: f64, xi: f64, pi: f64, threshold: f64) -> f64 {
    if pi == po {
        return xo;
    }
    xo + (threshold - po) / (pi - po) * (xi - xo)
}

//! Text reports of fit results

use crate::converter::QuantumErrorBars;
use crate::params::FitParameters;

/// Format `value` with `significant` digits like C's `%g`
///
/// Scientific notation is used for exponents below -4 or at least
/// `significant`; trailing zeros are dropped.
pub fn format_general(value: f64, significant: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let precision = significant.max(1);
    let scientific = format!("{:.*e}", precision - 1, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_zeros(mantissa), exponent.abs())
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        trim_zeros(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// One line per coefficient, optionally with its standard deviation
pub fn format_fit_parameters(params: &FitParameters, show_cov: bool) -> String {
    let std_errors = params.std_errors();
    let lines: Vec<String> = params
        .iter()
        .zip(std_errors)
        .map(|((name, value), std)| {
            let shown = if show_cov {
                format!("{:>8}  +-  {}", format_general(value, 6), format_general(std, 3))
            } else {
                format_general(value, 6)
            };
            format!("{name:>12} = {shown}")
        })
        .collect();
    format!("Fit parameters:\n{}", lines.join("\n"))
}

pub fn format_quantum_error_bars(q: &QuantumErrorBars) -> String {
    format!(
        "Quantum Error Bars:\n          f0 = {}\n       Delta = {}\n       gamma = {}\n",
        format_general(q.f0, 4),
        format_general(q.delta, 4),
        format_general(q.gamma, 4)
    )
}

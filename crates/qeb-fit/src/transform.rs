//! Figure-of-merit to fit-coordinate transform

use qeb_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Affine map between the figure of merit `f` and the fit coordinate `x`
///
/// `x = s * (f - h)` and `f = s * x + h`, with `s` exactly `+1` or `-1`.
/// For the fidelity one uses `(1, -1)`, i.e. `x = 1 - f`, so that the peak
/// of the distribution sits at small positive `x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FtoX {
    h: f64,
    s: f64,
}

impl FtoX {
    /// Create a transform, rejecting any scale other than `+1` or `-1`
    pub fn new(h: f64, s: f64) -> Result<Self> {
        if s != 1.0 && s != -1.0 {
            return Err(Error::invalid_scale(s));
        }
        if !h.is_finite() {
            return Err(Error::Configuration(format!(
                "Invalid value of `h` in `ftox=(h,s)`: h={h}"
            )));
        }
        Ok(Self { h, s })
    }

    /// The identity transform `x = f`
    pub fn identity() -> Self {
        Self { h: 0.0, s: 1.0 }
    }

    pub fn h(&self) -> f64 {
        self.h
    }

    pub fn s(&self) -> f64 {
        self.s
    }

    pub fn ftox(&self, f: f64) -> f64 {
        self.s * (f - self.h)
    }

    pub fn xtof(&self, x: f64) -> f64 {
        self.s * x + self.h
    }

    pub fn ftox_all(&self, f: &[f64]) -> Vec<f64> {
        f.iter().map(|&v| self.ftox(v)).collect()
    }

    pub fn xtof_all(&self, x: &[f64]) -> Vec<f64> {
        x.iter().map(|&v| self.xtof(v)).collect()
    }
}

impl Default for FtoX {
    fn default() -> Self {
        Self::identity()
    }
}

impl TryFrom<(f64, f64)> for FtoX {
    type Error = Error;

    fn try_from((h, s): (f64, f64)) -> Result<Self> {
        Self::new(h, s)
    }
}

impl fmt::Display for FtoX {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.s > 0.0 { "" } else { "-" };
        write!(f, "x = {sign}(f - {})", self.h)
    }
}

//! Named fit coefficients

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fitted coefficients with their names and covariance
///
/// The names come from the model's declared parameter list, so the values
/// can be read back by name (`params.get("a2")`) as well as by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitParameters {
    names: Vec<String>,
    values: Vec<f64>,
    covariance: Vec<Vec<f64>>,
}

impl FitParameters {
    pub(crate) fn new(names: Vec<String>, values: Vec<f64>, covariance: &DMatrix<f64>) -> Self {
        let covariance = (0..covariance.nrows())
            .map(|i| (0..covariance.ncols()).map(|j| covariance[(i, j)]).collect())
            .collect();
        Self {
            names,
            values,
            covariance,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of the coefficient called `name`
    pub fn get(&self, name: &str) -> Option<f64> {
        self.index_of(name).map(|i| self.values[i])
    }

    /// Variance of the coefficient called `name`
    pub fn variance(&self, name: &str) -> Option<f64> {
        self.index_of(name).map(|i| self.covariance[i][i])
    }

    /// Square roots of the covariance diagonal
    pub fn std_errors(&self) -> Vec<f64> {
        (0..self.len()).map(|i| self.covariance[i][i].sqrt()).collect()
    }

    /// Full covariance matrix, row-major
    pub fn covariance(&self) -> &[Vec<f64>] {
        &self.covariance
    }

    /// `(name, value)` pairs in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.names.iter().map(String::as_str).zip(self.values.iter().copied())
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

impl std::ops::Index<usize> for FitParameters {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.values[index]
    }
}

impl fmt::Display for FitParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<String> = self.iter().map(|(n, v)| format!("{n}={v}")).collect();
        write!(f, "FitParameters({})", fields.join(", "))
    }
}

//! Fit model registry
//!
//! A fit model is a log-density function of the fit coordinate `x` and a
//! fixed number of named coefficients. The built-in models come with an
//! [`ErrorBarConverter`] turning their coefficients into quantum error bars;
//! custom models do not.

use crate::converter::{A2Converter, DirectConverter, ErrorBarConverter};
use crate::solver::Bounds;
use qeb_core::{Error, Result};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// `y(x) = -a2 x^2 - a1 x + m ln(x) + c`
pub fn fit_fn_a2(x: f64, a2: f64, a1: f64, m: f64, c: f64) -> f64 {
    -a2 * x * x - a1 * x + m * x.ln() + c
}

/// The skew correction `z_m(w) = (m/2) w^2 - 2 m w + m ln(w) + 3m/2`
///
/// `y(x) - y_deskewed(x) = z_m(x / x0)` for the canonical model.
pub fn zm(w: f64, m: f64) -> f64 {
    m * w * w / 2.0 - 2.0 * m * w + m * w.ln() + 3.0 * m / 2.0
}

/// `y(x) = -a (x - x0)^2 + y0 + z_m(x / x0)`
pub fn fit_fn_direct(x: f64, a: f64, x0: f64, y0: f64, m: f64) -> f64 {
    -a * (x - x0) * (x - x0) + y0 + zm(x / x0, m)
}

/// Model function signature: `(x, coefficients) -> log density`
pub type ModelFn = dyn Fn(f64, &[f64]) -> f64 + Send + Sync;

/// The built-in fit models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BuiltinModel {
    /// Canonical model with coefficients `(a2, a1, m, c)`
    #[default]
    A2,
    /// The same curve parametrized around its peak, `(a, x0, y0, m)`
    Direct,
}

const A2_PARAMS: &[&str] = &["a2", "a1", "m", "c"];
const DIRECT_PARAMS: &[&str] = &["a", "x0", "y0", "m"];

static A2_CONVERTER: A2Converter = A2Converter;
static DIRECT_CONVERTER: DirectConverter = DirectConverter;

impl BuiltinModel {
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinModel::A2 => "a2",
            BuiltinModel::Direct => "direct",
        }
    }

    /// Look up a built-in model by name
    ///
    /// Accepts `"a2"`, `"canonical"`, `"default"` and `"direct"`.
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "a2" | "canonical" | "default" => Ok(BuiltinModel::A2),
            "direct" => Ok(BuiltinModel::Direct),
            other => Err(Error::unknown_model(other)),
        }
    }

    pub fn param_names(&self) -> &'static [&'static str] {
        match self {
            BuiltinModel::A2 => A2_PARAMS,
            BuiltinModel::Direct => DIRECT_PARAMS,
        }
    }

    pub fn evaluate(&self, x: f64, p: &[f64]) -> f64 {
        match self {
            BuiltinModel::A2 => fit_fn_a2(x, p[0], p[1], p[2], p[3]),
            BuiltinModel::Direct => fit_fn_direct(x, p[0], p[1], p[2], p[3]),
        }
    }

    pub fn converter(&self) -> &'static dyn ErrorBarConverter {
        match self {
            BuiltinModel::A2 => &A2_CONVERTER,
            BuiltinModel::Direct => &DIRECT_CONVERTER,
        }
    }
}

impl FromStr for BuiltinModel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

impl fmt::Display for BuiltinModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A caller-supplied model without error-bar conversion
#[derive(Clone)]
pub struct CustomModel {
    name: String,
    param_names: Vec<String>,
    func: Arc<ModelFn>,
}

impl CustomModel {
    /// Create a custom model from its parameter names and function
    pub fn new<S, F>(param_names: &[S], func: F) -> Result<Self>
    where
        S: AsRef<str>,
        F: Fn(f64, &[f64]) -> f64 + Send + Sync + 'static,
    {
        if param_names.is_empty() {
            return Err(Error::Configuration(
                "custom fit model must declare at least one parameter".to_string(),
            ));
        }
        Ok(Self {
            name: "<custom fit function>".to_string(),
            param_names: param_names.iter().map(|s| s.as_ref().to_string()).collect(),
            func: Arc::new(func),
        })
    }

    /// Give the model a display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    pub fn evaluate(&self, x: f64, p: &[f64]) -> f64 {
        (self.func)(x, p)
    }
}

impl fmt::Debug for CustomModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomModel")
            .field("name", &self.name)
            .field("param_names", &self.param_names)
            .finish_non_exhaustive()
    }
}

/// A fit model: built-in with converter, or custom without
#[derive(Debug, Clone)]
pub enum FitModel {
    Builtin(BuiltinModel),
    Custom(CustomModel),
}

impl FitModel {
    /// Resolve a built-in model by name
    pub fn builtin(name: &str) -> Result<Self> {
        Ok(FitModel::Builtin(BuiltinModel::from_name(name)?))
    }

    pub fn name(&self) -> &str {
        match self {
            FitModel::Builtin(m) => m.name(),
            FitModel::Custom(m) => m.name(),
        }
    }

    pub fn param_names(&self) -> Vec<String> {
        match self {
            FitModel::Builtin(m) => m.param_names().iter().map(|s| s.to_string()).collect(),
            FitModel::Custom(m) => m.param_names().to_vec(),
        }
    }

    pub fn num_params(&self) -> usize {
        match self {
            FitModel::Builtin(m) => m.param_names().len(),
            FitModel::Custom(m) => m.param_names().len(),
        }
    }

    /// Predicted log density at `x`
    pub fn evaluate(&self, x: f64, params: &[f64]) -> f64 {
        match self {
            FitModel::Builtin(m) => m.evaluate(x, params),
            FitModel::Custom(m) => m.evaluate(x, params),
        }
    }

    /// The converter to quantum error bars, if the model has one
    pub fn converter(&self) -> Option<&'static dyn ErrorBarConverter> {
        match self {
            FitModel::Builtin(m) => Some(m.converter()),
            FitModel::Custom(_) => None,
        }
    }

    /// Default coefficient bounds
    pub fn default_bounds(&self) -> Bounds {
        match self.converter() {
            Some(converter) => converter.param_bounds(),
            None => Bounds::unbounded(self.num_params()),
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, FitModel::Custom(_))
    }
}

impl Default for FitModel {
    fn default() -> Self {
        FitModel::Builtin(BuiltinModel::default())
    }
}

impl From<BuiltinModel> for FitModel {
    fn from(model: BuiltinModel) -> Self {
        FitModel::Builtin(model)
    }
}

impl From<CustomModel> for FitModel {
    fn from(model: CustomModel) -> Self {
        FitModel::Custom(model)
    }
}

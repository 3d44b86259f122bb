//! One-shot histogram analysis
//!
//! [`HistogramAnalysis`] runs the whole pipeline in its constructor:
//!
//! 1. validate the `ftox` transform
//! 2. normalize the histogram
//! 3. resolve the fit model
//! 4. guess a seed from the histogram unless one was given
//! 5. fit the log-density
//! 6. compute the reduced chi-squared and warn on a poor fit
//!
//! The result is immutable; the accessors only read from it.

use crate::converter::{QuantumErrorBars, QuantumErrorBarsX};
use crate::diagnostic::{FitDiagnostic, DEFAULT_REDCHI2_WARN_THRESHOLD};
use crate::driver::{fit_histogram, FitHistogramResult, FitOptions};
use crate::model::{CustomModel, FitModel};
use crate::params::FitParameters;
use crate::report::{format_fit_parameters, format_quantum_error_bars};
use crate::solver::{Bounds, BoundedLbfgs, LeastSquaresSolver, SolverOptions};
use crate::transform::FtoX;
use crate::visualization::{linspace, FitVisualizer, PlotData, PlotOptions, PlotSeries};
use qeb_core::{default_sink, DiagnosticSink, Error, Result, SharedSink};
use qeb_histogram::{DensityHistogram, HistogramWithErrorBars};
use std::fmt;
use std::sync::Arc;
use tracing::instrument;

#[derive(Debug, Clone)]
enum ModelChoice {
    Default,
    Named(String),
    Model(FitModel),
}

/// Configuration of a [`HistogramAnalysis`]
///
/// The builder can be reused to analyze several histograms with the same
/// settings.
#[derive(Clone)]
pub struct HistogramAnalysisBuilder {
    ftox: (f64, f64),
    model: ModelChoice,
    bounds: Option<Bounds>,
    p0: Option<Vec<f64>>,
    threshold_fraction: f64,
    redchi2_warn_threshold: f64,
    solver_options: SolverOptions,
    solver: Arc<dyn LeastSquaresSolver>,
    sink: SharedSink,
}

impl Default for HistogramAnalysisBuilder {
    fn default() -> Self {
        Self {
            ftox: (0.0, 1.0),
            model: ModelChoice::Default,
            bounds: None,
            p0: None,
            threshold_fraction: 0.0,
            redchi2_warn_threshold: DEFAULT_REDCHI2_WARN_THRESHOLD,
            solver_options: SolverOptions::default(),
            solver: Arc::new(BoundedLbfgs),
            sink: default_sink(),
        }
    }
}

impl HistogramAnalysisBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the transform `x = s * (f - h)`; `s` is checked when analyzing.
    pub fn ftox(mut self, h: f64, s: f64) -> Self {
        self.ftox = (h, s);
        self
    }

    /// Selects a built-in model by name (`"a2"`, `"canonical"`, `"direct"`).
    pub fn model_name(mut self, name: impl Into<String>) -> Self {
        self.model = ModelChoice::Named(name.into());
        self
    }

    pub fn model(mut self, model: impl Into<FitModel>) -> Self {
        self.model = ModelChoice::Model(model.into());
        self
    }

    /// Uses a caller-supplied model. Quantum error bars will not be available
    /// and an explicit [`p0`](Self::p0) is required.
    pub fn custom_model(self, model: CustomModel) -> Self {
        self.model(FitModel::Custom(model))
    }

    pub fn bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Sets the solver seed, skipping the graphical guess.
    pub fn p0(mut self, p0: Vec<f64>) -> Self {
        self.p0 = Some(p0);
        self
    }

    pub fn threshold_fraction(mut self, threshold_fraction: f64) -> Self {
        self.threshold_fraction = threshold_fraction;
        self
    }

    pub fn redchi2_warn_threshold(mut self, threshold: f64) -> Self {
        self.redchi2_warn_threshold = threshold;
        self
    }

    pub fn solver_options(mut self, solver_options: SolverOptions) -> Self {
        self.solver_options = solver_options;
        self
    }

    pub fn solver<S: LeastSquaresSolver + 'static>(mut self, solver: S) -> Self {
        self.solver = Arc::new(solver);
        self
    }

    pub fn sink<S: DiagnosticSink + 'static>(mut self, sink: S) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    fn resolve_model(&self) -> Result<FitModel> {
        match &self.model {
            ModelChoice::Default => Ok(FitModel::default()),
            ModelChoice::Named(name) => FitModel::builtin(name),
            ModelChoice::Model(model) => Ok(model.clone()),
        }
    }

    /// Run the analysis on `histogram`
    ///
    /// Any [`DensityHistogram`] can be analyzed; it is normalized to a
    /// probability density before fitting.
    #[instrument(skip_all, fields(num_bins = histogram.num_bins()))]
    pub fn analyze<H>(&self, histogram: &H) -> Result<HistogramAnalysis>
    where
        H: DensityHistogram + ?Sized,
    {
        let ftox = FtoX::new(self.ftox.0, self.ftox.1)?;
        let normalized = histogram.to_normalized();
        let model = self.resolve_model()?;
        let sink = self.sink.as_ref();

        let options = FitOptions {
            threshold_fraction: self.threshold_fraction,
            bounds: self.bounds.clone(),
            p0: self.p0.clone(),
            solver_options: self.solver_options,
        };
        let solver = self.solver.as_ref();
        let result = fit_histogram(&normalized, &model, &ftox, &options, solver, sink)?;
        sink.debug(&format!("Fit parameters: {}", result.params));

        let diagnostic =
            FitDiagnostic::compute(&result, &model, self.redchi2_warn_threshold, sink)?;
        sink.debug(&format!("Fit reduced chi-squared: {}", diagnostic.red_chi2));

        Ok(HistogramAnalysis {
            histogram: normalized,
            ftox,
            model,
            result,
            diagnostic,
            sink: Arc::clone(&self.sink),
        })
    }
}

impl fmt::Debug for HistogramAnalysisBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistogramAnalysisBuilder")
            .field("ftox", &self.ftox)
            .field("model", &self.model)
            .field("bounds", &self.bounds)
            .field("p0", &self.p0)
            .field("threshold_fraction", &self.threshold_fraction)
            .field("redchi2_warn_threshold", &self.redchi2_warn_threshold)
            .field("solver_options", &self.solver_options)
            .field("solver", &self.solver)
            .finish_non_exhaustive()
    }
}

/// A fitted histogram and its quantum error bars
pub struct HistogramAnalysis {
    histogram: HistogramWithErrorBars,
    ftox: FtoX,
    model: FitModel,
    result: FitHistogramResult,
    diagnostic: FitDiagnostic,
    sink: SharedSink,
}

impl HistogramAnalysis {
    /// Analyze with the default model, identity transform and no threshold
    pub fn new<H: DensityHistogram + ?Sized>(histogram: &H) -> Result<Self> {
        Self::builder().analyze(histogram)
    }

    pub fn builder() -> HistogramAnalysisBuilder {
        HistogramAnalysisBuilder::new()
    }

    /// Fitted coefficients, named after the model's parameters
    pub fn fit_parameters(&self) -> &FitParameters {
        &self.result.params
    }

    pub fn fit_red_chi2(&self) -> f64 {
        self.diagnostic.red_chi2
    }

    pub fn fit_diagnostic(&self) -> &FitDiagnostic {
        &self.diagnostic
    }

    pub fn fit_result(&self) -> &FitHistogramResult {
        &self.result
    }

    pub fn model(&self) -> &FitModel {
        &self.model
    }

    /// The histogram after normalization, as it was fitted
    pub fn normalized_histogram(&self) -> &HistogramWithErrorBars {
        &self.histogram
    }

    pub fn transform(&self) -> &FtoX {
        &self.ftox
    }

    pub fn ftox(&self, f: f64) -> f64 {
        self.ftox.ftox(f)
    }

    pub fn xtof(&self, x: f64) -> f64 {
        self.ftox.xtof(x)
    }

    /// Quantum error bars in the fit coordinate
    ///
    /// Fails with [`Error::MissingConverter`] for custom models and with the
    /// converter's error when the fitted curve has the wrong curvature.
    pub fn quantum_error_bars_x(&self) -> Result<QuantumErrorBarsX> {
        let converter = self
            .model
            .converter()
            .ok_or_else(|| Error::missing_converter(self.model.name()))?;
        converter.error_bars_x(self.result.params.values(), self.sink.as_ref())
    }

    /// Quantum error bars with the peak on the figure-of-merit axis
    pub fn quantum_error_bars(&self) -> Result<QuantumErrorBars> {
        Ok(self.quantum_error_bars_x()?.to_f(&self.ftox))
    }

    /// Pass the fitted coefficients as text to `print_fn`
    pub fn print_fit_parameters<F: FnMut(&str)>(
        &self,
        mut print_fn: F,
        show_cov: bool,
    ) -> &FitParameters {
        print_fn(&format_fit_parameters(&self.result.params, show_cov));
        &self.result.params
    }

    /// Pass the quantum error bars as text to `print_fn`
    pub fn print_quantum_error_bars<F: FnMut(&str)>(
        &self,
        mut print_fn: F,
    ) -> Result<QuantumErrorBars> {
        let q = self.quantum_error_bars()?;
        print_fn(&format_quantum_error_bars(&q));
        Ok(q)
    }

    /// [`print_fit_parameters`](Self::print_fit_parameters) to stdout
    pub fn display_fit_parameters(&self, show_cov: bool) -> &FitParameters {
        self.print_fit_parameters(|s| println!("{s}"), show_cov)
    }

    /// [`print_quantum_error_bars`](Self::print_quantum_error_bars) to stdout
    pub fn display_quantum_error_bars(&self) -> Result<QuantumErrorBars> {
        self.print_quantum_error_bars(|s| println!("{s}"))
    }

    /// Series to draw for this analysis
    pub fn plot_data(&self, options: &PlotOptions) -> Result<PlotData> {
        let r = &self.result;
        let fmin = r.f.iter().copied().fold(f64::INFINITY, f64::min);
        let fmax = r.f.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let fvals = linspace(fmin, fmax, options.curve_npts);
        let params = r.params.values();

        let fit = PlotSeries {
            label: "fit".to_string(),
            p: fvals
                .iter()
                .map(|&f| self.model.evaluate(self.ftox.ftox(f), params).exp())
                .collect(),
            f: fvals.clone(),
            err: None,
        };

        let deskewed_gaussian = if options.plot_deskewed_gaussian {
            if self.model.is_custom() {
                return Err(Error::missing_converter(self.model.name()));
            }
            let q = self.quantum_error_bars()?;
            let x0 = self.ftox.ftox(q.f0);
            Some(PlotSeries {
                label: "deskewed Gaussian".to_string(),
                p: fvals
                    .iter()
                    .map(|&f| {
                        let dx = self.ftox.ftox(f) - x0;
                        (-dx * dx / (q.delta * q.delta) + q.y0).exp()
                    })
                    .collect(),
                f: fvals,
                err: None,
            })
        } else {
            None
        };

        Ok(PlotData {
            xlabel: options.xlabel.clone(),
            ylabel: "probability density".to_string(),
            log_scale: options.log_scale,
            data: PlotSeries {
                label: "numerics".to_string(),
                f: r.f.clone(),
                p: r.p.clone(),
                err: Some(r.err_p.clone()),
            },
            fit,
            deskewed_gaussian,
        })
    }

    /// Compute the plot series and hand them to `visualizer`
    pub fn plot<V: FitVisualizer + ?Sized>(
        &self,
        visualizer: &V,
        options: &PlotOptions,
    ) -> Result<PlotData> {
        let data = self.plot_data(options)?;
        visualizer.render(&data)?;
        Ok(data)
    }
}

impl fmt::Debug for HistogramAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistogramAnalysis")
            .field("ftox", &self.ftox)
            .field("model", &self.model)
            .field("params", &self.result.params)
            .field("red_chi2", &self.diagnostic.red_chi2)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fit_fn_a2;
    use crate::visualization::NullFitVisualizer;
    use approx::assert_relative_eq;
    use qeb_core::{CollectingSink, NullSink};

    /// Canonical curve on 30 bins with 2% error bars, scaled like raw counts
    fn counts_histogram() -> HistogramWithErrorBars {
        let mut h = HistogramWithErrorBars::new(0.0, 0.3, 30).unwrap();
        let bins: Vec<f64> = h
            .values_center()
            .iter()
            .map(|&x| 1e6 * fit_fn_a2(x, 250.0, 100.0, 20.0, 0.0).exp())
            .collect();
        let delta: Vec<f64> = bins.iter().map(|b| 0.02 * b).collect();
        h.load(&bins, &delta, 0.0).unwrap();
        h
    }

    /// Raw counts with Poisson error bars, kept outside the histogram container
    struct PoissonCounts {
        min: f64,
        max: f64,
        counts: Vec<f64>,
        errors: Vec<f64>,
    }

    impl PoissonCounts {
        fn new(min: f64, max: f64, counts: Vec<f64>) -> Self {
            let errors = counts.iter().map(|c| c.sqrt()).collect();
            Self { min, max, counts, errors }
        }
    }

    impl DensityHistogram for PoissonCounts {
        fn centers(&self) -> Vec<f64> {
            let width = (self.max - self.min) / self.counts.len() as f64;
            (0..self.counts.len())
                .map(|i| self.min + (i as f64 + 0.5) * width)
                .collect()
        }

        fn densities(&self) -> &[f64] {
            &self.counts
        }

        fn uncertainties(&self) -> &[f64] {
            &self.errors
        }

        fn to_normalized(&self) -> HistogramWithErrorBars {
            let mut h = HistogramWithErrorBars::new(self.min, self.max, self.counts.len()).unwrap();
            h.load(&self.counts, &self.errors, 0.0).unwrap();
            h.normalized()
        }
    }

    fn quiet() -> HistogramAnalysisBuilder {
        HistogramAnalysis::builder().sink(NullSink)
    }

    #[test]
    fn test_pipeline_on_exact_curve() {
        let h = counts_histogram();
        let analysis = quiet().analyze(&h).unwrap();

        let params = analysis.fit_parameters();
        assert_relative_eq!(params.get("a2").unwrap(), 250.0, max_relative = 1e-4);
        assert_relative_eq!(params.get("m").unwrap(), 20.0, max_relative = 1e-4);
        // normalization only shifts the constant
        let expected_c = -(1e-6 * h.normalization()).ln();
        assert_relative_eq!(params.get("c").unwrap(), expected_c, epsilon = 1e-3);
        assert!(analysis.fit_red_chi2() < 1e-6);
        assert!(!analysis.fit_diagnostic().is_poor_fit());

        let qx = analysis.quantum_error_bars_x().unwrap();
        let q = analysis.quantum_error_bars().unwrap();
        assert_eq!(q.f0, qx.x0);
        assert!(qx.x0 > 0.1 && qx.x0 < 0.15);
        let normalization = analysis.normalized_histogram().normalization();
        assert_relative_eq!(normalization, 1.0, max_relative = 1e-12);
    }

    #[test]
    fn test_any_density_histogram_can_be_analyzed() {
        let container = counts_histogram();
        let counts = PoissonCounts::new(0.0, 0.3, container.bins().to_vec());
        assert_eq!(DensityHistogram::num_bins(&counts), 30);
        assert_eq!(counts.centers(), container.values_center());

        let analysis = quiet().analyze(&counts).unwrap();
        assert_eq!(analysis.fit_result().num_points(), 30);
        let normalization = analysis.normalized_histogram().normalization();
        assert_relative_eq!(normalization, 1.0, max_relative = 1e-12);
        let params = analysis.fit_parameters();
        assert_relative_eq!(params.get("a2").unwrap(), 250.0, max_relative = 1e-3);
        assert_relative_eq!(params.get("m").unwrap(), 20.0, max_relative = 1e-3);
    }

    #[test]
    fn test_reflected_transform() {
        // same curve on the fidelity axis f = 1 - x
        let base = counts_histogram();
        let mut h = HistogramWithErrorBars::new(0.7, 1.0, 30).unwrap();
        let bins: Vec<f64> = base.bins().iter().rev().copied().collect();
        let delta: Vec<f64> = base.delta().iter().rev().copied().collect();
        h.load(&bins, &delta, 0.0).unwrap();

        let analysis = quiet().ftox(1.0, -1.0).analyze(&h).unwrap();
        let qx = analysis.quantum_error_bars_x().unwrap();
        let q = analysis.quantum_error_bars().unwrap();
        assert_relative_eq!(q.f0, 1.0 - qx.x0, max_relative = 1e-12);
        let a2 = analysis.fit_parameters().get("a2").unwrap();
        assert_relative_eq!(a2, 250.0, max_relative = 1e-3);
        assert_relative_eq!(analysis.xtof(analysis.ftox(0.93)), 0.93, max_relative = 1e-12);
    }

    #[test]
    fn test_invalid_configuration_fails_at_construction() {
        let h = counts_histogram();
        assert!(quiet().ftox(0.0, 2.0).analyze(&h).unwrap_err().is_configuration());
        assert!(quiet().model_name("cubic").analyze(&h).unwrap_err().is_configuration());
    }

    #[test]
    fn test_direct_model() {
        let h = counts_histogram();
        let a2 = quiet().analyze(&h).unwrap().quantum_error_bars_x().unwrap();
        let direct = quiet().model_name("direct").analyze(&h).unwrap();
        assert_eq!(direct.fit_parameters().names(), &["a", "x0", "y0", "m"]);

        let q = direct.quantum_error_bars_x().unwrap();
        assert_relative_eq!(q.x0, a2.x0, max_relative = 1e-4);
        assert_relative_eq!(q.delta, a2.delta, max_relative = 1e-4);
        assert_relative_eq!(q.gamma, a2.gamma, max_relative = 1e-3);
    }

    #[test]
    fn test_reports() {
        let analysis = quiet().analyze(&counts_histogram()).unwrap();

        let mut lines = Vec::new();
        analysis.print_fit_parameters(|s| lines.push(s.to_string()), true);
        assert!(lines[0].starts_with("Fit parameters:\n"));
        assert!(lines[0].contains("a2 ="));
        assert!(lines[0].contains("+-"));

        let mut text = String::new();
        let q = analysis.print_quantum_error_bars(|s| text.push_str(s)).unwrap();
        assert!(text.starts_with("Quantum Error Bars:\n"));
        assert!(text.contains(&crate::report::format_general(q.f0, 4)));
    }

    #[test]
    fn test_plot_data() {
        let analysis = quiet().analyze(&counts_histogram()).unwrap();
        let plot = analysis
            .plot(&NullFitVisualizer, &PlotOptions::new().curve_npts(50))
            .unwrap();

        assert_eq!(plot.data.f.len(), 30);
        assert_eq!(plot.fit.f.len(), 50);
        let gaussian = plot.deskewed_gaussian.unwrap();
        assert_eq!(gaussian.p.len(), 50);

        // both curves peak near the same point with the same height
        let q = analysis.quantum_error_bars().unwrap();
        let peak = gaussian.p.iter().copied().fold(0.0, f64::max);
        assert!(peak <= q.y0.exp() * (1.0 + 1e-12));
        assert!(peak > 0.9 * q.y0.exp());
    }

    #[test]
    fn test_poor_fit_is_reported_not_fatal() {
        let sink = Arc::new(CollectingSink::new());
        let mut h = counts_histogram();
        // error bars far too small for the wiggle added below
        let bins: Vec<f64> = h
            .bins()
            .iter()
            .enumerate()
            .map(|(i, b)| b * if i % 2 == 0 { 1.2 } else { 0.8 })
            .collect();
        let delta: Vec<f64> = bins.iter().map(|b| 0.01 * b).collect();
        h.load(&bins, &delta, 0.0).unwrap();

        let analysis = HistogramAnalysis::builder()
            .sink(Arc::clone(&sink))
            .p0(vec![250.0, 100.0, 20.0, 0.0])
            .analyze(&h)
            .unwrap();
        assert!(analysis.fit_diagnostic().is_poor_fit());
        assert!(sink.warnings().iter().any(|w| w.contains("reduced chi-squared")));
    }
}

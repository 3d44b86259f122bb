//! Behaviour of the analysis pipeline around models, transforms and filtering

mod common;

use common::*;
use proptest::prelude::*;
use qeb_core::{CollectingSink, Error};
use qeb_fit::test_data::SyntheticHistograms;
use qeb_fit::{
    retained_indices, CustomModel, FitVisualizer, HistogramAnalysis, NullFitVisualizer, PlotData,
    PlotOptions,
};
use std::sync::{Arc, Mutex};

fn custom_canonical() -> CustomModel {
    CustomModel::new(&["a2", "a1", "m", "c"], |x, p| {
        -p[0] * x * x - p[1] * x + p[2] * x.ln() + p[3]
    })
    .unwrap()
    .with_name("my canonical copy")
}

#[test]
fn test_custom_model_has_no_error_bars() {
    let histogram = SyntheticHistograms::reference().unwrap();
    let analysis = quiet_builder()
        .custom_model(custom_canonical())
        .p0(vec![300.0, 80.0, 15.0, 0.0])
        .analyze(&histogram)
        .unwrap();

    // raw coefficients and chi-squared remain available
    let params = analysis.fit_parameters();
    assert_eq!(params.names(), &["a2", "a1", "m", "c"]);
    assert_relative_eq!(params.get("a2").unwrap(), 250.0, max_relative = RECOVERY_TOLERANCE);
    assert!(analysis.fit_red_chi2().is_finite());

    match analysis.quantum_error_bars() {
        Err(Error::MissingConverter { model }) => assert_eq!(model, "my canonical copy"),
        other => panic!("expected a missing converter error, got {other:?}"),
    }
    assert!(matches!(
        analysis.quantum_error_bars_x(),
        Err(Error::MissingConverter { .. })
    ));
    assert!(analysis.print_quantum_error_bars(|_| {}).is_err());

    // the deskewed Gaussian needs the converter, the plain plot does not
    assert!(analysis.plot(&NullFitVisualizer, &PlotOptions::default()).is_err());
    let plot = analysis
        .plot(&NullFitVisualizer, &PlotOptions::new().plot_deskewed_gaussian(false))
        .unwrap();
    assert!(plot.deskewed_gaussian.is_none());
}

#[test]
fn test_custom_model_requires_seed() {
    let histogram = SyntheticHistograms::reference().unwrap();
    let err = quiet_builder()
        .custom_model(custom_canonical())
        .analyze(&histogram)
        .unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_invalid_scale_is_rejected() {
    let histogram = SyntheticHistograms::reference().unwrap();
    for s in [2.0, 0.0, -2.0, 0.5] {
        let err = quiet_builder().ftox(0.0, s).analyze(&histogram).unwrap_err();
        assert!(err.is_configuration(), "s={s}");
        assert!(err.to_string().contains("s="));
    }
}

#[test]
fn test_threshold_shrinks_retained_points() {
    let histogram = SyntheticHistograms::reference().unwrap();
    let mut previous = usize::MAX;
    for threshold in [0.0, 0.001, 0.01, 0.05] {
        let analysis = quiet_builder()
            .threshold_fraction(threshold)
            .analyze(&histogram)
            .unwrap();
        let n = analysis.fit_result().num_points();
        assert!(n <= previous, "threshold={threshold}: {n} > {previous}");
        previous = n;
    }
    assert!(previous < histogram.num_bins());
}

#[test]
fn test_zero_threshold_keeps_all_positive_bins() {
    let mut histogram = SyntheticHistograms::reference().unwrap();
    let mut bins = histogram.bins().to_vec();
    bins[0] = 0.0;
    bins[39] = 0.0;
    let delta = histogram.delta().to_vec();
    histogram.load(&bins, &delta, 0.0).unwrap();

    let analysis = quiet_builder().analyze(&histogram).unwrap();
    let result = analysis.fit_result();
    assert_eq!(result.num_points(), 38);
    assert_eq!(result.indices.first(), Some(&1));
    assert!(result.fit_logp.iter().all(|v| v.is_finite()));
    assert_eq!(result.p.len(), 40);
}

#[test]
fn test_warnings_reach_the_sink() {
    let sink = Arc::new(CollectingSink::new());
    let histogram = SyntheticHistograms::reference().unwrap();

    // a strict threshold turns the ordinary noise into a warning
    let analysis = HistogramAnalysis::builder()
        .sink(Arc::clone(&sink))
        .redchi2_warn_threshold(0.01)
        .analyze(&histogram)
        .unwrap();
    assert!(analysis.fit_diagnostic().is_poor_fit());
    assert_eq!(sink.warnings().len(), 1);
    assert!(sink.records().iter().any(|d| d.message.starts_with("Fit parameters:")));
}

#[derive(Default)]
struct RecordingVisualizer {
    plots: Mutex<Vec<PlotData>>,
}

impl FitVisualizer for RecordingVisualizer {
    fn render(&self, plot: &PlotData) -> qeb_core::Result<()> {
        self.plots.lock().unwrap().push(plot.clone());
        Ok(())
    }
}

#[test]
fn test_plot_reaches_visualizer() {
    let histogram = SyntheticHistograms::reference().unwrap();
    let analysis = quiet_builder().analyze(&histogram).unwrap();
    let visualizer = RecordingVisualizer::default();
    analysis
        .plot(&visualizer, &PlotOptions::new().log_scale(true).xlabel("fidelity"))
        .unwrap();

    let plots = visualizer.plots.lock().unwrap();
    assert_eq!(plots.len(), 1);
    assert_eq!(plots[0].xlabel, "fidelity");
    assert!(plots[0].log_scale);
    assert_eq!(plots[0].fit.f.len(), 200);
    assert_eq!(plots[0].data.err.as_ref().map(Vec::len), Some(40));
}

proptest! {
    #[test]
    fn prop_threshold_is_monotone(
        p in prop::collection::vec(0.0f64..10.0, 1..60),
        lo in 0.0f64..1.0,
        hi in 0.0f64..1.0,
    ) {
        let err: Vec<f64> = p.iter().map(|v| 0.1 * v + 0.01).collect();
        let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };

        let kept_lo = retained_indices(&p, &err, lo);
        let kept_hi = retained_indices(&p, &err, hi);
        prop_assert!(kept_hi.iter().all(|i| kept_lo.contains(i)));

        let kept_zero = retained_indices(&p, &err, 0.0);
        let positive: Vec<usize> = (0..p.len()).filter(|&i| p[i] > 0.0).collect();
        prop_assert_eq!(kept_zero, positive);
    }
}

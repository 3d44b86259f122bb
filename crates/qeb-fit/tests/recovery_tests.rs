//! Fitting synthetic histograms with known coefficients

mod common;

use common::*;
use qeb_fit::test_data::{SyntheticHistograms, REFERENCE_PARAMS};
use qeb_fit::{A2Converter, ErrorBarConverter, HistogramAnalysis};
use qeb_core::NullSink;

#[test]
fn test_reference_histogram_recovers_coefficients() {
    let histogram = SyntheticHistograms::reference().unwrap();
    let analysis = quiet_builder().analyze(&histogram).unwrap();
    let params = analysis.fit_parameters();

    assert_relative_eq!(params.get("a2").unwrap(), 250.0, max_relative = RECOVERY_TOLERANCE);
    assert_relative_eq!(params.get("a1").unwrap(), 100.0, max_relative = RECOVERY_TOLERANCE);
    assert_relative_eq!(params.get("m").unwrap(), 20.0, max_relative = RECOVERY_TOLERANCE);

    // normalization shifts c by -ln(N)
    let expected_c = -histogram.normalization().ln();
    assert_relative_eq!(params.get("c").unwrap(), expected_c, epsilon = 0.5);

    let red_chi2 = analysis.fit_red_chi2();
    assert!(red_chi2 > 0.3 && red_chi2 < 3.0, "red_chi2={red_chi2}");
}

#[test]
fn test_recovery_across_seeds() {
    let truth = A2Converter.error_bars_x(&REFERENCE_PARAMS, &NullSink).unwrap();

    for seed in seeds() {
        let histogram =
            SyntheticHistograms::noisy(REFERENCE_PARAMS, 0.02, 0.32, 40, 0.005, seed).unwrap();
        let analysis = quiet_builder().analyze(&histogram).unwrap();

        let q = analysis.quantum_error_bars_x().unwrap();
        assert_relative_eq!(q.x0, truth.x0, max_relative = 0.01);
        assert_relative_eq!(q.delta, truth.delta, max_relative = 0.01);

        let red_chi2 = analysis.fit_red_chi2();
        assert!(red_chi2 > 0.3 && red_chi2 < 3.0, "seed={seed} red_chi2={red_chi2}");
    }
}

#[test]
fn test_averaged_runs() {
    let histogram =
        SyntheticHistograms::averaged(REFERENCE_PARAMS, 0.02, 0.32, 40, 0.05, 25, 3).unwrap();
    let analysis = quiet_builder().analyze(&histogram).unwrap();
    let params = analysis.fit_parameters();

    assert_relative_eq!(params.get("a2").unwrap(), 250.0, max_relative = RECOVERY_TOLERANCE);
    assert_relative_eq!(params.get("m").unwrap(), 20.0, max_relative = RECOVERY_TOLERANCE);
    assert!(analysis.fit_result().covariance_estimated);
    assert!(params.std_errors().iter().all(|s| s.is_finite() && *s > 0.0));
}

#[test]
fn test_direct_model_agrees_with_canonical() {
    let histogram = SyntheticHistograms::reference().unwrap();
    let canonical = quiet_builder().analyze(&histogram).unwrap();
    let direct = quiet_builder().model_name("direct").analyze(&histogram).unwrap();

    let qc = canonical.quantum_error_bars().unwrap();
    let qd = direct.quantum_error_bars().unwrap();
    assert_relative_eq!(qd.f0, qc.f0, max_relative = 1e-3);
    assert_relative_eq!(qd.delta, qc.delta, max_relative = 1e-3);
    assert_relative_eq!(direct.fit_red_chi2(), canonical.fit_red_chi2(), max_relative = 1e-3);
}

#[test]
fn test_default_constructor() {
    let histogram = SyntheticHistograms::exact(REFERENCE_PARAMS, 0.02, 0.32, 40, 0.01).unwrap();
    let analysis = HistogramAnalysis::new(&histogram).unwrap();
    assert_eq!(analysis.model().name(), "a2");
    assert_eq!(analysis.transform().s(), 1.0);
    assert!(analysis.fit_red_chi2() < 1e-6);
}

//! Loading and saving histogram files on disk

mod common;

use common::*;
use qeb_core::Error;
use qeb_histogram::{
    load_csv_histogram, save_csv_histogram, AveragedHistogramBuilder, DensityHistogram,
    HistogramParams,
};
use rand::prelude::*;
use rand_distr::Normal;

#[test]
fn test_load_five_row_file() {
    let file = temp_file_with(FIVE_ROW_FILE);
    let histogram = load_csv_histogram(file.path()).unwrap();

    assert_relative_eq!(histogram.min(), 0.0);
    assert_relative_eq!(histogram.max(), 1.0);
    assert_eq!(histogram.num_bins(), 5);
    assert_eq!(histogram.bins(), &[10.0, 20.0, 30.0, 40.0, 50.0]);
    assert_eq!(histogram.delta(), &[1.0, 2.0, 3.0, 4.0, 5.0]);
    assert_eq!(histogram.off_chart(), 0.0);
}

#[test]
fn test_space_separated_file_with_extra_column() {
    let file = temp_file_with(
        "Value   Counts   Error   Extra\n\
         0.90   1.5e-3   1e-4   7\n\
         0.92   2.5e-3   2e-4   7\n\
         0.94   1.0e-3   1e-4   7\n",
    );
    let histogram = load_csv_histogram(file.path()).unwrap();
    assert_eq!(histogram.num_bins(), 3);
    assert_relative_eq!(histogram.max(), 0.96, max_relative = 1e-12);
    assert_relative_eq!(histogram.bins()[1], 2.5e-3);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_csv_histogram(dir.path().join("does-not-exist.csv")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_malformed_files() {
    let short = temp_file_with("x\tp\terr\n0.0\t1\t0.1\n");
    assert!(matches!(load_csv_histogram(short.path()), Err(Error::InvalidInput(_))));

    let narrow = temp_file_with("x\tp\n0.0\t1\n0.1\t2\n");
    assert!(matches!(load_csv_histogram(narrow.path()), Err(Error::InvalidInput(_))));

    let garbage = temp_file_with("x\tp\terr\n0.0\tabc\t0.1\n0.1\t2\t0.1\n");
    assert!(matches!(load_csv_histogram(garbage.path()), Err(Error::Parse(_))));
}

#[test]
fn test_save_then_load_averaged_histogram() {
    let params = HistogramParams::new(0.0, 1.0, 20).unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    let noise = Normal::new(0.0, 0.5).unwrap();

    let mut builder = AveragedHistogramBuilder::new(params);
    for _ in 0..10 {
        let run: Vec<f64> = params
            .values_center()
            .iter()
            .map(|x| {
                let peak = 100.0 * (-(x - 0.5) * (x - 0.5) / 0.02).exp();
                (peak + noise.sample(&mut rng)).max(0.0)
            })
            .collect();
        builder.add_run(&run, 1.0).unwrap();
    }
    let averaged = builder.finalize().unwrap();

    let file = tempfile::NamedTempFile::new().unwrap();
    save_csv_histogram(&averaged, file.path()).unwrap();
    let loaded = load_csv_histogram(file.path()).unwrap();

    assert_eq!(loaded.num_bins(), 20);
    assert_relative_eq!(loaded.min(), 0.0, epsilon = 1e-12);
    assert_relative_eq!(loaded.max(), 1.0, max_relative = 1e-9);
    for (a, b) in loaded.bins().iter().zip(averaged.bins()) {
        assert_relative_eq!(*a, *b, max_relative = 1e-9);
    }

    // the file format has no off-chart column
    assert_eq!(loaded.off_chart(), 0.0);
    let density = loaded.to_normalized();
    assert_relative_eq!(density.normalization(), 1.0, max_relative = 1e-12);
}

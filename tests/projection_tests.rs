// End-to-end tests of the PCA projection step and its reports.

use approx::assert_abs_diff_eq;
use ndarray::{array, Array2};
use pca_projection::reports::{ReportRow, CUMULATIVE_EXPLAINED_VARIANCE, EXPLAINED_VARIANCE, RECONSTRUCTION_ERRORS};
use pca_projection::{
    reconstruction_error, Instances, OutputDirectory, OutputFilename, PcaConfig, PcaProjection, ProjectionError,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::Path;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn event_instances(n: usize, seed: u64) -> Instances {
    // Three latent behaviours spread over eight features, plus a little noise.
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let latent = Array2::from_shape_fn((n, 3), |_| rng.gen_range(-2.0..2.0));
    let loadings = Array2::from_shape_fn((3, 8), |_| rng.gen_range(-1.0..1.0));
    let noise = Array2::from_shape_fn((n, 8), |_| rng.gen_range(-0.01..0.01));
    Instances::new(latent.dot(&loadings) + noise + 10.0)
}

fn read_report(path: &Path) -> Vec<ReportRow> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    assert_eq!(reader.headers().unwrap(), vec!["x", "y"]);
    reader.deserialize().map(|r| r.unwrap()).collect()
}

#[test]
fn full_mode_writes_all_three_reports() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let output = OutputDirectory::new(dir.path());
    let projection = PcaProjection::new(PcaConfig::default(), output.clone());
    let instances = event_instances(60, 1);

    let (fitted, projected) = projection.fit_transform(&instances, false).unwrap();
    assert_eq!(projected.coordinates().dim(), (60, fitted.num_components()));

    let explained = read_report(&output.output_filename(EXPLAINED_VARIANCE, ".csv"));
    let cumulative = read_report(&output.output_filename(CUMULATIVE_EXPLAINED_VARIANCE, ".csv"));
    let errors = read_report(&output.output_filename(RECONSTRUCTION_ERRORS, ".csv"));

    let k = fitted.num_components();
    assert_eq!(explained.len(), k);
    assert_eq!(cumulative.len(), k);
    assert_eq!(errors.len(), k);

    let mut running = 0.0;
    for (i, (e, c)) in explained.iter().zip(cumulative.iter()).enumerate() {
        assert_eq!(e.x, i);
        assert_eq!(c.x, i);
        assert!(e.y >= 0.0);
        running += e.y;
        assert_abs_diff_eq!(c.y, running, epsilon = 1e-12);
    }
    assert!(running <= 1.0 + 1e-12);
    // Three latent behaviours carry nearly all of the variance.
    assert!(cumulative[2].y > 0.99);

    for (i, row) in errors.iter().enumerate() {
        assert_eq!(row.x, i);
        let expected = reconstruction_error(&fitted, &instances, &projected, i + 1).unwrap();
        assert_abs_diff_eq!(row.y, expected, epsilon = 1e-12);
    }
    for w in errors.windows(2) {
        assert!(w[1].y <= w[0].y + 1e-9);
    }
}

#[test]
fn quick_mode_writes_nothing() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let projection = PcaProjection::new(PcaConfig::default(), OutputDirectory::new(dir.path()));
    let instances = event_instances(20, 2);

    let (fitted, projected) = projection.fit_transform(&instances, true).unwrap();
    assert_eq!(projected.num_components(), fitted.num_components());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn constant_feature_scenario() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let output = OutputDirectory::new(dir.path());
    let projection = PcaProjection::new(PcaConfig::default(), output.clone());
    let instances = Instances::new(array![
        [1.0, 2.0, 5.0],
        [2.0, 1.0, 5.0],
        [3.0, 5.0, 5.0],
        [4.0, 3.0, 5.0]
    ]);

    let fitted = projection.fit(&instances, false).unwrap();
    assert_eq!(fitted.num_components(), 2);

    let cumulative = read_report(&output.output_filename(CUMULATIVE_EXPLAINED_VARIANCE, ".csv"));
    assert_eq!(cumulative.len(), 2);
    assert_abs_diff_eq!(cumulative[1].y, 1.0, epsilon = 1e-10);
}

#[test]
fn line_scenario_reconstructs_exactly() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let output = OutputDirectory::new(dir.path());
    let projection = PcaProjection::new(PcaConfig::with_num_components(1), output.clone());
    let instances = Instances::new(array![[0.0, 0.0], [1.0, 2.0], [2.5, 5.0], [-3.0, -6.0], [7.0, 14.0]]);

    let (fitted, _) = projection.fit_transform(&instances, false).unwrap();
    assert_eq!(fitted.num_components(), 1);
    let errors = read_report(&output.output_filename(RECONSTRUCTION_ERRORS, ".csv"));
    assert_eq!(errors.len(), 1);
    assert_abs_diff_eq!(errors[0].y, 0.0, epsilon = 1e-18);
}

#[test]
fn transform_with_other_feature_count_fails_without_report() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let output = OutputDirectory::new(dir.path());
    let projection = PcaProjection::new(PcaConfig::default(), output.clone());
    let fitted = projection.fit(&event_instances(30, 3), true).unwrap();

    let other = Instances::new(Array2::zeros((5, 7)));
    let err = projection.transform(&fitted, &other, false).unwrap_err();
    assert!(matches!(err, ProjectionError::DimensionMismatch { expected: 8, found: 7 }));
    assert!(!output.output_filename(RECONSTRUCTION_ERRORS, ".csv").exists());
}

#[test]
fn failed_fit_writes_no_report() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let output = OutputDirectory::new(dir.path());
    let projection = PcaProjection::new(PcaConfig::default(), output.clone());
    let instances = Instances::new(array![[1.0, f64::NAN], [2.0, 3.0]]);

    assert!(matches!(projection.fit(&instances, false), Err(ProjectionError::Fit { .. })));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn transform_of_no_instances_skips_the_error_report() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let output = OutputDirectory::new(dir.path());
    let projection = PcaProjection::new(PcaConfig::default(), output.clone());
    let fitted = projection.fit(&event_instances(30, 4), true).unwrap();

    let projected = projection
        .transform(&fitted, &Instances::new(Array2::zeros((0, 8))), false)
        .unwrap();
    assert_eq!(projected.num_instances(), 0);
    assert!(!output.output_filename(RECONSTRUCTION_ERRORS, ".csv").exists());
}

#[test]
fn fitted_state_is_shared_across_threads() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let projection = PcaProjection::new(PcaConfig::default(), OutputDirectory::new(dir.path()));
    let instances = event_instances(40, 5);
    let fitted = projection.fit(&instances, true).unwrap();
    let reference = fitted.transform(&instances).unwrap();

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| fitted.transform(&instances).unwrap()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), reference);
        }
    });
}

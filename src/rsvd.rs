// src/rsvd.rs

use log::debug;
use ndarray::{s, Array1, Array2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use crate::error::ProjectionError;
use crate::linalg_backends::{decomposition_error, BackendQR, BackendSVD};

/// Truncated SVD of a (centered) data matrix.
#[derive(Debug)]
pub struct TruncatedSvd {
    /// Leading singular values, descending. Length k.
    pub singular_values: Array1<f64>,
    /// Leading right singular vectors as rows. Shape (k, n_features).
    pub vt: Array2<f64>,
}

/// Randomized truncated SVD (Halko, Martinsson, Tropp, 2011) of `data`,
/// shape (n_samples, n_features).
///
/// * `k` - target rank
/// * `n_oversamples` - extra sketch columns, the sketch has `k + n_oversamples` columns
///   (capped by the smaller matrix dimension)
/// * `n_power_iterations` - QR-stabilised power iterations refining the range basis
/// * `seed` - seed of the Gaussian test matrix
pub fn randomized_svd<B: BackendQR + BackendSVD>(
    backend: &B,
    data: &Array2<f64>,
    k: usize,
    n_oversamples: usize,
    n_power_iterations: usize,
    seed: u64,
) -> Result<TruncatedSvd, ProjectionError> {
    let (n_samples, n_features) = data.dim();
    let min_dim = n_samples.min(n_features);
    if k == 0 || min_dim == 0 {
        return Err(ProjectionError::fit("randomized SVD needs a non-empty matrix and k > 0"));
    }
    let k = k.min(min_dim);
    let sketch_dim = (k + n_oversamples).min(min_dim);
    debug!(
        "RSVD: n_samples={}, n_features={}, k={}, sketch={}, power_iterations={}",
        n_samples, n_features, k, sketch_dim, n_power_iterations
    );

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0).map_err(|e| ProjectionError::Decomposition(e.to_string()))?;
    let omega = Array2::from_shape_fn((n_features, sketch_dim), |_| normal.sample(&mut rng));

    // Range basis of data, refined by power iterations
    let mut q_basis = backend
        .qr_q_factor(&data.dot(&omega))
        .map_err(|e| decomposition_error("QR of the initial sketch", e))?;
    for _ in 0..n_power_iterations {
        let z = backend
            .qr_q_factor(&data.t().dot(&q_basis))
            .map_err(|e| decomposition_error("QR during power iteration", e))?;
        q_basis = backend
            .qr_q_factor(&data.dot(&z))
            .map_err(|e| decomposition_error("QR during power iteration", e))?;
    }

    let projected = q_basis.t().dot(data);
    let svd = backend
        .svd_into(projected, false, true)
        .map_err(|e| decomposition_error("SVD of the projected sketch", e))?;
    let vt = svd
        .vt
        .ok_or_else(|| ProjectionError::Decomposition("SVD did not return right singular vectors".into()))?;

    let k = k.min(svd.s.len()).min(vt.nrows());
    Ok(TruncatedSvd {
        singular_values: svd.s.slice(s![..k]).to_owned(),
        vt: vt.slice(s![..k, ..]).to_owned(),
    })
}

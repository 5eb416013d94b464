// Principal component analysis (PCA) projector

use log::{debug, info, warn};
use ndarray::{s, Array1, Array2, Axis};
use std::time::Instant;

use crate::config::{PcaConfig, SvdSolver};
use crate::error::ProjectionError;
use crate::instances::{Instances, ProjectedInstances};
use crate::linalg_backends::{decomposition_error, BackendEigh, BackendQR, BackendSVD, NdarrayLinAlgBackend};
use crate::reconstruction;
use crate::rsvd::randomized_svd;

/// Smallest relative eigenvalue cutoff; below it eigenpairs are rounding noise.
const MIN_RANK_TOLERANCE: f64 = 1e-12;

/// Fits principal components to training instances.
///
/// The projector itself holds no fitted state: `fit` returns a [`FittedPca`]
/// that owns everything needed to transform and reconstruct instances.
#[derive(Debug, Clone)]
pub struct PcaProjector<B = NdarrayLinAlgBackend> {
    config: PcaConfig,
    backend: B,
}

impl PcaProjector<NdarrayLinAlgBackend> {
    pub fn new(config: PcaConfig) -> Self {
        Self::with_backend(config, NdarrayLinAlgBackend)
    }
}

impl Default for PcaProjector<NdarrayLinAlgBackend> {
    fn default() -> Self {
        Self::new(PcaConfig::default())
    }
}

impl<B: BackendEigh + BackendQR + BackendSVD> PcaProjector<B> {
    pub fn with_backend(config: PcaConfig, backend: B) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &PcaConfig {
        &self.config
    }

    /// Fits the principal components of `instances`.
    ///
    /// The data is mean-centered (and divided by the per-feature standard deviation
    /// when `standardize` is set). Components are ranked by descending explained
    /// variance. Components whose eigenvalue is numerically zero relative to the
    /// largest one are discarded, so the fitted `num_components` may be lower than
    /// requested.
    ///
    /// Exact fitting eigendecomposes the f×f covariance matrix when
    /// n_features <= n_instances and the n×n Gram matrix otherwise.
    ///
    /// # Errors
    /// Returns `ProjectionError::Fit` if the matrix is empty, holds non-finite values,
    /// has no variance, or if the requested component count is 0 or exceeds the
    /// number of features. Returns `ProjectionError::Decomposition` if the
    /// linear-algebra backend fails.
    pub fn fit(&self, instances: &Instances) -> Result<FittedPca, ProjectionError> {
        let start_time = Instant::now();
        let data = instances.features();
        let (n_instances, n_features) = data.dim();

        if n_instances == 0 || n_features == 0 {
            return Err(ProjectionError::fit(format!(
                "training matrix is empty ({} instances x {} features)",
                n_instances, n_features
            )));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(ProjectionError::fit("training matrix contains non-finite values"));
        }
        if !(self.config.rank_tolerance >= 0.0 && self.config.rank_tolerance.is_finite()) {
            return Err(ProjectionError::fit(format!(
                "rank tolerance must be finite and non-negative, got {}",
                self.config.rank_tolerance
            )));
        }
        let requested = match self.config.num_components {
            Some(0) => return Err(ProjectionError::fit("requested number of components is 0")),
            Some(k) if k > n_features => {
                return Err(ProjectionError::fit(format!(
                    "requested {} components but the data only has {} features",
                    k, n_features
                )))
            }
            Some(k) => k,
            None => n_instances.min(n_features),
        };
        let max_rank = requested.min(n_instances.min(n_features));

        let mean = data
            .mean_axis(Axis(0))
            .ok_or_else(|| ProjectionError::fit("failed to compute the mean of the training data"))?;
        let mut centered = data - &mean;

        let scale = if self.config.standardize {
            let std_dev = centered.map_axis(Axis(0), |column| column.std(0.0));
            std_dev.mapv(|val| if val.abs() < 1e-9 { 1.0 } else { val })
        } else {
            Array1::ones(n_features)
        };
        if self.config.standardize {
            centered /= &scale;
        }

        // Covariance denominator; a single instance has no spread to normalise.
        let denom = (n_instances.max(2) - 1) as f64;
        let total_variance = centered.iter().map(|v| v * v).sum::<f64>() / denom;
        let magnitude = data.iter().map(|v| v * v).sum::<f64>() / denom;
        if total_variance <= 1e-24 * magnitude || total_variance == 0.0 {
            return Err(ProjectionError::fit("training data has no variance"));
        }

        let solver = self.config.resolve_solver(n_instances, n_features);
        debug!(
            "Fitting PCA: {} instances x {} features, requested {} components, solver {:?}",
            n_instances, n_features, requested, solver
        );

        let eig_pairs = match solver {
            SvdSolver::Randomized => self.randomized_eigenpairs(&centered, max_rank, denom)?,
            _ if n_features <= n_instances => self.covariance_eigenpairs(&centered, denom)?,
            _ => self.gram_eigenpairs(&centered, denom)?,
        };

        let largest_eigval = eig_pairs.first().map_or(0.0, |(v, _)| *v);
        if largest_eigval <= 0.0 {
            return Err(ProjectionError::fit("decomposition produced no positive eigenvalue"));
        }
        let threshold = largest_eigval * self.config.rank_tolerance.max(MIN_RANK_TOLERANCE);
        let final_rank = eig_pairs
            .iter()
            .take(max_rank)
            .take_while(|(val, _)| *val > threshold)
            .count();

        if self.config.num_components.is_some() && final_rank < requested {
            warn!(
                "Requested {} components but the training data only supports {}.",
                requested, final_rank
            );
        }

        let mut projection_matrix = Array2::<f64>::zeros((n_features, final_rank));
        let mut explained_variance = Array1::<f64>::zeros(final_rank);
        for (i, (eigval, direction)) in eig_pairs.into_iter().take(final_rank).enumerate() {
            projection_matrix.slice_mut(s![.., i]).assign(&direction);
            explained_variance[i] = eigval.max(0.0);
        }
        flip_signs(&mut projection_matrix);
        let explained_variance_ratio = explained_variance.mapv(|v| v / total_variance);

        info!(
            "Fitted PCA on {} instances x {} features: {} components, {:.4} of the variance explained, in {:?}",
            n_instances,
            n_features,
            final_rank,
            explained_variance_ratio.sum(),
            start_time.elapsed()
        );

        Ok(FittedPca {
            mean,
            scale,
            projection_matrix,
            explained_variance,
            explained_variance_ratio,
            total_variance,
            num_training_instances: n_instances,
            solver,
        })
    }

    fn covariance_eigenpairs(&self, centered: &Array2<f64>, denom: f64) -> Result<Vec<(f64, Array1<f64>)>, ProjectionError> {
        let mut cov_matrix = centered.t().dot(centered);
        cov_matrix /= denom;

        let eig = self
            .backend
            .eigh_upper(&cov_matrix)
            .map_err(|e| decomposition_error("eigendecomposition of the covariance matrix", e))?;

        let mut eig_pairs: Vec<(f64, Array1<f64>)> = eig
            .eigenvalues
            .into_iter()
            .zip(eig.eigenvectors.columns().into_iter().map(|col| normalized(col.to_owned())))
            .filter_map(|(val, direction)| direction.map(|d| (val, d)))
            .collect();
        sort_descending(&mut eig_pairs);
        Ok(eig_pairs)
    }

    fn gram_eigenpairs(&self, centered: &Array2<f64>, denom: f64) -> Result<Vec<(f64, Array1<f64>)>, ProjectionError> {
        let mut gram_matrix = centered.dot(&centered.t());
        gram_matrix /= denom;

        let eig = self
            .backend
            .eigh_upper(&gram_matrix)
            .map_err(|e| decomposition_error("eigendecomposition of the Gram matrix", e))?;

        // Feature-space axis of eigenvector u is X^T u, re-normalised to unit length.
        let mut eig_pairs: Vec<(f64, Array1<f64>)> = eig
            .eigenvalues
            .into_iter()
            .zip(
                eig.eigenvectors
                    .columns()
                    .into_iter()
                    .map(|u_col| normalized(centered.t().dot(&u_col))),
            )
            .filter_map(|(val, direction)| direction.map(|d| (val, d)))
            .collect();
        sort_descending(&mut eig_pairs);
        Ok(eig_pairs)
    }

    fn randomized_eigenpairs(
        &self,
        centered: &Array2<f64>,
        k: usize,
        denom: f64,
    ) -> Result<Vec<(f64, Array1<f64>)>, ProjectionError> {
        let svd = randomized_svd(
            &self.backend,
            centered,
            k,
            self.config.n_oversamples,
            self.config.n_power_iterations,
            self.config.random_seed,
        )?;
        let mut eig_pairs: Vec<(f64, Array1<f64>)> = svd
            .singular_values
            .iter()
            .map(|s| s * s / denom)
            .zip(svd.vt.rows().into_iter().map(|row| normalized(row.to_owned())))
            .filter_map(|(val, direction)| direction.map(|d| (val, d)))
            .collect();
        sort_descending(&mut eig_pairs);
        Ok(eig_pairs)
    }
}

fn sort_descending(eig_pairs: &mut [(f64, Array1<f64>)]) {
    eig_pairs.sort_by(|(a, _), (b, _)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
}

/// Unit-length copy of `v`, `None` when `v` is numerically zero.
fn normalized(mut v: Array1<f64>) -> Option<Array1<f64>> {
    let norm = v.dot(&v).sqrt();
    if norm > 1e-12 {
        v.mapv_inplace(|x| x / norm);
        Some(v)
    } else {
        None
    }
}

/// Makes the entry of largest magnitude of every column positive.
fn flip_signs(matrix: &mut Array2<f64>) {
    for mut column in matrix.columns_mut() {
        let pivot = column
            .iter()
            .copied()
            .fold(0.0_f64, |best, v| if v.abs() > best.abs() { v } else { best });
        if pivot < 0.0 {
            column.mapv_inplace(|x| -x);
        }
    }
}

fn check_finite(instances: &Instances) -> Result<(), ProjectionError> {
    for (row_idx, row) in instances.features().axis_iter(Axis(0)).enumerate() {
        if let Some(column) = row.iter().position(|v| !v.is_finite()) {
            return Err(ProjectionError::NonFinite { row: row_idx, column });
        }
    }
    Ok(())
}

/// A fitted PCA projection. Immutable once returned by [`PcaProjector::fit`].
#[derive(Debug, Clone)]
pub struct FittedPca {
    /// Per-feature mean of the training data. Shape: (n_features)
    mean: Array1<f64>,
    /// Per-feature divisor applied after centering; all ones unless standardizing.
    /// Shape: (n_features)
    scale: Array1<f64>,
    /// Principal directions as unit-norm orthogonal columns.
    /// Shape: (n_features, num_components)
    projection_matrix: Array2<f64>,
    /// Eigenvalues of the covariance matrix, descending. Shape: (num_components)
    explained_variance: Array1<f64>,
    /// Shape: (num_components)
    explained_variance_ratio: Array1<f64>,
    total_variance: f64,
    num_training_instances: usize,
    solver: SvdSolver,
}

impl FittedPca {
    /// Number of components actually produced by the decomposition.
    pub fn num_components(&self) -> usize {
        self.projection_matrix.ncols()
    }

    pub fn num_features(&self) -> usize {
        self.projection_matrix.nrows()
    }

    pub fn num_training_instances(&self) -> usize {
        self.num_training_instances
    }

    /// The (n_features, num_components) matrix whose columns are the principal directions.
    pub fn projection_matrix(&self) -> &Array2<f64> {
        &self.projection_matrix
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn scale(&self) -> &Array1<f64> {
        &self.scale
    }

    pub fn explained_variance(&self) -> &Array1<f64> {
        &self.explained_variance
    }

    pub fn explained_variance_ratio(&self) -> &Array1<f64> {
        &self.explained_variance_ratio
    }

    /// Running sum of the explained variance ratios.
    pub fn cumulative_explained_variance_ratio(&self) -> Array1<f64> {
        let mut running = 0.0;
        self.explained_variance_ratio.mapv(|r| {
            running += r;
            running
        })
    }

    /// Total variance of the (centered, possibly scaled) training data, discarded
    /// components included.
    pub fn total_variance(&self) -> f64 {
        self.total_variance
    }

    /// The solver the fit actually ran with.
    pub fn solver(&self) -> SvdSolver {
        self.solver
    }

    /// Projects `instances` onto the principal directions.
    ///
    /// Uses the centering (and scaling) learned at fit time. The returned
    /// coordinates are freshly allocated; calling this twice on the same
    /// instances returns identical coordinates.
    ///
    /// # Errors
    /// Returns `DimensionMismatch` if `instances` does not have the fitted number
    /// of features, `NonFinite` if an instance holds NaN or infinity.
    pub fn transform(&self, instances: &Instances) -> Result<ProjectedInstances, ProjectionError> {
        if instances.num_features() != self.num_features() {
            return Err(ProjectionError::DimensionMismatch {
                expected: self.num_features(),
                found: instances.num_features(),
            });
        }
        if instances.num_instances() == 0 {
            return Ok(ProjectedInstances::new(Array2::zeros((0, self.num_components()))));
        }
        check_finite(instances)?;

        let mut x = instances.features().to_owned();
        for mut row in x.axis_iter_mut(Axis(0)) {
            ndarray::Zip::from(&mut row)
                .and(&self.mean)
                .and(&self.scale)
                .for_each(|val, &m, &s| *val = (*val - m) / s);
        }
        let coordinates = x.dot(&self.projection_matrix);
        debug!(
            "Transformed {} instances into {} components.",
            coordinates.nrows(),
            coordinates.ncols()
        );
        Ok(ProjectedInstances::new(coordinates))
    }

    /// Maps projected coordinates back to feature space using every component.
    pub fn inverse_transform(&self, projected: &ProjectedInstances) -> Result<Array2<f64>, ProjectionError> {
        reconstruction::reconstructed_data(self, projected, self.num_components())
    }
}

// src/config.rs

use serde::{Deserialize, Serialize};

/// Strategy used to compute the principal components.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SvdSolver {
    /// `Full` for small inputs or when most components are requested, `Randomized` otherwise.
    Auto,
    /// Exact eigendecomposition of the covariance (or Gram) matrix.
    Full,
    /// Randomized truncated SVD of the centered data.
    Randomized,
}

/// Configuration of the PCA projection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PcaConfig {
    /// Number of components to keep. `None` keeps min(n_instances, n_features).
    /// The fitted count can be lower when the data is rank deficient.
    pub num_components: Option<usize>,
    /// Divide the centered features by their standard deviation before fitting.
    pub standardize: bool,
    pub svd_solver: SvdSolver,
    /// Components with an eigenvalue at or below `rank_tolerance * largest_eigenvalue`
    /// are treated as numerically zero and discarded.
    pub rank_tolerance: f64,
    /// Number of additional random dimensions sampled by the randomized solver.
    pub n_oversamples: usize,
    /// Number of power iterations of the randomized solver.
    pub n_power_iterations: usize,
    /// Seed of the random test matrix of the randomized solver.
    pub random_seed: u64,
}

impl Default for PcaConfig {
    fn default() -> Self {
        PcaConfig {
            num_components: None,
            standardize: false,
            svd_solver: SvdSolver::Auto,
            rank_tolerance: 1e-10,
            n_oversamples: 10,
            n_power_iterations: 4,
            random_seed: 2025,
        }
    }
}

impl PcaConfig {
    pub fn with_num_components(num_components: usize) -> Self {
        PcaConfig {
            num_components: Some(num_components),
            ..Default::default()
        }
    }

    /// Resolves `Auto` into a concrete solver for an input of the given shape.
    pub fn resolve_solver(&self, n_instances: usize, n_features: usize) -> SvdSolver {
        match self.svd_solver {
            SvdSolver::Auto => {
                let max_dim = n_instances.max(n_features);
                let min_dim = n_instances.min(n_features);
                match self.num_components {
                    Some(k) if max_dim > 500 && (k as f64) < 0.8 * min_dim as f64 => {
                        SvdSolver::Randomized
                    }
                    _ => SvdSolver::Full,
                }
            }
            solver => solver,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_solver_prefers_full_on_small_inputs() {
        let config = PcaConfig::with_num_components(2);
        assert_eq!(config.resolve_solver(100, 50), SvdSolver::Full);
    }

    #[test]
    fn auto_solver_switches_to_randomized_for_few_components_of_large_inputs() {
        let config = PcaConfig::with_num_components(10);
        assert_eq!(config.resolve_solver(2000, 600), SvdSolver::Randomized);
        // Most of the spectrum requested: exact decomposition.
        let config = PcaConfig::with_num_components(550);
        assert_eq!(config.resolve_solver(2000, 600), SvdSolver::Full);
        // Unspecified count keeps every component.
        assert_eq!(PcaConfig::default().resolve_solver(2000, 600), SvdSolver::Full);
    }

    #[test]
    fn explicit_solver_is_kept() {
        let config = PcaConfig {
            svd_solver: SvdSolver::Randomized,
            ..Default::default()
        };
        assert_eq!(config.resolve_solver(3, 3), SvdSolver::Randomized);
    }
}

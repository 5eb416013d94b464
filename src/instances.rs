// src/instances.rs

use ndarray::{s, Array2, ArrayView2};

use crate::error::ProjectionError;

/// An ordered set of instances, one row per instance and one column per feature.
///
/// Row order is meaningful: projected and reconstructed matrices are aligned
/// with the original rows by position.
#[derive(Debug, Clone, PartialEq)]
pub struct Instances {
    features: Array2<f64>,
}

impl Instances {
    /// Wraps a feature matrix of shape (n_instances, n_features).
    pub fn new(features: Array2<f64>) -> Self {
        Self { features }
    }

    /// Builds the feature matrix from row vectors.
    ///
    /// # Errors
    /// Returns `RaggedRows` if a row does not have the length of the first row.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, ProjectionError> {
        let n_instances = rows.len();
        let n_features = rows.first().map_or(0, |row| row.len());

        if let Some((row_idx, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != n_features) {
            return Err(ProjectionError::RaggedRows {
                row: row_idx,
                expected: n_features,
                found: row.len(),
            });
        }
        let features = Array2::from_shape_fn((n_instances, n_features), |(i, j)| rows[i][j]);
        Ok(Self { features })
    }

    pub fn num_instances(&self) -> usize {
        self.features.nrows()
    }

    pub fn num_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    /// View on the first `num_max_features` columns (all columns if there are fewer).
    pub fn leading_features(&self, num_max_features: usize) -> ArrayView2<'_, f64> {
        let n = num_max_features.min(self.num_features());
        self.features.slice(s![.., ..n])
    }
}

impl From<Array2<f64>> for Instances {
    fn from(features: Array2<f64>) -> Self {
        Self::new(features)
    }
}

/// Coordinates of instances in the reduced space, shape (n_instances, num_components).
///
/// Each transform call allocates a fresh matrix; it never aliases the input instances.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedInstances {
    coordinates: Array2<f64>,
}

impl ProjectedInstances {
    pub fn new(coordinates: Array2<f64>) -> Self {
        Self { coordinates }
    }

    pub fn num_instances(&self) -> usize {
        self.coordinates.nrows()
    }

    pub fn num_components(&self) -> usize {
        self.coordinates.ncols()
    }

    pub fn coordinates(&self) -> &Array2<f64> {
        &self.coordinates
    }

    /// View on the coordinates along the first `k` components.
    pub fn leading_components(&self, k: usize) -> ArrayView2<'_, f64> {
        let k = k.min(self.num_components());
        self.coordinates.slice(s![.., ..k])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn from_rows_keeps_row_order() {
        let instances = Instances::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
        assert_eq!(instances.num_instances(), 3);
        assert_eq!(instances.num_features(), 2);
        assert_eq!(instances.features(), &array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
    }

    #[test]
    fn from_rows_rejects_ragged_input() {
        let err = Instances::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(
            err,
            ProjectionError::RaggedRows { row: 1, expected: 2, found: 1 }
        ));
    }

    #[test]
    fn from_rows_accepts_empty_and_featureless_input() {
        let empty = Instances::from_rows(Vec::new()).unwrap();
        assert_eq!(empty.features().dim(), (0, 0));
        let featureless = Instances::from_rows(vec![Vec::new(), Vec::new()]).unwrap();
        assert_eq!(featureless.features().dim(), (2, 0));
    }

    #[test]
    fn leading_features_is_clamped() {
        let instances = Instances::new(array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(instances.leading_features(2), array![[1.0, 2.0], [4.0, 5.0]]);
        assert_eq!(instances.leading_features(10).ncols(), 3);
    }

    #[test]
    fn leading_components_views_first_columns() {
        let projected = ProjectedInstances::new(array![[1.0, 2.0], [3.0, 4.0]]);
        assert_eq!(projected.leading_components(1), array![[1.0], [3.0]]);
    }
}

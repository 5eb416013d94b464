// src/reconstruction.rs

use log::debug;
use ndarray::{s, Array1, Array2, Axis};
use rayon::prelude::*;

use crate::error::ProjectionError;
use crate::instances::{Instances, ProjectedInstances};
use crate::pca::FittedPca;

fn check_component_count(fitted: &FittedPca, k: usize) -> Result<(), ProjectionError> {
    if k == 0 || k > fitted.num_components() {
        return Err(ProjectionError::Range {
            k,
            num_components: fitted.num_components(),
        });
    }
    Ok(())
}

fn check_projected(fitted: &FittedPca, projected: &ProjectedInstances) -> Result<(), ProjectionError> {
    if projected.num_components() != fitted.num_components() {
        return Err(ProjectionError::DimensionMismatch {
            expected: fitted.num_components(),
            found: projected.num_components(),
        });
    }
    Ok(())
}

fn check_aligned(
    fitted: &FittedPca,
    instances: &Instances,
    projected: &ProjectedInstances,
) -> Result<(), ProjectionError> {
    if instances.num_features() != fitted.num_features() {
        return Err(ProjectionError::DimensionMismatch {
            expected: fitted.num_features(),
            found: instances.num_features(),
        });
    }
    check_projected(fitted, projected)?;
    if projected.num_instances() != instances.num_instances() {
        return Err(ProjectionError::DimensionMismatch {
            expected: instances.num_instances(),
            found: projected.num_instances(),
        });
    }
    if instances.num_instances() == 0 {
        return Err(ProjectionError::NoInstances);
    }
    Ok(())
}

/// Approximates the original instances from their first `k` projected coordinates.
///
/// The truncated coordinates are copied, multiplied by the transpose of the first
/// `k` principal directions, then mapped back through the fitted scale and mean.
///
/// # Errors
/// `Range` if `k` is 0 or exceeds `num_components`, `DimensionMismatch` if the
/// coordinates do not have `num_components` columns.
pub fn reconstructed_data(
    fitted: &FittedPca,
    projected: &ProjectedInstances,
    k: usize,
) -> Result<Array2<f64>, ProjectionError> {
    check_component_count(fitted, k)?;
    check_projected(fitted, projected)?;

    let truncated = projected.leading_components(k).to_owned();
    let directions = fitted.projection_matrix().slice(s![.., ..k]);
    let mut reconstructed = truncated.dot(&directions.t());
    for mut row in reconstructed.axis_iter_mut(Axis(0)) {
        ndarray::Zip::from(&mut row)
            .and(fitted.mean())
            .and(fitted.scale())
            .for_each(|val, &m, &s| *val = *val * s + m);
    }
    Ok(reconstructed)
}

/// Mean over instances of the squared Euclidean distance between each instance
/// and its reconstruction from the first `k` components.
///
/// Distances are measured in the space the directions were fitted in: instances
/// are centered and divided by the fitted scale, then compared with
/// `projected[:, ..k] · directions[:, ..k]ᵀ`. Without standardization the scale is
/// one and this is the raw-space distance. With it, every feature weighs the same
/// and the error cannot grow with `k`, on training and held-out instances alike.
///
/// # Errors
/// `Range` if `k` is outside `1..=num_components`; `DimensionMismatch` if the
/// instances, the coordinates and the fitted projection disagree on shape;
/// `NoInstances` if there is no row to average over.
pub fn reconstruction_error(
    fitted: &FittedPca,
    instances: &Instances,
    projected: &ProjectedInstances,
    k: usize,
) -> Result<f64, ProjectionError> {
    check_component_count(fitted, k)?;
    check_aligned(fitted, instances, projected)?;

    let directions = fitted.projection_matrix().slice(s![.., ..k]);
    let mut residual = instances.features().to_owned();
    for mut row in residual.axis_iter_mut(Axis(0)) {
        ndarray::Zip::from(&mut row)
            .and(fitted.mean())
            .and(fitted.scale())
            .for_each(|val, &m, &s| *val = (*val - m) / s);
    }
    residual -= &projected.leading_components(k).dot(&directions.t());
    let total: f64 = residual
        .axis_iter(Axis(0))
        .map(|row| row.dot(&row))
        .sum();
    Ok(total / instances.num_instances() as f64)
}

/// Reconstruction error for every k in `1..=num_components`; entry `k - 1` holds
/// the error with `k` components.
///
/// Each k is evaluated as an independent task and the table is assembled in k order.
pub fn reconstruction_errors(
    fitted: &FittedPca,
    instances: &Instances,
    projected: &ProjectedInstances,
) -> Result<Array1<f64>, ProjectionError> {
    check_aligned(fitted, instances, projected)?;

    let errors = (1..=fitted.num_components())
        .into_par_iter()
        .map(|k| reconstruction_error(fitted, instances, projected, k))
        .collect::<Result<Vec<f64>, ProjectionError>>()?;
    debug!("Computed reconstruction errors for {} truncation sizes.", errors.len());
    Ok(Array1::from(errors))
}

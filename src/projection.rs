// src/projection.rs

use log::{info, warn};
use std::time::Instant;

use crate::config::PcaConfig;
use crate::error::ProjectionError;
use crate::instances::{Instances, ProjectedInstances};
use crate::pca::{FittedPca, PcaProjector};
use crate::reconstruction::reconstruction_errors;
use crate::reports::{
    cumulative_explained_variance_table, explained_variance_table, reconstruction_error_table, write_report,
    OutputFilename,
};

/// The PCA step of an unsupervised projection pipeline.
///
/// Outside quick mode, fitting writes the explained variance reports and
/// transforming writes the reconstruction error report, each resolved through
/// `output`. Every table is fully computed before anything is written.
#[derive(Debug, Clone)]
pub struct PcaProjection<O> {
    projector: PcaProjector,
    output: O,
}

impl<O: OutputFilename> PcaProjection<O> {
    pub fn new(config: PcaConfig, output: O) -> Self {
        Self {
            projector: PcaProjector::new(config),
            output,
        }
    }

    pub fn config(&self) -> &PcaConfig {
        self.projector.config()
    }

    /// Fits the projection on `instances`.
    ///
    /// When `quick` is false, `explained_variance.csv` and
    /// `cumuled_explained_variance.csv` are written.
    pub fn fit(&self, instances: &Instances, quick: bool) -> Result<FittedPca, ProjectionError> {
        let fitted = self.projector.fit(instances)?;
        if !quick {
            let explained = explained_variance_table(&fitted);
            let cumulative = cumulative_explained_variance_table(&fitted);
            write_report(&explained, &self.output)?;
            write_report(&cumulative, &self.output)?;
        }
        Ok(fitted)
    }

    /// Projects `instances` with a fitted projection.
    ///
    /// When `quick` is false, the reconstruction error for every component count is
    /// computed against `instances` and written to `reconstruction_errors.csv`.
    pub fn transform(
        &self,
        fitted: &FittedPca,
        instances: &Instances,
        quick: bool,
    ) -> Result<ProjectedInstances, ProjectionError> {
        let projected = fitted.transform(instances)?;
        if !quick {
            if instances.num_instances() == 0 {
                warn!("No instances to transform; skipping the reconstruction error report.");
                return Ok(projected);
            }
            let start_time = Instant::now();
            let errors = reconstruction_errors(fitted, instances, &projected)?;
            write_report(&reconstruction_error_table(&errors), &self.output)?;
            info!(
                "Reconstruction errors for {} component counts computed in {:?}",
                errors.len(),
                start_time.elapsed()
            );
        }
        Ok(projected)
    }

    pub fn fit_transform(
        &self,
        instances: &Instances,
        quick: bool,
    ) -> Result<(FittedPca, ProjectedInstances), ProjectionError> {
        let fitted = self.fit(instances, quick)?;
        let projected = self.transform(&fitted, instances, quick)?;
        Ok((fitted, projected))
    }
}

// PCA projection of security-event instances

#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod instances;
pub mod linalg_backends;
pub mod pca;
pub mod projection;
pub mod reconstruction;
pub mod reports;
pub mod rsvd;

pub use config::{PcaConfig, SvdSolver};
pub use error::ProjectionError;
pub use instances::{Instances, ProjectedInstances};
pub use pca::{FittedPca, PcaProjector};
pub use projection::PcaProjection;
pub use reconstruction::{reconstructed_data, reconstruction_error, reconstruction_errors};
pub use reports::{OutputDirectory, OutputFilename, ReportRow, ReportTable};

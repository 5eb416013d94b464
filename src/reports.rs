// src/reports.rs

use log::info;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ProjectionError;
use crate::pca::FittedPca;

pub const EXPLAINED_VARIANCE: &str = "explained_variance";
pub const CUMULATIVE_EXPLAINED_VARIANCE: &str = "cumuled_explained_variance";
pub const RECONSTRUCTION_ERRORS: &str = "reconstruction_errors";
pub const CSV_EXTENSION: &str = ".csv";

/// Resolves the path of a named output file.
pub trait OutputFilename {
    fn output_filename(&self, name: &str, extension: &str) -> PathBuf;
}

/// Writes every output as `<directory>/<name><extension>`.
#[derive(Debug, Clone)]
pub struct OutputDirectory {
    directory: PathBuf,
}

impl OutputDirectory {
    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
        }
    }
}

impl OutputFilename for OutputDirectory {
    fn output_filename(&self, name: &str, extension: &str) -> PathBuf {
        self.directory.join(format!("{}{}", name, extension))
    }
}

/// One line of a report: `x` is the index column, `y` the value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub x: usize,
    pub y: f64,
}

/// A two-column `x,y` table.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    pub name: &'static str,
    pub rows: Vec<ReportRow>,
}

impl ReportTable {
    fn from_values(name: &'static str, values: &Array1<f64>) -> Self {
        let rows = values
            .iter()
            .enumerate()
            .map(|(x, &y)| ReportRow { x, y })
            .collect();
        Self { name, rows }
    }}

/// Explained variance ratio of each component, indexed from 0.
pub fn explained_variance_table(fitted: &FittedPca) -> ReportTable {
    ReportTable::from_values(EXPLAINED_VARIANCE, fitted.explained_variance_ratio())
}

/// Running sum of the explained variance ratios, indexed from 0.
pub fn cumulative_explained_variance_table(fitted: &FittedPca) -> ReportTable {
    ReportTable::from_values(
        CUMULATIVE_EXPLAINED_VARIANCE,
        &fitted.cumulative_explained_variance_ratio(),
    )
}

/// Reconstruction error table: row `x` holds the error with `x + 1` components.
pub fn reconstruction_error_table(errors: &Array1<f64>) -> ReportTable {
    ReportTable::from_values(RECONSTRUCTION_ERRORS, errors)
}

/// Writes `table` as a comma-separated file with an `x,y` header.
///
/// The file is written to a temporary file in the destination directory and
/// renamed into place, so a failed write never leaves a partial report.
pub fn write_csv<P: AsRef<Path>>(table: &ReportTable, path: P) -> Result<(), ProjectionError> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let temp_file = tempfile::NamedTempFile::new_in(&parent)?;
    {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b',')
            .has_headers(true)
            .from_writer(temp_file.as_file());
        for row in &table.rows {
            writer.serialize(row)?;
        }
        // An empty table still gets its header.
        if table.rows.is_empty() {
            writer.write_record(["x", "y"])?;
        }
        writer.flush()?;
    }
    temp_file.persist(path).map_err(|e| ProjectionError::Io(e.error))?;

    info!("Wrote {} rows to {}", table.rows.len(), path.display());
    Ok(())
}

/// Writes `table` where `output` resolves its name.
pub fn write_report<O: OutputFilename + ?Sized>(table: &ReportTable, output: &O) -> Result<PathBuf, ProjectionError> {
    let path = output.output_filename(table.name, CSV_EXTENSION);
    write_csv(table, &path)?;
    Ok(path)
}

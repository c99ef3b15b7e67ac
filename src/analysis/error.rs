use std::path::PathBuf;

use crate::formats::IoError;
use crate::table::DatasetError;
use thiserror::Error;

use super::RowFailure;

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("image could not be loaded: {0}")]
    Image(#[from] IoError),

    #[error("image `{0}` has no pixels")]
    EmptyImage(PathBuf),
}

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("threshold is disabled; enable it before processing")]
    ThresholdDisabled,

    #[error("threshold {0} is not a finite number")]
    InvalidThreshold(f64),

    #[error("the dataset was replaced or edited while processing; results were discarded")]
    DatasetChanged,

    #[error(
        "{} row(s) already hold Threshold/Fraction/Mean Value; choose cancel, overwrite or save as",
        rows.len()
    )]
    ColumnCollision { rows: Vec<PathBuf> },

    #[error("{} row(s) failed: {}", failures.len(), summarize(failures))]
    PartialFailure { failures: Vec<RowFailure> },

    #[error("dataset error: {0}")]
    Dataset(#[from] DatasetError),
}

fn summarize(failures: &[RowFailure]) -> String {
    failures
        .iter()
        .map(|failure| format!("row {} `{}`", failure.index + 1, failure.file_path.display()))
        .collect::<Vec<_>>()
        .join(", ")
}

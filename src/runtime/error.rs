use std::path::PathBuf;

use crate::analysis::{AnalysisError, BatchError};
use crate::formats::IoError;
use crate::model::ModelError;
use crate::report::ReportError;
use crate::table::DatasetError;
use thiserror::Error;

use super::JobKind;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config `{path}`: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config `{path}`: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] IoError),

    #[error("preview error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("processing error: {0}")]
    Batch(#[from] BatchError),

    #[error("dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("report error: {0}")]
    Report(#[from] ReportError),

    #[error("invalid input: {0}")]
    Model(#[from] ModelError),

    #[error("no dataset is open")]
    NoDataset,

    #[error("group `{0}` is not part of the dataset")]
    UnknownGroup(String),

    #[error("a {0} run is already in progress")]
    Busy(JobKind),
}

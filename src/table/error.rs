use std::path::PathBuf;

use crate::model::ModelError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DatasetError>;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("dataset snapshot `{path}` is corrupt: {reason}")]
    CorruptFile { path: PathBuf, reason: String },

    #[error("dataset snapshot `{path}` has version {found}, expected {expected}")]
    VersionMismatch {
        path: PathBuf,
        found: u32,
        expected: u32,
    },

    #[error("failed to encode dataset snapshot: {0}")]
    Encode(String),

    #[error("file `{0}` appears more than once in the dataset")]
    DuplicatePath(PathBuf),

    #[error("{} row(s) already hold computed values", rows.len())]
    ColumnCollision { rows: Vec<PathBuf> },

    #[error("file `{0}` is not part of the dataset")]
    UnknownRow(PathBuf),

    #[error("dataset has no storage location; save it under a path first")]
    NoStorageLocation,

    #[error("invalid dataset row: {0}")]
    Row(#[from] ModelError),
}

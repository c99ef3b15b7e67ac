use std::path::PathBuf;

use thiserror::Error;

use super::SheetFailure;

pub type Result<T> = std::result::Result<T, ReportError>;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("export path `{0}` exists and is not a directory")]
    PathConflict(PathBuf),

    #[error("invalid export folder name `{0}`")]
    InvalidFolderName(String),

    #[error("unknown export format `{0}` (expected png or svg)")]
    UnknownFormat(String),

    #[error("report I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("sheet rendering failed: {0}")]
    Render(String),

    #[error("PNG encoding failed: {0}")]
    Encode(#[from] png::EncodingError),

    #[error("image encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("{} sheet(s) failed to export", failures.len())]
    PartialFailure { failures: Vec<SheetFailure> },
}

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("fraction {value} for `{path}` is outside [0, 1]")]
    FractionOutOfRange { path: PathBuf, value: f64 },

    #[error("threshold {value} for `{path}` is not a finite number")]
    NonFiniteThreshold { path: PathBuf, value: f64 },

    #[error("`{path}` has computed statistics but no threshold")]
    StatisticsWithoutThreshold { path: PathBuf },

    #[error("`{path}` has no file name")]
    MissingFileName { path: PathBuf },

    #[error("invalid grouping rule: {0}")]
    InvalidGroupingRule(String),
}

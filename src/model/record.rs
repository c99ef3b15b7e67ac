use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{ModelError, PixelArray, Result};

/// Group id carried by files that belong to no group.
pub const UNGROUPED_ID: u32 = 0;

/// One imported file before it is frozen into a dataset row.
#[derive(Debug, Clone)]
pub struct ImageRecord {
    file_path: PathBuf,
    pub group: String,
    pub group_id: u32,
    pixels: Option<Arc<PixelArray>>,
}

impl ImageRecord {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            group: String::new(),
            group_id: UNGROUPED_ID,
            pixels: None,
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn assign_group(&mut self, group: impl Into<String>, group_id: u32) {
        self.group = group.into();
        self.group_id = group_id;
    }

    pub fn pixels(&self) -> Option<&Arc<PixelArray>> {
        self.pixels.as_ref()
    }

    /// Returns the cached pixel array, loading it on first access.
    pub fn pixels_or_load<E>(
        &mut self,
        load: impl FnOnce(&Path) -> std::result::Result<PixelArray, E>,
    ) -> std::result::Result<Arc<PixelArray>, E> {
        if let Some(pixels) = &self.pixels {
            return Ok(Arc::clone(pixels));
        }
        let pixels = Arc::new(load(&self.file_path)?);
        self.pixels = Some(Arc::clone(&pixels));
        Ok(pixels)
    }

    /// Freezes the record into a row; pixels are never persisted.
    pub fn into_row(self) -> Result<DatasetRow> {
        DatasetRow::new(&self.file_path, self.group, self.group_id)
    }
}

/// Persisted row of the dataset table.
///
/// `fraction` and `mean_value` are only ever set together with `threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRow {
    #[serde(rename = "Filename")]
    file_name: String,
    #[serde(rename = "Directory")]
    directory: PathBuf,
    #[serde(rename = "Group", default)]
    pub group: String,
    #[serde(rename = "Group_ID", default)]
    pub group_id: u32,
    #[serde(rename = "Threshold", default)]
    threshold: Option<f64>,
    #[serde(rename = "Fraction", default)]
    fraction: Option<f64>,
    #[serde(rename = "Mean Value", default)]
    mean_value: Option<f64>,
}

impl DatasetRow {
    pub fn new(file_path: &Path, group: impl Into<String>, group_id: u32) -> Result<Self> {
        let file_name = file_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| ModelError::MissingFileName {
                path: file_path.to_path_buf(),
            })?;
        let directory = file_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(Self {
            file_name,
            directory,
            group: group.into(),
            group_id,
            threshold: None,
            fraction: None,
            mean_value: None,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn file_path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }

    pub(crate) fn set_directory(&mut self, directory: impl Into<PathBuf>) {
        self.directory = directory.into();
    }

    pub fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    pub fn fraction(&self) -> Option<f64> {
        self.fraction
    }

    pub fn mean_value(&self) -> Option<f64> {
        self.mean_value
    }

    /// True when any computed column already holds a value.
    pub fn has_statistics(&self) -> bool {
        self.threshold.is_some() || self.fraction.is_some() || self.mean_value.is_some()
    }

    pub fn set_statistics(&mut self, threshold: f64, fraction: f64, mean_value: f64) -> Result<()> {
        if !threshold.is_finite() {
            return Err(ModelError::NonFiniteThreshold {
                path: self.file_path(),
                value: threshold,
            });
        }
        if !(0.0..=1.0).contains(&fraction) {
            return Err(ModelError::FractionOutOfRange {
                path: self.file_path(),
                value: fraction,
            });
        }
        self.threshold = Some(threshold);
        self.fraction = Some(fraction);
        self.mean_value = Some(mean_value);
        Ok(())
    }

    pub fn clear_statistics(&mut self) {
        self.threshold = None;
        self.fraction = None;
        self.mean_value = None;
    }

    pub fn validate(&self) -> Result<()> {
        if self.file_name.is_empty() {
            return Err(ModelError::MissingFileName {
                path: self.file_path(),
            });
        }
        if self.threshold.is_none() && (self.fraction.is_some() || self.mean_value.is_some()) {
            return Err(ModelError::StatisticsWithoutThreshold {
                path: self.file_path(),
            });
        }
        if let Some(threshold) = self.threshold.filter(|value| !value.is_finite()) {
            return Err(ModelError::NonFiniteThreshold {
                path: self.file_path(),
                value: threshold,
            });
        }
        if let Some(fraction) = self.fraction {
            if !(0.0..=1.0).contains(&fraction) {
                return Err(ModelError::FractionOutOfRange {
                    path: self.file_path(),
                    value: fraction,
                });
            }
        }
        Ok(())
    }
}

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::analysis::DEFAULT_BINS;
use crate::model::DisplayOptions;
use crate::report::{DEFAULT_FOLDER_NAME, DISTRIBUTION_BINS, ExportFormat};
use crate::table::DEFAULT_SNAPSHOT_NAME;

use super::ConfigError;

/// Environment variable naming a config file when `--config` is absent.
pub const CONFIG_ENV: &str = "CELLSHEET_CONFIG";

/// User-tunable defaults; every field may be omitted from the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub threshold: f64,
    pub histogram_bins: usize,
    pub distribution_bins: usize,
    pub threshold_debounce_ms: u64,
    pub selection_debounce_ms: u64,
    pub display: DisplayOptions,
    pub export_format: ExportFormat,
    pub export_folder: String,
    pub snapshot_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            histogram_bins: DEFAULT_BINS,
            distribution_bins: DISTRIBUTION_BINS,
            threshold_debounce_ms: 300,
            selection_debounce_ms: 400,
            display: DisplayOptions::default(),
            export_format: ExportFormat::default(),
            export_folder: DEFAULT_FOLDER_NAME.to_string(),
            snapshot_name: DEFAULT_SNAPSHOT_NAME.to_string(),
        }
    }
}

impl AppConfig {
    /// Reads JSON, or YAML for `.yaml`/`.yml` paths.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let parsed = if matches!(extension.as_str(), "yaml" | "yml") {
            serde_yaml::from_str::<Self>(&raw).map_err(|error| error.to_string())
        } else {
            serde_json::from_str::<Self>(&raw).map_err(|error| error.to_string())
        };
        let config = parsed.map_err(|reason| ConfigError::Parse {
            path: path.to_path_buf(),
            reason,
        })?;
        config.validate()?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Explicit path first, then [`CONFIG_ENV`], then defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let from_env = env::var_os(CONFIG_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.histogram_bins == 0 || self.distribution_bins == 0 {
            return Err(ConfigError::Invalid(
                "histogram bin counts must be positive".to_string(),
            ));
        }
        if !self.threshold.is_finite() {
            return Err(ConfigError::Invalid("threshold must be finite".to_string()));
        }
        if self.snapshot_name.trim().is_empty() {
            return Err(ConfigError::Invalid("snapshot name is empty".to_string()));
        }
        Ok(())
    }

    pub fn threshold_debounce(&self) -> Duration {
        Duration::from_millis(self.threshold_debounce_ms)
    }

    pub fn selection_debounce(&self) -> Duration {
        Duration::from_millis(self.selection_debounce_ms)
    }
}

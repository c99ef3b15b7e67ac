use serde::{Deserialize, Serialize};

/// Background cutoff for the current preview/processing session.
///
/// Copied into each row's `threshold` only when a batch run completes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub value: f64,
    pub enabled: bool,
}

impl ThresholdConfig {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            enabled: true,
        }
    }

    /// The threshold to mask with, if masking is on.
    pub fn active(&self) -> Option<f64> {
        self.enabled.then_some(self.value)
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            value: 0.0,
            enabled: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HistogramScale {
    #[default]
    Linear,
    Log,
}

/// Manual Y-axis bounds; only honoured when `max > min`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct YBounds {
    pub min: f64,
    pub max: f64,
}

impl YBounds {
    pub fn resolve(self) -> Option<(f64, f64)> {
        (self.max > self.min).then_some((self.min, self.max))
    }
}

/// Session-level display settings shared by preview and report sheets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DisplayOptions {
    pub scale: HistogramScale,
    pub y_bounds: YBounds,
    /// Rescale each report histogram so its peak is 1.0.
    pub normalize: bool,
}

impl DisplayOptions {
    pub fn log_scale(&self) -> bool {
        self.scale == HistogramScale::Log
    }
}

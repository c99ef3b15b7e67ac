use std::path::Path;

use log::debug;

use crate::model::{DisplayOptions, ImageRecord, ThresholdConfig};
use crate::table::Dataset;

use super::{AppConfig, AppError, Result};

/// Mutable state of one interactive session: the open dataset, the current
/// threshold and display settings, and the last decoded preview.
#[derive(Debug, Clone)]
pub struct Session {
    dataset: Option<Dataset>,
    pub threshold: ThresholdConfig,
    pub display: DisplayOptions,
    pub selected_groups: Vec<String>,
    preview: Option<ImageRecord>,
}

impl Session {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            dataset: None,
            threshold: ThresholdConfig::new(config.threshold),
            display: config.display,
            selected_groups: Vec::new(),
            preview: None,
        }
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn dataset_mut(&mut self) -> Option<&mut Dataset> {
        self.dataset.as_mut()
    }

    pub fn require_dataset(&self) -> Result<&Dataset> {
        self.dataset.as_ref().ok_or(AppError::NoDataset)
    }

    pub fn require_dataset_mut(&mut self) -> Result<&mut Dataset> {
        self.dataset.as_mut().ok_or(AppError::NoDataset)
    }

    /// Replaces the open dataset; group selection and preview cache reset.
    pub fn open_dataset(&mut self, dataset: Dataset) {
        debug!("session opened dataset with {} row(s)", dataset.len());
        self.dataset = Some(dataset);
        self.selected_groups.clear();
        self.preview = None;
    }

    pub fn close_dataset(&mut self) -> Option<Dataset> {
        self.selected_groups.clear();
        self.preview = None;
        self.dataset.take()
    }

    pub fn set_threshold(&mut self, value: f64) {
        self.threshold.value = value;
    }

    pub fn set_threshold_enabled(&mut self, enabled: bool) {
        self.threshold.enabled = enabled;
    }

    /// Cached record for `path` when it was the last preview, otherwise a
    /// fresh record carrying the row's group.
    pub fn preview_record(&self, path: &Path) -> ImageRecord {
        if let Some(record) = self
            .preview
            .as_ref()
            .filter(|record| record.file_path() == path)
        {
            return record.clone();
        }
        let mut record = ImageRecord::new(path);
        if let Some(row) = self.dataset.as_ref().and_then(|dataset| dataset.row(path)) {
            record.assign_group(row.group.clone(), row.group_id);
        }
        record
    }

    pub fn remember_preview(&mut self, record: ImageRecord) {
        self.preview = Some(record);
    }

    pub fn cached_preview(&self) -> Option<&ImageRecord> {
        self.preview.as_ref()
    }

    pub fn is_group_selected(&self, name: &str) -> bool {
        self.selected_groups.iter().any(|selected| selected == name)
    }

    pub fn toggle_group(&mut self, name: &str) {
        if let Some(position) = self.selected_groups.iter().position(|g| g == name) {
            self.selected_groups.remove(position);
        } else {
            self.selected_groups.push(name.to_string());
        }
    }

    pub fn select_all_groups(&mut self) {
        self.selected_groups = self
            .dataset
            .as_ref()
            .map(|dataset| dataset.groups().into_iter().map(|group| group.name).collect())
            .unwrap_or_default();
    }

    pub fn clear_group_selection(&mut self) {
        self.selected_groups.clear();
    }
}

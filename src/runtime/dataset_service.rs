use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;

use crate::formats::is_supported_image;
use crate::model::{GroupAssignment, GroupingRule, group_files};
use crate::table::Dataset;

use super::Result;

/// Outcome of filtering user-picked paths down to readable images.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSelection {
    pub accepted: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DatasetService;

impl DatasetService {
    /// Keeps supported images, expanding directories one level, sorted and
    /// without duplicates.
    pub fn select_files(
        &self,
        paths: impl IntoIterator<Item = PathBuf>,
    ) -> Result<ImportSelection> {
        let mut selection = ImportSelection::default();
        for path in paths {
            if path.is_dir() {
                let mut entries = fs::read_dir(&path)?
                    .filter_map(|entry| entry.ok().map(|entry| entry.path()))
                    .filter(|entry| entry.is_file())
                    .collect::<Vec<_>>();
                entries.sort();
                for entry in entries {
                    push_candidate(&mut selection, entry);
                }
            } else {
                push_candidate(&mut selection, path);
            }
        }
        selection.accepted.sort();
        selection.accepted.dedup();
        info!(
            "selected {} image(s), skipped {}",
            selection.accepted.len(),
            selection.skipped.len()
        );
        Ok(selection)
    }

    pub fn group(
        &self,
        files: &[PathBuf],
        rule: Option<&GroupingRule>,
    ) -> Result<GroupAssignment> {
        if let Some(rule) = rule {
            rule.validate()?;
        }
        Ok(group_files(files, rule))
    }

    pub fn create(&self, files: &[PathBuf], rule: Option<&GroupingRule>) -> Result<Dataset> {
        let assignment = self.group(files, rule)?;
        Ok(Dataset::from_assignment(&assignment)?)
    }

    pub fn load(&self, path: impl AsRef<Path>) -> Result<Dataset> {
        Ok(Dataset::load(path)?)
    }

    pub fn save(&self, dataset: &mut Dataset) -> Result<()> {
        dataset.save()?;
        Ok(())
    }

    pub fn save_as(&self, dataset: &mut Dataset, path: impl Into<PathBuf>) -> Result<()> {
        dataset.save_as(path)?;
        Ok(())
    }

    pub fn relocate(&self, dataset: &mut Dataset, directory: impl AsRef<Path>) -> Result<()> {
        dataset.relocate(directory)?;
        Ok(())
    }
}

fn push_candidate(selection: &mut ImportSelection, path: PathBuf) {
    if is_supported_image(&path) {
        selection.accepted.push(path);
    } else {
        selection.skipped.push(path);
    }
}

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;

use crate::model::{DatasetRow, GroupAssignment, GroupingRule, group_files};

use super::snapshot::{read_snapshot, write_snapshot};
use super::{DatasetError, Group, Result};

/// Computed statistics for one row, keyed by the row's file path.
#[derive(Debug, Clone, PartialEq)]
pub struct RowUpdate {
    pub file_path: PathBuf,
    pub threshold: f64,
    pub fraction: f64,
    pub mean_value: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub groups: usize,
    pub processed: usize,
    pub storage_path: Option<PathBuf>,
}

/// Ordered rows keyed by file path, plus where they were last persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    rows: Vec<DatasetRow>,
    storage_path: Option<PathBuf>,
    dirty: bool,
}

impl Dataset {
    /// Builds a dataset from rows, rejecting duplicate paths and invalid rows.
    pub fn from_rows(rows: Vec<DatasetRow>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(rows.len());
        for row in &rows {
            row.validate()?;
            let path = row.file_path();
            if !seen.insert(path.clone()) {
                return Err(DatasetError::DuplicatePath(path));
            }
        }
        Ok(Self {
            rows,
            storage_path: None,
            dirty: true,
        })
    }

    /// One row per assigned file with every computed column empty.
    pub fn from_assignment(assignment: &GroupAssignment) -> Result<Self> {
        let rows = assignment
            .assignments()
            .into_iter()
            .map(|(path, group, group_id)| DatasetRow::new(&path, group, group_id))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let dataset = Self::from_rows(rows)?;
        info!(
            "created dataset with {} rows in {} groups",
            dataset.len(),
            assignment.group_count()
        );
        Ok(dataset)
    }

    pub fn from_selection(files: &[PathBuf], rule: Option<&GroupingRule>) -> Result<Self> {
        Self::from_assignment(&group_files(files, rule))
    }

    /// Reads a snapshot; the dataset remembers `path` as its storage location.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let rows = read_snapshot(path)?;
        let mut dataset = Self::from_rows(rows).map_err(|error| match error {
            DatasetError::Row(source) => DatasetError::CorruptFile {
                path: path.to_path_buf(),
                reason: source.to_string(),
            },
            DatasetError::DuplicatePath(duplicate) => DatasetError::CorruptFile {
                path: path.to_path_buf(),
                reason: format!("duplicate row for `{}`", duplicate.display()),
            },
            other => other,
        })?;
        dataset.storage_path = Some(path.to_path_buf());
        dataset.dirty = false;
        info!("loaded {} rows from {}", dataset.len(), path.display());
        Ok(dataset)
    }

    /// Saves to the current storage location.
    pub fn save(&mut self) -> Result<()> {
        let path = self
            .storage_path
            .clone()
            .ok_or(DatasetError::NoStorageLocation)?;
        self.save_as(path)
    }

    /// Saves to `path` and adopts it as the storage location.
    pub fn save_as(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        write_snapshot(&path, &self.rows)?;
        info!("saved {} rows to {}", self.len(), path.display());
        self.storage_path = Some(path);
        self.dirty = false;
        Ok(())
    }

    pub fn rows(&self) -> &[DatasetRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn position(&self, file_path: &Path) -> Option<usize> {
        self.rows.iter().position(|row| row.file_path() == file_path)
    }

    pub fn row(&self, file_path: &Path) -> Option<&DatasetRow> {
        self.position(file_path).map(|index| &self.rows[index])
    }

    pub fn storage_path(&self) -> Option<&Path> {
        self.storage_path.as_deref()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    /// Paths of rows whose computed columns already hold data.
    pub fn collisions(&self) -> Vec<PathBuf> {
        self.rows
            .iter()
            .filter(|row| row.has_statistics())
            .map(DatasetRow::file_path)
            .collect()
    }

    /// Merges `updates` into their rows.
    ///
    /// Without `overwrite`, any targeted row that already holds statistics
    /// fails the whole merge before anything changes.
    pub fn add_or_update_columns(
        &mut self,
        updates: &[RowUpdate],
        overwrite: bool,
    ) -> Result<usize> {
        let mut targets = Vec::with_capacity(updates.len());
        let mut colliding = Vec::new();
        for update in updates {
            let index = self
                .position(&update.file_path)
                .ok_or_else(|| DatasetError::UnknownRow(update.file_path.clone()))?;
            if self.rows[index].has_statistics() {
                colliding.push(update.file_path.clone());
            }
            targets.push(index);
        }
        if !overwrite && !colliding.is_empty() {
            return Err(DatasetError::ColumnCollision { rows: colliding });
        }

        // Validate on copies first so a bad update leaves every row untouched.
        let mut staged = Vec::with_capacity(updates.len());
        for (update, &index) in updates.iter().zip(&targets) {
            let mut row = self.rows[index].clone();
            row.set_statistics(update.threshold, update.fraction, update.mean_value)?;
            staged.push((index, row));
        }
        for (index, row) in staged {
            self.rows[index] = row;
        }
        if !updates.is_empty() {
            self.dirty = true;
        }
        debug!("merged {} row updates", updates.len());
        Ok(updates.len())
    }

    /// Rows ordered by group id, keeping insertion order inside a group.
    ///
    /// Ungrouped rows (id 0) sort last. The stored order is not changed.
    pub fn sorted_by_group(&self) -> Vec<&DatasetRow> {
        let mut view = self.rows.iter().collect::<Vec<_>>();
        view.sort_by_key(|row| group_sort_key(row));
        view
    }

    /// Persists the group ordering into the row order.
    pub fn apply_group_order(&mut self) {
        self.rows.sort_by_key(|row| group_sort_key(row));
        self.dirty = true;
    }

    /// Persists a file-name ordering into the row order.
    pub fn apply_filename_order(&mut self) {
        self.rows
            .sort_by(|left, right| left.file_name().cmp(right.file_name()));
        self.dirty = true;
    }

    /// Points every row at `directory`, keeping file names.
    pub fn relocate(&mut self, directory: impl AsRef<Path>) -> Result<()> {
        let directory = directory.as_ref();
        let mut seen = HashSet::with_capacity(self.rows.len());
        for row in &self.rows {
            let path = directory.join(row.file_name());
            if !seen.insert(path.clone()) {
                return Err(DatasetError::DuplicatePath(path));
            }
        }
        for row in &mut self.rows {
            row.set_directory(directory);
        }
        self.dirty = true;
        info!("relocated {} rows to {}", self.len(), directory.display());
        Ok(())
    }

    /// Named groups ordered by id; ungrouped rows are not a group.
    pub fn groups(&self) -> Vec<Group> {
        let mut by_name = BTreeMap::<&str, Group>::new();
        for row in self.rows.iter().filter(|row| !row.group.is_empty()) {
            by_name
                .entry(row.group.as_str())
                .or_insert_with(|| Group {
                    name: row.group.clone(),
                    id: row.group_id,
                    rows: Vec::new(),
                })
                .rows
                .push(row.clone());
        }
        let mut groups = by_name.into_values().collect::<Vec<_>>();
        groups.sort_by(|left, right| {
            left.id
                .cmp(&right.id)
                .then_with(|| left.name.cmp(&right.name))
        });
        groups
    }

    pub fn group(&self, name: &str) -> Option<Group> {
        self.groups().into_iter().find(|group| group.name == name)
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            rows: self.len(),
            groups: self.groups().len(),
            processed: self.rows.iter().filter(|row| row.has_statistics()).count(),
            storage_path: self.storage_path.clone(),
        }
    }
}

fn group_sort_key(row: &DatasetRow) -> (bool, u32) {
    (row.group.is_empty(), row.group_id)
}

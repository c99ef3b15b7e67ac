use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Serialize;

use crate::formats::ImageReader;
use crate::model::ThresholdConfig;
use crate::table::{Dataset, RowUpdate};

use super::{BatchError, CancelToken, ProgressObserver, compute_stats};

type BatchResult<T> = std::result::Result<T, BatchError>;

/// How to proceed when computed columns already hold data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollisionPolicy {
    /// Stop before loading anything; the dataset stays as it was.
    Cancel,
    /// Replace existing values and save over the current snapshot.
    Overwrite,
    /// Write results, but persist to a new snapshot path.
    SaveAs(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowFailure {
    /// Zero-based position in the dataset.
    pub index: usize,
    pub file_path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Persist {
    Storage,
    SaveAs(PathBuf),
}

/// Which dataset a plan was made for: its snapshot location and row set.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DatasetIdentity {
    storage: Option<PathBuf>,
    rows: Vec<PathBuf>,
}

impl DatasetIdentity {
    fn of(dataset: &Dataset) -> Self {
        let mut rows = dataset
            .rows()
            .iter()
            .map(|row| row.file_path())
            .collect::<Vec<_>>();
        rows.sort();
        Self {
            storage: dataset.storage_path().map(Path::to_path_buf),
            rows,
        }
    }
}

/// Rows to process, fixed before any work leaves the calling thread.
#[derive(Debug, Clone)]
pub struct BatchPlan {
    identity: DatasetIdentity,
    threshold: f64,
    rows: Vec<PathBuf>,
    overwrite: bool,
    persist: Persist,
    aborted: bool,
}

/// Results computed off the dataset, waiting to be merged.
#[derive(Debug, Clone)]
pub struct StagedBatch {
    plan: BatchPlan,
    updates: Vec<RowUpdate>,
    failures: Vec<RowFailure>,
    cancelled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub threshold: f64,
    pub total: usize,
    pub processed: usize,
    pub failures: Vec<RowFailure>,
    /// Set when the run stopped early or the collision policy was `Cancel`.
    pub cancelled: bool,
    pub saved_to: Option<PathBuf>,
}

impl BatchReport {
    pub fn succeeded(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }

    /// Turns recorded row failures into [`BatchError::PartialFailure`].
    pub fn ensure_complete(self) -> BatchResult<Self> {
        if self.failures.is_empty() {
            Ok(self)
        } else {
            Err(BatchError::PartialFailure {
                failures: self.failures,
            })
        }
    }
}

/// Checks the threshold and collision policy against the current rows.
///
/// A collision without a policy is an error; nothing is loaded or written.
pub fn plan_batch(
    dataset: &Dataset,
    threshold: &ThresholdConfig,
    policy: Option<&CollisionPolicy>,
) -> BatchResult<BatchPlan> {
    let threshold = threshold.active().ok_or(BatchError::ThresholdDisabled)?;
    if !threshold.is_finite() {
        return Err(BatchError::InvalidThreshold(threshold));
    }
    let collisions = dataset.collisions();
    let mut plan = BatchPlan {
        identity: DatasetIdentity::of(dataset),
        threshold,
        rows: dataset.rows().iter().map(|row| row.file_path()).collect(),
        overwrite: false,
        persist: Persist::Storage,
        aborted: false,
    };
    if collisions.is_empty() {
        return Ok(plan);
    }
    match policy {
        None => return Err(BatchError::ColumnCollision { rows: collisions }),
        Some(CollisionPolicy::Cancel) => {
            info!(
                "processing cancelled: {} rows already hold values",
                collisions.len()
            );
            plan.aborted = true;
        }
        Some(CollisionPolicy::Overwrite) => plan.overwrite = true,
        Some(CollisionPolicy::SaveAs(path)) => {
            plan.overwrite = true;
            plan.persist = Persist::SaveAs(path.clone());
        }
    }
    Ok(plan)
}

impl BatchPlan {
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn total(&self) -> usize {
        self.rows.len()
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Loads and measures every row in order; safe to run on a worker thread.
    ///
    /// A failing row is recorded and skipped. Cancellation stops before the
    /// next row and keeps what was already computed.
    pub fn stage(
        self,
        reader: &dyn ImageReader,
        progress: &dyn ProgressObserver,
        cancel: &CancelToken,
    ) -> StagedBatch {
        let total = self.rows.len();
        let mut updates = Vec::with_capacity(total);
        let mut failures = Vec::new();
        let mut cancelled = self.aborted;

        if !self.aborted {
            info!("processing {total} rows at threshold {}", self.threshold);
            for (index, path) in self.rows.iter().enumerate() {
                if cancel.is_cancelled() {
                    info!("processing cancelled after {index} of {total} rows");
                    cancelled = true;
                    break;
                }
                match measure(reader, path, self.threshold) {
                    Ok(update) => updates.push(update),
                    Err(reason) => {
                        warn!("row {} ({}) failed: {reason}", index + 1, path.display());
                        failures.push(RowFailure {
                            index,
                            file_path: path.clone(),
                            reason,
                        });
                    }
                }
                progress.report(index + 1, total, &display_name(path));
            }
        }

        StagedBatch {
            plan: self,
            updates,
            failures,
            cancelled,
        }
    }
}

impl StagedBatch {
    pub fn updates(&self) -> &[RowUpdate] {
        &self.updates
    }

    pub fn failures(&self) -> &[RowFailure] {
        &self.failures
    }

    /// Merges staged values into `dataset` and persists them.
    ///
    /// Rows that failed keep their previous values. Nothing is written when
    /// no row produced a value. `dataset` must be the one the plan was made
    /// for; a replaced, relocated or re-saved dataset is rejected untouched.
    pub fn apply(self, dataset: &mut Dataset) -> BatchResult<BatchReport> {
        if DatasetIdentity::of(dataset) != self.plan.identity {
            warn!("discarding staged batch: dataset changed since it was planned");
            return Err(BatchError::DatasetChanged);
        }
        let mut report = BatchReport {
            threshold: self.plan.threshold,
            total: self.plan.rows.len(),
            processed: self.updates.len(),
            failures: self.failures,
            cancelled: self.cancelled,
            saved_to: None,
        };
        if self.updates.is_empty() {
            return Ok(report);
        }

        dataset.add_or_update_columns(&self.updates, self.plan.overwrite)?;
        match self.plan.persist {
            Persist::SaveAs(path) => {
                dataset.save_as(&path)?;
                report.saved_to = Some(path);
            }
            Persist::Storage => {
                if dataset.storage_path().is_some() {
                    dataset.save()?;
                    report.saved_to = dataset.storage_path().map(Path::to_path_buf);
                }
            }
        }
        info!(
            "processed {} of {} rows, {} failed",
            report.processed,
            report.total,
            report.failures.len()
        );
        Ok(report)
    }
}

/// Plans, stages and applies in one call on the current thread.
pub fn process_all(
    dataset: &mut Dataset,
    threshold: &ThresholdConfig,
    policy: Option<&CollisionPolicy>,
    reader: &dyn ImageReader,
    progress: &dyn ProgressObserver,
    cancel: &CancelToken,
) -> BatchResult<BatchReport> {
    let plan = plan_batch(dataset, threshold, policy)?;
    plan.stage(reader, progress, cancel).apply(dataset)
}

fn measure(reader: &dyn ImageReader, path: &Path, threshold: f64) -> Result<RowUpdate, String> {
    let pixels = reader.read(path).map_err(|error| error.to_string())?;
    if pixels.is_empty() {
        return Err("image has no pixels".to_string());
    }
    let stats = compute_stats(&pixels, threshold);
    Ok(RowUpdate {
        file_path: path.to_path_buf(),
        threshold,
        fraction: stats.fraction,
        mean_value: stats.mean_value,
    })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

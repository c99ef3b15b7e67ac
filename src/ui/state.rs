use std::path::PathBuf;

use crate::analysis::{BatchReport, CancelToken, Preview, StagedBatch};
use crate::model::ImageRecord;
use crate::report::{ExportReport, SheetBitmap};
use crate::runtime::{ImportSelection, JobGuard, JobKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(super) enum Workspace {
    #[default]
    Input,
    Analysis,
    Output,
}

impl Workspace {
    pub(super) const ALL: [Self; 3] = [Self::Input, Self::Analysis, Self::Output];

    pub(super) fn label(self) -> &'static str {
        match self {
            Self::Input => "Input",
            Self::Analysis => "Analysis",
            Self::Output => "Output",
        }
    }
}

pub(super) enum WorkerEvent {
    Preview {
        ticket: u64,
        record: ImageRecord,
        result: Result<(Preview, Option<usize>), String>,
    },
    Progress {
        job_id: u64,
        completed: usize,
        total: usize,
        label: String,
    },
    BatchStaged {
        job_id: u64,
        staged: Box<StagedBatch>,
    },
    ExportFinished {
        job_id: u64,
        result: Result<ExportReport, String>,
    },
    SheetPreview {
        ticket: u64,
        result: Result<Vec<SheetBitmap>, String>,
    },
}

/// A batch or export run; the guard keeps the job slot taken until the
/// worker's result has been merged.
pub(super) struct ActiveJob {
    pub(super) job_id: u64,
    pub(super) kind: JobKind,
    pub(super) cancel: CancelToken,
    pub(super) completed: usize,
    pub(super) total: usize,
    pub(super) label: String,
    pub(super) _guard: JobGuard,
}

impl ActiveJob {
    pub(super) fn fraction_done(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.completed as f32 / self.total as f32
        }
    }
}

/// Files picked in the Input workspace, not yet turned into a dataset.
#[derive(Debug, Clone, Default)]
pub(super) struct ImportState {
    pub(super) selection: ImportSelection,
    pub(super) rule_enabled: bool,
    pub(super) rule_text: String,
    pub(super) snapshot_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum CollisionChoice {
    Cancel,
    Overwrite,
    SaveAs,
}

#[derive(Debug, Clone, Copy, Default)]
pub(super) struct RepaintDecisionInputs {
    pub(super) worker_state_changed: bool,
    pub(super) has_pending_actions: bool,
    pub(super) has_pointer_activity: bool,
    pub(super) has_input_events: bool,
    pub(super) has_active_jobs: bool,
    pub(super) has_pending_render: bool,
}

pub(super) fn should_request_repaint_now(inputs: RepaintDecisionInputs) -> bool {
    inputs.worker_state_changed
        || inputs.has_pending_actions
        || inputs.has_pointer_activity
        || inputs.has_input_events
}

pub(super) fn should_request_periodic_repaint(inputs: RepaintDecisionInputs) -> bool {
    !should_request_repaint_now(inputs) && (inputs.has_active_jobs || inputs.has_pending_render)
}

pub(super) fn batch_summary(report: &BatchReport) -> String {
    let mut text = format!(
        "Processed {} of {} row(s) at threshold {}",
        report.processed, report.total, report.threshold
    );
    if report.cancelled {
        text.push_str(", cancelled");
    }
    if !report.failures.is_empty() {
        let rows = report
            .failures
            .iter()
            .map(|failure| format!("row {} ({})", failure.index + 1, failure.reason))
            .collect::<Vec<_>>();
        text.push_str(&format!("; failed: {}", rows.join(", ")));
    }
    if let Some(path) = &report.saved_to {
        text.push_str(&format!("; saved to {}", path.display()));
    }
    text
}

pub(super) fn export_summary(report: &ExportReport) -> String {
    let mut text = format!(
        "Exported {} of {} sheet(s) to {}",
        report.written.len(),
        report.total,
        report.folder.display()
    );
    if report.cancelled {
        text.push_str(", cancelled");
    }
    if !report.failures.is_empty() {
        let groups = report
            .failures
            .iter()
            .map(|failure| format!("{} ({})", failure.group, failure.reason))
            .collect::<Vec<_>>();
        text.push_str(&format!("; failed: {}", groups.join(", ")));
    }
    text
}

/// Warning shown when a freshly decoded image had to be reduced to one plane.
pub(super) fn channel_warning(channels: usize) -> Option<String> {
    match channels {
        0 | 1 => None,
        3 | 4 => Some(format!(
            "Image has {channels} channels; showing the mean of R, G and B"
        )),
        _ => Some(format!(
            "Image has {channels} channels; showing the first channel"
        )),
    }
}

use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread;

use log::warn;

use crate::analysis::{BatchPlan, CancelToken};
use crate::formats::ImageReader;
use crate::model::{DisplayOptions, ImageRecord, ThresholdConfig};
use crate::report::{ExportRequest, PREVIEW_SHEET_SIZE, ReportSheet};
use crate::runtime::{IoService, ReportService};

use super::state::WorkerEvent;

pub(super) struct PreviewJob {
    pub(super) ticket: u64,
    pub(super) record: ImageRecord,
    pub(super) threshold: ThresholdConfig,
    pub(super) display: DisplayOptions,
    pub(super) bins: usize,
}

pub(super) fn spawn_preview(io: IoService, job: PreviewJob, tx: Sender<WorkerEvent>) {
    thread::spawn(move || {
        let PreviewJob {
            ticket,
            mut record,
            threshold,
            display,
            bins,
        } = job;
        let result = io
            .preview(&mut record, &threshold, &display, bins)
            .map_err(|error| error.to_string());
        let _ = tx.send(WorkerEvent::Preview {
            ticket,
            record,
            result,
        });
    });
}

/// Loads and measures every planned row; the UI thread merges the result.
pub(super) fn spawn_batch(
    job_id: u64,
    plan: BatchPlan,
    reader: Arc<dyn ImageReader>,
    cancel: CancelToken,
    tx: Sender<WorkerEvent>,
) {
    thread::spawn(move || {
        let progress_tx = tx.clone();
        let progress = move |completed: usize, total: usize, label: &str| {
            let _ = progress_tx.send(WorkerEvent::Progress {
                job_id,
                completed,
                total,
                label: label.to_string(),
            });
        };
        let staged = plan.stage(reader.as_ref(), &progress, &cancel);
        if !staged.failures().is_empty() {
            warn!("{} row(s) failed during batch {job_id}", staged.failures().len());
        }
        let _ = tx.send(WorkerEvent::BatchStaged {
            job_id,
            staged: Box::new(staged),
        });
    });
}

pub(super) fn spawn_export(
    job_id: u64,
    service: ReportService,
    sheets: Vec<ReportSheet>,
    request: ExportRequest,
    cancel: CancelToken,
    tx: Sender<WorkerEvent>,
) {
    thread::spawn(move || {
        let progress_tx = tx.clone();
        let progress = move |completed: usize, total: usize, label: &str| {
            let _ = progress_tx.send(WorkerEvent::Progress {
                job_id,
                completed,
                total,
                label: label.to_string(),
            });
        };
        let result = service
            .export(&sheets, &request, &progress, &cancel)
            .map_err(|error| error.to_string());
        let _ = tx.send(WorkerEvent::ExportFinished { job_id, result });
    });
}

pub(super) fn spawn_sheet_preview(
    ticket: u64,
    service: ReportService,
    sheets: Vec<ReportSheet>,
    tx: Sender<WorkerEvent>,
) {
    thread::spawn(move || {
        let result = service
            .preview(&sheets, PREVIEW_SHEET_SIZE)
            .map_err(|error| error.to_string());
        let _ = tx.send(WorkerEvent::SheetPreview { ticket, result });
    });
}

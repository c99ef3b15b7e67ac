use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use eframe::egui;
use log::{info, warn};
use rfd::FileDialog;

use crate::analysis::{CancelToken, CollisionPolicy, Preview};
use crate::formats::supported_formats;
use crate::model::{GroupingRule, ThresholdConfig};
use crate::report::{ExportFormat, ExportRequest, SheetBitmap};
use crate::runtime::{AppConfig, AppContext, Debouncer, JobKind, Session};
use crate::table::Dataset;

use super::state::{
    ActiveJob, CollisionChoice, ImportState, RepaintDecisionInputs, WorkerEvent, Workspace,
    batch_summary, channel_warning, export_summary, should_request_periodic_repaint,
    should_request_repaint_now,
};
use super::worker::{PreviewJob, spawn_batch, spawn_export, spawn_preview, spawn_sheet_preview};

const SNAPSHOT_EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

pub(super) enum UiAction {
    PickFiles,
    PickFolder,
    ClearSelection,
    CreateDataset,
    OpenSnapshot,
    SaveSnapshot,
    SaveSnapshotAs,
    RelocateImages,
    SortByGroup,
    SortByFilename,
    SelectRow(PathBuf),
    ThresholdEdited,
    DisplayEdited,
    SheetOptionsEdited,
    Process,
    ResolveCollision(CollisionChoice),
    CancelJob,
    PickDestination,
    Export,
}

impl UiAction {
    /// Actions that replace, reorder, relocate or re-home the open dataset.
    fn edits_dataset(&self) -> bool {
        matches!(
            self,
            Self::CreateDataset
                | Self::OpenSnapshot
                | Self::SaveSnapshot
                | Self::SaveSnapshotAs
                | Self::RelocateImages
                | Self::SortByGroup
                | Self::SortByFilename
        )
    }
}

pub(super) struct CellsheetApp {
    pub(super) app: AppContext,
    pub(super) session: Session,
    pub(super) workspace: Workspace,
    pub(super) import: ImportState,
    pub(super) status: String,
    pub(super) warning: Option<String>,
    pub(super) selected_row: Option<PathBuf>,
    pub(super) preview: Option<Preview>,
    pub(super) heatmap_texture: Option<egui::TextureHandle>,
    texture_dirty: bool,
    threshold_debounce: Debouncer,
    selection_debounce: Debouncer,
    preview_ticket: u64,
    sheet_debounce: Debouncer,
    sheet_ticket: u64,
    sheet_images: Option<Vec<SheetBitmap>>,
    pub(super) sheet_textures: Vec<(String, egui::TextureHandle)>,
    pub(super) collision_pending: bool,
    pub(super) active_job: Option<ActiveJob>,
    next_job_id: u64,
    pub(super) export_destination: Option<PathBuf>,
    pub(super) export_folder: String,
    pub(super) export_format: ExportFormat,
    worker_tx: Sender<WorkerEvent>,
    worker_rx: Receiver<WorkerEvent>,
}

impl CellsheetApp {
    pub(super) fn new(config: AppConfig, startup_snapshot: Option<PathBuf>) -> Self {
        let (worker_tx, worker_rx) = mpsc::channel();
        let app = AppContext::with_config(config);
        let config = app.config().clone();
        let mut this = Self {
            session: app.new_session(),
            workspace: Workspace::default(),
            import: ImportState::default(),
            status: "Select images or open a dataset snapshot.".to_string(),
            warning: None,
            selected_row: None,
            preview: None,
            heatmap_texture: None,
            texture_dirty: false,
            threshold_debounce: Debouncer::new(config.threshold_debounce()),
            selection_debounce: Debouncer::new(config.selection_debounce()),
            preview_ticket: 0,
            sheet_debounce: Debouncer::new(config.threshold_debounce()),
            sheet_ticket: 0,
            sheet_images: None,
            sheet_textures: Vec::new(),
            collision_pending: false,
            active_job: None,
            next_job_id: 0,
            export_destination: None,
            export_folder: config.export_folder.clone(),
            export_format: config.export_format,
            worker_tx,
            worker_rx,
            app,
        };
        if let Some(path) = startup_snapshot {
            this.open_snapshot(path);
        }
        this
    }

    fn next_job_id(&mut self) -> u64 {
        self.next_job_id = self.next_job_id.saturating_add(1);
        self.next_job_id
    }

    pub(super) fn has_dataset(&self) -> bool {
        self.session.dataset().is_some()
    }

    /// True while a batch run holds staged results for the open dataset.
    pub(super) fn batch_running(&self) -> bool {
        self.active_job
            .as_ref()
            .is_some_and(|job| job.kind == JobKind::Batch)
    }

    fn poll_worker_events(&mut self) -> bool {
        let mut state_changed = false;
        while let Ok(event) = self.worker_rx.try_recv() {
            state_changed = true;
            match event {
                WorkerEvent::Preview {
                    ticket,
                    record,
                    result,
                } => {
                    if ticket != self.preview_ticket {
                        continue;
                    }
                    match result {
                        Ok((preview, channels)) => {
                            if let Some(channels) = channels {
                                self.warning = channel_warning(channels);
                            }
                            self.session.remember_preview(record);
                            self.preview = Some(preview);
                            self.texture_dirty = true;
                        }
                        Err(error) => {
                            self.preview = None;
                            self.heatmap_texture = None;
                            self.status = error;
                        }
                    }
                }
                WorkerEvent::Progress {
                    job_id,
                    completed,
                    total,
                    label,
                } => {
                    if let Some(job) = self
                        .active_job
                        .as_mut()
                        .filter(|job| job.job_id == job_id)
                    {
                        job.completed = completed;
                        job.total = total;
                        job.label = label;
                    }
                }
                WorkerEvent::BatchStaged { job_id, staged } => {
                    if !self.is_active_job(job_id) {
                        continue;
                    }
                    let merged = self
                        .session
                        .require_dataset_mut()
                        .map_err(|error| error.to_string())
                        .and_then(|dataset| {
                            (*staged).apply(dataset).map_err(|error| error.to_string())
                        });
                    self.status = match merged {
                        Ok(report) => {
                            self.sheet_debounce.schedule(Instant::now());
                            batch_summary(&report)
                        }
                        Err(error) => error,
                    };
                    self.active_job = None;
                }
                WorkerEvent::ExportFinished { job_id, result } => {
                    if !self.is_active_job(job_id) {
                        continue;
                    }
                    self.status = match result {
                        Ok(report) => export_summary(&report),
                        Err(error) => error,
                    };
                    self.active_job = None;
                }
                WorkerEvent::SheetPreview { ticket, result } => {
                    if ticket != self.sheet_ticket {
                        continue;
                    }
                    match result {
                        Ok(bitmaps) => self.sheet_images = Some(bitmaps),
                        Err(error) => {
                            self.sheet_images = Some(Vec::new());
                            self.status = error;
                        }
                    }
                }
            }
        }
        state_changed
    }

    fn is_active_job(&self, job_id: u64) -> bool {
        self.active_job.as_ref().is_some_and(|job| job.job_id == job_id)
    }

    fn poll_debouncers(&mut self, now: Instant) {
        let selection_fired = self.selection_debounce.poll(now).is_some();
        let threshold_fired = self.threshold_debounce.poll(now).is_some();
        if selection_fired || threshold_fired {
            self.start_preview();
        }
        if self.sheet_debounce.poll(now).is_some() {
            self.start_sheet_preview();
        }
    }

    pub(super) fn has_pending_render(&self) -> bool {
        self.selection_debounce.is_pending()
            || self.threshold_debounce.is_pending()
            || self.sheet_debounce.is_pending()
    }

    pub(super) fn schedule_sheet_preview(&mut self) {
        self.sheet_debounce.schedule(Instant::now());
    }

    /// Composes the selected groups' sheets and rasterizes them off-thread.
    fn start_sheet_preview(&mut self) {
        self.sheet_ticket = self.sheet_ticket.saturating_add(1);
        if self.session.selected_groups.is_empty() {
            self.sheet_images = Some(Vec::new());
            return;
        }
        let sheets = self.session.require_dataset().and_then(|dataset| {
            self.app.report_service().compose(
                dataset,
                &self.session.selected_groups,
                &self.session.display,
            )
        });
        match sheets {
            Ok(sheets) => spawn_sheet_preview(
                self.sheet_ticket,
                self.app.report_service().clone(),
                sheets,
                self.worker_tx.clone(),
            ),
            Err(error) => {
                self.sheet_images = Some(Vec::new());
                self.status = error.to_string();
            }
        }
    }

    fn start_preview(&mut self) {
        let Some(path) = self.selected_row.clone() else {
            return;
        };
        self.preview_ticket = self.preview_ticket.saturating_add(1);
        let job = PreviewJob {
            ticket: self.preview_ticket,
            record: self.session.preview_record(&path),
            threshold: self.session.threshold,
            display: self.session.display,
            bins: self.app.config().histogram_bins,
        };
        spawn_preview(self.app.io_service().clone(), job, self.worker_tx.clone());
    }

    fn refresh_texture(&mut self, ctx: &egui::Context) {
        if !self.texture_dirty {
            return;
        }
        self.texture_dirty = false;
        let Some(preview) = &self.preview else {
            self.heatmap_texture = None;
            return;
        };
        let heatmap = &preview.heatmap;
        let size = [heatmap.width, heatmap.height];
        let image = egui::ColorImage::from_rgba_unmultiplied(size, &heatmap.rgba);
        if let Some(texture) = &mut self.heatmap_texture {
            texture.set(image, egui::TextureOptions::NEAREST);
        } else {
            self.heatmap_texture =
                Some(ctx.load_texture("heatmap", image, egui::TextureOptions::NEAREST));
        }
    }

    fn refresh_sheet_textures(&mut self, ctx: &egui::Context) {
        let Some(bitmaps) = self.sheet_images.take() else {
            return;
        };
        self.sheet_textures = bitmaps
            .into_iter()
            .map(|bitmap| {
                let size = [bitmap.width as usize, bitmap.height as usize];
                let image = egui::ColorImage::from_rgb(size, &bitmap.rgb);
                let texture = ctx.load_texture(
                    format!("sheet-{}", bitmap.group_name),
                    image,
                    egui::TextureOptions::LINEAR,
                );
                (bitmap.group_name, texture)
            })
            .collect();
    }

    pub(super) fn apply_actions(&mut self, actions: Vec<UiAction>) {
        let now = Instant::now();
        for action in actions {
            if action.edits_dataset() && self.batch_running() {
                self.status =
                    "Wait for processing to finish before changing the dataset".to_string();
                continue;
            }
            match action {
                UiAction::PickFiles => {
                    if let Some(files) = FileDialog::new()
                        .add_filter("Images", supported_formats())
                        .pick_files()
                    {
                        self.extend_selection(files);
                    }
                }
                UiAction::PickFolder => {
                    if let Some(folder) = FileDialog::new().pick_folder() {
                        self.extend_selection(vec![folder]);
                    }
                }
                UiAction::ClearSelection => {
                    self.import.selection = Default::default();
                }
                UiAction::CreateDataset => self.create_dataset(),
                UiAction::OpenSnapshot => {
                    if let Some(path) = FileDialog::new()
                        .add_filter("Dataset", SNAPSHOT_EXTENSIONS)
                        .pick_file()
                    {
                        self.open_snapshot(path);
                    }
                }
                UiAction::SaveSnapshot => self.save_snapshot(false),
                UiAction::SaveSnapshotAs => self.save_snapshot(true),
                UiAction::RelocateImages => {
                    if let Some(directory) = FileDialog::new().pick_folder() {
                        self.relocate(directory);
                    }
                }
                UiAction::SortByGroup => {
                    if let Some(dataset) = self.session.dataset_mut() {
                        dataset.apply_group_order();
                    }
                }
                UiAction::SortByFilename => {
                    if let Some(dataset) = self.session.dataset_mut() {
                        dataset.apply_filename_order();
                    }
                }
                UiAction::SelectRow(path) => {
                    if self.selected_row.as_ref() != Some(&path) {
                        self.selected_row = Some(path);
                        self.warning = None;
                        self.selection_debounce.schedule(now);
                    }
                }
                UiAction::ThresholdEdited | UiAction::DisplayEdited => {
                    self.threshold_debounce.schedule(now);
                }
                UiAction::SheetOptionsEdited => {
                    self.sheet_debounce.schedule(now);
                }
                UiAction::Process => self.request_batch(),
                UiAction::ResolveCollision(choice) => self.resolve_collision(choice),
                UiAction::CancelJob => {
                    if let Some(job) = &self.active_job {
                        job.cancel.cancel();
                        self.status = format!("Cancelling {}...", job.kind);
                    }
                }
                UiAction::PickDestination => {
                    if let Some(folder) = FileDialog::new().pick_folder() {
                        self.export_destination = Some(folder);
                    }
                }
                UiAction::Export => self.start_export(),
            }
        }
    }

    fn extend_selection(&mut self, paths: Vec<PathBuf>) {
        let mut candidates = self.import.selection.accepted.clone();
        candidates.extend(paths);
        match self.app.dataset_service().select_files(candidates) {
            Ok(mut selection) => {
                let mut skipped = std::mem::take(&mut self.import.selection.skipped);
                skipped.append(&mut selection.skipped);
                selection.skipped = skipped;
                self.status = format!(
                    "{} image(s) selected, {} skipped",
                    selection.accepted.len(),
                    selection.skipped.len()
                );
                self.import.selection = selection;
            }
            Err(error) => self.status = error.to_string(),
        }
    }

    /// Grouping rule typed in the Input workspace, if grouping is on.
    pub(super) fn grouping_rule(&self) -> Result<Option<GroupingRule>, String> {
        if !self.import.rule_enabled {
            return Ok(None);
        }
        self.import
            .rule_text
            .parse::<GroupingRule>()
            .map(Some)
            .map_err(|error| error.to_string())
    }

    fn create_dataset(&mut self) {
        let rule = match self.grouping_rule() {
            Ok(rule) => rule,
            Err(error) => {
                self.status = error;
                return;
            }
        };
        let files = &self.import.selection.accepted;
        match self.app.dataset_service().create(files, rule.as_ref()) {
            Ok(dataset) => {
                self.status = format!("Created dataset with {} row(s)", dataset.len());
                self.open_dataset(dataset);
            }
            Err(error) => self.status = error.to_string(),
        }
    }

    fn open_snapshot(&mut self, path: PathBuf) {
        match self.app.dataset_service().load(&path) {
            Ok(dataset) => {
                info!("opened {}", path.display());
                self.status = format!("Opened {} ({} rows)", path.display(), dataset.len());
                self.import.snapshot_path = Some(path);
                self.open_dataset(dataset);
            }
            Err(error) => {
                warn!("failed to open {}: {error}", path.display());
                self.status = error.to_string();
            }
        }
    }

    fn open_dataset(&mut self, dataset: Dataset) {
        self.session.open_dataset(dataset);
        self.selected_row = None;
        self.preview = None;
        self.heatmap_texture = None;
        self.warning = None;
        self.selection_debounce.cancel();
        self.threshold_debounce.cancel();
        self.sheet_debounce.cancel();
        self.sheet_images = None;
        self.sheet_textures.clear();
        self.workspace = Workspace::Analysis;
    }

    fn save_snapshot(&mut self, choose_path: bool) {
        let snapshot_name = self.app.config().snapshot_name.clone();
        let Some(dataset) = self.session.dataset_mut() else {
            self.status = "No dataset is open".to_string();
            return;
        };
        let result = if choose_path || dataset.storage_path().is_none() {
            let Some(path) = FileDialog::new()
                .add_filter("Dataset", SNAPSHOT_EXTENSIONS)
                .set_file_name(&snapshot_name)
                .save_file()
            else {
                return;
            };
            dataset.save_as(path)
        } else {
            dataset.save()
        };
        self.status = match result {
            Ok(()) => format!(
                "Saved {}",
                dataset
                    .storage_path()
                    .map(|path| path.display().to_string())
                    .unwrap_or_default()
            ),
            Err(error) => error.to_string(),
        };
    }

    fn relocate(&mut self, directory: PathBuf) {
        let service = *self.app.dataset_service();
        let result = self
            .session
            .require_dataset_mut()
            .and_then(|dataset| service.relocate(dataset, &directory));
        self.status = match result {
            Ok(()) => format!("Images now read from {}", directory.display()),
            Err(error) => error.to_string(),
        };
        self.selected_row = None;
        self.preview = None;
        self.heatmap_texture = None;
    }

    fn request_batch(&mut self) {
        if let Some(kind) = self.app.jobs().active() {
            self.status = format!("A {kind} run is already in progress");
            return;
        }
        let dataset = match self.session.require_dataset() {
            Ok(dataset) => dataset,
            Err(error) => {
                self.status = error.to_string();
                return;
            }
        };
        if !self.session.threshold.enabled {
            self.status = "Enable the threshold before processing".to_string();
            return;
        }
        if dataset.collisions().is_empty() {
            self.start_batch(None);
        } else {
            self.collision_pending = true;
        }
    }

    fn resolve_collision(&mut self, choice: CollisionChoice) {
        self.collision_pending = false;
        match choice {
            CollisionChoice::Cancel => {
                self.status = "Processing cancelled; dataset unchanged".to_string();
            }
            CollisionChoice::Overwrite => self.start_batch(Some(CollisionPolicy::Overwrite)),
            CollisionChoice::SaveAs => {
                if let Some(path) = FileDialog::new()
                    .add_filter("Dataset", SNAPSHOT_EXTENSIONS)
                    .set_file_name(&self.app.config().snapshot_name)
                    .save_file()
                {
                    self.start_batch(Some(CollisionPolicy::SaveAs(path)));
                } else {
                    self.status = "Processing cancelled; no file chosen".to_string();
                }
            }
        }
    }

    fn start_batch(&mut self, policy: Option<CollisionPolicy>) {
        let threshold: ThresholdConfig = self.session.threshold;
        let plan = self.session.require_dataset().and_then(|dataset| {
            self.app
                .batch_service()
                .plan(dataset, &threshold, policy.as_ref())
        });
        let plan = match plan {
            Ok(plan) => plan,
            Err(error) => {
                self.status = error.to_string();
                return;
            }
        };
        let guard = match self.app.jobs().try_start(JobKind::Batch) {
            Ok(guard) => guard,
            Err(error) => {
                self.status = error.to_string();
                return;
            }
        };
        let job_id = self.next_job_id();
        let cancel = CancelToken::new();
        self.active_job = Some(ActiveJob {
            job_id,
            kind: JobKind::Batch,
            cancel: cancel.clone(),
            completed: 0,
            total: plan.total(),
            label: String::new(),
            _guard: guard,
        });
        self.status = format!("Processing {} row(s)...", plan.total());
        spawn_batch(
            job_id,
            plan,
            self.app.batch_service().reader(),
            cancel,
            self.worker_tx.clone(),
        );
    }

    fn start_export(&mut self) {
        let Some(destination) = self.export_destination.clone() else {
            self.status = "Choose a destination folder first".to_string();
            return;
        };
        if self.session.selected_groups.is_empty() {
            self.status = "Select at least one group to export".to_string();
            return;
        }
        let sheets = self.session.require_dataset().and_then(|dataset| {
            self.app.report_service().compose(
                dataset,
                &self.session.selected_groups,
                &self.session.display,
            )
        });
        let sheets = match sheets {
            Ok(sheets) => sheets,
            Err(error) => {
                self.status = error.to_string();
                return;
            }
        };
        let guard = match self.app.jobs().try_start(JobKind::Export) {
            Ok(guard) => guard,
            Err(error) => {
                self.status = error.to_string();
                return;
            }
        };
        let request = ExportRequest {
            destination,
            folder_name: self.export_folder.trim().to_string(),
            format: self.export_format,
        };
        let job_id = self.next_job_id();
        let cancel = CancelToken::new();
        self.active_job = Some(ActiveJob {
            job_id,
            kind: JobKind::Export,
            cancel: cancel.clone(),
            completed: 0,
            total: sheets.len(),
            label: String::new(),
            _guard: guard,
        });
        self.status = format!("Exporting {} sheet(s)...", sheets.len());
        spawn_export(
            job_id,
            self.app.report_service().clone(),
            sheets,
            request,
            cancel,
            self.worker_tx.clone(),
        );
    }
}

impl eframe::App for CellsheetApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let worker_state_changed = self.poll_worker_events();
        self.poll_debouncers(Instant::now());
        self.refresh_texture(ctx);
        self.refresh_sheet_textures(ctx);

        let mut actions = Vec::new();
        self.draw_navigation(ctx);
        self.draw_status_bar(ctx, &mut actions);
        self.draw_workspace(ctx, &mut actions);
        self.draw_collision_dialog(ctx, &mut actions);

        let has_pending_actions = !actions.is_empty();
        self.apply_actions(actions);

        let repaint_inputs = ctx.input(|input| RepaintDecisionInputs {
            worker_state_changed,
            has_pending_actions,
            has_pointer_activity: input.pointer.any_down(),
            has_input_events: !input.events.is_empty(),
            has_active_jobs: self.active_job.is_some(),
            has_pending_render: self.has_pending_render(),
        });
        if should_request_repaint_now(repaint_inputs) {
            ctx.request_repaint();
        } else if should_request_periodic_repaint(repaint_inputs) {
            ctx.request_repaint_after(Duration::from_millis(50));
        }
    }
}

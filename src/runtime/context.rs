use std::sync::Arc;

use crate::formats::{DefaultImageReader, ImageReader};
use crate::report::{PlottersRenderer, SheetRenderer};

use super::{
    AppConfig, BatchService, DatasetService, IoService, JobSlot, ReportService, Session,
};

/// Services shared by the CLI and the desktop shell.
#[derive(Debug, Clone)]
pub struct AppContext {
    config: AppConfig,
    dataset_service: DatasetService,
    io_service: IoService,
    batch_service: BatchService,
    report_service: ReportService,
    jobs: JobSlot,
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new()
    }
}

impl AppContext {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        Self::with_reader(config, Arc::new(DefaultImageReader))
    }

    /// Routes every image load through `reader`, including sheet rendering.
    pub fn with_reader(config: AppConfig, reader: Arc<dyn ImageReader>) -> Self {
        let renderer = PlottersRenderer::new(Arc::clone(&reader))
            .with_bins(config.distribution_bins);
        Self {
            dataset_service: DatasetService,
            io_service: IoService::new(Arc::clone(&reader)),
            batch_service: BatchService::new(reader),
            report_service: ReportService::new(Arc::new(renderer)),
            jobs: JobSlot::default(),
            config,
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn SheetRenderer>) -> Self {
        self.report_service = ReportService::new(renderer);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn dataset_service(&self) -> &DatasetService {
        &self.dataset_service
    }

    pub fn io_service(&self) -> &IoService {
        &self.io_service
    }

    pub fn batch_service(&self) -> &BatchService {
        &self.batch_service
    }

    pub fn report_service(&self) -> &ReportService {
        &self.report_service
    }

    pub fn jobs(&self) -> &JobSlot {
        &self.jobs
    }

    pub fn new_session(&self) -> Session {
        Session::new(&self.config)
    }
}

use std::sync::Arc;

use crate::analysis::{CancelToken, ProgressObserver};
use crate::model::DisplayOptions;
use crate::report::{
    ExportReport, ExportRequest, PlottersRenderer, ReportSheet, SheetBitmap, SheetRenderer,
    compose_sheet, export_sheets,
};
use crate::table::Dataset;

use super::{AppError, Result};

#[derive(Clone)]
pub struct ReportService {
    renderer: Arc<dyn SheetRenderer>,
}

impl std::fmt::Debug for ReportService {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("ReportService").finish_non_exhaustive()
    }
}

impl Default for ReportService {
    fn default() -> Self {
        Self::new(Arc::new(PlottersRenderer::default()))
    }
}

impl ReportService {
    pub fn new(renderer: Arc<dyn SheetRenderer>) -> Self {
        Self { renderer }
    }

    pub fn renderer(&self) -> Arc<dyn SheetRenderer> {
        Arc::clone(&self.renderer)
    }

    /// Sheets for the named groups in dataset group order; all groups when
    /// `names` is empty.
    pub fn compose(
        &self,
        dataset: &Dataset,
        names: &[String],
        display: &DisplayOptions,
    ) -> Result<Vec<ReportSheet>> {
        let groups = dataset.groups();
        if let Some(unknown) = names
            .iter()
            .find(|name| !groups.iter().any(|group| &group.name == *name))
        {
            return Err(AppError::UnknownGroup(unknown.clone()));
        }
        Ok(groups
            .iter()
            .filter(|group| names.is_empty() || names.contains(&group.name))
            .map(|group| compose_sheet(group, display))
            .collect())
    }

    pub fn export(
        &self,
        sheets: &[ReportSheet],
        request: &ExportRequest,
        progress: &dyn ProgressObserver,
        cancel: &CancelToken,
    ) -> Result<ExportReport> {
        Ok(export_sheets(
            sheets,
            request,
            self.renderer.as_ref(),
            progress,
            cancel,
        )?)
    }

    /// Rasterizes `sheets` in order for on-screen display.
    pub fn preview(&self, sheets: &[ReportSheet], size: (u32, u32)) -> Result<Vec<SheetBitmap>> {
        sheets
            .iter()
            .map(|sheet| Ok(self.renderer.rasterize(sheet, size)?))
            .collect()
    }
}

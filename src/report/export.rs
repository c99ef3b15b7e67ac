use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::analysis::{CancelToken, ProgressObserver};

use super::{ReportError, ReportSheet, Result, SheetRenderer};

pub const DEFAULT_FOLDER_NAME: &str = "report_sheets";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// 300 DPI raster.
    #[default]
    Png,
    Svg,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Svg => "svg",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ReportError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "svg" => Ok(Self::Svg),
            other => Err(ReportError::UnknownFormat(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub destination: PathBuf,
    pub folder_name: String,
    pub format: ExportFormat,
}

impl ExportRequest {
    pub fn folder(&self) -> PathBuf {
        self.destination.join(&self.folder_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetFailure {
    pub group: String,
    pub group_id: u32,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub folder: PathBuf,
    pub total: usize,
    pub written: Vec<PathBuf>,
    pub failures: Vec<SheetFailure>,
    pub cancelled: bool,
}

impl ExportReport {
    pub fn ensure_complete(self) -> Result<Self> {
        if self.failures.is_empty() {
            Ok(self)
        } else {
            Err(ReportError::PartialFailure {
                failures: self.failures,
            })
        }
    }
}

/// `{group}_{id}.{ext}` with characters unsafe in file names replaced by `_`.
pub fn sheet_file_name(group_name: &str, group_id: u32, format: ExportFormat) -> String {
    let safe = group_name
        .chars()
        .map(|character| match character {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            character if character.is_control() => '_',
            character => character,
        })
        .collect::<String>();
    format!("{safe}_{group_id}.{}", format.extension())
}

/// Creates `destination/folder_name` unless a non-directory is in the way.
pub fn prepare_destination(destination: &Path, folder_name: &str) -> Result<PathBuf> {
    let mut components = Path::new(folder_name).components();
    let valid = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !valid {
        return Err(ReportError::InvalidFolderName(folder_name.to_string()));
    }
    if destination.exists() && !destination.is_dir() {
        return Err(ReportError::PathConflict(destination.to_path_buf()));
    }
    let folder = destination.join(folder_name);
    if folder.exists() && !folder.is_dir() {
        return Err(ReportError::PathConflict(folder));
    }
    fs::create_dir_all(&folder)?;
    Ok(folder)
}

/// Renders every sheet into the export folder.
///
/// The folder is validated before any file is written. A sheet that fails is
/// recorded and the rest continue; cancellation stops before the next sheet.
pub fn export_sheets(
    sheets: &[ReportSheet],
    request: &ExportRequest,
    renderer: &dyn SheetRenderer,
    progress: &dyn ProgressObserver,
    cancel: &CancelToken,
) -> Result<ExportReport> {
    let folder = prepare_destination(&request.destination, &request.folder_name)?;
    let total = sheets.len();
    let mut report = ExportReport {
        folder: folder.clone(),
        total,
        written: Vec::with_capacity(total),
        failures: Vec::new(),
        cancelled: false,
    };
    info!(
        "exporting {total} sheet(s) as {} to {}",
        request.format,
        folder.display()
    );

    for (index, sheet) in sheets.iter().enumerate() {
        if cancel.is_cancelled() {
            info!("export cancelled after {index} of {total} sheets");
            report.cancelled = true;
            break;
        }
        let path = folder.join(sheet_file_name(
            &sheet.group_name,
            sheet.group_id,
            request.format,
        ));
        match renderer.render(sheet, request.format, &path) {
            Ok(()) => report.written.push(path),
            Err(error) => {
                warn!("sheet {} failed: {error}", sheet.title);
                report.failures.push(SheetFailure {
                    group: sheet.group_name.clone(),
                    group_id: sheet.group_id,
                    reason: error.to_string(),
                });
            }
        }
        progress.report(index + 1, total, &sheet.title);
    }

    info!(
        "exported {} of {total} sheet(s), {} failed",
        report.written.len(),
        report.failures.len()
    );
    Ok(report)
}

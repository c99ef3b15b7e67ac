use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use crate::analysis::ThresholdStats;
use crate::formats::ImageInfo;
use crate::model::{DatasetRow, GroupingRule};
use crate::report::ExportFormat;
use crate::table::DatasetSummary;

#[derive(Debug, Parser)]
#[command(
    name = "cellsheet",
    version,
    about = "Batch threshold analysis and report sheets for microscopy cell images"
)]
pub(super) struct Cli {
    /// JSON or YAML config file; `CELLSHEET_CONFIG` is used when absent.
    #[arg(long, global = true)]
    pub(super) config: Option<PathBuf>,
    #[command(subcommand)]
    pub(super) command: Commands,
}

#[derive(Debug, Subcommand)]
pub(super) enum Commands {
    /// Image dimensions, channel count and intensity range.
    Info { input: PathBuf },
    /// Fraction and mean of pixels at or above the threshold.
    Stats {
        input: PathBuf,
        #[arg(long, value_parser = parse_threshold)]
        threshold: Option<f64>,
    },
    /// Dry run of a grouping rule over a file selection.
    Group {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// `underscore:START:END` or `chars:START:END`.
        #[arg(long, value_parser = parse_rule)]
        rule: Option<GroupingRule>,
    },
    /// Creates a dataset snapshot from images and directories.
    New {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, value_parser = parse_rule)]
        rule: Option<GroupingRule>,
        #[arg(long)]
        sort_by_group: bool,
    },
    Show {
        snapshot: PathBuf,
        #[arg(long)]
        sort_by_group: bool,
    },
    /// Points every row at a new image directory.
    Relocate { snapshot: PathBuf, directory: PathBuf },
    /// Computes threshold statistics for every row and saves the snapshot.
    Process {
        snapshot: PathBuf,
        #[arg(long, value_parser = parse_threshold)]
        threshold: Option<f64>,
        #[command(flatten)]
        collision: CollisionArgs,
    },
    /// Writes the heatmap and histogram of one image as PNG files.
    Preview {
        input: PathBuf,
        #[arg(long, value_parser = parse_threshold)]
        threshold: Option<f64>,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        log_scale: bool,
        #[arg(long)]
        y_min: Option<f64>,
        #[arg(long)]
        y_max: Option<f64>,
    },
    /// Renders one report sheet per group.
    Export {
        snapshot: PathBuf,
        #[arg(long)]
        destination: PathBuf,
        #[arg(long)]
        folder: Option<String>,
        #[arg(long, value_parser = parse_format)]
        format: Option<ExportFormat>,
        /// Group names to export; all groups when omitted.
        #[arg(long = "group")]
        groups: Vec<String>,
        #[arg(long)]
        log_scale: bool,
        #[arg(long)]
        normalize: bool,
    },
    /// Opens the desktop workspace, optionally with a snapshot loaded.
    Ui { snapshot: Option<PathBuf> },
}

/// What to do when rows already hold statistics.
#[derive(Debug, Args)]
#[group(multiple = false)]
pub(super) struct CollisionArgs {
    #[arg(long)]
    pub(super) overwrite: bool,
    #[arg(long)]
    pub(super) save_as: Option<PathBuf>,
    #[arg(long)]
    pub(super) cancel_on_collision: bool,
}

fn parse_rule(value: &str) -> Result<GroupingRule, String> {
    value.parse().map_err(|error: crate::model::ModelError| error.to_string())
}

fn parse_threshold(value: &str) -> Result<f64, String> {
    let threshold = value
        .parse::<f64>()
        .map_err(|error| format!("invalid threshold `{value}`: {error}"))?;
    if threshold.is_finite() {
        Ok(threshold)
    } else {
        Err(format!("threshold must be a finite number, got `{value}`"))
    }
}

fn parse_format(value: &str) -> Result<ExportFormat, String> {
    value.parse().map_err(|error: crate::report::ReportError| error.to_string())
}

#[derive(Debug, Serialize)]
pub(super) struct ImageReport {
    pub(super) path: PathBuf,
    #[serde(flatten)]
    pub(super) info: ImageInfo,
}

#[derive(Debug, Serialize)]
pub(super) struct StatsReport {
    pub(super) path: PathBuf,
    pub(super) threshold: f64,
    #[serde(flatten)]
    pub(super) stats: ThresholdStats,
}

#[derive(Debug, Serialize)]
pub(super) struct GroupPreview {
    pub(super) name: String,
    pub(super) id: u32,
    pub(super) files: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
pub(super) struct GroupingReport {
    pub(super) groups: Vec<GroupPreview>,
    pub(super) ungrouped: Vec<PathBuf>,
    pub(super) skipped: Vec<PathBuf>,
}

#[derive(Debug, Serialize)]
pub(super) struct DatasetReport<'a> {
    pub(super) summary: DatasetSummary,
    pub(super) rows: Vec<&'a DatasetRow>,
}

#[derive(Debug, Serialize)]
pub(super) struct PreviewReport {
    pub(super) path: PathBuf,
    pub(super) channels: Option<usize>,
    pub(super) stats: Option<ThresholdStats>,
    pub(super) heatmap: PathBuf,
    pub(super) histogram: PathBuf,
}

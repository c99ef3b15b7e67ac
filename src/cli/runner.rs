use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use log::{debug, info};
use serde::Serialize;

use crate::analysis::{CancelToken, CollisionPolicy};
use crate::model::{DisplayOptions, HistogramScale, ImageRecord, ThresholdConfig, YBounds};
use crate::report::{ExportRequest, write_preview_images};
use crate::runtime::{AppConfig, AppContext};
use crate::table::Dataset;

use super::types::{
    Cli, CollisionArgs, Commands, DatasetReport, GroupPreview, GroupingReport, ImageReport,
    PreviewReport, StatsReport,
};

pub fn run_cli() -> Result<(), String> {
    let cli = Cli::parse();
    let config = AppConfig::resolve(cli.config.as_deref()).map_err(|error| error.to_string())?;
    let app = AppContext::with_config(config);

    match cli.command {
        Commands::Info { input } => {
            let info = app
                .io_service()
                .describe(&input)
                .map_err(|error| error.to_string())?;
            print_json(&ImageReport { path: input, info })?;
        }
        Commands::Stats { input, threshold } => {
            let threshold = threshold.unwrap_or(app.config().threshold);
            let stats = app
                .io_service()
                .stats(&input, threshold)
                .map_err(|error| error.to_string())?;
            print_json(&StatsReport {
                path: input,
                threshold,
                stats,
            })?;
        }
        Commands::Group { files, rule } => {
            let selection = app
                .dataset_service()
                .select_files(files)
                .map_err(|error| error.to_string())?;
            let assignment = app
                .dataset_service()
                .group(&selection.accepted, rule.as_ref())
                .map_err(|error| error.to_string())?;
            let groups = assignment
                .groups
                .iter()
                .zip(1..)
                .map(|((name, files), id)| GroupPreview {
                    name: name.clone(),
                    id,
                    files: files.clone(),
                })
                .collect();
            print_json(&GroupingReport {
                groups,
                ungrouped: assignment.ungrouped,
                skipped: selection.skipped,
            })?;
        }
        Commands::New {
            files,
            output,
            rule,
            sort_by_group,
        } => {
            let selection = app
                .dataset_service()
                .select_files(files)
                .map_err(|error| error.to_string())?;
            let mut dataset = app
                .dataset_service()
                .create(&selection.accepted, rule.as_ref())
                .map_err(|error| error.to_string())?;
            if sort_by_group {
                dataset.apply_group_order();
            }
            let output = snapshot_path(&output, &app.config().snapshot_name);
            app.dataset_service()
                .save_as(&mut dataset, &output)
                .map_err(|error| error.to_string())?;
            info!("created {} with {} row(s)", output.display(), dataset.len());
            print_dataset(&dataset, false)?;
        }
        Commands::Show {
            snapshot,
            sort_by_group,
        } => {
            let dataset = load_dataset(&app, &snapshot)?;
            print_dataset(&dataset, sort_by_group)?;
        }
        Commands::Relocate {
            snapshot,
            directory,
        } => {
            let mut dataset = load_dataset(&app, &snapshot)?;
            app.dataset_service()
                .relocate(&mut dataset, &directory)
                .map_err(|error| error.to_string())?;
            app.dataset_service()
                .save(&mut dataset)
                .map_err(|error| error.to_string())?;
            print_dataset(&dataset, false)?;
        }
        Commands::Process {
            snapshot,
            threshold,
            collision,
        } => {
            let mut dataset = load_dataset(&app, &snapshot)?;
            let threshold = ThresholdConfig::new(threshold.unwrap_or(app.config().threshold));
            let policy = collision_policy(collision);
            let progress = |completed: usize, total: usize, label: &str| {
                debug!("[{completed}/{total}] {label}");
            };
            let report = app
                .batch_service()
                .run(
                    &mut dataset,
                    &threshold,
                    policy.as_ref(),
                    &progress,
                    &CancelToken::new(),
                )
                .map_err(|error| error.to_string())?;
            print_json(&report)?;
            report.ensure_complete().map_err(|error| error.to_string())?;
        }
        Commands::Preview {
            input,
            threshold,
            output,
            log_scale,
            y_min,
            y_max,
        } => {
            let threshold = ThresholdConfig::new(threshold.unwrap_or(app.config().threshold));
            let mut display = app.config().display;
            if log_scale {
                display.scale = HistogramScale::Log;
            }
            if let (Some(min), Some(max)) = (y_min, y_max) {
                display.y_bounds = YBounds { min, max };
            }
            let mut record = ImageRecord::new(&input);
            let (preview, channels) = app
                .io_service()
                .preview(
                    &mut record,
                    &threshold,
                    &display,
                    app.config().histogram_bins,
                )
                .map_err(|error| error.to_string())?;

            fs::create_dir_all(&output).map_err(|error| error.to_string())?;
            let stem = input
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("preview");
            let heatmap = output.join(format!("{stem}_heatmap.png"));
            let histogram = output.join(format!("{stem}_histogram.png"));
            write_preview_images(&preview, &heatmap, &histogram)
                .map_err(|error| error.to_string())?;
            print_json(&PreviewReport {
                path: input,
                channels,
                stats: preview.stats,
                heatmap,
                histogram,
            })?;
        }
        Commands::Export {
            snapshot,
            destination,
            folder,
            format,
            groups,
            log_scale,
            normalize,
        } => {
            let dataset = load_dataset(&app, &snapshot)?;
            let display = DisplayOptions {
                scale: if log_scale {
                    HistogramScale::Log
                } else {
                    app.config().display.scale
                },
                normalize: normalize || app.config().display.normalize,
                ..app.config().display
            };
            let sheets = app
                .report_service()
                .compose(&dataset, &groups, &display)
                .map_err(|error| error.to_string())?;
            let request = ExportRequest {
                destination,
                folder_name: folder.unwrap_or_else(|| app.config().export_folder.clone()),
                format: format.unwrap_or(app.config().export_format),
            };
            let progress = |completed: usize, total: usize, label: &str| {
                info!("[{completed}/{total}] {label}");
            };
            let report = app
                .report_service()
                .export(&sheets, &request, &progress, &CancelToken::new())
                .map_err(|error| error.to_string())?;
            print_json(&report)?;
            report.ensure_complete().map_err(|error| error.to_string())?;
        }
        Commands::Ui { snapshot } => {
            crate::ui::run_with_config(app.config().clone(), snapshot)?;
        }
    }

    Ok(())
}

fn collision_policy(args: CollisionArgs) -> Option<CollisionPolicy> {
    if let Some(path) = args.save_as {
        Some(CollisionPolicy::SaveAs(path))
    } else if args.overwrite {
        Some(CollisionPolicy::Overwrite)
    } else if args.cancel_on_collision {
        Some(CollisionPolicy::Cancel)
    } else {
        None
    }
}

/// A directory argument gets the configured snapshot file name appended.
fn snapshot_path(output: &Path, snapshot_name: &str) -> PathBuf {
    if output.is_dir() {
        output.join(snapshot_name)
    } else {
        output.to_path_buf()
    }
}

fn load_dataset(app: &AppContext, snapshot: &Path) -> Result<Dataset, String> {
    app.dataset_service()
        .load(snapshot)
        .map_err(|error| error.to_string())
}

fn print_dataset(dataset: &Dataset, sort_by_group: bool) -> Result<(), String> {
    let rows = if sort_by_group {
        dataset.sorted_by_group()
    } else {
        dataset.rows().iter().collect()
    };
    print_json(&DatasetReport {
        summary: dataset.summary(),
        rows,
    })
}

fn print_json(value: &impl Serialize) -> Result<(), String> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).map_err(|error| error.to_string())?
    );
    Ok(())
}

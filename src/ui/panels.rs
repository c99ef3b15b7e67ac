use eframe::egui;

use crate::model::HistogramScale;
use crate::report::ExportFormat;

use super::app::{CellsheetApp, UiAction};
use super::histogram::draw_histogram;
use super::state::{CollisionChoice, Workspace};

const WARNING_COLOR: egui::Color32 = egui::Color32::from_rgb(220, 140, 0);
const PREVIEW_SIZE: f32 = 360.0;

impl CellsheetApp {
    pub(super) fn draw_navigation(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("workspaces")
            .resizable(false)
            .default_width(150.0)
            .show(ctx, |ui| {
                ui.heading("cellsheet");
                ui.separator();
                for workspace in Workspace::ALL {
                    let selected = self.workspace == workspace;
                    if ui.selectable_label(selected, workspace.label()).clicked() && !selected {
                        self.workspace = workspace;
                        if workspace == Workspace::Output {
                            self.schedule_sheet_preview();
                        }
                    }
                }
                ui.separator();
                match self.session.dataset() {
                    Some(dataset) => {
                        let summary = dataset.summary();
                        ui.label(format!("{} rows", summary.rows));
                        ui.label(format!("{} groups", summary.groups));
                        ui.label(format!("{} processed", summary.processed));
                        if dataset.has_unsaved_changes() {
                            ui.colored_label(WARNING_COLOR, "Unsaved changes");
                        }
                    }
                    None => {
                        ui.label("No dataset");
                    }
                }
            });
    }

    pub(super) fn draw_status_bar(&mut self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            if let Some(job) = &self.active_job {
                ui.horizontal(|ui| {
                    ui.add(
                        egui::ProgressBar::new(job.fraction_done())
                            .desired_width(240.0)
                            .text(format!(
                                "{} {}/{} {}",
                                job.kind, job.completed, job.total, job.label
                            )),
                    );
                    if ui.button("Cancel").clicked() {
                        actions.push(UiAction::CancelJob);
                    }
                });
            }
            if let Some(warning) = &self.warning {
                ui.colored_label(WARNING_COLOR, warning);
            }
            ui.label(&self.status);
        });
    }

    pub(super) fn draw_workspace(&mut self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        egui::CentralPanel::default().show(ctx, |ui| match self.workspace {
            Workspace::Input => self.draw_input(ui, actions),
            Workspace::Analysis => self.draw_analysis(ui, actions),
            Workspace::Output => self.draw_output(ui, actions),
        });
    }

    fn draw_input(&mut self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        ui.heading("Input");
        ui.horizontal(|ui| {
            if ui.button("Add images...").clicked() {
                actions.push(UiAction::PickFiles);
            }
            if ui.button("Add folder...").clicked() {
                actions.push(UiAction::PickFolder);
            }
            if ui.button("Clear").clicked() {
                actions.push(UiAction::ClearSelection);
            }
            ui.separator();
            let idle = !self.batch_running();
            if ui
                .add_enabled(idle, egui::Button::new("Open dataset..."))
                .clicked()
            {
                actions.push(UiAction::OpenSnapshot);
            }
        });

        ui.separator();
        ui.horizontal(|ui| {
            ui.checkbox(&mut self.import.rule_enabled, "Group by file name");
            ui.add_enabled(
                self.import.rule_enabled,
                egui::TextEdit::singleline(&mut self.import.rule_text)
                    .hint_text("underscore:0:1 or chars:1:3"),
            );
        });
        match self.grouping_rule() {
            Ok(rule) => {
                let files = &self.import.selection.accepted;
                match self.app.dataset_service().group(files, rule.as_ref()) {
                    Ok(assignment) => {
                        if let Some((name, members)) = assignment.preview() {
                            ui.label(format!(
                                "{} group(s); first group `{name}` has {} file(s), {} ungrouped",
                                assignment.group_count(),
                                members.len(),
                                assignment.ungrouped.len()
                            ));
                        } else if rule.is_some() && !files.is_empty() {
                            ui.colored_label(WARNING_COLOR, "No file matches the rule");
                        }
                    }
                    Err(error) => {
                        ui.colored_label(WARNING_COLOR, error.to_string());
                    }
                }
            }
            Err(error) => {
                ui.colored_label(WARNING_COLOR, error);
            }
        }

        ui.separator();
        let selection = &self.import.selection;
        ui.label(format!(
            "{} image(s) selected, {} skipped",
            selection.accepted.len(),
            selection.skipped.len()
        ));
        egui::ScrollArea::vertical()
            .max_height(320.0)
            .show(ui, |ui| {
                for path in &selection.accepted {
                    ui.label(path.display().to_string());
                }
                for path in &selection.skipped {
                    ui.colored_label(WARNING_COLOR, format!("skipped: {}", path.display()));
                }
            });

        let can_create = !self.import.selection.accepted.is_empty() && !self.batch_running();
        if ui
            .add_enabled(can_create, egui::Button::new("Create dataset"))
            .clicked()
        {
            actions.push(UiAction::CreateDataset);
        }
    }

    fn draw_analysis(&mut self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        ui.heading("Analysis");
        let Some(dataset) = self.session.dataset() else {
            ui.label("Create or open a dataset in the Input workspace.");
            return;
        };

        let idle = !self.batch_running();
        ui.horizontal(|ui| {
            let buttons = [
                ("Save", UiAction::SaveSnapshot),
                ("Save as...", UiAction::SaveSnapshotAs),
                ("Relocate images...", UiAction::RelocateImages),
                ("Sort by group", UiAction::SortByGroup),
                ("Sort by file name", UiAction::SortByFilename),
            ];
            for (label, action) in buttons {
                if ui.add_enabled(idle, egui::Button::new(label)).clicked() {
                    actions.push(action);
                }
            }
        });

        egui::ScrollArea::vertical()
            .id_salt("rows")
            .max_height(220.0)
            .show(ui, |ui| {
                egui::Grid::new("dataset_rows").striped(true).show(ui, |ui| {
                    for header in ["Filename", "Group", "Group_ID", "Threshold", "Fraction"] {
                        ui.strong(header);
                    }
                    ui.strong("Mean Value");
                    ui.end_row();
                    for row in dataset.rows() {
                        let path = row.file_path();
                        let selected = self.selected_row.as_ref() == Some(&path);
                        if ui.selectable_label(selected, row.file_name()).clicked() {
                            actions.push(UiAction::SelectRow(path));
                        }
                        ui.label(&row.group);
                        ui.label(row.group_id.to_string());
                        ui.label(format_value(row.threshold(), 2));
                        ui.label(format_value(row.fraction(), 4));
                        ui.label(format_value(row.mean_value(), 2));
                        ui.end_row();
                    }
                });
            });

        ui.separator();
        ui.horizontal(|ui| {
            if ui
                .checkbox(&mut self.session.threshold.enabled, "Threshold")
                .changed()
            {
                actions.push(UiAction::ThresholdEdited);
            }
            if ui
                .add(egui::DragValue::new(&mut self.session.threshold.value).speed(1.0))
                .changed()
            {
                actions.push(UiAction::ThresholdEdited);
            }
            ui.separator();
            let mut log_scale = self.session.display.log_scale();
            if ui.checkbox(&mut log_scale, "Log Y").changed() {
                self.session.display.scale = if log_scale {
                    HistogramScale::Log
                } else {
                    HistogramScale::Linear
                };
                actions.push(UiAction::DisplayEdited);
            }
            ui.label("Y range");
            let bounds = &mut self.session.display.y_bounds;
            let min_changed = ui.add(egui::DragValue::new(&mut bounds.min)).changed();
            let max_changed = ui.add(egui::DragValue::new(&mut bounds.max)).changed();
            if min_changed || max_changed {
                actions.push(UiAction::DisplayEdited);
            }
            ui.separator();
            let busy = self.active_job.is_some();
            if ui
                .add_enabled(!busy, egui::Button::new("Process all"))
                .clicked()
            {
                actions.push(UiAction::Process);
            }
        });

        ui.separator();
        let Some(preview) = &self.preview else {
            ui.label("Select a row to preview it.");
            return;
        };
        ui.horizontal_top(|ui| {
            if let Some(texture) = &self.heatmap_texture {
                ui.add(
                    egui::Image::new(texture)
                        .max_size(egui::vec2(PREVIEW_SIZE, PREVIEW_SIZE))
                        .maintain_aspect_ratio(true),
                );
            }
            ui.vertical(|ui| {
                if let Some(plot) = &preview.histogram {
                    if let Some(value) = draw_histogram(ui, plot, PREVIEW_SIZE) {
                        self.session.threshold.value = value;
                        self.session.threshold.enabled = true;
                        actions.push(UiAction::ThresholdEdited);
                    }
                } else {
                    ui.label("Image has no pixels.");
                }
                if let Some(stats) = &preview.stats {
                    ui.label(format!(
                        "Fraction {:.4} ({} of {} px), mean {:.2}",
                        stats.fraction, stats.above, stats.total, stats.mean_value
                    ));
                }
            });
        });
    }

    fn draw_output(&mut self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        ui.heading("Output");
        let Some(dataset) = self.session.dataset() else {
            ui.label("Create or open a dataset in the Input workspace.");
            return;
        };
        let groups = dataset.groups();
        if groups.is_empty() {
            ui.label("The dataset has no groups; group files when creating it.");
            return;
        }

        ui.horizontal(|ui| {
            if ui.button("Select all").clicked() {
                self.session.select_all_groups();
                actions.push(UiAction::SheetOptionsEdited);
            }
            if ui.button("Select none").clicked() {
                self.session.clear_group_selection();
                actions.push(UiAction::SheetOptionsEdited);
            }
        });
        egui::ScrollArea::vertical()
            .id_salt("groups")
            .max_height(240.0)
            .show(ui, |ui| {
                for group in &groups {
                    let mut selected = self.session.is_group_selected(&group.name);
                    let label = format!("{} - {} file(s)", group.title(), group.len());
                    if ui.checkbox(&mut selected, label).changed() {
                        self.session.toggle_group(&group.name);
                        actions.push(UiAction::SheetOptionsEdited);
                    }
                }
            });

        ui.separator();
        ui.horizontal(|ui| {
            let mut log_scale = self.session.display.log_scale();
            if ui.checkbox(&mut log_scale, "Log scale").changed() {
                self.session.display.scale = if log_scale {
                    HistogramScale::Log
                } else {
                    HistogramScale::Linear
                };
                actions.push(UiAction::SheetOptionsEdited);
            }
            if ui
                .checkbox(&mut self.session.display.normalize, "Normalize histograms")
                .changed()
            {
                actions.push(UiAction::SheetOptionsEdited);
            }
        });
        ui.horizontal(|ui| {
            if ui.button("Destination...").clicked() {
                actions.push(UiAction::PickDestination);
            }
            match &self.export_destination {
                Some(path) => ui.label(path.display().to_string()),
                None => ui.label("no destination chosen"),
            };
        });
        ui.horizontal(|ui| {
            ui.label("Folder");
            ui.text_edit_singleline(&mut self.export_folder);
            egui::ComboBox::from_label("Format")
                .selected_text(self.export_format.to_string())
                .show_ui(ui, |ui| {
                    let format = &mut self.export_format;
                    ui.selectable_value(format, ExportFormat::Png, "png (300 DPI)");
                    ui.selectable_value(format, ExportFormat::Svg, "svg");
                });
        });
        let busy = self.active_job.is_some();
        if ui
            .add_enabled(!busy, egui::Button::new("Export sheets"))
            .clicked()
        {
            actions.push(UiAction::Export);
        }

        ui.separator();
        if self.session.selected_groups.is_empty() {
            ui.label("Select groups to preview their sheets.");
            return;
        }
        if self.sheet_textures.is_empty() {
            if self.has_pending_render() {
                ui.label("Rendering preview...");
            }
            return;
        }
        egui::ScrollArea::vertical()
            .id_salt("sheets")
            .show(ui, |ui| {
                for (name, texture) in &self.sheet_textures {
                    ui.strong(name);
                    ui.add(
                        egui::Image::new(texture)
                            .max_width(ui.available_width())
                            .maintain_aspect_ratio(true),
                    );
                }
            });
    }

    pub(super) fn draw_collision_dialog(
        &mut self,
        ctx: &egui::Context,
        actions: &mut Vec<UiAction>,
    ) {
        if !self.collision_pending {
            return;
        }
        egui::Window::new("Existing results")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label("Some rows already have Threshold, Fraction or Mean Value.");
                ui.horizontal(|ui| {
                    if ui.button("Cancel").clicked() {
                        actions.push(UiAction::ResolveCollision(CollisionChoice::Cancel));
                    }
                    if ui.button("Overwrite").clicked() {
                        actions.push(UiAction::ResolveCollision(CollisionChoice::Overwrite));
                    }
                    if ui.button("Save as...").clicked() {
                        actions.push(UiAction::ResolveCollision(CollisionChoice::SaveAs));
                    }
                });
            });
    }
}

fn format_value(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|value| format!("{value:.decimals$}"))
        .unwrap_or_default()
}

use eframe::egui;
use egui_plot::{Bar, BarChart, Plot, VLine};

use crate::analysis::HistogramPlot;

const BAR_COLOR: egui::Color32 = egui::Color32::from_rgb(70, 110, 170);

/// Draws the intensity histogram with its threshold marker.
///
/// Returns the new threshold when the user clicks or drags inside the plot.
pub(super) fn draw_histogram(ui: &mut egui::Ui, plot: &HistogramPlot, height: f32) -> Option<f64> {
    let histogram = &plot.histogram;
    let width = histogram.bin_width();
    let bars = plot
        .heights()
        .into_iter()
        .enumerate()
        .map(|(bin, value)| {
            Bar::new(histogram.bin_center(bin), value)
                .width(width)
                .fill(BAR_COLOR)
        })
        .collect::<Vec<_>>();

    let response = Plot::new("threshold_histogram")
        .height(height)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_double_click_reset(false)
        .x_axis_label("Intensity")
        .y_axis_label(if plot.log_scale {
            "Log10(Count)"
        } else {
            "Count"
        })
        .include_x(histogram.min)
        .include_x(histogram.max)
        .include_y(plot.y_range.0)
        .include_y(plot.y_range.1)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name("Pixels"));
            if let Some(marker) = plot.marker {
                plot_ui.vline(
                    VLine::new(marker)
                        .color(egui::Color32::RED)
                        .width(2.0)
                        .name(format!("Threshold {marker:.2}")),
                );
            }
            plot_ui.pointer_coordinate()
        });

    let pointer = response.inner?;
    let interacted = response.response.clicked() || response.response.dragged();
    interacted.then(|| plot.threshold_at(pointer.x))
}

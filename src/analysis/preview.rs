use image::RgbaImage;
use log::debug;
use serde::Serialize;

use crate::formats::ImageReader;
use crate::model::{DisplayOptions, ImageRecord, PixelArray, ThresholdConfig};

use super::colormap::{MASKED_RGBA, viridis};
use super::{AnalysisError, Histogram, Result, ThresholdStats, compute_stats};

/// Row-major RGBA buffer, four bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeatmapImage {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
}

impl HeatmapImage {
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let offset = (y * self.width + x) * 4;
        let mut rgba = [0_u8; 4];
        rgba.copy_from_slice(&self.rgba[offset..offset + 4]);
        rgba
    }

    pub fn to_rgba_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width as u32, self.height as u32, self.rgba.clone())
    }
}

/// Histogram of all pixel values ready to draw, with its threshold marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramPlot {
    pub histogram: Histogram,
    pub log_scale: bool,
    /// Y axis range in plotted units (`log10(count)` when `log_scale`).
    pub y_range: (f64, f64),
    pub manual_y: bool,
    pub marker: Option<f64>,
}

impl HistogramPlot {
    pub fn new(
        histogram: Histogram,
        threshold: &ThresholdConfig,
        display: &DisplayOptions,
    ) -> Self {
        let log_scale = display.log_scale();
        let to_plotted = |count: f64| {
            if log_scale {
                count.max(1.0).log10()
            } else {
                count
            }
        };
        let manual = display
            .y_bounds
            .resolve()
            .map(|(min, max)| (to_plotted(min), to_plotted(max)))
            .filter(|(min, max)| max > min);
        let y_range = manual.unwrap_or_else(|| {
            let peak = to_plotted(histogram.peak() as f64);
            (0.0, if peak > 0.0 { peak * 1.05 } else { 1.0 })
        });
        Self {
            histogram,
            log_scale,
            y_range,
            manual_y: manual.is_some(),
            marker: threshold.active(),
        }
    }

    /// Bar heights in plotted units; empty bins sit on the axis floor.
    pub fn heights(&self) -> Vec<f64> {
        self.histogram
            .counts
            .iter()
            .map(|count| {
                let count = *count as f64;
                if self.log_scale {
                    count.max(1.0).log10()
                } else {
                    count
                }
            })
            .collect()
    }

    /// Threshold for a marker dragged to `x`, kept inside the binned range.
    pub fn threshold_at(&self, x: f64) -> f64 {
        x.clamp(self.histogram.min, self.histogram.max)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub heatmap: HeatmapImage,
    pub histogram: Option<HistogramPlot>,
    /// Present when the threshold is enabled.
    pub stats: Option<ThresholdStats>,
}

/// Viridis heatmap; with a threshold, pixels below it are painted black.
///
/// Colours span the unmasked pixels' range, or the full range when nothing
/// survives the mask.
pub fn render_heatmap(pixels: &PixelArray, threshold: Option<f64>) -> HeatmapImage {
    let (height, width) = pixels.dim();
    let keeps = |value: f32| {
        value.is_finite() && threshold.is_none_or(|threshold| f64::from(value) >= threshold)
    };
    let range = |filter: &dyn Fn(f32) -> bool| {
        pixels
            .iter()
            .copied()
            .filter(|value| filter(*value))
            .fold(None, |range: Option<(f32, f32)>, value| match range {
                Some((min, max)) => Some((min.min(value), max.max(value))),
                None => Some((value, value)),
            })
    };
    let (low, high) = range(&keeps)
        .or_else(|| range(&|value: f32| value.is_finite()))
        .unwrap_or((0.0, 1.0));
    let span = high - low;

    let mut rgba = Vec::with_capacity(width * height * 4);
    for value in pixels.iter().copied() {
        if !keeps(value) {
            rgba.extend_from_slice(&MASKED_RGBA);
            continue;
        }
        let normalized = if span > 0.0 { (value - low) / span } else { 0.0 };
        let [red, green, blue] = viridis(normalized);
        rgba.extend_from_slice(&[red, green, blue, 255]);
    }
    HeatmapImage {
        width,
        height,
        rgba,
    }
}

pub fn render_preview(
    pixels: &PixelArray,
    threshold: &ThresholdConfig,
    display: &DisplayOptions,
    bins: usize,
) -> Preview {
    let active = threshold.active();
    let heatmap = render_heatmap(pixels, active);
    let histogram = Histogram::of_pixels(pixels, bins)
        .map(|histogram| HistogramPlot::new(histogram, threshold, display));
    let stats = active.map(|threshold| compute_stats(pixels, threshold));
    Preview {
        heatmap,
        histogram,
        stats,
    }
}

/// Loads the record's pixels on first use, then renders from the cache.
pub fn render_record_preview(
    record: &mut ImageRecord,
    reader: &dyn ImageReader,
    threshold: &ThresholdConfig,
    display: &DisplayOptions,
    bins: usize,
) -> Result<Preview> {
    let pixels = record.pixels_or_load(|path| reader.read(path))?;
    if pixels.is_empty() {
        return Err(AnalysisError::EmptyImage(record.file_path().to_path_buf()));
    }
    debug!(
        "rendering preview of {} ({}x{})",
        record.file_path().display(),
        pixels.ncols(),
        pixels.nrows()
    );
    Ok(render_preview(&pixels, threshold, display, bins))
}

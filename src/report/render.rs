use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;

use log::{debug, warn};
use plotters::coord::Shift;
use plotters::coord::ranged1d::SegmentValue;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::analysis::{Histogram, HistogramPlot, Preview, histogram_above, render_heatmap};
use crate::formats::{DefaultImageReader, ImageReader};
use crate::model::PixelArray;

use super::{
    ExportFormat, PAGE_HEIGHT_MM, Rect, ReportError, ReportSheet, Result, SheetMember,
};

pub const PNG_DPI: f64 = 300.0;
pub const DISTRIBUTION_BINS: usize = 100;

/// A4 at 300 DPI and at 96 DPI.
const PNG_SIZE: (u32, u32) = (3508, 2480);
const SVG_SIZE: (u32, u32) = (1123, 794);
const HEATMAP_BLOCKS: usize = 64;
const FONT: &str = "sans-serif";

type DrawResult<T> = std::result::Result<T, Box<dyn Error>>;

/// A4 at 72 DPI, for on-screen sheet previews.
pub const PREVIEW_SHEET_SIZE: (u32, u32) = (842, 595);

/// Turns a composed sheet into a file or an in-memory raster.
pub trait SheetRenderer: Send + Sync {
    fn render(&self, sheet: &ReportSheet, format: ExportFormat, path: &Path) -> Result<()>;
    fn rasterize(&self, sheet: &ReportSheet, size: (u32, u32)) -> Result<SheetBitmap>;
}

/// 8-bit RGB pixels of one rendered sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetBitmap {
    pub group_name: String,
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

/// Draws sheets with plotters, loading member images through `reader`.
#[derive(Clone)]
pub struct PlottersRenderer {
    reader: Arc<dyn ImageReader>,
    bins: usize,
}

impl std::fmt::Debug for PlottersRenderer {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("PlottersRenderer")
            .field("bins", &self.bins)
            .finish()
    }
}

impl Default for PlottersRenderer {
    fn default() -> Self {
        Self::new(Arc::new(DefaultImageReader))
    }
}

impl PlottersRenderer {
    pub fn new(reader: Arc<dyn ImageReader>) -> Self {
        Self {
            reader,
            bins: DISTRIBUTION_BINS,
        }
    }

    pub fn with_bins(mut self, bins: usize) -> Self {
        self.bins = bins.max(1);
        self
    }

    fn load_members(&self, sheet: &ReportSheet) -> Vec<Option<PixelArray>> {
        sheet
            .members
            .iter()
            .map(|member| match self.reader.read(&member.file_path) {
                Ok(pixels) => Some(pixels),
                Err(error) => {
                    warn!("{}: {error}", member.file_path.display());
                    None
                }
            })
            .collect()
    }
}

impl PlottersRenderer {
    fn draw_bitmap(
        &self,
        sheet: &ReportSheet,
        images: &[Option<PixelArray>],
        (width, height): (u32, u32),
    ) -> Result<Vec<u8>> {
        let mut buffer = vec![0_u8; width as usize * height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            draw_sheet(&root, sheet, images, self.bins).map_err(render_error)?;
            root.present().map_err(render_error)?;
        }
        Ok(buffer)
    }
}

impl SheetRenderer for PlottersRenderer {
    fn render(&self, sheet: &ReportSheet, format: ExportFormat, path: &Path) -> Result<()> {
        let images = self.load_members(sheet);
        debug!("rendering {} to {}", sheet.title, path.display());
        match format {
            ExportFormat::Png => {
                let (width, height) = PNG_SIZE;
                let buffer = self.draw_bitmap(sheet, &images, PNG_SIZE)?;
                write_png(path, width, height, &buffer, PNG_DPI)
            }
            ExportFormat::Svg => {
                let root = SVGBackend::new(path, SVG_SIZE).into_drawing_area();
                draw_sheet(&root, sheet, &images, self.bins).map_err(render_error)?;
                root.present().map_err(render_error)?;
                Ok(())
            }
        }
    }

    fn rasterize(&self, sheet: &ReportSheet, size: (u32, u32)) -> Result<SheetBitmap> {
        let (width, height) = size;
        if width == 0 || height == 0 {
            return Err(ReportError::Render(format!(
                "cannot rasterize a {width}x{height} sheet"
            )));
        }
        let images = self.load_members(sheet);
        let rgb = self.draw_bitmap(sheet, &images, size)?;
        Ok(SheetBitmap {
            group_name: sheet.group_name.clone(),
            width,
            height,
            rgb,
        })
    }
}

/// Saves the preview heatmap as-is and its histogram as an 800x480 chart.
pub fn write_preview_images(
    preview: &Preview,
    heatmap_path: &Path,
    histogram_path: &Path,
) -> Result<()> {
    let heatmap = preview.heatmap.to_rgba_image().ok_or_else(|| {
        ReportError::Render("heatmap buffer does not match its dimensions".to_string())
    })?;
    heatmap.save(heatmap_path)?;
    if let Some(plot) = &preview.histogram {
        let root = BitMapBackend::new(histogram_path, (800, 480)).into_drawing_area();
        draw_histogram_plot(&root, plot).map_err(render_error)?;
        root.present().map_err(render_error)?;
    }
    Ok(())
}

/// Writes 8-bit RGB with a pHYs chunk so viewers see the intended DPI.
pub(crate) fn write_png(
    path: &Path,
    width: u32,
    height: u32,
    rgb: &[u8],
    dpi: f64,
) -> Result<()> {
    let file = File::create(path)?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let per_meter = (dpi / 0.0254).round() as u32;
    encoder.set_pixel_dims(Some(png::PixelDimensions {
        xppu: per_meter,
        yppu: per_meter,
        unit: png::Unit::Meter,
    }));
    let mut writer = encoder.write_header()?;
    writer.write_image_data(rgb)?;
    writer.finish()?;
    Ok(())
}

fn render_error(error: impl std::fmt::Display) -> ReportError {
    ReportError::Render(error.to_string())
}

/// Converts page millimetres into pixels for one canvas.
struct Scale {
    px_per_mm: f64,
}

impl Scale {
    fn new(height: u32) -> Self {
        Self {
            px_per_mm: f64::from(height) / PAGE_HEIGHT_MM,
        }
    }

    fn px(&self, mm: f64) -> u32 {
        (mm * self.px_per_mm).round().max(1.0) as u32
    }

    fn text(&self, mm: f64) -> TextStyle<'static> {
        TextStyle::from((FONT, mm * self.px_per_mm).into_font())
    }

    fn bold(&self, mm: f64) -> TextStyle<'static> {
        TextStyle::from((FONT, mm * self.px_per_mm, FontStyle::Bold).into_font())
    }
}

fn rgb([red, green, blue]: [u8; 3]) -> RGBColor {
    RGBColor(red, green, blue)
}

fn sub_area<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    rect: &Rect,
) -> DrawingArea<DB, Shift> {
    let (width, height) = root.dim_in_pixel();
    let (offset, size) = rect.to_pixels(width, height);
    root.clone().shrink(offset, size)
}

fn draw_sheet<DB>(
    root: &DrawingArea<DB, Shift>,
    sheet: &ReportSheet,
    images: &[Option<PixelArray>],
    bins: usize,
) -> DrawResult<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let (width, height) = root.dim_in_pixel();
    let scale = Scale::new(height);
    let (header, _) = sheet.header.to_pixels(width, height);
    root.draw_text(&sheet.title, &scale.bold(5.0), header)?;

    if sheet.is_empty() {
        let style = scale
            .text(4.0)
            .color(&RGBColor(128, 128, 128))
            .pos(Pos::new(HPos::Center, VPos::Center));
        let centre = ((width / 2) as i32, (height / 2) as i32);
        root.draw_text("No files in this group", &style, centre)?;
        return Ok(());
    }

    for (member, pixels) in sheet.members.iter().zip(images) {
        let cell = sub_area(root, &member.cell);
        draw_heatmap_cell(&cell, member, pixels.as_ref(), sheet.threshold, &scale)?;
    }
    draw_distributions(
        &sub_area(root, &sheet.distributions),
        sheet,
        images,
        bins,
        &scale,
    )?;
    draw_fractions(&sub_area(root, &sheet.fractions), sheet, &scale)?;
    Ok(())
}

fn draw_heatmap_cell<DB>(
    cell: &DrawingArea<DB, Shift>,
    member: &SheetMember,
    pixels: Option<&PixelArray>,
    threshold: Option<f64>,
    scale: &Scale,
) -> DrawResult<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let (width, height) = cell.dim_in_pixel();
    let title_height = scale.px(3.5).min(height / 3);
    let pad = scale.px(1.0);
    let label = scale.text(2.2).pos(Pos::new(HPos::Center, VPos::Top));
    cell.draw_text(&member.label, &label, ((width / 2) as i32, 0))?;

    let available_width = width.saturating_sub(2 * pad);
    let available_height = height.saturating_sub(title_height + pad);
    let Some(pixels) = pixels else {
        let style = scale
            .text(2.2)
            .color(&RED)
            .pos(Pos::new(HPos::Center, VPos::Center));
        let centre = (
            (width / 2) as i32,
            (title_height + available_height / 2) as i32,
        );
        cell.draw_text("Failed to load", &style, centre)?;
        return Ok(());
    };

    let heatmap = render_heatmap(pixels, threshold);
    if heatmap.width == 0 || heatmap.height == 0 || available_width == 0 || available_height == 0 {
        return Ok(());
    }
    // Keep square pixels; nearest-sample down to a bounded block grid.
    let fit = (f64::from(available_width) / heatmap.width as f64)
        .min(f64::from(available_height) / heatmap.height as f64);
    let (draw_width, draw_height) = (heatmap.width as f64 * fit, heatmap.height as f64 * fit);
    let left = (f64::from(width) - draw_width) / 2.0;
    let top = f64::from(title_height) + (f64::from(available_height) - draw_height) / 2.0;
    let blocks_x = heatmap.width.min(HEATMAP_BLOCKS);
    let blocks_y = heatmap.height.min(HEATMAP_BLOCKS);
    let block_width = draw_width / blocks_x as f64;
    let block_height = draw_height / blocks_y as f64;

    for block_y in 0..blocks_y {
        let source_y = (((block_y as f64 + 0.5) * heatmap.height as f64 / blocks_y as f64) as usize)
            .min(heatmap.height - 1);
        for block_x in 0..blocks_x {
            let source_x = (((block_x as f64 + 0.5) * heatmap.width as f64 / blocks_x as f64)
                as usize)
                .min(heatmap.width - 1);
            let [red, green, blue, _] = heatmap.pixel(source_x, source_y);
            let x0 = left + block_x as f64 * block_width;
            let y0 = top + block_y as f64 * block_height;
            cell.draw(&Rectangle::new(
                [
                    (x0.floor() as i32, y0.floor() as i32),
                    (
                        (x0 + block_width).ceil() as i32,
                        (y0 + block_height).ceil() as i32,
                    ),
                ],
                RGBColor(red, green, blue).filled(),
            ))?;
        }
    }
    Ok(())
}

/// Plotted heights of one distribution; `None` marks an empty log bin.
fn distribution_heights(
    histogram: &Histogram,
    normalize: bool,
    log_scale: bool,
) -> Vec<Option<f64>> {
    let peak = histogram.peak().max(1) as f64;
    histogram
        .counts
        .iter()
        .map(|count| {
            let value = if normalize {
                *count as f64 / peak
            } else {
                *count as f64
            };
            match (log_scale, value > 0.0) {
                (true, true) => Some(value.log10()),
                (true, false) => None,
                (false, _) => Some(value),
            }
        })
        .collect()
}

fn draw_distributions<DB>(
    area: &DrawingArea<DB, Shift>,
    sheet: &ReportSheet,
    images: &[Option<PixelArray>],
    bins: usize,
    scale: &Scale,
) -> DrawResult<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let log_scale = sheet.display.log_scale();
    let series = sheet
        .members
        .iter()
        .zip(images)
        .filter_map(|(member, pixels)| {
            let histogram = histogram_above(pixels.as_ref()?, sheet.threshold, bins)?;
            let heights = distribution_heights(&histogram, sheet.display.normalize, log_scale);
            Some((member, histogram, heights))
        })
        .collect::<Vec<_>>();

    let mut x_range = series
        .iter()
        .map(|(_, histogram, _)| (histogram.min, histogram.max))
        .reduce(|left, right| (left.0.min(right.0), left.1.max(right.1)))
        .unwrap_or((0.0, 1.0));
    if let Some(threshold) = sheet.threshold {
        x_range = (x_range.0.min(threshold), x_range.1.max(threshold));
    }
    if x_range.1 <= x_range.0 {
        x_range.1 = x_range.0 + 1.0;
    }

    let plotted = series
        .iter()
        .flat_map(|(_, _, heights)| heights.iter().flatten().copied());
    let (low, high) = plotted.fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), value| {
        (low.min(value), high.max(value))
    });
    let floor = if log_scale && low.is_finite() {
        low.floor().min(0.0)
    } else {
        0.0
    };
    let auto_top = if high.is_finite() && high > floor {
        high + (high - floor) * 0.05
    } else {
        floor + 1.0
    };
    let y_range = sheet
        .display
        .y_bounds
        .resolve()
        .map(|(min, max)| {
            if log_scale {
                (min.max(f64::MIN_POSITIVE).log10(), max.log10())
            } else {
                (min, max)
            }
        })
        .filter(|(min, max)| max > min)
        .unwrap_or((floor, auto_top));

    let mut chart = ChartBuilder::on(area)
        .caption("Intensity Distributions", scale.bold(3.2))
        .margin(scale.px(1.5))
        .x_label_area_size(scale.px(8.0))
        .y_label_area_size(scale.px(12.0))
        .build_cartesian_2d(x_range.0..x_range.1, y_range.0..y_range.1)?;
    chart
        .configure_mesh()
        .x_desc("Pixel Value")
        .y_desc(if log_scale {
            "log10(Frequency)"
        } else {
            "Frequency"
        })
        .label_style(scale.text(2.2))
        .axis_desc_style(scale.text(2.6))
        .draw()?;

    let stroke = scale.px(0.4);
    let legend_length = scale.px(5.0) as i32;
    for (member, histogram, heights) in &series {
        let color = rgb(member.color);
        let width = histogram.bin_width();
        let mut points = Vec::with_capacity(heights.len() * 2 + 2);
        points.push((histogram.min, y_range.0));
        for (bin, height) in heights.iter().enumerate() {
            let height = height.unwrap_or(y_range.0).clamp(y_range.0, y_range.1);
            let left = histogram.min + bin as f64 * width;
            points.push((left, height));
            points.push((left + width, height));
        }
        points.push((histogram.max, y_range.0));
        chart
            .draw_series(LineSeries::new(points, color.stroke_width(stroke)))?
            .label(member.label.clone())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + legend_length, y)], color.stroke_width(2))
            });
    }

    if let Some(threshold) = sheet.threshold {
        let dashes = 24;
        let step = (y_range.1 - y_range.0) / f64::from(dashes);
        chart.draw_series((0..dashes).step_by(2).map(|dash| {
            let start = y_range.0 + f64::from(dash) * step;
            PathElement::new(
                vec![(threshold, start), (threshold, start + step)],
                RED.stroke_width(stroke),
            )
        }))?;
    }

    if sheet.show_legend && !series.is_empty() {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .label_font(scale.text(1.8))
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }
    Ok(())
}

fn draw_fractions<DB>(
    area: &DrawingArea<DB, Shift>,
    sheet: &ReportSheet,
    scale: &Scale,
) -> DrawResult<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let count = sheet.members.len();
    let mut chart = ChartBuilder::on(area)
        .caption("Fractions Above Threshold", scale.bold(3.2))
        .margin(scale.px(1.5))
        .x_label_area_size(scale.px(10.0))
        .y_label_area_size(scale.px(12.0))
        .build_cartesian_2d((0..count).into_segmented(), 0.0..sheet.fraction_axis_max)?;
    let label_for = |value: &SegmentValue<usize>| match value {
        SegmentValue::CenterOf(index) => sheet
            .members
            .get(*index)
            .map(|member| member.label.clone())
            .unwrap_or_default(),
        _ => String::new(),
    };
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(count)
        .x_label_formatter(&label_for)
        .x_desc("File")
        .y_desc("Fraction")
        .label_style(scale.text(2.0))
        .axis_desc_style(scale.text(2.6))
        .draw()?;

    let gap = scale.px(1.0);
    let bars = sheet
        .members
        .iter()
        .enumerate()
        .filter_map(|(index, member)| Some((index, member, member.fraction?)))
        .collect::<Vec<_>>();
    chart.draw_series(bars.iter().map(|(index, member, fraction)| {
        let mut bar = Rectangle::new(
            [
                (SegmentValue::Exact(*index), 0.0),
                (SegmentValue::Exact(index + 1), *fraction),
            ],
            rgb(member.color).filled(),
        );
        bar.set_margin(0, 0, gap, gap);
        bar
    }))?;
    chart.draw_series(bars.iter().map(|(index, _, fraction)| {
        let mut outline = Rectangle::new(
            [
                (SegmentValue::Exact(*index), 0.0),
                (SegmentValue::Exact(index + 1), *fraction),
            ],
            BLACK.stroke_width(1),
        );
        outline.set_margin(0, 0, gap, gap);
        outline
    }))?;
    let value_style = scale.text(1.8).pos(Pos::new(HPos::Center, VPos::Bottom));
    chart.draw_series(bars.iter().map(|(index, _, fraction)| {
        Text::new(
            format!("{fraction:.2}"),
            (SegmentValue::CenterOf(*index), *fraction),
            value_style.clone(),
        )
    }))?;
    Ok(())
}

fn draw_histogram_plot<DB>(root: &DrawingArea<DB, Shift>, plot: &HistogramPlot) -> DrawResult<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let histogram = &plot.histogram;
    let (bottom, top) = plot.y_range;
    let mut chart = ChartBuilder::on(root)
        .margin(10)
        .caption("Pixel Value Histogram", (FONT, 20))
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(histogram.min..histogram.max, bottom..top)?;
    chart
        .configure_mesh()
        .x_desc("Pixel Value")
        .y_desc(if plot.log_scale {
            "log10(Count)"
        } else {
            "Count"
        })
        .draw()?;

    let width = histogram.bin_width();
    let bar_color = RGBColor(31, 119, 180);
    chart.draw_series(plot.heights().into_iter().enumerate().map(|(bin, height)| {
        let left = histogram.min + bin as f64 * width;
        Rectangle::new(
            [(left, bottom), (left + width, height.clamp(bottom, top))],
            bar_color.filled(),
        )
    }))?;
    if let Some(marker) = plot.marker {
        chart.draw_series(LineSeries::new(
            vec![(marker, bottom), (marker, top)],
            RED.stroke_width(2),
        ))?;
    }
    Ok(())
}

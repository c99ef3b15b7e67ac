use std::path::PathBuf;

use serde::Serialize;

use crate::model::DisplayOptions;
use crate::table::Group;

use super::member_color;

/// A4 landscape.
pub const PAGE_WIDTH_MM: f64 = 297.0;
pub const PAGE_HEIGHT_MM: f64 = 210.0;

const MARGIN_LEFT: f64 = 0.05;
const MARGIN_RIGHT: f64 = 0.05;
const CONTENT_TOP: f64 = 0.12;
const CONTENT_BOTTOM: f64 = 0.08;
const HEATMAP_SHARE: f64 = 0.55;
const COLUMN_GAP: f64 = 0.06;
const ROW_GAP: f64 = 0.09;
const LEGEND_LIMIT: usize = 8;

/// Rectangle in page fractions, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Scales to a `width x height` pixel canvas as `(offset, size)`.
    pub fn to_pixels(&self, width: u32, height: u32) -> ((i32, i32), (u32, u32)) {
        let (width, height) = (f64::from(width), f64::from(height));
        (
            ((self.x * width).round() as i32, (self.y * height).round() as i32),
            (
                (self.width * width).round().max(1.0) as u32,
                (self.height * height).round().max(1.0) as u32,
            ),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Grid {
    pub rows: usize,
    pub cols: usize,
}

impl Grid {
    /// Near-square grid, slightly wider than tall: `cols = ceil(sqrt(n * 1.2))`.
    pub fn for_count(count: usize) -> Self {
        if count == 0 {
            return Self { rows: 0, cols: 0 };
        }
        let cols = ((count as f64 * 1.2).sqrt().ceil() as usize).max(1);
        Self {
            rows: count.div_ceil(cols),
            cols,
        }
    }

    pub fn cells(&self) -> usize {
        self.rows * self.cols
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetMember {
    pub file_path: PathBuf,
    pub label: String,
    pub color: [u8; 3],
    pub row: usize,
    pub col: usize,
    pub cell: Rect,
    pub fraction: Option<f64>,
}

/// Layout of one group's page; rendering is left to a `SheetRenderer`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSheet {
    pub group_name: String,
    pub group_id: u32,
    pub title: String,
    /// Threshold of the first processed member; drives masking and the marker.
    pub threshold: Option<f64>,
    pub display: DisplayOptions,
    pub grid: Grid,
    pub header: Rect,
    pub heatmaps: Rect,
    pub distributions: Rect,
    pub fractions: Rect,
    pub members: Vec<SheetMember>,
    pub show_legend: bool,
    pub fraction_axis_max: f64,
}

impl ReportSheet {
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Lays out `group` deterministically: same rows and options, same sheet.
pub fn compose_sheet(group: &Group, display: &DisplayOptions) -> ReportSheet {
    let content_width = 1.0 - MARGIN_LEFT - MARGIN_RIGHT - COLUMN_GAP;
    let content_height = 1.0 - CONTENT_TOP - CONTENT_BOTTOM;
    let left_width = content_width * HEATMAP_SHARE;
    let right_x = MARGIN_LEFT + left_width + COLUMN_GAP;
    let right_width = content_width - left_width;
    let chart_height = (content_height - ROW_GAP) / 2.0;

    let header = Rect {
        x: MARGIN_LEFT,
        y: 0.03,
        width: 1.0 - MARGIN_LEFT - MARGIN_RIGHT,
        height: CONTENT_TOP - 0.05,
    };
    let heatmaps = Rect {
        x: MARGIN_LEFT,
        y: CONTENT_TOP,
        width: left_width,
        height: content_height,
    };
    let distributions = Rect {
        x: right_x,
        y: CONTENT_TOP,
        width: right_width,
        height: chart_height,
    };
    let fractions = Rect {
        x: right_x,
        y: CONTENT_TOP + chart_height + ROW_GAP,
        width: right_width,
        height: chart_height,
    };

    let grid = Grid::for_count(group.rows.len());
    let members = group
        .rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let (grid_row, grid_col) = (index / grid.cols, index % grid.cols);
            SheetMember {
                file_path: row.file_path(),
                label: display_name(row.file_name(), &group.name),
                color: member_color(index),
                row: grid_row,
                col: grid_col,
                cell: grid_cell(&heatmaps, grid, grid_row, grid_col),
                fraction: row.fraction(),
            }
        })
        .collect::<Vec<_>>();

    let peak_fraction = members
        .iter()
        .filter_map(|member| member.fraction)
        .fold(0.0_f64, f64::max);
    ReportSheet {
        group_name: group.name.clone(),
        group_id: group.id,
        title: group.title(),
        threshold: group.rows.iter().find_map(|row| row.threshold()),
        display: *display,
        grid,
        header,
        heatmaps,
        distributions,
        fractions,
        show_legend: members.len() <= LEGEND_LIMIT,
        members,
        fraction_axis_max: (peak_fraction * 1.1).clamp(0.05, 1.0),
    }
}

/// File name with the group prefix and following `_`, `-` or spaces removed.
///
/// Falls back to the full name when nothing would be left.
pub fn display_name(file_name: &str, group_name: &str) -> String {
    if group_name.is_empty() {
        return file_name.to_string();
    }
    match file_name.strip_prefix(group_name) {
        Some(rest) => {
            let rest = rest.trim_start_matches(['_', '-', ' ']);
            if rest.is_empty() {
                file_name.to_string()
            } else {
                rest.to_string()
            }
        }
        None => file_name.to_string(),
    }
}

fn grid_cell(area: &Rect, grid: Grid, row: usize, col: usize) -> Rect {
    let width = area.width / grid.cols as f64;
    let height = area.height / grid.rows as f64;
    Rect {
        x: area.x + col as f64 * width,
        y: area.y + row as f64 * height,
        width,
        height,
    }
}

mod error;
mod export;
mod layout;
mod palette;
mod render;


pub use error::{ReportError, Result};
pub use export::{
    DEFAULT_FOLDER_NAME, ExportFormat, ExportReport, ExportRequest, SheetFailure, export_sheets,
    prepare_destination, sheet_file_name,
};
pub use layout::{
    Grid, PAGE_HEIGHT_MM, PAGE_WIDTH_MM, Rect, ReportSheet, SheetMember, compose_sheet,
    display_name,
};
pub use palette::{TAB10, member_color};
pub use render::{
    DISTRIBUTION_BINS, PNG_DPI, PREVIEW_SHEET_SIZE, PlottersRenderer, SheetBitmap, SheetRenderer,
    write_preview_images,
};

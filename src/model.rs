mod config;
mod error;
mod grouping;
mod pixels;
mod record;

#[cfg(test)]
mod tests;

pub use config::{DisplayOptions, HistogramScale, ThresholdConfig, YBounds};
pub use error::{ModelError, Result};
pub use grouping::{GroupAssignment, GroupingRule, group_files};
pub use pixels::{PixelArray, min_max};
pub use record::{DatasetRow, ImageRecord, UNGROUPED_ID};

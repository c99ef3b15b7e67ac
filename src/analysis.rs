mod batch;
mod colormap;
mod error;
mod histogram;
mod preview;
mod progress;
mod stats;

#[cfg(test)]
mod tests;

pub use batch::{
    BatchPlan, BatchReport, CollisionPolicy, RowFailure, StagedBatch, plan_batch, process_all,
};
pub use colormap::{MASKED_RGBA, viridis};
pub use error::{AnalysisError, BatchError, Result};
pub use histogram::{DEFAULT_BINS, Histogram, histogram_above};
pub use preview::{
    HeatmapImage, HistogramPlot, Preview, render_heatmap, render_preview, render_record_preview,
};
pub use progress::{CancelToken, NoProgress, ProgressObserver};
pub use stats::{ThresholdStats, compute_stats};

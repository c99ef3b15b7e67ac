use std::path::Path;
use std::sync::Arc;

use crate::analysis::{Preview, ThresholdStats, compute_stats, render_record_preview};
use crate::formats::{DefaultImageReader, ImageInfo, ImageReader, reduce_channels};
use crate::model::{DisplayOptions, ImageRecord, PixelArray, ThresholdConfig};

use super::Result;

#[derive(Clone)]
pub struct IoService {
    reader: Arc<dyn ImageReader>,
}

impl std::fmt::Debug for IoService {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("IoService").finish_non_exhaustive()
    }
}

impl Default for IoService {
    fn default() -> Self {
        Self::new(Arc::new(DefaultImageReader))
    }
}

impl IoService {
    pub fn new(reader: Arc<dyn ImageReader>) -> Self {
        Self { reader }
    }

    pub fn reader(&self) -> Arc<dyn ImageReader> {
        Arc::clone(&self.reader)
    }

    pub fn supports(&self, path: impl AsRef<Path>) -> bool {
        self.reader.supports(path.as_ref())
    }

    pub fn read(&self, path: impl AsRef<Path>) -> Result<PixelArray> {
        Ok(self.reader.read(path.as_ref())?)
    }

    pub fn describe(&self, path: impl AsRef<Path>) -> Result<ImageInfo> {
        Ok(self.reader.describe(path.as_ref())?)
    }

    pub fn stats(&self, path: impl AsRef<Path>, threshold: f64) -> Result<ThresholdStats> {
        let pixels = self.read(path)?;
        Ok(compute_stats(&pixels, threshold))
    }

    /// Renders `record`, decoding it only if its pixels are not cached yet.
    ///
    /// Returns the source channel count when this call decoded the file, so
    /// callers can warn that a multi-channel image was reduced.
    pub fn preview(
        &self,
        record: &mut ImageRecord,
        threshold: &ThresholdConfig,
        display: &DisplayOptions,
        bins: usize,
    ) -> Result<(Preview, Option<usize>)> {
        let mut channels = None;
        if record.pixels().is_none() {
            record.pixels_or_load(|path| {
                let stack = self.reader.read_channels(path)?;
                channels = Some(stack.dim().2);
                reduce_channels(stack)
            })?;
        }
        let preview =
            render_record_preview(record, self.reader.as_ref(), threshold, display, bins)?;
        Ok((preview, channels))
    }
}

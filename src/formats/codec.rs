use std::path::Path;

use ndarray::Axis;

use crate::model::PixelArray;

use super::{ChannelStack, ImageInfo, Result, describe_stack, is_supported_image, load_image};

/// Source of intensity planes; the batch processor, preview and sheet
/// renderer load images through this seam.
pub trait ImageReader: Send + Sync {
    fn supports(&self, path: &Path) -> bool;
    fn read(&self, path: &Path) -> Result<PixelArray>;

    /// Raw `[Y, X, C]` samples. Readers without channel data report the
    /// reduced plane as a single channel.
    fn read_channels(&self, path: &Path) -> Result<ChannelStack> {
        Ok(self.read(path)?.insert_axis(Axis(2)))
    }

    fn describe(&self, path: &Path) -> Result<ImageInfo> {
        describe_stack(self.read_channels(path)?)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultImageReader;

impl ImageReader for DefaultImageReader {
    fn supports(&self, path: &Path) -> bool {
        is_supported_image(path)
    }

    fn read(&self, path: &Path) -> Result<PixelArray> {
        load_image(path)
    }

    fn read_channels(&self, path: &Path) -> Result<ChannelStack> {
        super::read_channels(path)
    }
}

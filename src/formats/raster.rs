use std::path::Path;

use image::DynamicImage;

use super::util::stack_from_interleaved;
use super::{ChannelStack, Result};

/// Decodes PNG/JPEG/BMP/GIF/WebP keeping raw sample values.
pub(crate) fn read_common_raster(path: &Path) -> Result<ChannelStack> {
    let image = image::open(path)?;
    let (width, height) = (image.width() as usize, image.height() as usize);
    let (channels, values) = match image {
        DynamicImage::ImageLuma8(buffer) => (1, widen(buffer.into_raw())),
        DynamicImage::ImageLumaA8(buffer) => (2, widen(buffer.into_raw())),
        DynamicImage::ImageRgb8(buffer) => (3, widen(buffer.into_raw())),
        DynamicImage::ImageRgba8(buffer) => (4, widen(buffer.into_raw())),
        DynamicImage::ImageLuma16(buffer) => (1, widen(buffer.into_raw())),
        DynamicImage::ImageLumaA16(buffer) => (2, widen(buffer.into_raw())),
        DynamicImage::ImageRgb16(buffer) => (3, widen(buffer.into_raw())),
        DynamicImage::ImageRgba16(buffer) => (4, widen(buffer.into_raw())),
        DynamicImage::ImageRgb32F(buffer) => (3, buffer.into_raw()),
        DynamicImage::ImageRgba32F(buffer) => (4, buffer.into_raw()),
        other => (4, widen(other.to_rgba16().into_raw())),
    };
    stack_from_interleaved(height, width, channels, values)
}

fn widen<T: Into<f32>>(samples: Vec<T>) -> Vec<f32> {
    samples.into_iter().map(Into::into).collect()
}

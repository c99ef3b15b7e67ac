use std::path::Path;

use serde::Serialize;

use crate::model::{PixelArray, min_max};

use super::nd2::read_nd2;
use super::raster::read_common_raster;
use super::reduce::reduce_channels;
use super::tiff::read_tiff;
use super::util::extension;
use super::{ChannelStack, IoError, Result};

const RASTER_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "webp"];

/// Decodes `path` into its raw `[Y, X, C]` samples, dispatching by extension.
pub fn read_channels(path: impl AsRef<Path>) -> Result<ChannelStack> {
    let path = path.as_ref();
    let extension = extension(path)?;
    match extension.as_str() {
        "tif" | "tiff" => read_tiff(path),
        "nd2" => read_nd2(path),
        ext if RASTER_EXTENSIONS.contains(&ext) => read_common_raster(path),
        other => Err(IoError::UnsupportedFormat(other.to_string())),
    }
}

/// Loads `path` as a single intensity plane (see [`reduce_channels`]).
pub fn load_image(path: impl AsRef<Path>) -> Result<PixelArray> {
    reduce_channels(read_channels(path)?)
}

pub fn supported_formats() -> &'static [&'static str] {
    &["tif", "tiff", "nd2", "png", "jpg", "jpeg", "bmp", "gif", "webp"]
}

pub fn is_supported_image(path: impl AsRef<Path>) -> bool {
    extension(path.as_ref())
        .map(|ext| supported_formats().contains(&ext.as_str()))
        .unwrap_or(false)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageInfo {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub min: Option<f32>,
    pub max: Option<f32>,
}

pub fn describe_image(path: impl AsRef<Path>) -> Result<ImageInfo> {
    describe_stack(read_channels(path)?)
}

pub(crate) fn describe_stack(stack: ChannelStack) -> Result<ImageInfo> {
    let (height, width, channels) = stack.dim();
    let plane = reduce_channels(stack)?;
    let range = min_max(&plane);
    Ok(ImageInfo {
        width,
        height,
        channels,
        min: range.map(|(min, _)| min),
        max: range.map(|(_, max)| max),
    })
}

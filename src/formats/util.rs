use std::path::Path;

use ndarray::Array3;

use super::{ChannelStack, IoError, Result};

pub(crate) fn extension(path: &Path) -> Result<String> {
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .map(|value| value.to_ascii_lowercase())
        .ok_or_else(|| IoError::UnsupportedFormat(path.to_string_lossy().to_string()))?;
    Ok(ext)
}

/// Builds a `[Y, X, C]` stack from row-major, channel-interleaved samples.
pub(crate) fn stack_from_interleaved(
    height: usize,
    width: usize,
    channels: usize,
    values: Vec<f32>,
) -> Result<ChannelStack> {
    if height == 0 || width == 0 || channels == 0 {
        return Err(IoError::UnsupportedLayout(format!(
            "empty image ({width}x{height}, {channels} channels)"
        )));
    }
    Array3::from_shape_vec((height, width, channels), values)
        .map_err(|error| IoError::UnsupportedLayout(error.to_string()))
}

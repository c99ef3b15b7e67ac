use log::debug;
use ndarray::{Array3, Axis, s};

use crate::model::PixelArray;

use super::{IoError, Result};

/// Decoded samples as `[Y, X, C]`, before reduction to one plane.
pub type ChannelStack = Array3<f32>;

/// Reduces a channel stack to the single intensity plane used downstream.
///
/// * 1 channel: used as is.
/// * 3 channels (RGB) or 4 channels (RGBA): mean of the three colour
///   channels; alpha is ignored.
/// * any other count: the first channel.
pub fn reduce_channels(stack: ChannelStack) -> Result<PixelArray> {
    let channels = stack.dim().2;
    if channels > 1 {
        debug!("reducing {channels}-channel image to one intensity plane");
    }
    match channels {
        0 => Err(IoError::UnsupportedLayout(
            "image has no channels".to_string(),
        )),
        3 | 4 => stack
            .slice(s![.., .., 0..3])
            .mean_axis(Axis(2))
            .ok_or_else(|| IoError::UnsupportedLayout("empty colour image".to_string())),
        _ => Ok(stack.index_axis_move(Axis(2), 0)),
    }
}

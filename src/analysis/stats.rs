use std::borrow::Cow;

use rayon::prelude::*;
use serde::Serialize;

use crate::model::PixelArray;

const CHUNK_LEN: usize = 1 << 16;

/// Pixels at or above a threshold, summarised.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdStats {
    /// `above / total`, always within `[0, 1]`.
    pub fraction: f64,
    /// Mean of the counted pixels; `0.0` when none qualify.
    pub mean_value: f64,
    pub above: usize,
    pub total: usize,
}

/// Counts pixels `>= threshold` and averages them.
///
/// Partial sums are reduced in chunk order so repeated calls agree bit for bit.
pub fn compute_stats(pixels: &PixelArray, threshold: f64) -> ThresholdStats {
    let values = contiguous(pixels);
    let partials = values
        .par_chunks(CHUNK_LEN)
        .map(|chunk| {
            chunk
                .iter()
                .map(|value| f64::from(*value))
                .filter(|value| *value >= threshold)
                .fold((0_usize, 0.0_f64), |(count, sum), value| {
                    (count + 1, sum + value)
                })
        })
        .collect::<Vec<_>>();
    let (above, sum) = partials
        .into_iter()
        .fold((0_usize, 0.0_f64), |(count, sum), (chunk_count, chunk_sum)| {
            (count + chunk_count, sum + chunk_sum)
        });

    let total = values.len();
    let fraction = if total == 0 {
        0.0
    } else {
        above as f64 / total as f64
    };
    let mean_value = if above == 0 { 0.0 } else { sum / above as f64 };
    ThresholdStats {
        fraction,
        mean_value,
        above,
        total,
    }
}

pub(crate) fn contiguous(pixels: &PixelArray) -> Cow<'_, [f32]> {
    match pixels.as_slice() {
        Some(values) => Cow::Borrowed(values),
        None => Cow::Owned(pixels.iter().copied().collect()),
    }
}

use rayon::prelude::*;
use serde::Serialize;

use crate::model::PixelArray;

use super::stats::contiguous;

pub const DEFAULT_BINS: usize = 256;

const CHUNK_LEN: usize = 1 << 16;

/// Equal-width bins over `[min, max]`; the last bin includes `max`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub min: f64,
    pub max: f64,
    pub counts: Vec<u64>,
}

impl Histogram {
    /// Bins the finite values; `None` when there are none or `bins == 0`.
    pub fn from_values(values: &[f32], bins: usize) -> Option<Self> {
        if bins == 0 {
            return None;
        }
        let (min, max) = values
            .par_iter()
            .filter(|value| value.is_finite())
            .map(|value| (f64::from(*value), f64::from(*value)))
            .reduce_with(|left, right| (left.0.min(right.0), left.1.max(right.1)))?;
        // A flat image still gets a unit-wide range centred on its value.
        let (min, max) = if max > min {
            (min, max)
        } else {
            (min - 0.5, max + 0.5)
        };
        Some(Self::with_range(values, bins, min, max))
    }

    /// Bins finite values inside `[min, max]`, dropping the rest.
    pub fn with_range(values: &[f32], bins: usize, min: f64, max: f64) -> Self {
        let width = (max - min) / bins as f64;
        let counts = values
            .par_chunks(CHUNK_LEN)
            .map(|chunk| {
                let mut counts = vec![0_u64; bins];
                for value in chunk.iter().map(|value| f64::from(*value)) {
                    if !value.is_finite() || value < min || value > max {
                        continue;
                    }
                    let bin = (((value - min) / width) as usize).min(bins - 1);
                    counts[bin] += 1;
                }
                counts
            })
            .reduce(
                || vec![0_u64; bins],
                |mut left, right| {
                    left.iter_mut().zip(right).for_each(|(total, count)| *total += count);
                    left
                },
            );
        Self { min, max, counts }
    }

    pub fn of_pixels(pixels: &PixelArray, bins: usize) -> Option<Self> {
        Self::from_values(&contiguous(pixels), bins)
    }

    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.bins() as f64
    }

    pub fn bin_center(&self, bin: usize) -> f64 {
        self.min + (bin as f64 + 0.5) * self.bin_width()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn peak(&self) -> u64 {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}

/// Histogram of the pixels at or above `threshold` (all pixels when `None`).
pub fn histogram_above(
    pixels: &PixelArray,
    threshold: Option<f64>,
    bins: usize,
) -> Option<Histogram> {
    let values = contiguous(pixels);
    match threshold {
        None => Histogram::from_values(&values, bins),
        Some(threshold) => {
            let kept = values
                .iter()
                .copied()
                .filter(|value| f64::from(*value) >= threshold)
                .collect::<Vec<_>>();
            Histogram::from_values(&kept, bins)
        }
    }
}

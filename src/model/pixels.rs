use ndarray::Array2;

/// Single-plane intensity image, indexed `[y, x]`.
pub type PixelArray = Array2<f32>;

/// Minimum and maximum over the finite values of `pixels`.
pub fn min_max(pixels: &PixelArray) -> Option<(f32, f32)> {
    let mut iter = pixels.iter().copied().filter(|value| value.is_finite());
    let first = iter.next()?;
    let mut min = first;
    let mut max = first;
    for value in iter {
        if value < min {
            min = value;
        }
        if value > max {
            max = value;
        }
    }
    Some((min, max))
}

/// Colour of pixels hidden by the threshold mask.
pub const MASKED_RGBA: [u8; 4] = [0, 0, 0, 255];

// Viridis sampled every 16th entry of the 256-colour table, plus the last.
const VIRIDIS_STOPS: [[u8; 3]; 17] = [
    [68, 1, 84],
    [72, 26, 108],
    [71, 47, 125],
    [65, 68, 135],
    [57, 86, 140],
    [49, 104, 142],
    [42, 120, 142],
    [35, 136, 142],
    [31, 152, 139],
    [34, 168, 132],
    [53, 183, 121],
    [84, 197, 104],
    [122, 209, 81],
    [165, 219, 54],
    [210, 226, 27],
    [236, 229, 27],
    [253, 231, 37],
];

/// Maps `value` in `[0, 1]` onto viridis; out-of-range input is clamped.
pub fn viridis(value: f32) -> [u8; 3] {
    let value = if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let scaled = value * (VIRIDIS_STOPS.len() - 1) as f32;
    let lower = (scaled.floor() as usize).min(VIRIDIS_STOPS.len() - 2);
    let weight = scaled - lower as f32;
    let (from, to) = (VIRIDIS_STOPS[lower], VIRIDIS_STOPS[lower + 1]);
    let mut rgb = [0_u8; 3];
    for channel in 0..3 {
        let blended = f32::from(from[channel]) * (1.0 - weight) + f32::from(to[channel]) * weight;
        rgb[channel] = blended.round().clamp(0.0, 255.0) as u8;
    }
    rgb
}

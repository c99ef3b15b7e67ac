/// Matplotlib's `tab10` qualitative palette.
pub const TAB10: [[u8; 3]; 10] = [
    [31, 119, 180],
    [255, 127, 14],
    [44, 160, 44],
    [214, 39, 40],
    [148, 103, 189],
    [140, 86, 75],
    [227, 119, 194],
    [127, 127, 127],
    [188, 189, 34],
    [23, 190, 207],
];

/// Colour for the `index`-th member of a sheet, cycling through the palette.
pub fn member_color(index: usize) -> [u8; 3] {
    TAB10[index % TAB10.len()]
}

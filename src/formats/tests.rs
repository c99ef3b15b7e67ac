use std::fs::File;
use std::path::Path;

use image::{ImageBuffer, Luma, LumaA, Rgb, Rgba};
use tempfile::tempdir;
use tiff::encoder::{TiffEncoder, colortype};

use super::{IoError, describe_image, is_supported_image, load_image, read_channels};

#[test]
fn tiff_keeps_raw_sixteen_bit_values() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("cells.tiff");
    let mut encoder = TiffEncoder::new(File::create(&path).expect("create")).expect("encoder");
    encoder
        .write_image::<colortype::Gray16>(2, 2, &[10, 600, 7000, 65_535])
        .expect("write tiff");

    let pixels = load_image(&path).expect("load tiff");
    assert_eq!(pixels.dim(), (2, 2));
    assert_eq!(pixels[[0, 1]], 600.0);
    assert_eq!(pixels[[1, 1]], 65_535.0);
}

#[test]
fn rgb_tiff_is_reduced_to_channel_mean() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("rgb.tif");
    let mut encoder = TiffEncoder::new(File::create(&path).expect("create")).expect("encoder");
    encoder
        .write_image::<colortype::RGB8>(1, 1, &[30, 60, 90])
        .expect("write tiff");

    let stack = read_channels(&path).expect("channels");
    assert_eq!(stack.dim(), (1, 1, 3));
    let pixels = load_image(&path).expect("load");
    assert_eq!(pixels[[0, 0]], 60.0);
}

#[test]
fn png_rgb_and_rgba_use_mean_of_colour_channels() {
    let dir = tempdir().expect("tempdir");
    let rgb_path = dir.path().join("rgb.png");
    let rgba_path = dir.path().join("rgba.png");
    let mut rgb = ImageBuffer::<Rgb<u8>, Vec<u8>>::new(2, 1);
    rgb.put_pixel(0, 0, Rgb([255, 0, 0]));
    rgb.put_pixel(1, 0, Rgb([30, 60, 90]));
    rgb.save(&rgb_path).expect("save rgb");
    let mut rgba = ImageBuffer::<Rgba<u8>, Vec<u8>>::new(1, 1);
    rgba.put_pixel(0, 0, Rgba([30, 60, 90, 7]));
    rgba.save(&rgba_path).expect("save rgba");

    let pixels = load_image(&rgb_path).expect("rgb");
    assert_eq!(pixels.dim(), (1, 2));
    assert_eq!(pixels[[0, 0]], 85.0);
    assert_eq!(pixels[[0, 1]], 60.0);
    let pixels = load_image(&rgba_path).expect("rgba");
    assert_eq!(pixels[[0, 0]], 60.0);
}

#[test]
fn two_channel_png_keeps_first_channel() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("gray_alpha.png");
    let mut image = ImageBuffer::<LumaA<u8>, Vec<u8>>::new(1, 1);
    image.put_pixel(0, 0, LumaA([42, 200]));
    image.save(&path).expect("save");
    let pixels = load_image(&path).expect("load");
    assert_eq!(pixels[[0, 0]], 42.0);
}

#[test]
fn grayscale_png_is_not_normalized() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("gray.png");
    let image =
        ImageBuffer::<Luma<u8>, Vec<u8>>::from_vec(2, 2, vec![0, 50, 100, 255]).expect("image");
    image.save(&path).expect("save");
    let info = describe_image(&path).expect("info");
    assert_eq!((info.width, info.height, info.channels), (2, 2, 1));
    assert_eq!(info.min, Some(0.0));
    assert_eq!(info.max, Some(255.0));
}

#[test]
fn unknown_extension_is_unsupported_format() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "hello").expect("write");
    assert!(matches!(
        load_image(&path),
        Err(IoError::UnsupportedFormat(ext)) if ext == "txt"
    ));
    assert!(!is_supported_image(&path));
    assert!(is_supported_image(Path::new("a/b/cell.ND2")));
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempdir().expect("tempdir");
    let error = load_image(dir.path().join("absent.tif")).expect_err("must fail");
    assert!(matches!(error, IoError::Io(_)));
}

fn nd2_chunk(name: &[u8], data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend(0x0ABE_CEDA_u32.to_le_bytes());
    out.extend((name.len() as u32).to_le_bytes());
    out.extend((data.len() as u64).to_le_bytes());
    out.extend(name);
    out.extend(data);
    out
}

fn lv_uint(name: &str, value: u32) -> Vec<u8> {
    let mut out = vec![3_u8, (name.len() + 1) as u8];
    for unit in name.encode_utf16().chain(std::iter::once(0)) {
        out.extend(unit.to_le_bytes());
    }
    out.extend(value.to_le_bytes());
    out
}

fn synthetic_nd2(width: u32, height: u32, components: u32, samples: &[u16]) -> Vec<u8> {
    let mut file = nd2_chunk(b"ND2 FILE SIGNATURE CHUNK NAME01!", b"Ver3.0");

    let mut attributes = vec![11_u8, 0];
    for (name, value) in [
        ("uiWidth", width),
        ("uiWidthBytes", width * components * 2),
        ("uiHeight", height),
        ("uiComp", components),
        ("uiBpcInMemory", 16),
    ] {
        attributes.extend(lv_uint(name, value));
    }
    let attributes_at = file.len() as u64;
    file.extend(nd2_chunk(b"ImageAttributesLV!", &attributes));

    let mut frame = 0.0_f64.to_le_bytes().to_vec();
    for sample in samples {
        frame.extend(sample.to_le_bytes());
    }
    let frame_at = file.len() as u64;
    file.extend(nd2_chunk(b"ImageDataSeq|0!", &frame));

    let signature = b"ND2 CHUNK MAP SIGNATURE 0000001!";
    let map_at = file.len() as u64;
    let mut map = Vec::new();
    for (name, at) in [
        (&b"ImageAttributesLV!"[..], attributes_at),
        (&b"ImageDataSeq|0!"[..], frame_at),
    ] {
        map.extend(name);
        map.extend(at.to_le_bytes());
        map.extend(0_u64.to_le_bytes());
    }
    map.extend(signature);
    map.extend(map_at.to_le_bytes());
    map.extend(0_u64.to_le_bytes());
    file.extend(nd2_chunk(b"ND2 FILEMAP SIGNATURE NAME 0001!", &map));

    file.extend(signature);
    file.extend(map_at.to_le_bytes());
    file
}

#[test]
fn nd2_reads_first_component_of_first_frame() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("stack.nd2");
    // 2x2 pixels, two interleaved components.
    let samples = [100, 1, 200, 2, 300, 3, 400, 4];
    std::fs::write(&path, synthetic_nd2(2, 2, 2, &samples)).expect("write nd2");

    let pixels = load_image(&path).expect("load nd2");
    assert_eq!(pixels.dim(), (2, 2));
    assert_eq!(pixels[[0, 0]], 100.0);
    assert_eq!(pixels[[0, 1]], 200.0);
    assert_eq!(pixels[[1, 0]], 300.0);
    assert_eq!(pixels[[1, 1]], 400.0);
}

#[test]
fn nd2_truncated_frame_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("short.nd2");
    std::fs::write(&path, synthetic_nd2(4, 4, 1, &[1, 2, 3])).expect("write nd2");
    assert!(matches!(
        load_image(&path),
        Err(IoError::UnsupportedLayout(_))
    ));
}

#[test]
fn non_chunked_nd2_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("legacy.nd2");
    std::fs::write(&path, [0_u8; 64]).expect("write");
    assert!(load_image(&path).is_err());
}

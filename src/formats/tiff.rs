use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::debug;
use tiff::decoder::{Decoder, DecodingResult};

use super::util::stack_from_interleaved;
use super::{ChannelStack, IoError, Result};

/// Decodes the first page of a TIFF; further pages (Z/T stacks) are ignored.
pub(crate) fn read_tiff(path: &Path) -> Result<ChannelStack> {
    let file = File::open(path)?;
    let mut decoder = Decoder::new(BufReader::new(file))?;
    let (width, height) = decoder.dimensions()?;
    let (width, height) = (width as usize, height as usize);

    let values = match decoder.read_image()? {
        DecodingResult::U8(buffer) => buffer.into_iter().map(f32::from).collect::<Vec<_>>(),
        DecodingResult::U16(buffer) => buffer.into_iter().map(f32::from).collect(),
        DecodingResult::U32(buffer) => buffer.into_iter().map(|value| value as f32).collect(),
        DecodingResult::U64(buffer) => buffer.into_iter().map(|value| value as f32).collect(),
        DecodingResult::I8(buffer) => buffer.into_iter().map(f32::from).collect(),
        DecodingResult::I16(buffer) => buffer.into_iter().map(f32::from).collect(),
        DecodingResult::I32(buffer) => buffer.into_iter().map(|value| value as f32).collect(),
        DecodingResult::I64(buffer) => buffer.into_iter().map(|value| value as f32).collect(),
        DecodingResult::F32(buffer) => buffer,
        DecodingResult::F64(buffer) => buffer.into_iter().map(|value| value as f32).collect(),
        #[allow(unreachable_patterns)]
        other => {
            return Err(IoError::UnsupportedLayout(format!(
                "unsupported TIFF sample type: {other:?}"
            )));
        }
    };

    if decoder.more_images() {
        debug!("{} has several pages; using the first", path.display());
    }

    let plane = width * height;
    if plane == 0 || values.len() % plane != 0 {
        return Err(IoError::UnsupportedLayout(format!(
            "TIFF page holds {} samples for {width}x{height} pixels",
            values.len()
        )));
    }
    stack_from_interleaved(height, width, values.len() / plane, values)
}

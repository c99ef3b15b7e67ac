//! Minimal reader for chunked (v3) Nikon ND2 files.
//!
//! Only the first frame is decoded and only its first component is kept,
//! matching what a viewer shows for sequence index 0 / channel 0. Legacy
//! JPEG2000-based files and compressed frames are rejected.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use super::util::stack_from_interleaved;
use super::{ChannelStack, IoError, Result};

const CHUNK_MAGIC: u32 = 0x0ABE_CEDA;
const CHUNK_HEADER_LEN: u64 = 16;
const CHUNK_MAP_SIGNATURE: &[u8; 32] = b"ND2 CHUNK MAP SIGNATURE 0000001!";
const IMAGE_ATTRIBUTES: &[u8] = b"ImageAttributesLV!";
const FIRST_FRAME: &[u8] = b"ImageDataSeq|0!";
const FRAME_TIMESTAMP_LEN: usize = 8;

// Lite-variant value type tags.
const LV_INT32: u8 = 2;
const LV_UINT32: u8 = 3;

pub(crate) fn read_nd2(path: &Path) -> Result<ChannelStack> {
    let mut reader = BufReader::new(File::open(path)?);
    let file_len = reader.seek(SeekFrom::End(0))?;

    reader.seek(SeekFrom::Start(0))?;
    if read_u32(&mut reader)? != CHUNK_MAGIC {
        return Err(IoError::UnsupportedLayout(
            "legacy (JPEG2000) ND2 files are not supported".to_string(),
        ));
    }

    let chunks = read_chunk_map(&mut reader, file_len)?;
    let attributes = read_chunk(&mut reader, file_len, lookup(&chunks, IMAGE_ATTRIBUTES)?)?;
    let attributes = ImageAttributes::parse(&attributes)?;
    let frame = read_chunk(&mut reader, file_len, lookup(&chunks, FIRST_FRAME)?)?;
    decode_first_component(&frame, &attributes)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ImageAttributes {
    width: usize,
    height: usize,
    components: usize,
    bits_per_component: usize,
    row_stride: usize,
}

impl ImageAttributes {
    fn parse(data: &[u8]) -> Result<Self> {
        let field = |name: &str| {
            find_lv_u32(data, name)
                .map(|value| value as usize)
                .ok_or_else(|| IoError::Nd2(format!("image attributes lack `{name}`")))
        };
        let width = field("uiWidth")?;
        let height = field("uiHeight")?;
        let components = field("uiComp")?.max(1);
        let bits_per_component = field("uiBpcInMemory")?;
        let bytes = bytes_per_sample(bits_per_component)?;
        let row_stride = find_lv_u32(data, "uiWidthBytes")
            .map(|value| value as usize)
            .unwrap_or(width * components * bytes);
        Ok(Self {
            width,
            height,
            components,
            bits_per_component,
            row_stride,
        })
    }
}

fn bytes_per_sample(bits: usize) -> Result<usize> {
    match bits {
        8 => Ok(1),
        16 => Ok(2),
        32 => Ok(4),
        other => Err(IoError::UnsupportedLayout(format!(
            "{other}-bit ND2 samples are not supported"
        ))),
    }
}

fn decode_first_component(frame: &[u8], attributes: &ImageAttributes) -> Result<ChannelStack> {
    let bytes = bytes_per_sample(attributes.bits_per_component)?;
    let pixels = frame.get(FRAME_TIMESTAMP_LEN..).unwrap_or_default();
    let needed = attributes.row_stride * attributes.height;
    if attributes.row_stride < attributes.width * attributes.components * bytes
        || pixels.len() < needed
    {
        return Err(IoError::UnsupportedLayout(
            "ND2 frame is compressed or truncated".to_string(),
        ));
    }

    let mut values = Vec::with_capacity(attributes.width * attributes.height);
    for y in 0..attributes.height {
        let row = &pixels[y * attributes.row_stride..];
        for x in 0..attributes.width {
            let offset = x * attributes.components * bytes;
            let sample = &row[offset..offset + bytes];
            let value = match bytes {
                1 => f32::from(sample[0]),
                2 => f32::from(u16::from_le_bytes([sample[0], sample[1]])),
                _ => f32::from_le_bytes([sample[0], sample[1], sample[2], sample[3]]),
            };
            values.push(value);
        }
    }
    stack_from_interleaved(attributes.height, attributes.width, 1, values)
}

fn read_chunk_map<R: Read + Seek>(reader: &mut R, file_len: u64) -> Result<HashMap<Vec<u8>, u64>> {
    let trailer_len = CHUNK_MAP_SIGNATURE.len() as u64 + 8;
    if file_len < trailer_len {
        return Err(IoError::Nd2("file too short for a chunk map".to_string()));
    }
    reader.seek(SeekFrom::Start(file_len - trailer_len))?;
    let mut signature = [0_u8; 32];
    reader.read_exact(&mut signature)?;
    if &signature != CHUNK_MAP_SIGNATURE {
        return Err(IoError::Nd2("missing chunk map signature".to_string()));
    }
    let map_position = read_u64(reader)?;
    let map = read_chunk(reader, file_len, map_position)?;

    let mut chunks = HashMap::new();
    let mut cursor = 0;
    while cursor < map.len() {
        let name_end = map[cursor..]
            .iter()
            .position(|byte| *byte == b'!')
            .map(|offset| cursor + offset + 1)
            .ok_or_else(|| IoError::Nd2("unterminated chunk name in map".to_string()))?;
        let name = &map[cursor..name_end];
        if name == CHUNK_MAP_SIGNATURE {
            break;
        }
        let entry = map
            .get(name_end..name_end + 16)
            .ok_or_else(|| IoError::Nd2("truncated chunk map entry".to_string()))?;
        let mut position = [0_u8; 8];
        position.copy_from_slice(&entry[..8]);
        chunks.insert(name.to_vec(), u64::from_le_bytes(position));
        cursor = name_end + 16;
    }
    Ok(chunks)
}

fn lookup(chunks: &HashMap<Vec<u8>, u64>, name: &[u8]) -> Result<u64> {
    chunks.get(name).copied().ok_or_else(|| {
        IoError::Nd2(format!(
            "chunk `{}` not found",
            String::from_utf8_lossy(name)
        ))
    })
}

fn read_chunk<R: Read + Seek>(reader: &mut R, file_len: u64, position: u64) -> Result<Vec<u8>> {
    reader.seek(SeekFrom::Start(position))?;
    if read_u32(reader)? != CHUNK_MAGIC {
        return Err(IoError::Nd2(format!("bad chunk magic at offset {position}")));
    }
    let name_len = u64::from(read_u32(reader)?);
    let data_len = read_u64(reader)?;
    let data_start = position + CHUNK_HEADER_LEN + name_len;
    if data_start.saturating_add(data_len) > file_len {
        return Err(IoError::Nd2(format!(
            "chunk at offset {position} runs past the end of the file"
        )));
    }
    reader.seek(SeekFrom::Start(data_start))?;
    let mut data = vec![0_u8; data_len as usize];
    reader.read_exact(&mut data)?;
    Ok(data)
}

/// Scans lite-variant data for an integer entry named `name`.
fn find_lv_u32(data: &[u8], name: &str) -> Option<u32> {
    let mut encoded = name
        .encode_utf16()
        .chain(std::iter::once(0))
        .flat_map(u16::to_le_bytes)
        .collect::<Vec<_>>();
    let name_chars = u8::try_from(name.encode_utf16().count() + 1).ok()?;
    encoded.insert(0, name_chars);

    data.windows(encoded.len() + 1)
        .enumerate()
        .find(|(_, window)| {
            matches!(window[0], LV_INT32 | LV_UINT32) && window[1..] == encoded[..]
        })
        .and_then(|(start, _)| {
            let value_at = start + 1 + encoded.len();
            let bytes = data.get(value_at..value_at + 4)?;
            Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        })
}

fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut bytes = [0_u8; 4];
    reader.read_exact(&mut bytes)?;
    Ok(u32::from_le_bytes(bytes))
}

fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut bytes = [0_u8; 8];
    reader.read_exact(&mut bytes)?;
    Ok(u64::from_le_bytes(bytes))
}

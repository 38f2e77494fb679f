//! Valve's LZMA lump envelope.
//!
//! Compressed lumps start with a 17 byte header: the `LZMA` magic, the
//! uncompressed size, the size of the raw LZMA stream and the five LZMA
//! property bytes. The header is little endian regardless of the byte order
//! of the containing file.

use crate::error::{BspError, BspResult};
use std::io::Cursor;

pub const MAGIC: [u8; 4] = *b"LZMA";
/// Envelope bytes preceding the raw LZMA stream.
pub const HEADER_SIZE: usize = 17;

const PROPS_SIZE: usize = 5;
// lzma_rs prepends the props and a 64 bit unpacked size to its output
const LZMA_RS_HEADER: usize = PROPS_SIZE + 8;

/// A lump is compressed iff its payload starts with the envelope magic.
pub fn is_compressed(data: &[u8]) -> bool {
    data.len() >= HEADER_SIZE && data[..4] == MAGIC
}

/// Uncompressed size stated by the envelope, `None` when the payload is not
/// an envelope at all.
pub fn actual_size(data: &[u8]) -> Option<u32> {
    is_compressed(data).then(|| u32::from_le_bytes([data[4], data[5], data[6], data[7]]))
}

/// Decode an envelope back into the raw lump payload.
pub fn decompress(data: &[u8]) -> BspResult<Vec<u8>> {
    if !is_compressed(data) {
        return Err(BspError::MissingLzmaMagic);
    }
    let actual_size = u32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize;
    let lzma_size = u32::from_le_bytes([data[8], data[9], data[10], data[11]]) as usize;
    let available = data.len() - HEADER_SIZE;
    if lzma_size > available {
        return Err(BspError::TruncatedLzmaStream {
            stated: lzma_size,
            available,
        });
    }

    // feed the props followed by the payload, the unpacked size comes from
    // the envelope instead of the stream
    let mut input = Cursor::new(&data[12..HEADER_SIZE + lzma_size]);
    let mut output = Vec::with_capacity(actual_size);
    lzma_rs::lzma_decompress_with_options(
        &mut input,
        &mut output,
        &lzma_rs::decompress::Options {
            unpacked_size: lzma_rs::decompress::UnpackedSize::UseProvided(Some(actual_size as u64)),
            allow_incomplete: false,
            memlimit: None,
        },
    )?;
    Ok(output)
}

/// Encode a payload into an envelope. Returns `None` for payloads small
/// enough that the envelope alone would be a net loss.
pub fn compress(data: &[u8]) -> BspResult<Option<Vec<u8>>> {
    if data.len() <= HEADER_SIZE {
        return Ok(None);
    }

    let mut raw = Vec::new();
    lzma_rs::lzma_compress(&mut Cursor::new(data), &mut raw)?;
    let props = &raw[..PROPS_SIZE];
    let payload = &raw[LZMA_RS_HEADER..];

    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(props);
    out.extend_from_slice(payload);
    Ok(Some(out))
}

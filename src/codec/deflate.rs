//! zlib framing for the grid codec.
//!
//! Frame: `[uncompressed_size: u64 LE][zlib stream]`.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::util::{Error, Result};

/// Refuse to inflate frames claiming more than this.
const MAX_INFLATED: u64 = 1 << 30;

/// Compress `data` into a size-prefixed zlib frame.
///
/// `level` is clamped to 0-9; 0 stores without compression but keeps the frame.
pub fn compress(data: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(level.min(9)));
    encoder.write_all(data)?;
    let compressed = encoder.finish()?;

    let mut result = Vec::with_capacity(8 + compressed.len());
    result.extend_from_slice(&(data.len() as u64).to_le_bytes());
    result.extend_from_slice(&compressed);
    Ok(result)
}

/// Inflate a frame produced by [`compress`]. Trailing bytes after the zlib
/// stream (block padding) are ignored.
pub fn decompress(codec: &'static str, data: &[u8]) -> Result<Vec<u8>> {
    let Some((size, body)) = data.split_first_chunk::<8>() else {
        return Err(Error::codec(codec, "frame shorter than its size prefix"));
    };
    let size = u64::from_le_bytes(*size);
    if size > MAX_INFLATED {
        return Err(Error::codec(codec, format!("frame claims {size} bytes")));
    }

    let mut decoder = ZlibDecoder::new(body);
    let mut out = Vec::with_capacity(size as usize);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::codec(codec, e.to_string()))?;
    if out.len() as u64 != size {
        return Err(Error::codec(
            codec,
            format!("inflated {} bytes, frame says {size}", out.len()),
        ));
    }
    Ok(out)
}

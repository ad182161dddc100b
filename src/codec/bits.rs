//! Integer coding primitives shared by the quantized geometry codecs:
//! LEB128 varints, zigzag signed varints and a fixed-width bit packer.

use crate::util::{Error, Result};

/// Append a variable-length integer (LEB128).
pub(crate) fn write_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Append a signed varint (zigzag encoding).
pub(crate) fn write_svarint(buf: &mut Vec<u8>, value: i64) {
    write_varint(buf, ((value << 1) ^ (value >> 63)) as u64);
}

/// Cursor over an encoded byte stream.
pub(crate) struct ByteReader<'a> {
    codec: &'static str,
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(codec: &'static str, data: &'a [u8]) -> Self {
        Self { codec, data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or_else(|| Error::codec(self.codec, "stream ended early"))?;
        self.pos += 1;
        Ok(b)
    }

    pub fn read_varint(&mut self) -> Result<u64> {
        let mut result: u64 = 0;
        let mut shift = 0;
        loop {
            let byte = self.read_u8()?;
            result |= ((byte & 0x7F) as u64) << shift;
            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
            if shift >= 64 {
                return Err(Error::codec(self.codec, "varint overflow"));
            }
        }
        Ok(result)
    }

    pub fn read_svarint(&mut self) -> Result<i64> {
        let encoded = self.read_varint()?;
        Ok(((encoded >> 1) as i64) ^ -((encoded & 1) as i64))
    }

    /// Read a varint that must fit a `usize` count no larger than `max`.
    pub fn read_count(&mut self, max: usize) -> Result<usize> {
        let v = self.read_varint()?;
        if v > max as u64 {
            return Err(Error::codec(self.codec, format!("count {v} exceeds {max}")));
        }
        Ok(v as usize)
    }
}

/// Bits needed to store every value in `0..=max`.
#[inline]
pub(crate) fn bits_for(max: u64) -> u32 {
    64 - max.leading_zeros()
}

/// Packs unsigned values of arbitrary width (0 to 64 bits), LSB first.
#[derive(Default)]
pub(crate) struct BitWriter {
    buf: Vec<u8>,
    acc: u64,
    nbits: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, value: u64, width: u32) {
        if width > 32 {
            self.write(value & 0xFFFF_FFFF, 32);
            self.write(value >> 32, width - 32);
            return;
        }
        if width == 0 {
            return;
        }
        let mask = (1u64 << width) - 1;
        self.acc |= (value & mask) << self.nbits;
        self.nbits += width;
        while self.nbits >= 8 {
            self.buf.push(self.acc as u8);
            self.acc >>= 8;
            self.nbits -= 8;
        }
    }

    pub fn finish(mut self) -> Vec<u8> {
        if self.nbits > 0 {
            self.buf.push(self.acc as u8);
        }
        self.buf
    }
}

/// Reads values written by [`BitWriter`].
pub(crate) struct BitReader<'a> {
    codec: &'static str,
    data: &'a [u8],
    bit: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(codec: &'static str, data: &'a [u8]) -> Self {
        Self { codec, data, bit: 0 }
    }

    pub fn read(&mut self, width: u32) -> Result<u64> {
        if width > 32 {
            let lo = self.read(32)?;
            let hi = self.read(width - 32)?;
            return Ok(lo | (hi << 32));
        }
        if self.bit + width as usize > self.data.len() * 8 {
            return Err(Error::codec(self.codec, "bit stream ended early"));
        }
        let mut value = 0u64;
        for i in 0..width as usize {
            let bit = self.bit + i;
            let b = (self.data[bit / 8] >> (bit % 8)) & 1;
            value |= (b as u64) << i;
        }
        self.bit += width as usize;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varints() {
        let mut buf = Vec::new();
        write_varint(&mut buf, 0);
        write_varint(&mut buf, 300);
        write_svarint(&mut buf, -1);
        write_svarint(&mut buf, i64::MIN);
        write_varint(&mut buf, u64::MAX);
        assert_eq!(&buf[..3], &[0x00, 0xAC, 0x02]);

        let mut r = ByteReader::new("test", &buf);
        assert_eq!(r.read_varint().unwrap(), 0);
        assert_eq!(r.read_varint().unwrap(), 300);
        assert_eq!(r.read_svarint().unwrap(), -1);
        assert_eq!(r.read_svarint().unwrap(), i64::MIN);
        assert_eq!(r.read_varint().unwrap(), u64::MAX);
        assert!(r.read_u8().is_err());
    }

    #[test]
    fn test_read_count_limit() {
        let mut buf = Vec::new();
        write_varint(&mut buf, 70_000);
        assert!(ByteReader::new("test", &buf).read_count(65_535).is_err());
    }

    #[test]
    fn test_bits_for() {
        assert_eq!(bits_for(0), 0);
        assert_eq!(bits_for(1), 1);
        assert_eq!(bits_for(255), 8);
        assert_eq!(bits_for(256), 9);
        assert_eq!(bits_for(u64::MAX), 64);
    }

    #[test]
    fn test_bit_packing() {
        let values = [(5u64, 3u32), (0, 0), (1023, 10), (1, 1), (u64::MAX, 64), (0x1_2345_6789, 40)];
        let mut w = BitWriter::new();
        for (v, width) in values {
            w.write(v, width);
        }
        let bytes = w.finish();
        assert_eq!(bytes.len(), (3 + 10 + 1 + 64 + 40 + 7) / 8);

        let mut r = BitReader::new("test", &bytes);
        for (v, width) in values {
            assert_eq!(r.read(width).unwrap(), v);
        }
        assert!(r.read(16).is_err());
    }
}

//! Texture records.

use std::io::{Read, Write};

use super::{address, read_f32s, read_u32, write_f32s, write_u32, Record};
use crate::util::{Mat3, Result, Vec2};

/// A texture block and the transform remapping patch UVs into it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Texture {
    /// Block address in padding units.
    pub offset: u32,
    /// UV remap, column-major on disk.
    pub matrix: Mat3,
}

impl Texture {
    #[inline]
    pub fn address(&self) -> u64 {
        address(self.offset)
    }

    /// Apply the UV remap to one coordinate.
    #[inline]
    pub fn remap(&self, uv: Vec2) -> Vec2 {
        self.matrix.transform_point2(uv)
    }
}

impl Default for Texture {
    fn default() -> Self {
        Self {
            offset: 0,
            matrix: Mat3::IDENTITY,
        }
    }
}

impl Record for Texture {
    const SIZE: usize = 40;
    const NAME: &'static str = "texture";

    fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let offset = read_u32(r)?;
        let matrix = Mat3::from_cols_array(&read_f32s::<_, 9>(r)?);
        Ok(Self { offset, matrix })
    }

    fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        write_u32(w, self.offset)?;
        write_f32s(w, &self.matrix.to_cols_array())
    }
}

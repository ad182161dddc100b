//! Patch records.

use std::io::{Read, Write};

use super::{read_u32, write_u32, Record, NONE};
use crate::util::Result;

/// A run of a node's faces bound to one texture, material and feature.
///
/// The run ends at `face_offset`; it starts where the previous patch of the
/// same node ended (or at face 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Patch {
    /// Node this patch depends on, used for LOD bookkeeping.
    pub node: u32,
    /// One past the last face of this patch.
    pub face_offset: u32,
    pub texture: u32,
    pub material: u32,
    pub feature: u32,
}

impl Patch {
    #[inline]
    pub fn texture(&self) -> Option<u32> {
        (self.texture != NONE).then_some(self.texture)
    }

    #[inline]
    pub fn material(&self) -> Option<u32> {
        (self.material != NONE).then_some(self.material)
    }

    #[inline]
    pub fn feature(&self) -> Option<u32> {
        (self.feature != NONE).then_some(self.feature)
    }
}

impl Default for Patch {
    fn default() -> Self {
        Self {
            node: 0,
            face_offset: 0,
            texture: NONE,
            material: NONE,
            feature: NONE,
        }
    }
}

impl Record for Patch {
    const SIZE: usize = 20;
    const NAME: &'static str = "patch";

    fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            node: read_u32(r)?,
            face_offset: read_u32(r)?,
            texture: read_u32(r)?,
            material: read_u32(r)?,
            feature: read_u32(r)?,
        })
    }

    fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        write_u32(w, self.node)?;
        write_u32(w, self.face_offset)?;
        write_u32(w, self.texture)?;
        write_u32(w, self.material)?;
        write_u32(w, self.feature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_references() {
        let p = Patch::default();
        assert_eq!(p.texture(), None);
        assert_eq!(p.material(), None);
        assert_eq!(p.feature(), None);

        let p = Patch { texture: 3, feature: 0, ..Default::default() };
        assert_eq!(p.texture(), Some(3));
        assert_eq!(p.feature(), Some(0));
    }
}

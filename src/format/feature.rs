//! Feature records.

use std::io::{Read, Write};

use super::{address, read_sphere, read_u32, read_vec3, write_f32s, write_u32, Record};
use crate::util::{BBox3f, Result, Sphere};

/// Opaque semantic metadata attached to patches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Feature {
    /// Block address in padding units.
    pub offset: u32,
    pub kind: u32,
    pub id: u32,
    pub node: u32,
    pub sphere: Sphere,
    pub bbox: BBox3f,
}

impl Feature {
    #[inline]
    pub fn address(&self) -> u64 {
        address(self.offset)
    }
}

impl Default for Feature {
    fn default() -> Self {
        Self {
            offset: 0,
            kind: 0,
            id: 0,
            node: 0,
            sphere: Sphere::EMPTY,
            bbox: BBox3f::new(Default::default(), Default::default()),
        }
    }
}

impl Record for Feature {
    const SIZE: usize = 56;
    const NAME: &'static str = "feature";

    fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            offset: read_u32(r)?,
            kind: read_u32(r)?,
            id: read_u32(r)?,
            node: read_u32(r)?,
            sphere: read_sphere(r)?,
            bbox: BBox3f::new(read_vec3(r)?, read_vec3(r)?),
        })
    }

    fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        write_u32(w, self.offset)?;
        write_u32(w, self.kind)?;
        write_u32(w, self.id)?;
        write_u32(w, self.node)?;
        write_f32s(w, &self.sphere.to_array())?;
        write_f32s(w, &self.bbox.min.to_array())?;
        write_f32s(w, &self.bbox.max.to_array())
    }
}

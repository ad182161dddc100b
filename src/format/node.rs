//! Node and instance-node records.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::{address, read_sphere, read_u32, write_f32s, write_u32, Record};
use crate::util::{Cone3s, Result, Sphere};

/// One LOD region: where its block lives and how it is bounded.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Node {
    /// Block address in padding units.
    pub offset: u32,
    pub nvert: u16,
    pub nface: u16,
    /// LOD error metric.
    pub error: f32,
    pub cone: Cone3s,
    pub sphere: Sphere,
    /// Radius of the sphere without skirt geometry.
    pub tight_radius: f32,
    /// First patch owned by this node; the next node's value ends the range.
    pub first_patch: u32,
}

impl Node {
    /// Byte offset of this node's block.
    #[inline]
    pub fn address(&self) -> u64 {
        address(self.offset)
    }

    /// Bounding sphere with the tight radius.
    #[inline]
    pub fn tight_sphere(&self) -> Sphere {
        Sphere::new(self.sphere.center, self.tight_radius)
    }
}

impl Record for Node {
    const SIZE: usize = 44;
    const NAME: &'static str = "node";

    fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let offset = read_u32(r)?;
        let nvert = r.read_u16::<LittleEndian>()?;
        let nface = r.read_u16::<LittleEndian>()?;
        let error = r.read_f32::<LittleEndian>()?;
        let mut cone = [0i16; 4];
        r.read_i16_into::<LittleEndian>(&mut cone)?;
        let sphere = read_sphere(r)?;
        let tight_radius = r.read_f32::<LittleEndian>()?;
        let first_patch = read_u32(r)?;
        Ok(Self {
            offset,
            nvert,
            nface,
            error,
            cone: Cone3s(cone),
            sphere,
            tight_radius,
            first_patch,
        })
    }

    fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        write_u32(w, self.offset)?;
        w.write_u16::<LittleEndian>(self.nvert)?;
        w.write_u16::<LittleEndian>(self.nface)?;
        w.write_f32::<LittleEndian>(self.error)?;
        for c in self.cone.0 {
            w.write_i16::<LittleEndian>(c)?;
        }
        write_f32s(w, &self.sphere.to_array())?;
        w.write_f32::<LittleEndian>(self.tight_radius)?;
        write_u32(w, self.first_patch)?;
        Ok(())
    }
}

/// A node whose mesh is shared by several placements.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InstanceNode {
    pub node: Node,
    /// Byte offset of the placement payload inside this node's block.
    pub instance_offset: u32,
    /// Number of placements in the payload.
    pub ninstance: u32,
}

impl Record for InstanceNode {
    const SIZE: usize = 52;
    const NAME: &'static str = "instance node";

    fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let node = Node::read_from(r)?;
        let instance_offset = read_u32(r)?;
        let ninstance = read_u32(r)?;
        Ok(Self {
            node,
            instance_offset,
            ninstance,
        })
    }

    fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        self.node.write_to(w)?;
        write_u32(w, self.instance_offset)?;
        write_u32(w, self.ninstance)
    }
}

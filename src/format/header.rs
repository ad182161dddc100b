//! Archive header.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::{read_f32s, read_sphere, write_f32s, Signature, CURRENT_VERSION, HEADER_SIZE, MAGIC};
use crate::util::{Error, Mat4, Result, Sphere};

/// Number of reserved zero bytes at the end of the header.
const RESERVED: usize = 76;

/// Fixed-size archive header.
///
/// Table counts include the sentinel entries of the node, instance-node,
/// texture and feature tables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Header {
    pub magic: u32,
    pub version: u32,
    /// Total vertex count over all nodes.
    pub nvert: u64,
    /// Total face count over all nodes.
    pub nface: u64,
    pub signature: Signature,
    pub n_nodes: u32,
    pub n_instance_nodes: u32,
    pub n_instances: u32,
    pub n_patches: u32,
    pub n_textures: u32,
    pub n_materials: u32,
    pub n_features: u32,
    /// Bounding sphere of the whole model.
    pub sphere: Sphere,
    /// Model-to-world transform.
    pub matrix: Mat4,
    /// Tile coordinate when the archive is a tile.
    pub tile: [u32; 3],
}

impl Header {
    pub fn new(signature: Signature) -> Self {
        Self {
            magic: MAGIC,
            version: CURRENT_VERSION,
            nvert: 0,
            nface: 0,
            signature,
            n_nodes: 0,
            n_instance_nodes: 0,
            n_instances: 0,
            n_patches: 0,
            n_textures: 0,
            n_materials: 0,
            n_features: 0,
            sphere: Sphere::EMPTY,
            matrix: Mat4::IDENTITY,
            tile: [0; 3],
        }
    }

    /// Decode a header. Does not validate magic or version.
    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let magic = r.read_u32::<LittleEndian>()?;
        let version = r.read_u32::<LittleEndian>()?;
        let nvert = r.read_u64::<LittleEndian>()?;
        let nface = r.read_u64::<LittleEndian>()?;
        let signature = Signature::read_from(r)?;
        let mut counts = [0u32; 7];
        r.read_u32_into::<LittleEndian>(&mut counts)?;
        let sphere = read_sphere(r)?;
        let matrix = Mat4::from_cols_array(&read_f32s::<_, 16>(r)?);
        let mut tile = [0u32; 3];
        r.read_u32_into::<LittleEndian>(&mut tile)?;
        let mut reserved = [0u8; RESERVED];
        r.read_exact(&mut reserved)?;

        Ok(Self {
            magic,
            version,
            nvert,
            nface,
            signature,
            n_nodes: counts[0],
            n_instance_nodes: counts[1],
            n_instances: counts[2],
            n_patches: counts[3],
            n_textures: counts[4],
            n_materials: counts[5],
            n_features: counts[6],
            sphere,
            matrix,
            tile,
        })
    }

    /// Check magic and version, then decode the rest.
    pub fn read_checked<R: Read>(r: &mut R) -> Result<Self> {
        let mut head = [0u8; 8];
        r.read_exact(&mut head)?;
        let mut peek = &head[..];
        let magic = peek.read_u32::<LittleEndian>()?;
        if magic != MAGIC {
            return Err(Error::InvalidMagic(magic));
        }
        let version = peek.read_u32::<LittleEndian>()?;
        if version > CURRENT_VERSION {
            return Err(Error::UnsupportedVersion(version));
        }
        Self::read_from(&mut (&head[..]).chain(r))
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u32::<LittleEndian>(self.magic)?;
        w.write_u32::<LittleEndian>(self.version)?;
        w.write_u64::<LittleEndian>(self.nvert)?;
        w.write_u64::<LittleEndian>(self.nface)?;
        self.signature.write_to(w)?;
        for count in [
            self.n_nodes,
            self.n_instance_nodes,
            self.n_instances,
            self.n_patches,
            self.n_textures,
            self.n_materials,
            self.n_features,
        ] {
            w.write_u32::<LittleEndian>(count)?;
        }
        write_f32s(w, &self.sphere.to_array())?;
        write_f32s(w, &self.matrix.to_cols_array())?;
        for t in self.tile {
            w.write_u32::<LittleEndian>(t)?;
        }
        w.write_all(&[0u8; RESERVED])?;
        Ok(())
    }

    /// Encode into a fixed-size buffer.
    pub fn to_bytes(&self) -> Result<[u8; HEADER_SIZE]> {
        let mut buf = [0u8; HEADER_SIZE];
        let mut cursor = &mut buf[..];
        self.write_to(&mut cursor)?;
        if !cursor.is_empty() {
            return Err(Error::invalid("header encoded short of its fixed size"));
        }
        Ok(buf)
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new(Signature::default())
    }
}

//! Geometry and texture block codecs.
//!
//! A node block holds one encoded [`NodeMesh`]. Which encoding is used is
//! fixed per archive by the signature flags:
//!
//! | flags   | codec          |
//! |---------|----------------|
//! | none    | [`RawCodec`]    |
//! | `CORTO` | [`GridCodec`]   |
//! | `DRACO` | [`PackedCodec`] |
//!
//! Instance blocks hold the encoded mesh followed by the placement payload
//! at `instance_offset`. Every block is zero-padded to [`PADDING`].

mod bits;
pub mod deflate;
mod grid;
mod packed;
mod quant;
mod raw;
mod setting;
pub mod texture;

pub use grid::GridCodec;
pub use packed::PackedCodec;
pub use raw::RawCodec;
pub use setting::*;

use std::fmt;

use crate::format::{
    decode_placements, encode_placements, GeometryEncoding, InstanceLayout, InstanceNode, Node,
    Patch, Signature, PADDING,
};
use crate::mesh::{InstanceMesh, NodeMesh};
use crate::util::{pad_to, Error, Result};

/// Encoder/decoder for the geometry of one node.
///
/// `encode` returns unpadded bytes. `decode` receives the whole block,
/// padding included, and must ignore trailing zeros.
pub trait GeometryCodec: Send + Sync + fmt::Debug {
    /// Short name used in errors and logs.
    fn name(&self) -> &'static str;

    fn encode(
        &self,
        sig: &Signature,
        mesh: &NodeMesh,
        patches: &[Patch],
        budget: &QuantizationBudget,
    ) -> Result<Vec<u8>>;

    /// Decode one mesh. `node` carries the stored counts; codecs that record
    /// their own counts may ignore them.
    fn decode(&self, data: &[u8], sig: &Signature, node: &Node) -> Result<NodeMesh>;
}

/// Codec selected by the signature flags.
pub fn for_signature(sig: &Signature) -> Result<Box<dyn GeometryCodec>> {
    Ok(match sig.geometry_encoding()? {
        GeometryEncoding::Raw => Box::new(RawCodec),
        GeometryEncoding::Corto => Box::new(GridCodec),
        GeometryEncoding::Draco => Box::new(PackedCodec),
    })
}

/// Check that patch face ends are non-decreasing and stay inside the mesh.
pub(crate) fn check_patches(codec: &'static str, mesh: &NodeMesh, patches: &[Patch]) -> Result<()> {
    let mut prev = 0;
    for p in patches {
        if p.face_offset < prev || p.face_offset as usize > mesh.nface() {
            return Err(Error::codec(
                codec,
                format!(
                    "patch face offset {} out of order or beyond {} faces",
                    p.face_offset,
                    mesh.nface()
                ),
            ));
        }
        prev = p.face_offset;
    }
    Ok(())
}

/// Encode a node block, padded.
pub fn encode_node(
    codec: &dyn GeometryCodec,
    sig: &Signature,
    mesh: &NodeMesh,
    patches: &[Patch],
    budget: &QuantizationBudget,
) -> Result<Vec<u8>> {
    mesh.validate(sig)?;
    let mut block = codec.encode(sig, mesh, patches, budget)?;
    pad_to(&mut block, PADDING);
    Ok(block)
}

/// Decode a node block and return the mesh together with the node record
/// updated to the decoded counts.
pub fn decode_node(
    codec: &dyn GeometryCodec,
    data: &[u8],
    sig: &Signature,
    node: &Node,
) -> Result<(NodeMesh, Node)> {
    let mesh = codec.decode(data, sig, node)?;
    let mut node = *node;
    node.nvert = mesh.nvert() as u16;
    node.nface = mesh.nface() as u16;
    Ok((mesh, node))
}

/// Encode an instance block, padded. Returns the block and the byte offset
/// of the placement payload inside it.
pub fn encode_instance(
    codec: &dyn GeometryCodec,
    sig: &Signature,
    mesh: &InstanceMesh,
    patches: &[Patch],
    budget: &QuantizationBudget,
) -> Result<(Vec<u8>, u32)> {
    mesh.mesh.validate(sig)?;
    let mut block = codec.encode(sig, &mesh.mesh, patches, budget)?;
    let instance_offset = u32::try_from(block.len())
        .map_err(|_| Error::codec(codec.name(), "instance mesh exceeds 4 GiB"))?;
    let layout = InstanceLayout::from_signature(sig);
    block.extend_from_slice(&encode_placements(&mesh.instances, layout)?);
    pad_to(&mut block, PADDING);
    Ok((block, instance_offset))
}

/// Decode an instance block: the mesh from `block[..instance_offset]`, the
/// placements from `block[instance_offset..]`.
pub fn decode_instance(
    codec: &dyn GeometryCodec,
    data: &[u8],
    sig: &Signature,
    inode: &InstanceNode,
) -> Result<(InstanceMesh, InstanceNode)> {
    let split = inode.instance_offset as usize;
    if split > data.len() {
        return Err(Error::invalid(format!(
            "instance offset {split} beyond block of {} bytes",
            data.len()
        )));
    }
    let (mesh_bytes, placement_bytes) = data.split_at(split);
    let (mesh, node) = decode_node(codec, mesh_bytes, sig, &inode.node)?;
    let layout = InstanceLayout::from_signature(sig);
    let instances = decode_placements(placement_bytes, inode.ninstance as usize, layout)?;
    Ok((InstanceMesh { mesh, instances }, InstanceNode { node, ..*inode }))
}

//! Uncompressed columnar node layout.
//!
//! positions `3×f32`, faces `3×u16` (when `nface > 0`), normals `3×i16`,
//! texcoords `2×f32`, colors `4×u8`. Optional columns follow the signature.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::{check_patches, GeometryCodec, QuantizationBudget};
use crate::format::{Node, Patch, Signature};
use crate::mesh::NodeMesh;
use crate::util::{Error, Result, Vec2, Vec3};

const NAME: &str = "raw";

#[derive(Debug, Clone, Copy, Default)]
pub struct RawCodec;

impl RawCodec {
    /// Encoded size of a node with these counts.
    pub fn encoded_size(sig: &Signature, nvert: usize, nface: usize) -> usize {
        let mut size = nvert * 12 + nface * 6;
        if sig.has_normals() {
            size += nvert * 6;
        }
        if sig.has_texcoords() {
            size += nvert * 8;
        }
        if sig.has_colors() {
            size += nvert * 4;
        }
        size
    }
}

impl GeometryCodec for RawCodec {
    fn name(&self) -> &'static str {
        NAME
    }

    fn encode(
        &self,
        sig: &Signature,
        mesh: &NodeMesh,
        patches: &[Patch],
        _budget: &QuantizationBudget,
    ) -> Result<Vec<u8>> {
        check_patches(NAME, mesh, patches)?;
        let mut w = Vec::with_capacity(Self::encoded_size(sig, mesh.nvert(), mesh.nface()));
        for p in &mesh.positions {
            for c in p.to_array() {
                w.write_f32::<LittleEndian>(c)?;
            }
        }
        for f in &mesh.faces {
            for i in f {
                w.write_u16::<LittleEndian>(*i)?;
            }
        }
        if sig.has_normals() {
            for n in &mesh.normals {
                for c in n {
                    w.write_i16::<LittleEndian>(*c)?;
                }
            }
        }
        if sig.has_texcoords() {
            for uv in &mesh.texcoords {
                w.write_f32::<LittleEndian>(uv.x)?;
                w.write_f32::<LittleEndian>(uv.y)?;
            }
        }
        if sig.has_colors() {
            for c in &mesh.colors {
                w.extend_from_slice(c);
            }
        }
        Ok(w)
    }

    fn decode(&self, data: &[u8], sig: &Signature, node: &Node) -> Result<NodeMesh> {
        let nvert = node.nvert as usize;
        let nface = node.nface as usize;
        let needed = Self::encoded_size(sig, nvert, nface);
        if data.len() < needed {
            return Err(Error::codec(
                NAME,
                format!("block holds {} bytes, node needs {needed}", data.len()),
            ));
        }

        let mut r = data;
        let mut mesh = NodeMesh::default();
        mesh.positions.reserve(nvert);
        for _ in 0..nvert {
            let mut p = [0f32; 3];
            r.read_f32_into::<LittleEndian>(&mut p)?;
            mesh.positions.push(Vec3::from_array(p));
        }
        mesh.faces.reserve(nface);
        for _ in 0..nface {
            let mut f = [0u16; 3];
            r.read_u16_into::<LittleEndian>(&mut f)?;
            if let Some(bad) = f.iter().find(|&&i| i as usize >= nvert) {
                return Err(Error::codec(NAME, format!("face index {bad} beyond {nvert} vertices")));
            }
            mesh.faces.push(f);
        }
        if sig.has_normals() {
            mesh.normals.reserve(nvert);
            for _ in 0..nvert {
                let mut n = [0i16; 3];
                r.read_i16_into::<LittleEndian>(&mut n)?;
                mesh.normals.push(n);
            }
        }
        if sig.has_texcoords() {
            mesh.texcoords.reserve(nvert);
            for _ in 0..nvert {
                let u = r.read_f32::<LittleEndian>()?;
                let v = r.read_f32::<LittleEndian>()?;
                mesh.texcoords.push(Vec2::new(u, v));
            }
        }
        if sig.has_colors() {
            mesh.colors.reserve(nvert);
            for _ in 0..nvert {
                let mut c = [0u8; 4];
                std::io::Read::read_exact(&mut r, &mut c)?;
                mesh.colors.push(c);
            }
        }
        Ok(mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::tests::grid_mesh;

    fn node_for(mesh: &NodeMesh) -> Node {
        Node { nvert: mesh.nvert() as u16, nface: mesh.nface() as u16, ..Default::default() }
    }

    #[test]
    fn test_column_order() {
        let sig = Signature::mesh(true, true, true);
        let mesh = NodeMesh {
            positions: vec![Vec3::new(1.0, 2.0, 3.0)],
            faces: vec![[0, 0, 0]],
            normals: vec![[7, 8, 9]],
            texcoords: vec![Vec2::new(0.5, 0.25)],
            colors: vec![[1, 2, 3, 4]],
        };
        let bytes = RawCodec.encode(&sig, &mesh, &[], &QuantizationBudget::default()).unwrap();
        assert_eq!(bytes.len(), 12 + 6 + 6 + 8 + 4);
        assert_eq!(f32::from_le_bytes(bytes[0..4].try_into().unwrap()), 1.0);
        assert_eq!(i16::from_le_bytes(bytes[18..20].try_into().unwrap()), 7);
        assert_eq!(f32::from_le_bytes(bytes[24..28].try_into().unwrap()), 0.5);
        assert_eq!(&bytes[32..36], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_roundtrip_exact() {
        let sig = Signature::mesh(true, true, true);
        let mesh = grid_mesh(5);
        let bytes = RawCodec.encode(&sig, &mesh, &[], &QuantizationBudget::default()).unwrap();
        assert_eq!(bytes.len(), RawCodec::encoded_size(&sig, mesh.nvert(), mesh.nface()));
        let back = RawCodec.decode(&bytes, &sig, &node_for(&mesh)).unwrap();
        assert_eq!(back, mesh);
    }

    #[test]
    fn test_point_cloud() {
        let sig = Signature::mesh(false, true, false);
        let mesh = NodeMesh {
            positions: vec![Vec3::ZERO, Vec3::X],
            colors: vec![[255; 4], [0; 4]],
            ..Default::default()
        };
        let bytes = RawCodec.encode(&sig, &mesh, &[], &QuantizationBudget::default()).unwrap();
        assert_eq!(bytes.len(), 2 * 12 + 2 * 4);
        assert_eq!(RawCodec.decode(&bytes, &sig, &node_for(&mesh)).unwrap(), mesh);
    }

    #[test]
    fn test_short_block() {
        let sig = Signature::mesh(false, false, false);
        let node = Node { nvert: 10, nface: 0, ..Default::default() };
        let err = RawCodec.decode(&[0u8; 100], &sig, &node).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Codec);
    }
}

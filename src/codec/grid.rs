//! Grid codec: positions snapped to a power-of-two grid, every attribute
//! delta coded as zigzag varints, the whole stream deflated.
//!
//! Colors go through YCoCg-R before quantization so luma keeps more bits
//! than chroma.

use super::bits::{write_svarint, write_varint, ByteReader};
use super::quant::{
    dequantize_channel, dequantize_normal, dequantize_position, dequantize_uv, quantize_channel,
    quantize_normal, quantize_position, quantize_uv, rgb_to_ycocg, ycocg_to_rgb,
};
use super::{check_patches, deflate, GeometryCodec, QuantizationBudget};
use crate::format::{Node, Patch, Signature};
use crate::mesh::{NodeMesh, MAX_NODE_VERTICES};
use crate::util::{Error, Result};

const NAME: &str = "grid";
const STREAM_VERSION: u8 = 1;

const HAS_NORMALS: u8 = 0x1;
const HAS_COLORS: u8 = 0x2;
const HAS_TEXCOORDS: u8 = 0x4;

pub(crate) fn attribute_mask(sig: &Signature) -> u8 {
    let mut mask = 0;
    if sig.has_normals() {
        mask |= HAS_NORMALS;
    }
    if sig.has_colors() {
        mask |= HAS_COLORS;
    }
    if sig.has_texcoords() {
        mask |= HAS_TEXCOORDS;
    }
    mask
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GridCodec;

/// Delta coder over fixed-size integer tuples.
struct Deltas<const N: usize> {
    prev: [i64; N],
}

impl<const N: usize> Deltas<N> {
    fn new() -> Self {
        Self { prev: [0; N] }
    }

    fn put(&mut self, buf: &mut Vec<u8>, v: [i64; N]) {
        for i in 0..N {
            write_svarint(buf, v[i].wrapping_sub(self.prev[i]));
        }
        self.prev = v;
    }

    fn take(&mut self, r: &mut ByteReader<'_>) -> Result<[i64; N]> {
        let mut v = [0i64; N];
        for i in 0..N {
            v[i] = self.prev[i].wrapping_add(r.read_svarint()?);
        }
        self.prev = v;
        Ok(v)
    }
}

impl GeometryCodec for GridCodec {
    fn name(&self) -> &'static str {
        NAME
    }

    fn encode(
        &self,
        sig: &Signature,
        mesh: &NodeMesh,
        patches: &[Patch],
        budget: &QuantizationBudget,
    ) -> Result<Vec<u8>> {
        check_patches(NAME, mesh, patches)?;
        let mask = attribute_mask(sig);
        let step = budget.coord_step();

        let mut buf = Vec::with_capacity(16 + mesh.nvert() * 8 + mesh.nface() * 4);
        buf.push(STREAM_VERSION);
        buf.push(mask);
        write_svarint(&mut buf, budget.coord_q as i64);
        write_varint(&mut buf, mesh.nvert() as u64);
        write_varint(&mut buf, mesh.nface() as u64);
        buf.push(budget.normal_bits);
        buf.extend_from_slice(&budget.color_bits);
        buf.push(budget.uv_bits);

        write_varint(&mut buf, patches.len() as u64);
        let mut prev_end = 0;
        for p in patches {
            write_varint(&mut buf, (p.face_offset - prev_end) as u64);
            prev_end = p.face_offset;
        }

        let mut d = Deltas::<3>::new();
        for p in &mesh.positions {
            d.put(&mut buf, quantize_position(NAME, *p, step)?);
        }

        let mut d = Deltas::<1>::new();
        for i in mesh.faces.iter().flatten() {
            d.put(&mut buf, [*i as i64]);
        }

        if mask & HAS_NORMALS != 0 {
            let mut d = Deltas::<3>::new();
            for n in &mesh.normals {
                d.put(&mut buf, n.map(|c| quantize_normal(c, budget.normal_bits) as i64));
            }
        }

        if mask & HAS_COLORS != 0 {
            let [lb, cb0, cb1, ab] = budget.color_bits;
            let mut d = Deltas::<4>::new();
            for c in &mesh.colors {
                let [y, co, cg] = rgb_to_ycocg(c[0], c[1], c[2]);
                d.put(
                    &mut buf,
                    [
                        quantize_channel(y, lb) as i64,
                        quantize_channel(co, cb0) as i64,
                        quantize_channel(cg, cb1) as i64,
                        quantize_channel(c[3] as i32, ab) as i64,
                    ],
                );
            }
        }

        if mask & HAS_TEXCOORDS != 0 {
            let mut d = Deltas::<2>::new();
            for uv in &mesh.texcoords {
                d.put(&mut buf, quantize_uv(NAME, *uv, budget.uv_bits)?);
            }
        }

        deflate::compress(&buf, budget.level)
    }

    fn decode(&self, data: &[u8], sig: &Signature, _node: &Node) -> Result<NodeMesh> {
        let stream = deflate::decompress(NAME, data)?;
        let mut r = ByteReader::new(NAME, &stream);

        let version = r.read_u8()?;
        if version != STREAM_VERSION {
            return Err(Error::codec(NAME, format!("unknown stream version {version}")));
        }
        let mask = r.read_u8()?;
        if mask != attribute_mask(sig) {
            return Err(Error::codec(
                NAME,
                format!("stream attributes {mask:#x} do not match the signature"),
            ));
        }
        let coord_q = r.read_svarint()?;
        if !(-64..=64).contains(&coord_q) {
            return Err(Error::codec(NAME, format!("coordinate exponent {coord_q}")));
        }
        let step = 2f32.powi(coord_q as i32);
        let nvert = r.read_count(MAX_NODE_VERTICES)?;
        let nface = r.read_count(MAX_NODE_VERTICES)?;
        let normal_bits = read_bits(&mut r, 16)?;
        let color_bits = [
            read_bits(&mut r, 8)?,
            read_bits(&mut r, 8)?,
            read_bits(&mut r, 8)?,
            read_bits(&mut r, 8)?,
        ];
        let uv_bits = read_bits(&mut r, 24)?;

        let ngroups = r.read_count(MAX_NODE_VERTICES)?;
        let mut end = 0u64;
        for _ in 0..ngroups {
            end = end
                .checked_add(r.read_varint()?)
                .ok_or_else(|| Error::codec(NAME, "patch end overflows"))?;
            if end > nface as u64 {
                return Err(Error::codec(NAME, format!("patch end {end} beyond {nface} faces")));
            }
        }

        let mut mesh = NodeMesh::default();

        let mut d = Deltas::<3>::new();
        mesh.positions.reserve(nvert);
        for _ in 0..nvert {
            mesh.positions.push(dequantize_position(d.take(&mut r)?, step));
        }

        let mut d = Deltas::<1>::new();
        mesh.faces.reserve(nface);
        for _ in 0..nface {
            let mut f = [0u16; 3];
            for slot in &mut f {
                let [i] = d.take(&mut r)?;
                if i < 0 || i as usize >= nvert {
                    return Err(Error::codec(NAME, format!("face index {i} beyond {nvert} vertices")));
                }
                *slot = i as u16;
            }
            mesh.faces.push(f);
        }

        if mask & HAS_NORMALS != 0 {
            let mut d = Deltas::<3>::new();
            mesh.normals.reserve(nvert);
            for _ in 0..nvert {
                let q = d.take(&mut r)?;
                mesh.normals.push(q.map(|c| dequantize_normal(c as i32, normal_bits)));
            }
        }

        if mask & HAS_COLORS != 0 {
            let [lb, cb0, cb1, ab] = color_bits;
            let mut d = Deltas::<4>::new();
            mesh.colors.reserve(nvert);
            for _ in 0..nvert {
                let [y, co, cg, a] = d.take(&mut r)?;
                let [red, green, blue] = ycocg_to_rgb(
                    dequantize_channel(y as i32, lb),
                    dequantize_channel(co as i32, cb0),
                    dequantize_channel(cg as i32, cb1),
                );
                let alpha = dequantize_channel(a as i32, ab).clamp(0, 255) as u8;
                mesh.colors.push([red, green, blue, alpha]);
            }
        }

        if mask & HAS_TEXCOORDS != 0 {
            let mut d = Deltas::<2>::new();
            mesh.texcoords.reserve(nvert);
            for _ in 0..nvert {
                mesh.texcoords.push(dequantize_uv(d.take(&mut r)?, uv_bits));
            }
        }

        if !r.rest().is_empty() {
            return Err(Error::codec(
                NAME,
                format!("{} trailing bytes after mesh at {}", r.rest().len(), r.position()),
            ));
        }
        Ok(mesh)
    }
}

fn read_bits(r: &mut ByteReader<'_>, max: u8) -> Result<u8> {
    let b = r.read_u8()?;
    if b == 0 || b > max {
        return Err(Error::codec(NAME, format!("quantization bits {b} outside 1..={max}")));
    }
    Ok(b)
}

//! Packed codec: every attribute quantized to a fixed bit width relative to
//! its minimum, bit-packed, then lz4-compressed.
//!
//! Block frame: `[payload_len: u32 LE][lz4 block with prepended size]`.
//! The length prefix lets trailing block padding be cut off before lz4 sees it.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::bits::{bits_for, BitReader, BitWriter};
use super::grid::attribute_mask;
use super::quant::{
    dequantize_channel, dequantize_normal, dequantize_position, dequantize_uv, quantize_channel,
    quantize_normal, quantize_position, quantize_uv,
};
use super::{check_patches, GeometryCodec, QuantizationBudget};
use crate::format::{Node, Patch, Signature};
use crate::mesh::{NodeMesh, MAX_NODE_VERTICES};
use crate::util::{Error, Result};

const NAME: &str = "packed";
const STREAM_VERSION: u8 = 1;

#[derive(Debug, Clone, Copy, Default)]
pub struct PackedCodec;

/// Per-axis minimum and bit width of a quantized column.
fn column_range<const N: usize>(values: &[[i64; N]]) -> ([i64; N], [u8; N]) {
    let mut min = [i64::MAX; N];
    let mut max = [i64::MIN; N];
    for v in values {
        for i in 0..N {
            min[i] = min[i].min(v[i]);
            max[i] = max[i].max(v[i]);
        }
    }
    if values.is_empty() {
        return ([0; N], [0; N]);
    }
    let mut width = [0u8; N];
    for i in 0..N {
        width[i] = bits_for(max[i].wrapping_sub(min[i]) as u64) as u8;
    }
    (min, width)
}

fn write_range<const N: usize>(w: &mut Vec<u8>, min: &[i64; N], width: &[u8; N]) -> Result<()> {
    for m in min {
        w.write_i64::<LittleEndian>(*m)?;
    }
    w.extend_from_slice(width);
    Ok(())
}

fn read_range<const N: usize>(r: &mut &[u8]) -> Result<([i64; N], [u8; N])> {
    let mut min = [0i64; N];
    r.read_i64_into::<LittleEndian>(&mut min)?;
    let mut width = [0u8; N];
    std::io::Read::read_exact(r, &mut width)?;
    if let Some(w) = width.iter().find(|&&w| w > 64) {
        return Err(Error::codec(NAME, format!("column width {w}")));
    }
    Ok((min, width))
}

impl GeometryCodec for PackedCodec {
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
        let rgb_bits = budget.color_bits[0].max(budget.color_bits[1]);
        let alpha_bits = budget.color_bits[3];

        let positions = mesh
            .positions
            .iter()
            .map(|p| quantize_position(NAME, *p, step))
            .collect::<Result<Vec<_>>>()?;
        let (pos_min, pos_width) = column_range(&positions);

        let uvs = if sig.has_texcoords() {
            mesh.texcoords
                .iter()
                .map(|uv| quantize_uv(NAME, *uv, budget.uv_bits))
                .collect::<Result<Vec<_>>>()?
        } else {
            Vec::new()
        };
        let (uv_min, uv_width) = column_range(&uvs);

        let mut head = Vec::with_capacity(96 + patches.len() * 4);
        head.write_u8(STREAM_VERSION)?;
        head.write_u8(mask)?;
        head.write_i32::<LittleEndian>(budget.coord_q)?;
        head.write_u16::<LittleEndian>(mesh.nvert() as u16)?;
        head.write_u16::<LittleEndian>(mesh.nface() as u16)?;
        head.write_u8(budget.normal_bits)?;
        head.write_u8(rgb_bits)?;
        head.write_u8(alpha_bits)?;
        head.write_u8(budget.uv_bits)?;
        head.write_u32::<LittleEndian>(patches.len() as u32)?;
        for p in patches {
            head.write_u32::<LittleEndian>(p.face_offset)?;
        }
        write_range(&mut head, &pos_min, &pos_width)?;
        write_range(&mut head, &uv_min, &uv_width)?;

        let mut bits = BitWriter::new();
        for q in &positions {
            for i in 0..3 {
                bits.write(q[i].wrapping_sub(pos_min[i]) as u64, pos_width[i] as u32);
            }
        }
        let index_width = bits_for(mesh.nvert().saturating_sub(1) as u64);
        for i in mesh.faces.iter().flatten() {
            bits.write(*i as u64, index_width);
        }
        if sig.has_normals() {
            let nb = budget.normal_bits;
            let bias = 1i32 << (nb - 1);
            for n in &mesh.normals {
                for c in n {
                    bits.write((quantize_normal(*c, nb) + bias) as u64, nb as u32);
                }
            }
        }
        if sig.has_colors() {
            for c in &mesh.colors {
                for ch in &c[..3] {
                    bits.write(quantize_channel(*ch as i32, rgb_bits) as u64, rgb_bits as u32);
                }
                bits.write(quantize_channel(c[3] as i32, alpha_bits) as u64, alpha_bits as u32);
            }
        }
        for q in &uvs {
            for i in 0..2 {
                bits.write(q[i].wrapping_sub(uv_min[i]) as u64, uv_width[i] as u32);
            }
        }

        head.extend_from_slice(&bits.finish());
        let packed = lz4_flex::compress_prepend_size(&head);
        let mut out = Vec::with_capacity(4 + packed.len());
        out.write_u32::<LittleEndian>(packed.len() as u32)?;
        out.extend_from_slice(&packed);
        Ok(out)
    }

    fn decode(&self, data: &[u8], sig: &Signature, _node: &Node) -> Result<NodeMesh> {
        let mut r = data;
        let len = r.read_u32::<LittleEndian>()? as usize;
        if len > r.len() {
            return Err(Error::codec(NAME, format!("payload of {len} bytes, block has {}", r.len())));
        }
        let stream = lz4_flex::decompress_size_prepended(&r[..len])
            .map_err(|e| Error::codec(NAME, e.to_string()))?;
        let mut r = stream.as_slice();

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
        let coord_q = r.read_i32::<LittleEndian>()?;
        if !(-64..=64).contains(&coord_q) {
            return Err(Error::codec(NAME, format!("coordinate exponent {coord_q}")));
        }
        let step = 2f32.powi(coord_q);
        let nvert = r.read_u16::<LittleEndian>()? as usize;
        let nface = r.read_u16::<LittleEndian>()? as usize;
        let normal_bits = r.read_u8()?;
        let rgb_bits = r.read_u8()?;
        let alpha_bits = r.read_u8()?;
        let uv_bits = r.read_u8()?;
        if !(1..=16).contains(&normal_bits)
            || !(1..=8).contains(&rgb_bits)
            || !(1..=8).contains(&alpha_bits)
            || !(1..=24).contains(&uv_bits)
        {
            return Err(Error::codec(NAME, "quantization bits out of range"));
        }

        let npatch = r.read_u32::<LittleEndian>()? as usize;
        if npatch > MAX_NODE_VERTICES {
            return Err(Error::codec(NAME, format!("{npatch} patches")));
        }
        let mut prev = 0;
        for _ in 0..npatch {
            let end = r.read_u32::<LittleEndian>()?;
            if end < prev || end as usize > nface {
                return Err(Error::codec(NAME, format!("patch end {end} out of order or beyond {nface}")));
            }
            prev = end;
        }
        let (pos_min, pos_width) = read_range::<3>(&mut r)?;
        let (uv_min, uv_width) = read_range::<2>(&mut r)?;

        let mut bits = BitReader::new(NAME, r);
        let mut mesh = NodeMesh::default();

        mesh.positions.reserve(nvert);
        for _ in 0..nvert {
            let mut q = [0i64; 3];
            for i in 0..3 {
                q[i] = pos_min[i].wrapping_add(bits.read(pos_width[i] as u32)? as i64);
            }
            mesh.positions.push(dequantize_position(q, step));
        }

        let index_width = bits_for(nvert.saturating_sub(1) as u64);
        mesh.faces.reserve(nface);
        for _ in 0..nface {
            let mut f = [0u16; 3];
            for slot in &mut f {
                let i = bits.read(index_width)?;
                if i as usize >= nvert {
                    return Err(Error::codec(NAME, format!("face index {i} beyond {nvert} vertices")));
                }
                *slot = i as u16;
            }
            mesh.faces.push(f);
        }

        if sig.has_normals() {
            let bias = 1i64 << (normal_bits - 1);
            mesh.normals.reserve(nvert);
            for _ in 0..nvert {
                let mut n = [0i16; 3];
                for c in &mut n {
                    let q = bits.read(normal_bits as u32)? as i64 - bias;
                    *c = dequantize_normal(q as i32, normal_bits);
                }
                mesh.normals.push(n);
            }
        }

        if sig.has_colors() {
            mesh.colors.reserve(nvert);
            for _ in 0..nvert {
                let mut c = [0u8; 4];
                for ch in &mut c[..3] {
                    let q = bits.read(rgb_bits as u32)? as i32;
                    *ch = dequantize_channel(q, rgb_bits).clamp(0, 255) as u8;
                }
                let q = bits.read(alpha_bits as u32)? as i32;
                c[3] = dequantize_channel(q, alpha_bits).clamp(0, 255) as u8;
                mesh.colors.push(c);
            }
        }

        if sig.has_texcoords() {
            mesh.texcoords.reserve(nvert);
            for _ in 0..nvert {
                let mut q = [0i64; 2];
                for i in 0..2 {
                    q[i] = uv_min[i].wrapping_add(bits.read(uv_width[i] as u32)? as i64);
                }
                mesh.texcoords.push(dequantize_uv(q, uv_bits));
            }
        }

        Ok(mesh)
    }
}

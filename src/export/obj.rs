//! Wavefront OBJ/MTL text for one decoded node.

use std::fmt::Write;

use crate::format::{Material, MaterialType, Patch, Signature};
use crate::mesh::NodeMesh;
use crate::util::{Mat3, Mat4, Vec3};

/// Name of the OBJ material used by a patch, `None` when the patch has
/// neither texture nor material.
pub(crate) fn material_name(prefix: &str, patch: &Patch) -> Option<String> {
    if patch.texture().is_none() && patch.material().is_none() {
        return None;
    }
    let id = |v: Option<u32>| v.map_or_else(|| "x".to_string(), |v| v.to_string());
    Some(format!("{prefix}_{}_{}", id(patch.texture()), id(patch.material())))
}

/// File name an extracted texture gets.
pub(crate) fn texture_file(prefix: &str, texture: u32, extension: &str) -> String {
    format!("{prefix}_{texture}_tex.{extension}")
}

/// Vertex reference of one face corner.
fn corner(out: &mut String, index: usize, uv: bool, normal: bool) {
    let _ = match (uv, normal) {
        (true, true) => write!(out, "{index}/{index}/{index}"),
        (true, false) => write!(out, "{index}/{index}"),
        (false, true) => write!(out, "{index}//{index}"),
        (false, false) => write!(out, "{index}"),
    };
}

fn faces(out: &mut String, mesh: &NodeMesh, range: std::ops::Range<usize>, base: usize, sig: &Signature) {
    let uv = sig.has_texcoords();
    let normal = sig.has_normals();
    for face in &mesh.faces[range] {
        out.push('f');
        for &i in face {
            out.push(' ');
            corner(out, base + i as usize + 1, uv, normal);
        }
        out.push('\n');
    }
}

/// Append one copy of `mesh` transformed by `transform`. `base` is the
/// number of vertices already written to the file.
#[allow(clippy::too_many_arguments)]
pub(crate) fn write_object(
    out: &mut String,
    name: &str,
    prefix: &str,
    sig: &Signature,
    mesh: &NodeMesh,
    patches: &[Patch],
    first_patch: usize,
    transform: Mat4,
    base: usize,
) {
    let _ = writeln!(out, "o {name}");
    for p in &mesh.positions {
        let v = transform.transform_point3(*p);
        let _ = writeln!(out, "v {:.6} {:.6} {:.6}", v.x, v.y, v.z);
    }
    let _ = writeln!(out, "# {} vertices", mesh.nvert());

    if sig.has_normals() {
        let normal_matrix = Mat3::from_mat4(transform).inverse().transpose();
        for n in &mesh.normals {
            let v = Vec3::new(n[0] as f32, n[1] as f32, n[2] as f32) / i16::MAX as f32;
            let v = (normal_matrix * v).normalize_or_zero();
            let _ = writeln!(out, "vn {:.6} {:.6} {:.6}", v.x, v.y, v.z);
        }
    }
    if sig.has_texcoords() {
        for t in &mesh.texcoords {
            let _ = writeln!(out, "vt {:.6} {:.6}", t.x, t.y);
        }
    }

    let nface = mesh.nface();
    let mut start = 0;
    for (i, patch) in patches.iter().enumerate() {
        let end = (patch.face_offset as usize).min(nface);
        let _ = writeln!(out, "g patch-{}", first_patch + i);
        if let Some(mtl) = material_name(prefix, patch) {
            let _ = writeln!(out, "usemtl {mtl}");
        }
        faces(out, mesh, start..end.max(start), base, sig);
        start = end.max(start);
    }
    if start < nface {
        faces(out, mesh, start..nface, base, sig);
    }
}

pub(crate) fn obj_header(out: &mut String, prefix: &str) {
    out.push_str("# Wavefront OBJ file\n");
    let _ = writeln!(out, "mtllib {prefix}.mtl");
}

fn rgb(c: [u8; 3]) -> String {
    format!(
        "{:.6} {:.6} {:.6}",
        c[0] as f32 / 255.0,
        c[1] as f32 / 255.0,
        c[2] as f32 / 255.0
    )
}

/// MTL text with one entry per distinct texture/material pair.
pub(crate) fn write_mtl(
    out: &mut String,
    prefix: &str,
    patches: &[Patch],
    materials: &[Material],
    texture_extension: Option<&str>,
) {
    out.push_str("# Wavefront material file\n");
    let mut seen: Vec<String> = Vec::new();
    for patch in patches {
        let Some(name) = material_name(prefix, patch) else {
            continue;
        };
        if seen.contains(&name) {
            continue;
        }
        let _ = writeln!(out, "newmtl {name}");
        match patch.material().and_then(|m| materials.get(m as usize)) {
            Some(mat) => {
                let _ = writeln!(out, "Kd {}", rgb(mat.color));
                let _ = writeln!(out, "d {:.6}", mat.opacity);
                match mat.kind {
                    MaterialType::Lambert | MaterialType::Phong => {
                        let _ = writeln!(out, "Ka {}", rgb(mat.ambient));
                    }
                    _ => out.push_str("Ka 0.000000 0.000000 0.000000\n"),
                }
                if mat.kind == MaterialType::Phong {
                    let _ = writeln!(out, "Ks {}", rgb(mat.specular));
                    let _ = writeln!(out, "Ns {:.6}", mat.shininess);
                } else {
                    out.push_str("Ks 0.000000 0.000000 0.000000\nNs 8.000000\n");
                }
                if mat.emissive != [0; 3] {
                    let _ = writeln!(out, "Ke {}", rgb(mat.emissive));
                }
                if mat.kind == MaterialType::Pbr {
                    let _ = writeln!(out, "Pm {:.6}", mat.metallic);
                    let _ = writeln!(out, "Pr {:.6}", mat.roughness);
                }
            }
            None => {
                out.push_str("Ka 0.000000 0.000000 0.000000\n");
                out.push_str("Kd 1.000000 1.000000 1.000000\n");
                out.push_str("Ks 0.000000 0.000000 0.000000\n");
                out.push_str("Ns 8.000000\n");
            }
        }
        out.push_str("illum 2\n");
        if let (Some(t), Some(ext)) = (patch.texture(), texture_extension) {
            let _ = writeln!(out, "map_Kd {}", texture_file(prefix, t, ext));
        }
        seen.push(name);
    }
}

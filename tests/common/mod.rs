//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use image::{Rgba, RgbaImage};
use lodm::format::{Feature, Material, MaterialType, Node, Patch, Signature, Texture, NONE};
use lodm::util::{Vec2, Vec3};
use lodm::{Archive, NodeMesh};

/// A wavy `n`x`n` quad grid offset by `origin`, with exactly the attributes
/// `sig` declares.
pub fn grid(n: usize, origin: Vec3, sig: &Signature) -> NodeMesh {
    let mut m = NodeMesh::default();
    for y in 0..=n {
        for x in 0..=n {
            let (fx, fy) = (x as f32 / n as f32, y as f32 / n as f32);
            m.positions
                .push(origin + Vec3::new(fx * 10.0, fy * 10.0, (fx * 6.0).sin() * (fy * 4.0).cos()));
            if sig.has_normals() {
                m.normals.push([(fx * 8000.0) as i16, -(fy * 8000.0) as i16, 30000]);
            }
            if sig.has_texcoords() {
                m.texcoords.push(Vec2::new(fx, 1.0 - fy));
            }
            if sig.has_colors() {
                m.colors.push([(x * 255 / n) as u8, (y * 255 / n) as u8, 64, 255]);
            }
        }
    }
    let row = n + 1;
    for y in 0..n {
        for x in 0..n {
            let i = (y * row + x) as u16;
            let r = row as u16;
            m.faces.push([i, i + 1, i + r]);
            m.faces.push([i + 1, i + r + 1, i + r]);
        }
    }
    m
}

pub fn patch(node: u32, face_offset: u32, texture: u32, material: u32, feature: u32) -> Patch {
    Patch { node, face_offset, texture, material, feature }
}

pub fn checker(size: u32) -> RgbaImage {
    RgbaImage::from_fn(size, size, |x, y| {
        if (x / 8 + y / 8) % 2 == 0 {
            Rgba([230, 40, 40, 255])
        } else {
            Rgba([20, 20, 200, 255])
        }
    })
}

/// Three nodes in a small LOD chain: node 0 refines into node 2, node 1
/// refines into node 2, node 2 is a leaf. Node 0 carries two patches, one
/// textured, one with a feature.
pub fn chain(sig: Signature) -> Archive {
    let mut a = Archive::new(sig, None).unwrap();
    if sig.has_ptextures() {
        a.push_texture(Texture::default(), checker(64)).unwrap();
    }
    a.push_material(Material {
        kind: MaterialType::Phong,
        color: [200, 180, 20],
        ..Default::default()
    })
    .unwrap();
    a.push_feature(Feature { id: 42, ..Default::default() }, b"roof".to_vec()).unwrap();

    let tex = if sig.has_ptextures() { 0 } else { NONE };
    let m0 = grid(4, Vec3::ZERO, &sig);
    let m1 = grid(3, Vec3::new(10.0, 0.0, 0.0), &sig);
    let m2 = grid(6, Vec3::new(0.0, 10.0, 0.0), &sig);
    a.push_node(
        Node { error: 4.0, ..Default::default() },
        m0,
        vec![patch(2, 20, tex, 0, NONE), patch(2, 32, NONE, NONE, 0)],
    )
    .unwrap();
    a.push_node(Node { error: 4.0, ..Default::default() }, m1, vec![patch(2, 18, NONE, 0, NONE)])
        .unwrap();
    a.push_node(Node { error: 1.0, ..Default::default() }, m2, vec![patch(3, 72, NONE, NONE, NONE)])
        .unwrap();
    a
}

pub fn max_position_error(a: &NodeMesh, b: &NodeMesh) -> f32 {
    a.positions
        .iter()
        .zip(&b.positions)
        .map(|(p, q)| (*p - *q).abs().max_element())
        .fold(0.0, f32::max)
}

//! Export of decoded nodes to Wavefront OBJ/MTL plus texture files.
//!
//! Everything here works on already loaded payloads; nothing is read from
//! the archive source. Unloaded meshes or textures are reported as missing.

mod obj;

use std::fs;
use std::path::Path;

use crate::archive::Archive;
use crate::codec::texture;
use crate::format::Patch;
use crate::mesh::NodeMesh;
use crate::util::{Error, Mat4, Result};

/// What [`extract`] wrote.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportStats {
    pub nodes: usize,
    pub instances: usize,
    pub textures: usize,
}

impl ExportStats {
    pub fn total(&self) -> usize {
        self.nodes + self.instances + self.textures
    }
}

fn node_prefix(n: usize) -> String {
    format!("node_{n}")
}

fn instance_prefix(n: usize) -> String {
    format!("instance_{n}")
}

fn loaded_node(archive: &Archive, n: usize) -> Result<&NodeMesh> {
    archive.node(n)?;
    archive
        .node_mesh(n)
        .ok_or(Error::MissingPayload { table: "node", index: n })
}

/// OBJ text of node `n`.
pub fn node_obj(archive: &Archive, n: usize) -> Result<String> {
    let mesh = loaded_node(archive, n)?;
    let range = archive.node_patch_range(n)?;
    let prefix = node_prefix(n);
    let mut out = String::new();
    obj::obj_header(&mut out, &prefix);
    obj::write_object(
        &mut out,
        &prefix,
        &prefix,
        archive.signature(),
        mesh,
        &archive.patches()[range.clone()],
        range.start,
        Mat4::IDENTITY,
        0,
    );
    Ok(out)
}

/// MTL text of node `n`.
pub fn node_mtl(archive: &Archive, n: usize) -> Result<String> {
    let patches = archive.node_patches(n)?;
    Ok(mtl(archive, &node_prefix(n), patches))
}

/// OBJ text of instance node `n`: one object per placement, with the shared
/// mesh transformed by that placement. An instance node without placements
/// yields the untransformed mesh once.
pub fn instance_obj(archive: &Archive, n: usize) -> Result<String> {
    archive.instance_node(n)?;
    let inst = archive
        .instance_mesh(n)
        .ok_or(Error::MissingPayload { table: "instance node", index: n })?;
    let range = archive.instance_patch_range(n)?;
    let patches = &archive.patches()[range.clone()];
    let prefix = instance_prefix(n);
    let mut placements: Vec<(String, Mat4)> = inst
        .instances
        .iter()
        .map(|i| (format!("{prefix}_{}", i.id), i.placement.to_matrix()))
        .collect();
    if placements.is_empty() {
        placements.push((prefix.clone(), Mat4::IDENTITY));
    }

    let mut out = String::new();
    obj::obj_header(&mut out, &prefix);
    for (k, (name, transform)) in placements.iter().enumerate() {
        obj::write_object(
            &mut out,
            name,
            &prefix,
            archive.signature(),
            &inst.mesh,
            patches,
            range.start,
            *transform,
            k * inst.mesh.nvert(),
        );
    }
    Ok(out)
}

pub fn instance_mtl(archive: &Archive, n: usize) -> Result<String> {
    let patches = archive.instance_patches(n)?;
    Ok(mtl(archive, &instance_prefix(n), patches))
}

fn mtl(archive: &Archive, prefix: &str, patches: &[Patch]) -> String {
    let format = archive.signature().texture_format().ok().flatten();
    let mut out = String::new();
    obj::write_mtl(
        &mut out,
        prefix,
        patches,
        archive.materials(),
        format.map(|f| f.extension()),
    );
    out
}

/// Write the textures referenced by `patches` next to the OBJ files.
fn write_textures(archive: &Archive, dir: &Path, prefix: &str, patches: &[Patch]) -> Result<usize> {
    let Some(format) = archive.signature().texture_format()? else {
        return Ok(0);
    };
    let mut written: Vec<u32> = Vec::new();
    for t in patches.iter().filter_map(Patch::texture) {
        if written.contains(&t) {
            continue;
        }
        let image = archive
            .texture_image(t as usize)
            .ok_or(Error::MissingPayload { table: "texture", index: t as usize })?;
        let bytes = texture::encode_image(format, image)?;
        fs::write(dir.join(obj::texture_file(prefix, t, format.extension())), bytes)?;
        written.push(t);
    }
    Ok(written.len())
}

/// Write `node_<n>.obj`, `node_<n>.mtl` and the referenced textures for
/// every node, then the same with `instance_<n>` for every instance node.
#[tracing::instrument(skip_all)]
pub fn extract(archive: &Archive, dir: impl AsRef<Path>) -> Result<ExportStats> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let mut stats = ExportStats::default();

    for n in 0..archive.node_count() {
        let prefix = node_prefix(n);
        fs::write(dir.join(format!("{prefix}.obj")), node_obj(archive, n)?)?;
        fs::write(dir.join(format!("{prefix}.mtl")), node_mtl(archive, n)?)?;
        stats.textures += write_textures(archive, dir, &prefix, archive.node_patches(n)?)?;
        stats.nodes += 1;
    }
    for n in 0..archive.instance_node_count() {
        let prefix = instance_prefix(n);
        fs::write(dir.join(format!("{prefix}.obj")), instance_obj(archive, n)?)?;
        fs::write(dir.join(format!("{prefix}.mtl")), instance_mtl(archive, n)?)?;
        stats.textures += write_textures(archive, dir, &prefix, archive.instance_patches(n)?)?;
        stats.instances += 1;
    }

    tracing::debug!(dir = %dir.display(), files = stats.total(), "extracted");
    Ok(stats)
}

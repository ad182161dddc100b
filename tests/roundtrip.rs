//! Save an archive, reopen it and compare what comes back.

mod common;

use common::{chain, max_position_error};
use lodm::format::{Signature, SignatureFlags, CURRENT_VERSION, MAGIC, PADDING};
use lodm::{Archive, CompressSetting, OpenOptions};

fn saved(sig: Signature) -> (tempfile::TempDir, std::path::PathBuf, Archive) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.lodm");
    let mut built = chain(sig);
    built.save(&path).unwrap();
    (dir, path, built)
}

#[test]
fn test_raw_roundtrip_exact() {
    let sig = Signature::mesh(true, true, true).with_flags(SignatureFlags::PTPNG);
    let (_dir, path, built) = saved(sig);

    let mut a = Archive::open(&path).unwrap();
    let h = a.header();
    assert_eq!(h.magic, MAGIC);
    assert_eq!(h.version, CURRENT_VERSION);
    assert_eq!(h.n_nodes, 4);
    assert_eq!(h.n_instance_nodes, 1);
    assert_eq!(h.n_patches, 4);
    assert_eq!(h.n_textures, 2);
    assert_eq!(h.n_materials, 1);
    assert_eq!(h.n_features, 2);
    assert_eq!(h.nvert, 25 + 16 + 49);
    assert_eq!(h.nface, 32 + 18 + 72);
    assert_eq!(a.signature(), built.signature());
    assert_eq!(a.sphere(), built.sphere());
    assert_eq!(a.nroots(), 2);
    assert_eq!(a.codec().name(), "raw");

    a.load_all().unwrap();
    for n in 0..3 {
        assert_eq!(a.node_mesh(n), built.node_mesh(n), "node {n}");
        assert_eq!(a.nodes()[n].nface, built.nodes()[n].nface);
        assert_eq!(a.nodes()[n].error, built.nodes()[n].error);
    }
    assert_eq!(a.texture_image(0), built.texture_image(0));
    assert_eq!(a.materials(), built.materials());
    assert_eq!(a.features()[0].id, 42);
}

#[test]
fn test_blocks_are_aligned() {
    let sig = Signature::mesh(true, false, true).with_flags(SignatureFlags::PTJPG);
    let (_dir, path, _) = saved(sig);
    let a = Archive::open(&path).unwrap();

    let mut prev_end = 0;
    for n in 0..a.node_count() {
        let (start, end) = a.node_block_range(n).unwrap();
        assert_eq!(start % PADDING, 0);
        assert_eq!(end % PADDING, 0);
        assert!(start >= prev_end);
        prev_end = end;
    }
    let (tex_start, tex_end) = a.texture_block_range(0).unwrap();
    assert!(tex_start >= prev_end);
    let (feat_start, feat_end) = a.feature_block_range(0).unwrap();
    assert!(feat_start >= tex_end);
    assert_eq!(feat_end - feat_start, PADDING);
    assert_eq!(std::fs::metadata(&path).unwrap().len(), feat_end);
}

#[test]
fn test_patch_ranges_are_contiguous() {
    let sig = Signature::mesh(false, false, false);
    let (_dir, path, _) = saved(sig);
    let a = Archive::open(&path).unwrap();
    let mut next = 0;
    for n in 0..a.node_count() {
        let range = a.node_patch_range(n).unwrap();
        assert_eq!(range.start, next);
        next = range.end;
    }
    assert_eq!(next, a.patches().len());
}

fn compressed_roundtrip(flag: SignatureFlags) {
    let sig = Signature::mesh(true, true, true).with_flags(flag | SignatureFlags::PTPNG);
    let (_dir, path, built) = saved(sig);
    let budget = CompressSetting::default().resolve(&built.sphere());

    let mut a = Archive::open(&path).unwrap();
    a.load_all().unwrap();
    for n in 0..a.node_count() {
        let orig = built.node_mesh(n).unwrap();
        let back = a.node_mesh(n).unwrap();
        assert_eq!(back.nvert(), orig.nvert());
        assert_eq!(back.faces, orig.faces);
        assert_eq!(a.nodes()[n].nface as usize, orig.nface());
        assert!(max_position_error(orig, back) <= budget.coord_step() * 0.5 + 1e-5);
        for (p, q) in orig.normals.iter().zip(&back.normals) {
            for i in 0..3 {
                assert!((p[i] as i32 - q[i] as i32).abs() <= 64, "{p:?} vs {q:?}");
            }
        }
        for (p, q) in orig.colors.iter().zip(&back.colors) {
            for i in 0..4 {
                assert!((p[i] as i32 - q[i] as i32).abs() <= 16, "{p:?} vs {q:?}");
            }
        }
        for (p, q) in orig.texcoords.iter().zip(&back.texcoords) {
            assert!((*p - *q).abs().max_element() <= budget.uv_step() * 0.5 + 1e-6);
        }
    }
}

#[test]
fn test_grid_codec_roundtrip() {
    compressed_roundtrip(SignatureFlags::CORTO);
}

#[test]
fn test_packed_codec_roundtrip() {
    compressed_roundtrip(SignatureFlags::DRACO);
}

#[test]
fn test_compressed_is_smaller() {
    let (_raw_dir, raw, _) = saved(Signature::mesh(true, true, true));
    let (_grid_dir, grid, _) = saved(Signature::mesh(true, true, true).with_flags(SignatureFlags::CORTO));
    let (_packed_dir, packed, _) = saved(Signature::mesh(true, true, true).with_flags(SignatureFlags::DRACO));
    let size = |p: &std::path::Path| std::fs::metadata(p).unwrap().len();
    assert!(size(&grid) < size(&raw));
    assert!(size(&packed) < size(&raw));
}

#[test]
fn test_resave_is_stable() {
    let sig = Signature::mesh(true, true, true).with_flags(SignatureFlags::PTPNG);
    let (dir, path, _) = saved(sig);
    let copy = dir.path().join("copy.lodm");

    let mut a = Archive::open(&path).unwrap();
    a.save(&copy).unwrap();
    assert!(!a.is_open());
    assert_eq!(std::fs::read(&path).unwrap(), std::fs::read(&copy).unwrap());
}

#[test]
fn test_repack_changes_codec() {
    let sig = Signature::mesh(true, true, true).with_flags(SignatureFlags::PTPNG);
    let (dir, path, built) = saved(sig);
    let out = dir.path().join("packed.lodm");

    let mut a = Archive::open(&path).unwrap();
    a.detach().unwrap();
    a.set_codec_flags(SignatureFlags::DRACO, SignatureFlags::PTJPG).unwrap();
    a.save(&out).unwrap();

    let mut b = Archive::open(&out).unwrap();
    assert_eq!(b.codec().name(), "packed");
    assert!(b.signature().flags.contains(SignatureFlags::PTJPG));
    b.load_all().unwrap();
    assert_eq!(b.node_mesh(2).unwrap().faces, built.node_mesh(2).unwrap().faces);
    assert_eq!(b.texture_image(0).unwrap().dimensions(), (64, 64));
}

#[test]
fn test_rejected_repack_still_saves_readable_file() {
    let sig = Signature::mesh(true, true, true).with_flags(SignatureFlags::CORTO | SignatureFlags::PTPNG);
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("kept.lodm");

    let mut a = chain(sig);
    assert!(a
        .set_codec_flags(SignatureFlags::DRACO, SignatureFlags::PTJPG | SignatureFlags::PTPNG)
        .is_err());
    a.save(&out).unwrap();

    let mut b = Archive::open(&out).unwrap();
    assert_eq!(b.codec().name(), "grid");
    assert_eq!(b.signature().flags, sig.flags);
    b.load_all().unwrap();
    assert_eq!(b.node_mesh(0).unwrap().faces, a.node_mesh(0).unwrap().faces);
}

#[test]
fn test_stream_and_mmap_agree() {
    let sig = Signature::mesh(true, false, false).with_flags(SignatureFlags::CORTO);
    let (_dir, path, _) = saved(sig);

    let mut streamed = Archive::open_opts(&path, OpenOptions { use_mmap: false }).unwrap();
    assert!(!streamed.source().unwrap().is_mapped());
    streamed.load_all().unwrap();

    let mut default = Archive::open(&path).unwrap();
    default.load_all().unwrap();
    for n in 0..3 {
        assert_eq!(streamed.node_mesh(n), default.node_mesh(n));
    }
}

#[test]
fn test_from_reader() {
    let sig = Signature::mesh(false, true, false);
    let (_dir, path, built) = saved(sig);
    let bytes = std::fs::read(&path).unwrap();

    let mut a = Archive::from_reader(std::io::Cursor::new(bytes)).unwrap();
    assert!(a.path().is_none());
    a.load_all().unwrap();
    assert_eq!(a.node_mesh(1), built.node_mesh(1));
}

#[test]
fn test_setting_from_json_applies() {
    let sig = Signature::mesh(false, false, false).with_flags(SignatureFlags::CORTO);
    let dir = tempfile::tempdir().unwrap();
    let coarse_path = dir.path().join("coarse.lodm");
    let fine_path = dir.path().join("fine.lodm");

    let mut coarse = chain(sig);
    coarse.set_setting(CompressSetting::from_json_str(r#"{"coord_bits": 6}"#).unwrap());
    coarse.save(&coarse_path).unwrap();
    let mut fine = chain(sig);
    fine.set_setting(CompressSetting::from_json_str(r#"{"coord_bits": 18}"#).unwrap());
    fine.save(&fine_path).unwrap();

    let built = chain(sig);
    let mut c = Archive::open(&coarse_path).unwrap();
    let mut f = Archive::open(&fine_path).unwrap();
    c.load_node(2).unwrap();
    f.load_node(2).unwrap();
    let orig = built.node_mesh(2).unwrap();
    let coarse_err = max_position_error(orig, c.node_mesh(2).unwrap());
    let fine_err = max_position_error(orig, f.node_mesh(2).unwrap());
    assert!(fine_err < coarse_err, "{fine_err} vs {coarse_err}");
}

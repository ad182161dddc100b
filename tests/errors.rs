//! Failure modes of open, load and save.

mod common;

use std::io::Write;

use common::{chain, grid};
use lodm::format::{Header, Node, Signature, SignatureFlags, HEADER_SIZE};
use lodm::util::Vec3;
use lodm::{Archive, Error, ErrorKind};

fn saved(sig: Signature) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.lodm");
    chain(sig).save(&path).unwrap();
    (dir, path)
}

#[test]
fn test_bad_magic() {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(&[0x55u8; 1024]).unwrap();
    let err = Archive::open(tmp.path()).unwrap_err();
    assert!(matches!(err, Error::InvalidMagic(0x5555_5555)));
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn test_unsupported_version() {
    let mut header = Header::new(Signature::mesh(false, false, false));
    header.version = 7;
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(&header.to_bytes().unwrap()).unwrap();
    let err = Archive::open(tmp.path()).unwrap_err();
    assert!(matches!(err, Error::UnsupportedVersion(7)));
}

#[test]
fn test_short_file() {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(&[0u8; 100]).unwrap();
    assert_eq!(Archive::open(tmp.path()).unwrap_err().kind(), ErrorKind::Io);
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Archive::open(dir.path().join("nope.lodm")).unwrap_err();
    assert!(matches!(err, Error::FileNotFound(_)));
}

#[test]
fn test_index_truncated() {
    let (_dir, path) = saved(Signature::mesh(false, false, false));
    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..HEADER_SIZE + 30]).unwrap();
    let err = Archive::open(&path).unwrap_err();
    assert!(matches!(err, Error::IndexTruncated { .. }), "{err}");
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn test_truncated_block_is_io_error() {
    let (_dir, path) = saved(Signature::mesh(false, false, false));
    let a = Archive::open(&path).unwrap();
    let (_, end) = a.node_block_range(2).unwrap();
    drop(a);

    let bytes = std::fs::read(&path).unwrap();
    std::fs::write(&path, &bytes[..end as usize - 10]).unwrap();
    let mut a = Archive::open(&path).unwrap();
    a.load_node(1).unwrap();
    let err = a.load_node(2).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(a.node_mesh(2).is_none());
}

#[test]
fn test_conflicting_codec_flags() {
    let sig = Signature::mesh(false, false, false).with_flags(SignatureFlags::CORTO | SignatureFlags::DRACO);
    assert_eq!(Archive::new(sig, None).unwrap_err().kind(), ErrorKind::Format);
}

#[test]
fn test_out_of_range() {
    let (_dir, path) = saved(Signature::mesh(false, false, false));
    let mut a = Archive::open(&path).unwrap();
    // index 3 is the sentinel
    for n in [3, 4, usize::MAX] {
        let err = a.load_node(n).unwrap_err();
        assert!(matches!(err, Error::OutOfRange { table: "node", .. }));
    }
    assert_eq!(a.load_instance(0).unwrap_err().kind(), ErrorKind::Range);
    assert_eq!(a.load_texture(0).unwrap_err().kind(), ErrorKind::Range);
    assert_eq!(a.node_patch_range(3).unwrap_err().kind(), ErrorKind::Range);
}

#[test]
fn test_corrupt_block_is_codec_error() {
    let sig = Signature::mesh(true, false, false).with_flags(SignatureFlags::CORTO);
    let (_dir, path) = saved(sig);
    let a = Archive::open(&path).unwrap();
    let (start, end) = a.node_block_range(1).unwrap();
    drop(a);

    let mut bytes = std::fs::read(&path).unwrap();
    for b in &mut bytes[start as usize..end as usize] {
        *b = 0xA5;
    }
    std::fs::write(&path, &bytes).unwrap();
    let mut a = Archive::open(&path).unwrap();
    assert_eq!(a.load_node(1).unwrap_err().kind(), ErrorKind::Codec);
    assert!(a.node_mesh(1).is_none());
    a.load_node(0).unwrap();
}

#[test]
fn test_not_open() {
    let sig = Signature::mesh(false, false, false);
    let mut a = Archive::new(sig, None).unwrap();
    a.push_node(Node::default(), grid(1, Vec3::ZERO, &sig), vec![]).unwrap();
    a.unload_node(0).unwrap();
    assert!(matches!(a.load_node(0).unwrap_err(), Error::NotOpen));
}

#[test]
fn test_missing_payload_on_save() {
    let sig = Signature::mesh(false, false, false);
    let mut a = Archive::new(sig, None).unwrap();
    a.push_node(Node::default(), grid(1, Vec3::ZERO, &sig), vec![]).unwrap();
    a.unload_node(0).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let err = a.save(dir.path().join("x.lodm")).unwrap_err();
    assert!(matches!(err, Error::MissingPayload { table: "node", index: 0 }));
    assert_eq!(err.kind(), ErrorKind::Usage);
}

#[test]
fn test_save_over_source() {
    let (_dir, path) = saved(Signature::mesh(false, false, false));
    let original = std::fs::read(&path).unwrap();
    let mut a = Archive::open(&path).unwrap();
    assert_eq!(a.save(&path).unwrap_err().kind(), ErrorKind::Usage);
    assert_eq!(std::fs::read(&path).unwrap(), original);

    // once detached the archive owns its data and may overwrite the file
    a.detach().unwrap();
    a.save(&path).unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), original);
}

#[test]
fn test_edit_requires_detach() {
    let sig = Signature::mesh(false, false, false);
    let (_dir, path) = saved(sig);
    let mut a = Archive::open(&path).unwrap();
    let mesh = grid(1, Vec3::ZERO, &sig);
    assert_eq!(
        a.push_node(Node::default(), mesh.clone(), vec![]).unwrap_err().kind(),
        ErrorKind::Usage
    );
    a.detach().unwrap();
    assert_eq!(a.push_node(Node::default(), mesh, vec![]).unwrap(), 3);
}

#[test]
fn test_texture_without_codec_flag() {
    let sig = Signature::mesh(false, false, true);
    let mut a = Archive::new(sig, None).unwrap();
    let err = a
        .push_texture(Default::default(), image::RgbaImage::new(2, 2))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
}

//! Streaming loads: idempotence, feature accumulation, instances and the
//! parallel path.

mod common;

use common::{chain, grid, patch};
use lodm::format::{
    Feature, Instance, InstanceNode, Node, Placement, Signature, SignatureFlags, NONE, PADDING,
};
use lodm::util::{Mat4, Quat, Vec3};
use lodm::{Archive, InstanceMesh};

fn save(mut a: Archive) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.lodm");
    a.save(&path).unwrap();
    (dir, path)
}

#[test]
fn test_load_node_is_idempotent() {
    let sig = Signature::mesh(true, true, true).with_flags(SignatureFlags::CORTO);
    let (_dir, path) = save(chain(sig));
    let mut a = Archive::open(&path).unwrap();

    assert!(a.node_mesh(0).is_none());
    a.load_node(0).unwrap();
    let first = a.node_mesh(0).cloned().unwrap();
    let feature = a.feature_data(0).unwrap().to_vec();

    a.load_node(0).unwrap();
    assert_eq!(a.node_mesh(0), Some(&first));
    // a second call does no work, so the feature is not appended again
    assert_eq!(a.feature_data(0).unwrap(), feature.as_slice());

    a.unload_node(0).unwrap();
    assert!(a.node_mesh(0).is_none());
    a.load_node(0).unwrap();
    assert_eq!(a.node_mesh(0), Some(&first));
}

#[test]
fn test_features_accumulate() {
    let sig = Signature::mesh(false, false, false);
    let mut a = Archive::new(sig, None).unwrap();
    a.push_feature(Feature::default(), b"wall".to_vec()).unwrap();
    let mesh = grid(2, Vec3::ZERO, &sig);
    a.push_node(Node::default(), mesh.clone(), vec![patch(2, 8, NONE, NONE, 0)]).unwrap();
    a.push_node(Node::default(), mesh, vec![patch(2, 4, NONE, NONE, 0), patch(2, 8, NONE, NONE, NONE)])
        .unwrap();
    let (_dir, path) = save(a);

    let mut a = Archive::open(&path).unwrap();
    assert_eq!(a.feature_data(0).unwrap().len(), 0);
    a.load_node(0).unwrap();
    let data = a.feature_data(0).unwrap();
    assert_eq!(data.len() as u64, PADDING);
    assert_eq!(&data[..4], b"wall");

    a.load_node(1).unwrap();
    let data = a.feature_data(0).unwrap();
    assert_eq!(data.len() as u64, 2 * PADDING);
    assert_eq!(&data[PADDING as usize..PADDING as usize + 4], b"wall");
}

#[test]
fn test_missing_feature_reference_is_skipped() {
    let sig = Signature::mesh(false, false, false);
    let mut a = Archive::new(sig, None).unwrap();
    let mesh = grid(1, Vec3::ZERO, &sig);
    a.push_node(Node::default(), mesh, vec![patch(1, 2, NONE, NONE, 5)]).unwrap();
    let (_dir, path) = save(a);

    let mut a = Archive::open(&path).unwrap();
    a.load_node(0).unwrap();
    assert!(a.node_mesh(0).is_some());
}

fn instanced(sig: Signature, placements: Vec<Placement>) -> Archive {
    let mut a = Archive::new(sig, None).unwrap();
    let base = grid(2, Vec3::ZERO, &sig);
    a.push_node(Node::default(), base.clone(), vec![patch(1, 8, NONE, NONE, NONE)]).unwrap();

    let instances = placements
        .into_iter()
        .enumerate()
        .map(|(i, placement)| Instance { id: 100 + i as u32, placement })
        .collect();
    a.push_instance_node(
        InstanceNode::default(),
        InstanceMesh { mesh: base.clone(), instances },
        vec![patch(NONE, 8, NONE, NONE, NONE)],
    )
    .unwrap();
    a.push_instance_node(
        InstanceNode::default(),
        InstanceMesh { mesh: base, instances: vec![Instance::default()] },
        vec![],
    )
    .unwrap();
    a
}

#[test]
fn test_matrix_instances() {
    let sig = Signature::mesh(true, false, false);
    let placements = vec![
        Placement::Matrix(Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0))),
        Placement::Matrix(Mat4::from_scale(Vec3::splat(2.0))),
        Placement::default(),
    ];
    let built = instanced(sig, placements.clone());
    let (_dir, path) = save(built);

    let mut a = Archive::open(&path).unwrap();
    assert_eq!(a.instance_node_count(), 2);
    assert_eq!(a.header().n_instances, 4);
    assert_eq!(a.instance_range(0).unwrap(), 0..3);
    assert_eq!(a.instance_range(1).unwrap(), 3..4);
    assert_eq!(a.instance_patch_range(0).unwrap(), 1..2);
    assert_eq!(a.instance_patch_range(1).unwrap(), 2..2);

    a.load_instance(0).unwrap();
    let inst = a.instance_mesh(0).unwrap();
    assert_eq!(inst.mesh.nvert(), 9);
    assert_eq!(inst.mesh.nface(), 8);
    let got: Vec<Placement> = inst.instances.iter().map(|i| i.placement).collect();
    assert_eq!(got, placements);
    assert_eq!(inst.instances[1].id, 101);
    // the index table agrees with the block payload
    assert_eq!(&a.instances()[0..3], inst.instances.as_slice());
}

#[test]
fn test_trs_instances() {
    let sig = Signature::mesh(false, false, false).with_flags(SignatureFlags::INSTANCE_TRS | SignatureFlags::DRACO);
    let trs = Placement::Trs {
        translation: Vec3::new(5.0, 0.0, -1.0),
        scale: Vec3::new(1.0, 2.0, 1.0),
        rotation: Quat::from_rotation_z(0.5),
    };
    let (_dir, path) = save(instanced(sig, vec![trs, trs]));

    let mut a = Archive::open(&path).unwrap();
    a.load_all().unwrap();
    let inst = a.instance_mesh(0).unwrap();
    assert_eq!(inst.instances.len(), 2);
    assert_eq!(inst.instances[0].placement, trs);
    assert_eq!(a.instance_mesh(1).unwrap().instances.len(), 1);
}

#[test]
fn test_trs_layout_rejects_matrix() {
    let sig = Signature::mesh(false, false, false).with_flags(SignatureFlags::INSTANCE_TRS);
    let mut a = Archive::new(sig, None).unwrap();
    let mesh = InstanceMesh {
        mesh: grid(1, Vec3::ZERO, &sig),
        instances: vec![Instance::default()],
    };
    assert!(a.push_instance_node(InstanceNode::default(), mesh, vec![]).is_err());
}

#[test]
fn test_parallel_matches_sequential() {
    let sig = Signature::mesh(true, true, true).with_flags(SignatureFlags::CORTO | SignatureFlags::PTPNG);
    let (_dir, path) = save(chain(sig));

    let mut seq = Archive::open(&path).unwrap();
    seq.load_all().unwrap();
    let mut par = Archive::open(&path).unwrap();
    par.load_node(1).unwrap();
    par.load_all_parallel().unwrap();

    for n in 0..seq.node_count() {
        assert_eq!(seq.node_mesh(n), par.node_mesh(n));
    }
    assert_eq!(seq.texture_image(0), par.texture_image(0));
    assert_eq!(seq.feature_data(0), par.feature_data(0));
}

#[test]
fn test_views_after_load() {
    let sig = Signature::mesh(true, true, true).with_flags(SignatureFlags::PTJPG);
    let (_dir, path) = save(chain(sig));
    let mut a = Archive::open(&path).unwrap();

    let before = a.node_view(0).unwrap();
    assert!(before.mesh.is_none());
    assert!(before.textures[0].image.is_none());
    assert_eq!(before.patches.len(), 2);

    a.load_node(0).unwrap();
    let view = a.node_view(0).unwrap();
    assert!(view.mesh.is_some());
    assert_eq!(view.textures.len(), 1);
    assert_eq!(view.textures[0].image.unwrap().dimensions(), (64, 64));
    assert_eq!(view.materials.len(), 1);
    assert_eq!(view.features[0].feature.id, 42);
    assert_eq!(&view.features[0].data[..4], b"roof");
}

//! 从手工构造的二进制缓冲加载场景

use std::sync::Arc;

use glam::{Mat4, Vec3};
use vrm_engine::humanoid::{HumanBones, VrmVersion};
use vrm_engine::model::{
    Accessor, AccessorType, BaseScene, Bin, BufferView, ColliderDesc, ComponentType, ExpressionDesc,
    GltfAnimation, GltfChannel, GltfMesh, GltfNode, GltfPrimitive, GltfRoot, GltfSampler, GltfSkin,
    MorphBindDesc, MorphTargetAttributes, PrimitiveAttributes, RuntimeScene, SpringDesc, VrmExtension,
};
use vrm_engine::morph::ExpressionPreset;
use vrm_engine::physics::SpringColliderShape;
use vrm_engine::VrmError;

#[derive(Default)]
struct Builder {
    root: GltfRoot,
    bytes: Vec<u8>,
}

impl Builder {
    fn push(&mut self, data: &[u8], component_type: ComponentType, accessor_type: AccessorType, count: usize) -> usize {
        // 4 字节对齐
        while self.bytes.len() % 4 != 0 {
            self.bytes.push(0);
        }
        self.root.buffer_views.push(BufferView {
            byte_offset: self.bytes.len(),
            byte_length: data.len(),
            byte_stride: None,
        });
        self.bytes.extend_from_slice(data);
        self.root.accessors.push(Accessor {
            buffer_view: Some(self.root.buffer_views.len() - 1),
            byte_offset: 0,
            component_type,
            accessor_type,
            count,
        });
        self.root.accessors.len() - 1
    }

    fn floats(&mut self, values: &[f32], accessor_type: AccessorType) -> usize {
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let count = values.len() / accessor_type.component_count();
        self.push(&data, ComponentType::F32, accessor_type, count)
    }

    fn finish(self) -> (GltfRoot, Bin) {
        (self.root, Bin::new(self.bytes))
    }
}

fn node(name: &str, translation: [f32; 3], children: Vec<usize>) -> GltfNode {
    GltfNode {
        name: name.into(),
        translation: Some(translation),
        children,
        ..Default::default()
    }
}

/// root -> body(mesh, skin), root -> hips -> hair -> hair_end
fn document(bind_count: usize) -> Builder {
    let mut b = Builder::default();

    let positions = b.floats(&[0.0, 1.0, 0.0, 0.1, 0.9, 0.0, -0.1, 0.9, 0.0], AccessorType::Vec3);
    let normals = b.floats(&[0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0], AccessorType::Vec3);
    let joints = b.push(&[0, 0, 0, 0, 0, 1, 0, 0, 1, 0, 0, 0], ComponentType::U8, AccessorType::Vec4, 3);
    let weights = b.floats(
        &[1.0, 0.0, 0.0, 0.0, 0.5, 0.5, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0],
        AccessorType::Vec4,
    );
    let indices: Vec<u8> = [0u16, 1, 2].iter().flat_map(|i| i.to_le_bytes()).collect();
    let indices = b.push(&indices, ComponentType::U16, AccessorType::Scalar, 3);
    let smile = b.floats(&[0.0, 0.01, 0.0, 0.0, 0.02, 0.0, 0.0, 0.02, 0.0], AccessorType::Vec3);

    b.root.meshes.push(GltfMesh {
        name: "body".into(),
        primitives: vec![GltfPrimitive {
            attributes: PrimitiveAttributes {
                position: Some(positions),
                normal: Some(normals),
                texcoord0: None,
                joints0: Some(joints),
                weights0: Some(weights),
            },
            indices: Some(indices),
            material: Some(0),
            targets: vec![MorphTargetAttributes { position: Some(smile) }],
        }],
        target_names: vec!["smile".into()],
    });

    let hips_bind = Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0));
    let hair_bind = Mat4::from_translation(Vec3::new(0.0, -0.9, 0.0));
    let binds: Vec<f32> = [hips_bind, hair_bind]
        .iter()
        .take(bind_count)
        .flat_map(|m| m.to_cols_array())
        .collect();
    let binds = b.floats(&binds, AccessorType::Mat4);
    b.root.skins.push(GltfSkin {
        name: "skin".into(),
        joints: vec![2, 3],
        inverse_bind_matrices: Some(binds),
        skeleton: Some(2),
    });

    b.root.nodes = vec![
        node("root", [0.0; 3], vec![1, 2]),
        GltfNode {
            name: "body".into(),
            mesh: Some(0),
            skin: Some(0),
            ..Default::default()
        },
        node("hips", [0.0, 1.0, 0.0], vec![3]),
        node("hair", [0.0, -0.1, 0.0], vec![4]),
        node("hair_end", [0.0, -0.1, 0.0], vec![]),
    ];

    let times = b.floats(&[0.0, 1.0], AccessorType::Scalar);
    let smile_weights = b.floats(&[0.0, 1.0], AccessorType::Scalar);
    b.root.animations.push(GltfAnimation {
        name: "smile".into(),
        samplers: vec![GltfSampler {
            input: times,
            output: smile_weights,
        }],
        channels: vec![GltfChannel {
            sampler: 0,
            node: Some(1),
            path: "weights".into(),
        }],
    });

    b.root.vrm = Some(VrmExtension {
        version: VrmVersion::V0,
        human_bones: vec![("hips".into(), 2), ("noSuchBone".into(), 3)],
        expressions: vec![ExpressionDesc {
            preset: "joy".into(),
            name: "Joy".into(),
            is_binary: false,
            morph_binds: vec![MorphBindDesc {
                target: 0,
                index: 0,
                weight: 100.0,
            }],
        }],
        colliders: vec![ColliderDesc {
            node: 2,
            shape: SpringColliderShape::Sphere {
                offset: Vec3::new(0.1, 0.0, 0.0),
                radius: 0.05,
            },
        }],
        collider_groups: vec![vec![0]],
        springs: vec![SpringDesc::Recursive {
            name: "hair".into(),
            roots: vec![3],
            stiffness: 1.0,
            drag_force: 0.4,
            hit_radius: 0.02,
            gravity_power: 0.0,
            gravity_dir: Vec3::NEG_Y,
            collider_groups: vec![0],
        }],
    });
    b
}

#[test]
fn loads_vrm0_document() {
    let (root, bin) = document(2).finish();
    let scene = BaseScene::load(&root, &bin).unwrap();

    assert_eq!(scene.nodes().len(), 5);
    assert_eq!(scene.roots(), &[0]);
    assert_eq!(scene.bone_node(HumanBones::Hips), Some(2));

    let mesh = &scene.meshes[0];
    assert_eq!(mesh.vertices.len(), 3);
    assert_eq!(mesh.indices, vec![0, 1, 2]);
    assert_eq!(mesh.bindings[1].joints, [0, 1, 0, 0]);
    assert_eq!(mesh.morph_targets[0].name, "smile");

    assert_eq!(scene.skins[0].len(), 2);
    assert_eq!(scene.skins[0].root, Some(2));

    // VRM0：网格下标换成节点下标，权重从百分比换算
    let happy = scene.expressions.preset(ExpressionPreset::Happy);
    assert_eq!(happy.morph_binds.len(), 1);
    assert_eq!(happy.morph_binds[0].node, 1);
    assert!((happy.morph_binds[0].weight - 1.0).abs() < 1e-6);

    assert_eq!(scene.spring_colliders[0].shape.offset().x, -0.1);
    // hair -> hair_end，加上叶子节点的合成尾端
    let bone = &scene.spring_bones[0];
    assert_eq!(bone.joints.len(), 2);
    assert_eq!(bone.joints[0].tail, Some(4));
    assert_eq!(bone.joints[1].tail, None);
    assert!(bone.joints[1].local_tail_position.y < 0.0);
    assert_eq!(bone.collider_groups, vec![0]);
}

#[test]
fn loaded_scene_animates_and_deforms() {
    let (root, bin) = document(2).finish();
    let scene = Arc::new(BaseScene::load(&root, &bin).unwrap());
    let mut runtime = RuntimeScene::new(Arc::clone(&scene));

    assert!(runtime.update_animation(0, 1.0, false));
    assert!(!runtime.update_animation(3, 1.0, false));
    assert_eq!(runtime.deformed_mesh(0).unwrap().weights, vec![1.0]);

    // 表情绑定的 Morph 由表情覆盖
    runtime
        .expressions_mut()
        .preset_mut(ExpressionPreset::Happy)
        .weight = 0.5;
    runtime.set_next_spring_delta(1.0 / 30.0);
    let items = runtime.drawables().to_vec();
    assert_eq!(items.len(), 1);

    let deformed = runtime.deformed_mesh(0).unwrap();
    assert_eq!(deformed.weights, vec![0.5]);
    // 静止姿势下蒙皮不改变顶点，只剩 Morph 差分
    assert!((deformed.vertices[0].position - Vec3::new(0.0, 1.005, 0.0)).length() < 1e-5);
}

#[test]
fn bind_matrix_mismatch_fails_load() {
    let (root, bin) = document(1).finish();
    assert!(matches!(BaseScene::load(&root, &bin), Err(VrmError::Skin(_))));
}

#[test]
fn weights_count_mismatch_fails_load() {
    let mut b = document(2);
    let extra = b.floats(&[0.0, 0.5, 1.0], AccessorType::Scalar);
    b.root.animations[0].samplers[0].output = extra;
    let (root, bin) = b.finish();
    assert!(matches!(BaseScene::load(&root, &bin), Err(VrmError::Animation(_))));
}

#[test]
fn unknown_channel_path_fails_load() {
    let mut b = document(2);
    b.root.animations[0].channels[0].path = "visibility".into();
    let (root, bin) = b.finish();
    assert!(matches!(BaseScene::load(&root, &bin), Err(VrmError::Animation(_))));
}

#[test]
fn multiple_parents_fail_load() {
    let mut b = document(2);
    b.root.nodes[2].children.push(1);
    let (root, bin) = b.finish();
    assert!(matches!(BaseScene::load(&root, &bin), Err(VrmError::Node(_))));
}

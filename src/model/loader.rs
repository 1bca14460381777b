//! glTF/VRM 加载：网格、蒙皮、动画和 VRM 扩展

use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

use super::{BaseMesh, BaseScene, Bin, ComponentType, GltfRoot, PrimitiveAttributes, Skin, SpringDesc};
use crate::animation::Animation;
use crate::humanoid::VrmVersion;
use crate::morph::{Expression, ExpressionPreset};
use crate::physics::{SpringBone, SpringCollider, SpringColliderGroup, SpringColliderShape};
use crate::skeleton::{AimAxis, ConstraintKind, NodeConstraint, RollAxis};
use crate::{Result, VrmError};

/// 带约束节点的调试颜色
const CONSTRAINT_COLOR: crate::gizmo::Rgba = crate::gizmo::Rgba::new(1.0, 0.6, 1.0, 1.0);

// ========== 网格 ==========

/// 读取 JOINTS_0（u8x4 或 u16x4）
fn read_joints(root: &GltfRoot, bin: &Bin, accessor: usize) -> Result<Vec<[u16; 4]>> {
    let component = root
        .accessors
        .get(accessor)
        .map(|a| a.component_type)
        .ok_or_else(|| VrmError::Accessor(format!("accessor {} not found", accessor)))?;
    match component {
        ComponentType::U8 => Ok(bin
            .get_accessor::<[u8; 4]>(root, accessor)?
            .into_iter()
            .map(|j| j.map(u16::from))
            .collect()),
        ComponentType::U16 => bin.get_accessor::<[u16; 4]>(root, accessor),
        other => Err(VrmError::Mesh(format!(
            "JOINTS_0 accessor {}: unsupported component type {:?}",
            accessor, other
        ))),
    }
}

/// 解析网格
///
/// 属性完全相同的相邻图元共享一个顶点缓冲（VRM 常见布局），它们的索引不再偏移。
/// 所有图元的 Morph Target 数量必须一致。
pub fn parse_mesh(root: &GltfRoot, bin: &Bin, index: usize) -> Result<BaseMesh> {
    let src = root
        .meshes
        .get(index)
        .ok_or_else(|| VrmError::Mesh(format!("mesh {} not found", index)))?;
    let mut mesh = BaseMesh::new(src.name.clone());
    let target_count = src.primitives.first().map(|p| p.targets.len()).unwrap_or(0);

    // 上一个图元的 (属性, 顶点偏移, 顶点数)
    let mut shared: Option<(&PrimitiveAttributes, usize, usize)> = None;

    for (pi, prim) in src.primitives.iter().enumerate() {
        if prim.targets.len() != target_count {
            return Err(VrmError::Mesh(format!(
                "{}: primitive {} has {} morph targets, expected {}",
                src.name,
                pi,
                prim.targets.len(),
                target_count
            )));
        }

        let (offset, vertex_count) = match shared {
            Some((attributes, offset, count)) if *attributes == prim.attributes => (offset, count),
            _ => {
                let position = prim.attributes.position.ok_or_else(|| {
                    VrmError::Mesh(format!("{}: primitive {} has no POSITION", src.name, pi))
                })?;
                let positions = bin.get_accessor::<Vec3>(root, position)?;
                let offset = mesh.add_positions(&positions);

                if let Some(normal) = prim.attributes.normal {
                    mesh.set_normals(offset, &bin.get_accessor::<Vec3>(root, normal)?)?;
                }
                if let Some(uv) = prim.attributes.texcoord0 {
                    mesh.set_uvs(offset, &bin.get_accessor::<Vec2>(root, uv)?)?;
                }
                match (prim.attributes.joints0, prim.attributes.weights0) {
                    (Some(joints), Some(weights)) => {
                        let joints = read_joints(root, bin, joints)?;
                        let weights = bin.get_accessor::<Vec4>(root, weights)?;
                        mesh.set_bindings(offset, &joints, &weights)?;
                    }
                    (None, None) => {}
                    _ => {
                        return Err(VrmError::Mesh(format!(
                            "{}: primitive {} has only one of JOINTS_0 / WEIGHTS_0",
                            src.name, pi
                        )))
                    }
                }

                for (ti, target) in prim.targets.iter().enumerate() {
                    match target.position {
                        Some(accessor) => {
                            let deltas = bin.get_accessor::<Vec3>(root, accessor)?;
                            if deltas.len() != positions.len() {
                                return Err(VrmError::Mesh(format!(
                                    "{}: morph target {} has {} deltas for {} vertices",
                                    src.name,
                                    ti,
                                    deltas.len(),
                                    positions.len()
                                )));
                            }
                            mesh.set_morph_positions(ti, offset, &deltas)?;
                        }
                        None => {
                            mesh.morph_target_mut(ti);
                        }
                    }
                }

                shared = Some((&prim.attributes, offset, positions.len()));
                (offset, positions.len())
            }
        };

        let indices = match prim.indices {
            Some(accessor) => bin.get_indices(root, accessor)?,
            None => (0..vertex_count as u32).collect(),
        };
        mesh.add_primitive(offset as u32, &indices, prim.material)?;
    }

    // 补齐到顶点数
    let vertex_count = mesh.vertices.len();
    for (i, target) in mesh.morph_targets.iter_mut().enumerate() {
        target.position_deltas.resize(vertex_count, Vec3::ZERO);
        if let Some(name) = src.target_names.get(i) {
            target.name = name.clone();
        }
    }
    if mesh.is_skinned() {
        mesh.bindings.resize(vertex_count, Default::default());
    }

    Ok(mesh)
}

// ========== 蒙皮 ==========

/// 解析蒙皮；没有 inverseBindMatrices 时使用单位矩阵
pub fn parse_skin(root: &GltfRoot, bin: &Bin, index: usize) -> Result<Skin> {
    let src = root
        .skins
        .get(index)
        .ok_or_else(|| VrmError::Skin(format!("skin {} not found", index)))?;
    let bind_matrices = match src.inverse_bind_matrices {
        Some(accessor) => bin.get_accessor::<Mat4>(root, accessor)?,
        None => vec![Mat4::IDENTITY; src.joints.len()],
    };
    Skin::new(src.name.clone(), src.joints.clone(), bind_matrices, src.skeleton)
}

// ========== 动画 ==========

/// 节点所持网格的 Morph Target 数量
fn morph_target_count(root: &GltfRoot, node: usize) -> Option<usize> {
    let mesh = root.nodes.get(node)?.mesh?;
    let mesh = root.meshes.get(mesh)?;
    Some(mesh.primitives.first().map(|p| p.targets.len()).unwrap_or(0))
}

/// 解析动画
///
/// 没有目标节点的通道被忽略；未知的 path 和权重数不匹配都是错误。
pub fn parse_animation(root: &GltfRoot, bin: &Bin, index: usize) -> Result<Animation> {
    let src = root
        .animations
        .get(index)
        .ok_or_else(|| VrmError::Animation(format!("animation {} not found", index)))?;
    let mut animation = Animation::new(src.name.clone());

    for (ci, channel) in src.channels.iter().enumerate() {
        let Some(node) = channel.node else {
            continue;
        };
        if node >= root.nodes.len() {
            return Err(VrmError::Animation(format!(
                "{}: channel {} targets missing node {}",
                src.name, ci, node
            )));
        }
        let sampler = src.samplers.get(channel.sampler).ok_or_else(|| {
            VrmError::Animation(format!(
                "{}: channel {} sampler {} not found",
                src.name, ci, channel.sampler
            ))
        })?;
        let times = bin.get_accessor::<f32>(root, sampler.input)?;
        let name = format!("{}/{}", root.nodes[node].name, channel.path);

        match channel.path.as_str() {
            "translation" => {
                let values = bin.get_accessor::<Vec3>(root, sampler.output)?;
                animation.add_translation(node, times, values, &name)?;
            }
            "rotation" => {
                let values = bin
                    .get_accessor::<Quat>(root, sampler.output)?
                    .into_iter()
                    .map(Quat::normalize)
                    .collect();
                animation.add_rotation(node, times, values, &name)?;
            }
            "scale" => {
                let values = bin.get_accessor::<Vec3>(root, sampler.output)?;
                animation.add_scale(node, times, values, &name)?;
            }
            "weights" => {
                let values = bin.get_accessor::<f32>(root, sampler.output)?;
                let targets = morph_target_count(root, node).unwrap_or(0);
                if targets == 0 || values.len() != times.len() * targets {
                    return Err(VrmError::Animation(format!(
                        "{}: {} weights for {} keys x {} morph targets",
                        name,
                        values.len(),
                        times.len(),
                        targets
                    )));
                }
                animation.add_weights(node, times, values, &name)?;
            }
            other => {
                return Err(VrmError::Animation(format!(
                    "{}: unknown channel path '{}'",
                    src.name, other
                )))
            }
        }
    }

    Ok(animation)
}

// ========== VRM 扩展 ==========

fn check_node(scene: &BaseScene, node: usize, what: &str) -> Result<()> {
    if scene.node(node).is_none() {
        return Err(VrmError::Node(format!(
            "{}: node {} out of {} nodes",
            what,
            node,
            scene.nodes().len()
        )));
    }
    Ok(())
}

fn parse_constraint(desc: &super::ConstraintDesc) -> Result<NodeConstraint> {
    let axis = desc.axis.as_deref().unwrap_or_default();
    let kind = match desc.kind.as_str() {
        "roll" => ConstraintKind::Roll(
            RollAxis::from_name(axis)
                .ok_or_else(|| VrmError::Node(format!("unknown roll axis '{}'", axis)))?,
        ),
        "aim" => ConstraintKind::Aim(
            AimAxis::from_name(axis)
                .ok_or_else(|| VrmError::Node(format!("unknown aim axis '{}'", axis)))?,
        ),
        "rotation" => ConstraintKind::Rotation,
        other => return Err(VrmError::Node(format!("unknown constraint '{}'", other))),
    };
    Ok(NodeConstraint::new(kind, desc.source, desc.weight.unwrap_or(1.0)))
}

/// 应用节点约束、表情、碰撞体和弹簧骨骼
///
/// 需要在初始世界变换计算之后调用（递归弹簧关节依赖它）。
pub(crate) fn apply_vrm_extension(scene: &mut BaseScene, root: &GltfRoot) -> Result<()> {
    for (i, src) in root.nodes.iter().enumerate() {
        let Some(desc) = &src.constraint else {
            continue;
        };
        let constraint = parse_constraint(desc)?;
        if let Some(node) = scene.node_mut(i) {
            node.constraint = Some(constraint);
            node.shape_color = CONSTRAINT_COLOR;
        }
    }

    let Some(vrm) = &root.vrm else {
        return Ok(());
    };
    let v0 = vrm.version == VrmVersion::V0;

    // ========== 表情 ==========
    for desc in &vrm.expressions {
        let preset = if v0 {
            ExpressionPreset::from_vrm0_name(&desc.preset)
        } else {
            ExpressionPreset::from_vrm1_name(&desc.preset)
        };
        let name = match preset {
            Some(p) => p.name().to_string(),
            None if desc.name.is_empty() => desc.preset.clone(),
            None => desc.name.clone(),
        };
        let mut expression = Expression::new(preset, name);
        expression.is_binary = desc.is_binary;

        for bind in &desc.morph_binds {
            // VRM0 的绑定指向网格，权重为百分比
            let (node, weight) = if v0 {
                (scene.mesh_node(bind.target), bind.weight * 0.01)
            } else {
                (scene.node(bind.target).map(|_| bind.target), bind.weight)
            };
            match node {
                Some(node) => expression.add_morph_bind(node, bind.index, weight),
                None => log::debug!("表情 {} 的绑定目标 {} 不存在", expression.name, bind.target),
            }
        }

        match preset {
            Some(p) => *scene.expressions.preset_mut(p) = expression,
            None => {
                scene.expressions.add_custom(expression);
            }
        }
    }

    // ========== 碰撞体 ==========
    for desc in &vrm.colliders {
        check_node(scene, desc.node, "collider")?;
        let mut shape = desc.shape;
        if v0 {
            // VRM0 的 X 轴与 glTF 相反
            match &mut shape {
                SpringColliderShape::Sphere { offset, .. } => offset.x = -offset.x,
                SpringColliderShape::Capsule { offset, tail, .. } => {
                    offset.x = -offset.x;
                    tail.x = -tail.x;
                }
            }
        }
        scene.spring_colliders.push(SpringCollider::new(desc.node, shape));
    }
    for group in &vrm.collider_groups {
        if let Some(&bad) = group.iter().find(|&&c| c >= scene.spring_colliders.len()) {
            return Err(VrmError::Node(format!("collider group references missing collider {}", bad)));
        }
        scene.spring_collider_groups.push(SpringColliderGroup {
            colliders: group.clone(),
        });
    }

    // ========== 弹簧骨骼 ==========
    let group_count = scene.spring_collider_groups.len();
    for desc in &vrm.springs {
        let (name, groups) = match desc {
            SpringDesc::Joints { name, collider_groups, .. }
            | SpringDesc::Recursive { name, collider_groups, .. } => (name, collider_groups),
        };
        let mut bone = SpringBone::new(name.clone());
        for &g in groups {
            if g >= group_count {
                return Err(VrmError::Node(format!("spring {}: collider group {} not found", name, g)));
            }
            bone.add_collider_group(g);
        }

        match desc {
            SpringDesc::Joints { joints, .. } => {
                for pair in joints.windows(2) {
                    let (head, tail) = (&pair[0], &pair[1]);
                    check_node(scene, head.node, "spring joint")?;
                    check_node(scene, tail.node, "spring joint")?;
                    let local_tail = scene.nodes()[tail.node].initial_transform.translation;
                    let joint = bone.add_joint(
                        head.node,
                        Some(tail.node),
                        local_tail,
                        head.drag_force,
                        head.stiffness,
                        head.hit_radius,
                    );
                    joint.gravity_power = head.gravity_power;
                    joint.gravity_dir = head.gravity_dir;
                }
            }
            SpringDesc::Recursive {
                roots,
                stiffness,
                drag_force,
                hit_radius,
                gravity_power,
                gravity_dir,
                ..
            } => {
                for &node in roots {
                    check_node(scene, node, "spring root")?;
                    let start = bone.joints.len();
                    bone.add_joint_recursive(scene.nodes(), node, *drag_force, *stiffness, *hit_radius);
                    for joint in &mut bone.joints[start..] {
                        joint.gravity_power = *gravity_power;
                        joint.gravity_dir = *gravity_dir;
                    }
                }
            }
        }

        log::debug!("弹簧骨骼 {}: {} 关节", bone.comment, bone.joints.len());
        scene.spring_bones.push(bone);
    }

    Ok(())
}

//! 基础节点（静止姿势）

use glam::{Mat4, Vec3, Vec4};

use crate::gizmo::Rgba;
use crate::humanoid::HumanBones;
use crate::skeleton::{try_decompose, NodeConstraint, Transform};

/// 基础节点
///
/// 加载后只读（Humanoid 标记除外）。层级关系以下标保存在 [`BaseScene`](super::BaseScene) 的节点数组中。
#[derive(Clone, Debug)]
pub struct BaseNode {
    pub name: String,

    /// 初始本地变换
    pub initial_transform: Transform,
    pub initial_scale: Vec3,

    /// 初始世界变换（加载时自顶向下计算一次）
    pub world_initial_transform: Transform,
    pub world_initial_scale: Vec3,

    pub parent: Option<usize>,
    pub children: Vec<usize>,

    pub mesh: Option<usize>,
    pub skin: Option<usize>,

    pub humanoid: Option<HumanBones>,
    pub constraint: Option<NodeConstraint>,

    /// 调试形状
    pub shape_matrix: Mat4,
    pub shape_color: Rgba,
}

impl BaseNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_transform(name, Transform::default())
    }

    pub fn with_transform(name: impl Into<String>, transform: Transform) -> Self {
        Self {
            name: name.into(),
            initial_transform: transform,
            initial_scale: Vec3::ONE,
            world_initial_transform: transform,
            world_initial_scale: Vec3::ONE,
            parent: None,
            children: Vec::new(),
            mesh: None,
            skin: None,
            humanoid: None,
            constraint: None,
            shape_matrix: Mat4::IDENTITY,
            shape_color: Rgba::WHITE,
        }
    }

    pub fn with_mesh(mut self, mesh: usize) -> Self {
        self.mesh = Some(mesh);
        self
    }

    pub fn with_skin(mut self, skin: usize) -> Self {
        self.skin = Some(skin);
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.initial_scale = scale;
        self
    }

    pub fn initial_matrix(&self) -> Mat4 {
        self.initial_transform.to_matrix_with_scale(self.initial_scale)
    }

    pub fn world_initial_matrix(&self) -> Mat4 {
        self.world_initial_transform
            .to_matrix_with_scale(self.world_initial_scale)
    }

    pub fn world_initial_transform_point(&self, point: Vec3) -> Vec3 {
        self.world_initial_matrix().transform_point3(point)
    }

    /// 用矩阵设置初始本地变换（glTF `matrix` 属性）
    pub fn set_initial_matrix(&mut self, m: &Mat4) -> bool {
        match try_decompose(m) {
            Some((scale, rotation, translation)) => {
                self.initial_scale = scale;
                self.initial_transform = Transform::new(translation, rotation);
                true
            }
            None => false,
        }
    }

    // ========== 调试形状 ==========

    /// 子树中是否有 Humanoid 节点
    fn any_tail(nodes: &[BaseNode], index: usize) -> bool {
        nodes[index].children.iter().any(|&child| {
            nodes.get(child).is_some_and(|c| c.humanoid.is_some()) || Self::any_tail(nodes, child)
        })
    }

    fn humanoid_ancestor(nodes: &[BaseNode], index: usize) -> Option<HumanBones> {
        let mut current = nodes[index].parent;
        while let Some(i) = current {
            let node = nodes.get(i)?;
            if node.humanoid.is_some() {
                return node.humanoid;
            }
            current = node.parent;
        }
        None
    }

    /// 非 Humanoid 节点借用的骨骼尺寸
    fn closest_bone(nodes: &[BaseNode], index: usize) -> Option<HumanBones> {
        let node = &nodes[index];
        if node.humanoid.is_some() {
            return node.humanoid;
        }
        if Self::any_tail(nodes, index) {
            return Self::humanoid_ancestor(nodes, index);
        }
        node.parent
            .and_then(|p| nodes.get(p))
            .and_then(|p| p.humanoid)
            .filter(|bone| bone.is_finger())
    }

    /// 形状朝向的子节点
    ///
    /// 脊柱/颈/中指近节优先，眼睛跳过；非 Humanoid 子节点中取 |x| 最小的（最靠中线）。
    /// 没有 Humanoid 祖先时返回 None。
    fn shape_tail(nodes: &[BaseNode], index: usize) -> Option<usize> {
        let mut tail: Option<usize> = None;
        for &child in &nodes[index].children {
            let Some(c) = nodes.get(child) else {
                continue;
            };
            match c.humanoid {
                Some(
                    HumanBones::Spine
                    | HumanBones::Neck
                    | HumanBones::LeftMiddleProximal
                    | HumanBones::RightMiddleProximal,
                ) => return Some(child),
                Some(HumanBones::LeftEye | HumanBones::RightEye) => {}
                Some(_) => tail = Some(child),
                None => match tail {
                    None => tail = Some(child),
                    Some(t) => {
                        let current = nodes[t].initial_transform.translation.x.abs();
                        if c.initial_transform.translation.x.abs() < current {
                            tail = Some(child);
                        }
                    }
                },
            }
        }

        Self::humanoid_ancestor(nodes, index).and(tail)
    }

    /// 计算 `index` 及其子树的调试形状矩阵
    pub fn calc_shape(nodes: &mut [BaseNode], index: usize) {
        if index >= nodes.len() {
            return;
        }

        let (mut w, mut d) = (0.02, 0.02);
        if let Some(bone) = nodes[index].humanoid {
            nodes[index].shape_color = bone.color();
            (w, d) = bone.width_depth();
        } else if let Some(bone) = Self::closest_bone(nodes, index) {
            (w, d) = bone.width_depth();
        }

        if nodes[index].children.is_empty() {
            nodes[index].shape_matrix = Mat4::from_scale(Vec3::splat(w));
            return;
        }

        match Self::shape_tail(nodes, index) {
            Some(tail) => {
                let offset = nodes[tail].initial_transform.translation;
                let length = offset.length();
                let y = offset.normalize_or_zero();
                let mut z = Vec3::Z;
                let x;
                if y.dot(z).abs() < 0.9 {
                    x = y.cross(z).normalize_or_zero();
                    z = x.cross(y);
                } else {
                    let x0 = Vec3::X;
                    z = x0.cross(y);
                    x = y.cross(z);
                }
                let r = Mat4::from_cols(x.extend(0.0), y.extend(0.0), z.extend(0.0), Vec4::W);
                let scale = Mat4::from_scale(Vec3::new(w, length, d));
                let center = Mat4::from_translation(Vec3::new(0.0, 0.5, 0.0));
                nodes[index].shape_matrix = r * scale * center;
            }
            None => {
                nodes[index].shape_color = Rgba::new(1.0, 0.2, 0.2, 1.0);
                nodes[index].shape_matrix = Mat4::from_scale(Vec3::splat(w));
            }
        }

        let children = nodes[index].children.clone();
        for child in children {
            Self::calc_shape(nodes, child);
        }
    }
}

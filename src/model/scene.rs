//! 基础场景（加载后只读的模板）

use glam::{Mat4, Quat, Vec3};

use super::loader::{apply_vrm_extension, parse_animation, parse_mesh, parse_skin};
use super::{BaseMesh, BaseNode, Bin, GltfRoot, Skin};
use crate::animation::Animation;
use crate::humanoid::{HumanBones, VrmVersion};
use crate::morph::Expressions;
use crate::physics::{SpringBone, SpringCollider, SpringColliderGroup};
use crate::skeleton::{try_decompose, Transform};
use crate::{Result, VrmError};

/// 基础场景
///
/// 节点、网格、蒙皮、动画和 VRM 扩展数据。多个 [`RuntimeScene`](super::RuntimeScene)
/// 可以共享同一个基础场景。
#[derive(Clone, Debug, Default)]
pub struct BaseScene {
    nodes: Vec<BaseNode>,
    roots: Vec<usize>,

    pub meshes: Vec<BaseMesh>,
    pub skins: Vec<Skin>,
    pub animations: Vec<Animation>,

    // VRM 扩展
    pub version: VrmVersion,
    pub expressions: Expressions,
    pub spring_bones: Vec<SpringBone>,
    pub spring_colliders: Vec<SpringCollider>,
    pub spring_collider_groups: Vec<SpringColliderGroup>,
}

impl BaseScene {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== 节点 ==========

    pub fn nodes(&self) -> &[BaseNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> Option<&BaseNode> {
        self.nodes.get(index)
    }

    pub fn node_mut(&mut self, index: usize) -> Option<&mut BaseNode> {
        self.nodes.get_mut(index)
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// 添加节点，返回下标（新节点没有父节点）
    pub fn add_node(&mut self, node: BaseNode) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// 挂接子节点
    ///
    /// 子节点先从旧父节点上摘下；会形成环的挂接返回错误。
    pub fn add_child(&mut self, parent: usize, child: usize) -> Result<()> {
        let len = self.nodes.len();
        if parent >= len || child >= len {
            return Err(VrmError::Node(format!(
                "add_child({}, {}) out of {} nodes",
                parent, child, len
            )));
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(VrmError::Node(format!(
                "node {} cannot be a child of its descendant {}",
                child, parent
            )));
        }

        if let Some(old) = self.nodes[child].parent.take() {
            self.nodes[old].children.retain(|&c| c != child);
        }
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
        Ok(())
    }

    /// `ancestor` 是否为 `index` 本身或其祖先
    fn is_ancestor_or_self(&self, ancestor: usize, index: usize) -> bool {
        let mut current = Some(index);
        while let Some(i) = current {
            if i == ancestor {
                return true;
            }
            current = self.nodes.get(i).and_then(|n| n.parent);
        }
        false
    }

    // ========== Humanoid ==========

    /// 设置或清除节点的 Humanoid 骨骼；同一骨骼只能标记一个节点
    pub fn set_human_bone(&mut self, index: usize, bone: Option<HumanBones>) {
        if index >= self.nodes.len() {
            return;
        }
        if let Some(bone) = bone {
            for node in self.nodes.iter_mut() {
                if node.humanoid == Some(bone) {
                    node.humanoid = None;
                }
            }
        }
        self.nodes[index].humanoid = bone;
    }

    pub fn bone_node(&self, bone: HumanBones) -> Option<usize> {
        self.nodes.iter().position(|n| n.humanoid == Some(bone))
    }

    /// 持有网格 `mesh` 的第一个节点
    pub fn mesh_node(&self, mesh: usize) -> Option<usize> {
        self.nodes.iter().position(|n| n.mesh == Some(mesh))
    }

    // ========== 资源 ==========

    pub fn add_mesh(&mut self, mesh: BaseMesh) -> usize {
        self.meshes.push(mesh);
        self.meshes.len() - 1
    }

    /// 添加蒙皮；关节节点必须存在
    pub fn add_skin(&mut self, skin: Skin) -> Result<usize> {
        let len = self.nodes.len();
        if let Some(&bad) = skin
            .joints
            .iter()
            .chain(skin.root.iter())
            .find(|&&j| j >= len)
        {
            return Err(VrmError::Skin(format!(
                "{}: joint node {} out of {} nodes",
                skin.name, bad, len
            )));
        }
        self.skins.push(skin);
        Ok(self.skins.len() - 1)
    }

    pub fn add_animation(&mut self, animation: Animation) -> usize {
        self.animations.push(animation);
        self.animations.len() - 1
    }

    // ========== 初始化 ==========

    /// 重新计算根节点、初始世界变换和调试形状
    ///
    /// 层级或初始变换修改后调用。
    pub fn finish(&mut self) -> Result<()> {
        self.roots = (0..self.nodes.len())
            .filter(|&i| self.nodes[i].parent.is_none())
            .collect();

        let len = self.nodes.len();
        let mut seen = vec![false; len];
        let mut visited = 0;
        let mut stack: Vec<(usize, Option<(Mat4, Transform, Vec3)>)> =
            self.roots.iter().rev().map(|&r| (r, None)).collect();
        while let Some((index, parent)) = stack.pop() {
            match seen.get_mut(index) {
                None => {
                    return Err(VrmError::Node(format!("child node {} out of {} nodes", index, len)));
                }
                Some(true) => {
                    return Err(VrmError::Node(format!("node {} is reachable twice", index)));
                }
                Some(flag) => *flag = true,
            }
            visited += 1;
            let node = &mut self.nodes[index];
            match parent {
                None => {
                    node.world_initial_transform = node.initial_transform;
                    node.world_initial_scale = node.initial_scale;
                }
                Some((parent_world, parent_transform, parent_scale)) => {
                    let world = parent_world * node.initial_matrix();
                    match try_decompose(&world) {
                        Some((scale, rotation, translation)) => {
                            node.world_initial_scale = scale;
                            node.world_initial_transform = Transform::new(translation, rotation);
                        }
                        None => {
                            // 零缩放等退化情况：逐分量合成
                            node.world_initial_scale = parent_scale * node.initial_scale;
                            node.world_initial_transform = Transform::new(
                                world.w_axis.truncate(),
                                parent_transform.rotation * node.initial_transform.rotation,
                            );
                        }
                    }
                }
            }
            let world = node.world_initial_matrix();
            let entry = (world, node.world_initial_transform, node.world_initial_scale);
            for &child in node.children.iter().rev() {
                stack.push((child, Some(entry)));
            }
        }

        if visited != self.nodes.len() {
            return Err(VrmError::Node(format!(
                "{} of {} nodes unreachable from roots",
                self.nodes.len() - visited,
                self.nodes.len()
            )));
        }

        for i in 0..self.roots.len() {
            let root = self.roots[i];
            BaseNode::calc_shape(&mut self.nodes, root);
        }
        Ok(())
    }

    // ========== 加载 ==========

    /// 从 glTF 文档构建场景；任何结构错误都会使整个加载失败
    pub fn load(root: &GltfRoot, bin: &Bin) -> Result<Self> {
        let mut scene = Self::new();

        for (i, src) in root.nodes.iter().enumerate() {
            let mut node = BaseNode::new(src.name.clone());
            if let Some(m) = src.matrix {
                if !node.set_initial_matrix(&Mat4::from_cols_array(&m)) {
                    return Err(VrmError::Node(format!("node {} ({}): degenerate matrix", i, src.name)));
                }
            } else {
                let t = src.translation.map(Vec3::from_array).unwrap_or(Vec3::ZERO);
                let r = src
                    .rotation
                    .map(|q| Quat::from_array(q).normalize())
                    .unwrap_or(Quat::IDENTITY);
                node.initial_transform = Transform::new(t, r);
                node.initial_scale = src.scale.map(Vec3::from_array).unwrap_or(Vec3::ONE);
            }
            node.mesh = src.mesh;
            node.skin = src.skin;
            scene.add_node(node);
        }

        for (parent, src) in root.nodes.iter().enumerate() {
            for &child in &src.children {
                if scene.nodes.get(child).is_some_and(|c| c.parent.is_some()) {
                    return Err(VrmError::Node(format!("node {} has multiple parents", child)));
                }
                scene.add_child(parent, child)?;
            }
        }

        for (i, src) in root.nodes.iter().enumerate() {
            if src.mesh.is_some_and(|m| m >= root.meshes.len()) {
                return Err(VrmError::Node(format!("node {}: mesh out of range", i)));
            }
            if src.skin.is_some_and(|s| s >= root.skins.len()) {
                return Err(VrmError::Node(format!("node {}: skin out of range", i)));
            }
        }

        for i in 0..root.meshes.len() {
            let mesh = parse_mesh(root, bin, i)?;
            scene.add_mesh(mesh);
        }
        for i in 0..root.skins.len() {
            let skin = parse_skin(root, bin, i)?;
            scene.add_skin(skin)?;
        }
        for i in 0..root.animations.len() {
            let animation = parse_animation(root, bin, i)?;
            scene.add_animation(animation);
        }

        if let Some(vrm) = &root.vrm {
            scene.version = vrm.version;
            for (name, node) in &vrm.human_bones {
                match HumanBones::from_name(name, vrm.version) {
                    Some(bone) if *node < scene.nodes.len() => scene.set_human_bone(*node, Some(bone)),
                    _ => log::debug!("忽略 Humanoid 骨骼 {} -> {}", name, node),
                }
            }
        }

        scene.finish()?;
        apply_vrm_extension(&mut scene, root)?;

        log::info!(
            "场景加载完成: {} 节点, {} 网格, {} 蒙皮, {} 动画, {} 弹簧骨骼",
            scene.nodes.len(),
            scene.meshes.len(),
            scene.skins.len(),
            scene.animations.len(),
            scene.spring_bones.len()
        );
        Ok(scene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycles_are_rejected() {
        let mut scene = BaseScene::new();
        let a = scene.add_node(BaseNode::new("a"));
        let b = scene.add_node(BaseNode::new("b"));
        scene.add_child(a, b).unwrap();
        assert!(scene.add_child(b, a).is_err());
        assert!(scene.add_child(a, a).is_err());
        assert!(scene.add_child(a, 9).is_err());
    }

    #[test]
    fn reparent_detaches_from_old_parent() {
        let mut scene = BaseScene::new();
        let a = scene.add_node(BaseNode::new("a"));
        let b = scene.add_node(BaseNode::new("b"));
        let c = scene.add_node(BaseNode::new("c"));
        scene.add_child(a, c).unwrap();
        scene.add_child(b, c).unwrap();
        assert!(scene.node(a).unwrap().children.is_empty());
        assert_eq!(scene.node(b).unwrap().children, vec![c]);
        scene.finish().unwrap();
        assert_eq!(scene.roots(), &[a, b]);
    }

    #[test]
    fn world_initial_transforms_compose() {
        let mut scene = BaseScene::new();
        let a = scene.add_node(BaseNode::with_transform(
            "a",
            Transform::new(Vec3::new(1.0, 0.0, 0.0), Quat::from_rotation_z(std::f32::consts::FRAC_PI_2)),
        ));
        let b = scene.add_node(
            BaseNode::with_transform("b", Transform::new(Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY))
                .with_scale(Vec3::splat(2.0)),
        );
        scene.add_child(a, b).unwrap();
        scene.finish().unwrap();

        let b = scene.node(b).unwrap();
        assert!((b.world_initial_transform.translation - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-5);
        assert!((b.world_initial_scale - Vec3::splat(2.0)).length() < 1e-5);
    }

    #[test]
    fn broken_children_fail_finish() {
        let mut scene = BaseScene::new();
        let mut root = BaseNode::new("root");
        root.children.push(5);
        scene.add_node(root);
        assert!(matches!(scene.finish(), Err(VrmError::Node(_))));

        let mut scene = BaseScene::new();
        let a = scene.add_node(BaseNode::new("a"));
        let b = scene.add_node(BaseNode::new("b"));
        scene.add_child(a, b).unwrap();
        scene.node_mut(a).unwrap().children.push(b);
        assert!(matches!(scene.finish(), Err(VrmError::Node(_))));
    }

    #[test]
    fn human_bone_is_unique() {
        let mut scene = BaseScene::new();
        let a = scene.add_node(BaseNode::new("a"));
        let b = scene.add_node(BaseNode::new("b"));
        scene.set_human_bone(a, Some(HumanBones::Head));
        scene.set_human_bone(b, Some(HumanBones::Head));
        assert_eq!(scene.bone_node(HumanBones::Head), Some(b));
        assert_eq!(scene.node(a).unwrap().humanoid, None);
    }
}

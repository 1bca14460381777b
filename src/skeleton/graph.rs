//! 运行时节点层级

use glam::{Mat4, Quat, Vec3};
use std::collections::HashSet;

use super::{is_invertible, try_decompose, RuntimeNode, Transform};
use crate::model::BaseNode;

/// 运行时节点层级
///
/// 节点以下标寻址，与基础场景的节点数组平行。父子关系只存下标，不存在引用环。
#[derive(Clone, Debug, Default)]
pub struct RuntimeNodeGraph {
    nodes: Vec<RuntimeNode>,
    roots: Vec<usize>,
    /// 已经报告过分解失败的节点（每个节点只警告一次）
    decompose_warned: HashSet<usize>,
}

impl RuntimeNodeGraph {
    pub fn new(base: &[BaseNode]) -> Self {
        let mut graph = Self::default();
        graph.reset(base);
        graph
    }

    /// 丢弃所有运行时状态，从基础节点重新复制层级
    pub fn reset(&mut self, base: &[BaseNode]) {
        self.nodes = base
            .iter()
            .enumerate()
            .map(|(i, node)| RuntimeNode::new(i, node))
            .collect();
        self.decompose_warned.clear();

        // 按基础节点的子节点顺序挂接
        let len = self.nodes.len();
        for (i, node) in base.iter().enumerate() {
            for &child in node.children.iter().filter(|&&c| c < len) {
                self.nodes[child].parent = Some(i);
                self.nodes[i].children.push(child);
            }
        }
        self.roots = (0..len).filter(|&i| self.nodes[i].parent.is_none()).collect();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn get(&self, index: usize) -> Option<&RuntimeNode> {
        self.nodes.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut RuntimeNode> {
        self.nodes.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RuntimeNode> {
        self.nodes.iter()
    }

    /// 挂接子节点；先从旧父节点的子列表中移除，保证只有一个父节点
    ///
    /// 越界或会形成环（`child` 是 `parent` 本身或其祖先）时返回 false，层级不变。
    pub fn add_child(&mut self, parent: usize, child: usize) -> bool {
        if parent >= self.nodes.len() || child >= self.nodes.len() || self.is_ancestor_or_self(child, parent) {
            return false;
        }
        if let Some(current) = self.nodes[child].parent {
            self.nodes[current].children.retain(|&c| c != child);
        } else {
            self.roots.retain(|&r| r != child);
        }
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
        true
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

    /// 获取世界矩阵（越界返回单位矩阵）
    pub fn world_matrix(&self, index: usize) -> Mat4 {
        self.nodes
            .get(index)
            .map(|n| n.world_matrix())
            .unwrap_or(Mat4::IDENTITY)
    }

    pub fn parent_world_matrix(&self, index: usize) -> Mat4 {
        self.parent_of(index)
            .map(|p| p.world_matrix())
            .unwrap_or(Mat4::IDENTITY)
    }

    pub fn parent_world_rotation(&self, index: usize) -> Quat {
        self.parent_of(index)
            .map(|p| p.world_transform.rotation)
            .unwrap_or(Quat::IDENTITY)
    }

    pub fn parent_world_position(&self, index: usize) -> Vec3 {
        self.parent_of(index)
            .map(|p| p.world_transform.translation)
            .unwrap_or(Vec3::ZERO)
    }

    fn parent_of(&self, index: usize) -> Option<&RuntimeNode> {
        self.nodes
            .get(index)
            .and_then(|n| n.parent)
            .and_then(|p| self.nodes.get(p))
    }

    /// 计算世界矩阵：World = ParentWorld * Local
    ///
    /// 分解失败的节点保留上一次的世界变换，返回 false。
    /// `recursive` 为 true 时继续更新整个子树。
    pub fn calc_world_matrix(&mut self, index: usize, recursive: bool) -> bool {
        let Some(node) = self.nodes.get(index) else {
            return false;
        };
        let world = self.parent_world_matrix(index) * node.local_matrix();

        let mut ok = match try_decompose(&world) {
            Some((scale, rotation, translation)) => {
                self.nodes[index].store_world(scale, Transform::new(translation, rotation));
                true
            }
            None => {
                self.warn_decompose(index);
                false
            }
        };

        if recursive {
            let children = self.nodes[index].children.clone();
            for child in children {
                ok &= self.calc_world_matrix(child, true);
            }
        }
        ok
    }

    /// 从所有根节点向下重新计算世界矩阵
    pub fn sync_hierarchy(&mut self) -> bool {
        let roots = self.roots.clone();
        let mut ok = true;
        for root in roots {
            ok &= self.calc_world_matrix(root, true);
        }
        ok
    }

    pub fn set_local_matrix(&mut self, index: usize, local: &Mat4) -> bool {
        self.nodes
            .get_mut(index)
            .map(|n| n.set_local_matrix(local))
            .unwrap_or(false)
    }

    /// 设置世界矩阵并反推本地 TRS：local = inverse(ParentWorld) * world
    ///
    /// 父矩阵不可逆或分解失败时返回 false，节点保持不变。
    pub fn set_world_matrix(&mut self, index: usize, world: &Mat4) -> bool {
        if index >= self.nodes.len() {
            return false;
        }
        let parent = self.parent_world_matrix(index);
        if !is_invertible(&parent) {
            return false;
        }
        let Some((world_scale, world_rotation, world_translation)) = try_decompose(world) else {
            return false;
        };
        let local = parent.inverse() * *world;
        let Some((scale, rotation, translation)) = try_decompose(&local) else {
            return false;
        };

        let node = &mut self.nodes[index];
        node.store_world(world_scale, Transform::new(world_translation, world_rotation));
        node.scale = scale;
        node.transform = Transform::new(translation, rotation);
        true
    }

    /// 设置世界旋转：local = inverse(ParentWorldRotation) * world，然后更新世界矩阵
    pub fn set_world_rotation(&mut self, index: usize, world_rotation: Quat, recursive: bool) -> bool {
        if index >= self.nodes.len() {
            return false;
        }
        let parent = self.parent_world_rotation(index);
        self.nodes[index].transform.rotation = (parent.inverse() * world_rotation).normalize();
        self.calc_world_matrix(index, recursive)
    }

    fn warn_decompose(&mut self, index: usize) {
        if self.decompose_warned.insert(index) {
            log::warn!("节点 {} 世界矩阵分解失败，保留上一帧变换", index);
        }
    }
}

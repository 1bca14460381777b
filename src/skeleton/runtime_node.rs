//! 运行时节点

use glam::{Mat4, Vec3};

use super::{try_decompose, NodeConstraint, Transform};
use crate::model::BaseNode;

/// 运行时节点
///
/// 与 [`BaseNode`] 一一对应（同一下标），保存当前帧的本地/世界变换。
/// 世界变换只在 `calc_world_matrix` 之后才与本地变换一致。
#[derive(Clone, Debug)]
pub struct RuntimeNode {
    /// 对应的基础节点下标
    pub base: usize,

    // 本地变换
    pub transform: Transform,
    pub scale: Vec3,

    // 世界变换（派生）
    pub world_transform: Transform,
    pub world_scale: Vec3,

    pub parent: Option<usize>,
    pub children: Vec<usize>,

    pub constraint: Option<NodeConstraint>,
}

impl RuntimeNode {
    /// 从基础节点的初始姿势创建（层级关系由 `RuntimeNodeGraph` 建立）
    pub fn new(base_index: usize, base: &BaseNode) -> Self {
        Self {
            base: base_index,
            transform: base.initial_transform,
            scale: base.initial_scale,
            world_transform: base.world_initial_transform,
            world_scale: base.world_initial_scale,
            parent: None,
            children: Vec::new(),
            constraint: base.constraint.clone(),
        }
    }

    /// 本地矩阵 = T * R * S
    pub fn local_matrix(&self) -> Mat4 {
        self.transform.to_matrix_with_scale(self.scale)
    }

    pub fn world_matrix(&self) -> Mat4 {
        self.world_transform.to_matrix_with_scale(self.world_scale)
    }

    pub fn world_transform_point(&self, point: Vec3) -> Vec3 {
        self.world_matrix().transform_point3(point)
    }

    pub fn world_position(&self) -> Vec3 {
        self.world_transform.translation
    }

    /// 用本地矩阵覆盖本地 TRS，分解失败时返回 false 且不修改
    pub fn set_local_matrix(&mut self, local: &Mat4) -> bool {
        match try_decompose(local) {
            Some((scale, rotation, translation)) => {
                self.scale = scale;
                self.transform = Transform::new(translation, rotation);
                true
            }
            None => false,
        }
    }

    /// 写入已分解的世界变换
    pub(crate) fn store_world(&mut self, scale: Vec3, transform: Transform) {
        self.world_scale = scale;
        self.world_transform = transform;
    }
}

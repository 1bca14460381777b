//! SpringBone 碰撞查询

use glam::Vec3;

use super::{SpringBone, SpringCollider, SpringColliderGroup};
use crate::skeleton::RuntimeNodeGraph;

/// 一个骨骼组的碰撞状态
///
/// 游标保证每个碰撞体在一个关节的一次更新中最多被命中一次，
/// 因而推出循环一定会结束。每个关节更新前调用 [`clear`](Self::clear)。
#[derive(Clone, Debug, Default)]
pub struct RuntimeSpringCollision {
    colliders: Vec<usize>,
    current: usize,
}

impl RuntimeSpringCollision {
    /// 展开骨骼组引用的所有碰撞体组
    pub fn new(bone: &SpringBone, groups: &[SpringColliderGroup]) -> Self {
        let colliders = bone
            .collider_groups
            .iter()
            .filter_map(|&g| groups.get(g))
            .flat_map(|g| g.colliders.iter().copied())
            .collect();
        Self {
            colliders,
            current: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    /// 重置游标
    pub fn clear(&mut self) {
        self.current = 0;
    }

    /// 从游标处继续检测，返回第一个命中碰撞体的推出位置
    pub fn collide(
        &mut self,
        graph: &RuntimeNodeGraph,
        colliders: &[SpringCollider],
        tail: Vec3,
        radius: f32,
    ) -> Option<Vec3> {
        while self.current < self.colliders.len() {
            let index = self.colliders[self.current];
            self.current += 1;
            if let Some(pushed) = colliders
                .get(index)
                .and_then(|c| c.collide(graph, tail, radius))
            {
                return Some(pushed);
            }
        }
        None
    }
}

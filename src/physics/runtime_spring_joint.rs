//! SpringBone 关节的模拟状态（Verlet 积分）

use glam::Vec3;

use super::config::SpringConfig;
use super::{RuntimeSpringCollision, SpringCollider, SpringJoint};
use crate::gizmo::{GizmoDrawer, Rgba};
use crate::model::BaseNode;
use crate::skeleton::{rotate_from_to, RuntimeNodeGraph};

/// 尾端长度低于此值视为零长度
const MIN_TAIL_LENGTH: f32 = 1.0e-6;

/// 关节的帧间状态
///
/// 尾端长度在创建时由静止姿势确定，之后不再改变。
#[derive(Clone, Debug)]
pub struct RuntimeSpringJoint {
    current_tail: Vec3,
    last_tail: Vec3,
    tail_length: f32,
    init_local_tail_dir: Vec3,
    /// 零长度尾端：关节不参与模拟
    inert: bool,
    nan_warned: bool,
    cap_warned: bool,
}

impl RuntimeSpringJoint {
    /// 从静止姿势初始化尾端
    pub fn new(joint: &SpringJoint, nodes: &[BaseNode]) -> Self {
        let local_tail = joint.local_tail_position;
        let current_tail = nodes
            .get(joint.head)
            .map(|head| head.world_initial_transform_point(local_tail))
            .unwrap_or(local_tail);
        let tail_length = local_tail.length();

        let (init_local_tail_dir, inert) = match local_tail.try_normalize() {
            Some(dir) if tail_length >= MIN_TAIL_LENGTH && joint.head < nodes.len() => (dir, false),
            _ => {
                log::warn!("弹簧关节 (head = {}) 尾端长度为零，跳过模拟", joint.head);
                (Vec3::Y, true)
            }
        };

        Self {
            current_tail,
            last_tail: current_tail,
            tail_length,
            init_local_tail_dir,
            inert,
            nan_warned: false,
            cap_warned: false,
        }
    }

    pub fn current_tail(&self) -> Vec3 {
        self.current_tail
    }

    pub fn last_tail(&self) -> Vec3 {
        self.last_tail
    }

    pub fn tail_length(&self) -> f32 {
        self.tail_length
    }

    pub fn is_inert(&self) -> bool {
        self.inert
    }

    /// 把尾端约束到距 head 固定长度的位置
    fn constrain(&self, head: Vec3, tail: Vec3, fallback_dir: Vec3) -> Vec3 {
        let dir = (tail - head).try_normalize().unwrap_or(fallback_dir);
        head + dir * self.tail_length
    }

    fn warn_non_finite(&mut self, head: usize) {
        if !self.nan_warned {
            self.nan_warned = true;
            log::warn!("弹簧关节 (head = {}) 出现非有限值，保持上一帧", head);
        }
    }

    /// 推进一帧
    ///
    /// 1. 惯性（受阻力衰减的上一帧位移）+ 朝初始方向的刚度 + 重力
    /// 2. 约束到尾端长度
    /// 3. 碰撞推出并重新约束
    /// 4. 由新尾端方向求 head 世界旋转，只更新 head 和直接子节点的世界矩阵
    ///
    /// 出现非有限值时保持上一帧状态并返回 false。
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        joint: &SpringJoint,
        nodes: &[BaseNode],
        graph: &mut RuntimeNodeGraph,
        delta_time: f32,
        collision: &mut RuntimeSpringCollision,
        colliders: &[SpringCollider],
        config: &SpringConfig,
    ) -> bool {
        if self.inert {
            return false;
        }
        let (Some(base), Some(head)) = (nodes.get(joint.head), graph.get(joint.head)) else {
            return false;
        };
        let head_position = head.world_position();

        // 静止姿势下 head 的世界旋转（跟随父节点当前旋转）
        let rotation = graph.parent_world_rotation(joint.head) * base.initial_transform.rotation;
        let rest_dir = rotation * self.init_local_tail_dir;

        let drag = joint.drag_force * config.drag_scale;
        let stiffness = joint.stiffness * config.stiffness_scale;

        let delta = self.current_tail - self.last_tail;
        let next_tail = self.current_tail
            + delta * (1.0 - drag).max(0.0)
            + rest_dir * (stiffness * delta_time)
            + joint.gravity_dir * (joint.gravity_power * delta_time);
        if !next_tail.is_finite() {
            self.warn_non_finite(joint.head);
            return false;
        }

        let mut next_tail = self.constrain(head_position, next_tail, rest_dir);

        collision.clear();
        let mut iterations = 0;
        while let Some(pushed) = collision.collide(graph, colliders, next_tail, joint.radius) {
            next_tail = self.constrain(head_position, pushed, rest_dir);
            iterations += 1;
            if iterations >= config.max_collision_iterations {
                if !self.cap_warned {
                    self.cap_warned = true;
                    log::warn!(
                        "弹簧关节 (head = {}) 碰撞次数达到上限 {}",
                        joint.head,
                        config.max_collision_iterations
                    );
                }
                break;
            }
        }

        let next_dir = (next_tail - head_position).try_normalize();
        let new_rotation = next_dir.map(|dir| rotate_from_to(rest_dir, dir) * rotation);
        let new_rotation = match new_rotation {
            Some(q) if next_tail.is_finite() && q.is_finite() => q,
            _ => {
                self.warn_non_finite(joint.head);
                return false;
            }
        };

        self.last_tail = self.current_tail;
        self.current_tail = next_tail;

        graph.set_world_rotation(joint.head, new_rotation, false);
        // 只更新到下一层
        let children = graph
            .get(joint.head)
            .map(|n| n.children.clone())
            .unwrap_or_default();
        for child in children {
            graph.calc_world_matrix(child, false);
        }
        true
    }

    pub fn draw_gizmo(&self, joint: &SpringJoint, graph: &RuntimeNodeGraph, gizmo: &mut dyn GizmoDrawer) {
        let Some(head) = graph.get(joint.head) else {
            return;
        };
        let head_position = head.world_position();
        gizmo.draw_sphere(self.current_tail, joint.radius, Rgba::new(1.0, 0.0, 1.0, 1.0));
        gizmo.draw_line(head_position, self.current_tail, Rgba::new(1.0, 1.0, 0.0, 1.0));

        if let Some(child) = head.children.first().and_then(|&c| graph.get(c)) {
            let red = Rgba::new(1.0, 0.0, 0.0, 1.0);
            gizmo.draw_sphere(child.world_position(), joint.radius, red);
            gizmo.draw_line(head_position, child.world_position(), red);
        }
    }
}

//! SpringBone 静态定义：关节、骨骼组、碰撞体

use glam::Vec3;

use super::config::get_config;
use crate::gizmo::{GizmoDrawer, Rgba};
use crate::model::BaseNode;
use crate::skeleton::RuntimeNodeGraph;

/// 碰撞体颜色
const COLLIDER_COLOR: Rgba = Rgba::new(0.0, 1.0, 1.0, 1.0);

/// 碰撞体形状（偏移/端点在碰撞体节点的本地空间）
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SpringColliderShape {
    Sphere { offset: Vec3, radius: f32 },
    Capsule { offset: Vec3, tail: Vec3, radius: f32 },
}

impl SpringColliderShape {
    pub fn radius(&self) -> f32 {
        match *self {
            Self::Sphere { radius, .. } | Self::Capsule { radius, .. } => radius,
        }
    }

    pub fn offset(&self) -> Vec3 {
        match *self {
            Self::Sphere { offset, .. } | Self::Capsule { offset, .. } => offset,
        }
    }
}

/// 碰撞体
#[derive(Clone, Debug, PartialEq)]
pub struct SpringCollider {
    pub node: usize,
    pub shape: SpringColliderShape,
}

impl SpringCollider {
    pub fn new(node: usize, shape: SpringColliderShape) -> Self {
        Self { node, shape }
    }

    /// 碰撞体中心（胶囊为起点）的世界坐标
    pub fn position(&self, graph: &RuntimeNodeGraph) -> Vec3 {
        graph
            .world_matrix(self.node)
            .transform_point3(self.shape.offset())
    }

    /// 距离 `point` 最近的碰撞体轴上的点
    fn closest_point(&self, graph: &RuntimeNodeGraph, point: Vec3) -> Vec3 {
        let world = graph.world_matrix(self.node);
        match self.shape {
            SpringColliderShape::Sphere { offset, .. } => world.transform_point3(offset),
            SpringColliderShape::Capsule { offset, tail, .. } => {
                let head = world.transform_point3(offset);
                let tail = world.transform_point3(tail);
                let segment = tail - head;
                let length_squared = segment.length_squared();
                if length_squared <= f32::EPSILON {
                    return head;
                }
                let t = ((point - head).dot(segment) / length_squared).clamp(0.0, 1.0);
                head + segment * t
            }
        }
    }

    /// 检测半径为 `radius` 的尾端是否与碰撞体重叠
    ///
    /// 重叠时返回推出后的位置（沿碰撞体表面法线，距离 = 两半径之和）。
    pub fn collide(&self, graph: &RuntimeNodeGraph, tail: Vec3, radius: f32) -> Option<Vec3> {
        let center = self.closest_point(graph, tail);
        let r = radius + self.shape.radius();
        let d = tail - center;
        if d.length() < r {
            let normal = d.try_normalize().unwrap_or(Vec3::Y);
            Some(center + normal * r)
        } else {
            None
        }
    }

    pub fn draw_gizmo(&self, graph: &RuntimeNodeGraph, gizmo: &mut dyn GizmoDrawer) {
        let world = graph.world_matrix(self.node);
        match self.shape {
            SpringColliderShape::Sphere { offset, radius } => {
                gizmo.draw_sphere(world.transform_point3(offset), radius, COLLIDER_COLOR);
            }
            SpringColliderShape::Capsule { offset, tail, radius } => {
                gizmo.draw_capsule(
                    world.transform_point3(offset),
                    world.transform_point3(tail),
                    radius,
                    COLLIDER_COLOR,
                );
            }
        }
    }
}

/// 碰撞体组（`colliders` 是场景碰撞体数组的下标）
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpringColliderGroup {
    pub colliders: Vec<usize>,
}

/// 弹簧关节
#[derive(Clone, Debug, PartialEq)]
pub struct SpringJoint {
    pub head: usize,
    /// 显式尾节点（VRM0 叶子节点没有）
    pub tail: Option<usize>,
    /// 尾端在 head 本地空间的位置
    pub local_tail_position: Vec3,
    /// 阻力 [0, 1]
    pub drag_force: f32,
    /// 刚度：回到初始方向的力 [0, ∞)
    pub stiffness: f32,
    /// 尾端碰撞半径
    pub radius: f32,
    pub gravity_power: f32,
    pub gravity_dir: Vec3,
}

impl SpringJoint {
    pub fn new(
        head: usize,
        tail: Option<usize>,
        local_tail_position: Vec3,
        drag_force: f32,
        stiffness: f32,
        radius: f32,
    ) -> Self {
        Self {
            head,
            tail,
            local_tail_position,
            drag_force,
            stiffness,
            radius,
            gravity_power: 0.0,
            gravity_dir: Vec3::NEG_Y,
        }
    }

    pub fn with_gravity(mut self, power: f32, dir: Vec3) -> Self {
        self.gravity_power = power;
        self.gravity_dir = dir;
        self
    }
}

/// 弹簧骨骼组
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpringBone {
    pub comment: String,
    pub joints: Vec<SpringJoint>,
    /// 场景碰撞体组下标
    pub collider_groups: Vec<usize>,
}

impl SpringBone {
    pub fn new(comment: impl Into<String>) -> Self {
        Self {
            comment: comment.into(),
            ..Default::default()
        }
    }

    pub fn add_collider_group(&mut self, group: usize) {
        self.collider_groups.push(group);
    }

    pub fn add_joint(
        &mut self,
        head: usize,
        tail: Option<usize>,
        local_tail_position: Vec3,
        drag_force: f32,
        stiffness: f32,
        radius: f32,
    ) -> &mut SpringJoint {
        self.joints.push(SpringJoint::new(
            head,
            tail,
            local_tail_position,
            drag_force,
            stiffness,
            radius,
        ));
        let last = self.joints.len() - 1;
        &mut self.joints[last]
    }

    /// VRM0：为 `node` 及其整个子树生成关节
    ///
    /// 有子节点时朝向第一个子节点；叶子节点沿 父→自身 方向延长 `leaf_tail_length` 作为尾端。
    pub fn add_joint_recursive(
        &mut self,
        nodes: &[BaseNode],
        node: usize,
        drag_force: f32,
        stiffness: f32,
        radius: f32,
    ) {
        let Some(base) = nodes.get(node) else {
            return;
        };

        match base.children.first() {
            Some(&child) => {
                let local_tail = nodes
                    .get(child)
                    .map(|c| c.initial_transform.translation)
                    .unwrap_or(Vec3::ZERO);
                self.add_joint(node, Some(child), local_tail, drag_force, stiffness, radius);
            }
            None => {
                let position = base.world_initial_transform.translation;
                let parent_position = base
                    .parent
                    .and_then(|p| nodes.get(p))
                    .map(|p| p.world_initial_transform.translation)
                    .unwrap_or(Vec3::ZERO);
                // 方向不可求（与父节点重合）时尾端为零，关节不参与模拟
                let local_tail = match (position - parent_position).try_normalize() {
                    Some(dir) => {
                        let tail = position + dir * get_config().leaf_tail_length;
                        base.world_initial_matrix().inverse().transform_point3(tail)
                    }
                    None => Vec3::ZERO,
                };
                self.add_joint(node, None, local_tail, drag_force, stiffness, radius);
            }
        }

        for &child in &base.children {
            self.add_joint_recursive(nodes, child, drag_force, stiffness, radius);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BaseScene;
    use crate::skeleton::Transform;
    use glam::Quat;

    fn chain() -> BaseScene {
        let mut scene = BaseScene::new();
        let mut parent = scene.add_node(BaseNode::new("root"));
        for i in 0..3 {
            let node = scene.add_node(BaseNode::with_transform(
                format!("hair{}", i),
                Transform::new(Vec3::new(0.0, -0.1, 0.0), Quat::IDENTITY),
            ));
            scene.add_child(parent, node).unwrap();
            parent = node;
        }
        scene.finish().unwrap();
        scene
    }

    #[test]
    fn recursive_joints_follow_hierarchy() {
        let scene = chain();
        let mut bone = SpringBone::new("hair");
        bone.add_joint_recursive(scene.nodes(), 1, 0.4, 1.0, 0.02);
        assert_eq!(bone.joints.len(), 3);
        assert_eq!(bone.joints[0].tail, Some(2));
        assert_eq!(bone.joints[0].local_tail_position, Vec3::new(0.0, -0.1, 0.0));

        // 叶子：沿父→自身方向延长 0.07
        let leaf = &bone.joints[2];
        assert_eq!(leaf.tail, None);
        assert!((leaf.local_tail_position - Vec3::new(0.0, -0.07, 0.0)).length() < 1e-5);
    }

    #[test]
    fn sphere_pushes_out_along_normal() {
        let scene = chain();
        let graph = RuntimeNodeGraph::new(scene.nodes());
        let collider = SpringCollider::new(
            0,
            SpringColliderShape::Sphere {
                offset: Vec3::ZERO,
                radius: 0.1,
            },
        );
        let pushed = collider.collide(&graph, Vec3::new(0.05, 0.0, 0.0), 0.05).unwrap();
        assert!((pushed - Vec3::new(0.15, 0.0, 0.0)).length() < 1e-5);
        assert!(collider.collide(&graph, Vec3::new(0.2, 0.0, 0.0), 0.05).is_none());
    }

    #[test]
    fn capsule_uses_closest_segment_point() {
        let scene = chain();
        let graph = RuntimeNodeGraph::new(scene.nodes());
        let collider = SpringCollider::new(
            0,
            SpringColliderShape::Capsule {
                offset: Vec3::ZERO,
                tail: Vec3::new(1.0, 0.0, 0.0),
                radius: 0.1,
            },
        );
        let pushed = collider.collide(&graph, Vec3::new(0.5, 0.05, 0.0), 0.0).unwrap();
        assert!((pushed - Vec3::new(0.5, 0.1, 0.0)).length() < 1e-5);
    }
}

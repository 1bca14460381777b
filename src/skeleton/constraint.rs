//! 节点约束（VRMC_node_constraint）
//!
//! 所有约束都写入目标节点的本地旋转，在世界矩阵传播之前执行。

use glam::{Quat, Vec3};

use super::{rotate_from_to, RuntimeNodeGraph};
use crate::model::BaseNode;

/// Aim 约束的瞄准轴（目标节点本地空间）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AimAxis {
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl AimAxis {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "PositiveX" => Some(Self::PositiveX),
            "NegativeX" => Some(Self::NegativeX),
            "PositiveY" => Some(Self::PositiveY),
            "NegativeY" => Some(Self::NegativeY),
            "PositiveZ" => Some(Self::PositiveZ),
            "NegativeZ" => Some(Self::NegativeZ),
            _ => None,
        }
    }

    pub fn vector(self) -> Vec3 {
        match self {
            Self::PositiveX => Vec3::X,
            Self::NegativeX => Vec3::NEG_X,
            Self::PositiveY => Vec3::Y,
            Self::NegativeY => Vec3::NEG_Y,
            Self::PositiveZ => Vec3::Z,
            Self::NegativeZ => Vec3::NEG_Z,
        }
    }
}

/// Roll 约束的扭转轴
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RollAxis {
    X,
    Y,
    Z,
}

impl RollAxis {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "X" => Some(Self::X),
            "Y" => Some(Self::Y),
            "Z" => Some(Self::Z),
            _ => None,
        }
    }

    pub fn vector(self) -> Vec3 {
        match self {
            Self::X => Vec3::X,
            Self::Y => Vec3::Y,
            Self::Z => Vec3::Z,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstraintKind {
    /// 只传递源节点绕指定轴的扭转
    Roll(RollAxis),
    /// 让目标节点的指定轴指向源节点
    Aim(AimAxis),
    /// 传递源节点相对静止姿势的全部旋转
    Rotation,
}

/// 节点约束
///
/// `source` 是节点下标，使用时才解析；无法解析时约束被跳过。
#[derive(Clone, Debug, PartialEq)]
pub struct NodeConstraint {
    pub kind: ConstraintKind,
    pub source: usize,
    pub weight: f32,
}

impl NodeConstraint {
    pub fn new(kind: ConstraintKind, source: usize, weight: f32) -> Self {
        Self { kind, source, weight }
    }

    /// 对目标节点 `dst` 求值约束，结果写入其本地旋转
    ///
    /// 源节点不存在、或源与目标相同时返回 false。
    pub fn process(&self, dst: usize, base: &[BaseNode], graph: &mut RuntimeNodeGraph) -> bool {
        if self.source == dst {
            return false;
        }
        let (Some(src_base), Some(dst_base)) = (base.get(self.source), base.get(dst)) else {
            return false;
        };
        let (Some(src_node), Some(dst_node)) = (graph.get(self.source), graph.get(dst)) else {
            return false;
        };

        let weight = self.weight.clamp(0.0, 1.0);
        let src_rest = src_base.initial_transform.rotation;
        let dst_rest = dst_base.initial_transform.rotation;
        let src_rotation = src_node.transform.rotation;

        let rotation = match self.kind {
            ConstraintKind::Rotation => {
                let delta = src_rest.inverse() * src_rotation;
                dst_rest * Quat::IDENTITY.slerp(delta, weight)
            }
            ConstraintKind::Roll(axis) => {
                let axis = axis.vector();
                let delta = src_rest.inverse() * src_rotation;
                // 源节点的变化量换算到父空间，再换算到目标节点的静止空间
                let delta_in_parent = src_rest * delta * src_rest.inverse();
                let delta_in_dst = dst_rest.inverse() * delta_in_parent * dst_rest;
                let swing = rotate_from_to(axis, delta_in_dst * axis);
                let twist = (swing.inverse() * delta_in_dst).normalize();
                dst_rest * Quat::IDENTITY.slerp(twist, weight)
            }
            ConstraintKind::Aim(axis) => {
                let parent_world = graph.parent_world_rotation(dst);
                let from = parent_world * dst_rest * axis.vector();
                let to = src_node.world_position() - dst_node.world_position();
                let from_to = rotate_from_to(from, to);
                let target = parent_world.inverse() * from_to * parent_world * dst_rest;
                dst_rest.slerp(target, weight)
            }
        };

        if !rotation.is_finite() {
            return false;
        }
        match graph.get_mut(dst) {
            Some(node) => {
                node.transform.rotation = rotation.normalize();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BaseScene;
    use crate::skeleton::Transform;

    fn pair() -> BaseScene {
        let mut scene = BaseScene::new();
        let root = scene.add_node(BaseNode::new("root"));
        let src = scene.add_node(BaseNode::with_transform(
            "src",
            Transform::new(Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY),
        ));
        let dst = scene.add_node(BaseNode::with_transform(
            "dst",
            Transform::new(Vec3::new(-1.0, 0.0, 0.0), Quat::IDENTITY),
        ));
        scene.add_child(root, src).unwrap();
        scene.add_child(root, dst).unwrap();
        scene.finish().unwrap();
        scene
    }

    #[test]
    fn rotation_constraint_copies_delta() {
        let scene = pair();
        let mut graph = RuntimeNodeGraph::new(scene.nodes());
        let q = Quat::from_rotation_y(0.8);
        graph.get_mut(1).unwrap().transform.rotation = q;

        let c = NodeConstraint::new(ConstraintKind::Rotation, 1, 1.0);
        assert!(c.process(2, scene.nodes(), &mut graph));
        assert!(graph.get(2).unwrap().transform.rotation.dot(q).abs() > 0.9999);

        let half = NodeConstraint::new(ConstraintKind::Rotation, 1, 0.5);
        assert!(half.process(2, scene.nodes(), &mut graph));
        let expected = Quat::from_rotation_y(0.4);
        assert!(graph.get(2).unwrap().transform.rotation.dot(expected).abs() > 0.9999);
    }

    #[test]
    fn roll_constraint_keeps_only_twist() {
        let scene = pair();
        let mut graph = RuntimeNodeGraph::new(scene.nodes());
        graph.get_mut(1).unwrap().transform.rotation =
            Quat::from_rotation_y(0.6) * Quat::from_rotation_x(0.5);

        let c = NodeConstraint::new(ConstraintKind::Roll(RollAxis::Y), 1, 1.0);
        assert!(c.process(2, scene.nodes(), &mut graph));
        let result = graph.get(2).unwrap().transform.rotation;
        // 扭转不改变 Y 轴方向
        assert!((result * Vec3::Y - Vec3::Y).length() < 1e-4);
    }

    #[test]
    fn aim_constraint_points_axis_at_source() {
        let scene = pair();
        let mut graph = RuntimeNodeGraph::new(scene.nodes());
        graph.get_mut(1).unwrap().transform.translation = Vec3::new(-1.0, 2.0, 0.0);
        graph.sync_hierarchy();

        let c = NodeConstraint::new(ConstraintKind::Aim(AimAxis::PositiveX), 1, 1.0);
        assert!(c.process(2, scene.nodes(), &mut graph));
        graph.sync_hierarchy();
        let dst = graph.get(2).unwrap();
        let axis = dst.world_transform.rotation * Vec3::X;
        assert!((axis - Vec3::Y).length() < 1e-4);
    }

    #[test]
    fn unresolved_source_is_skipped() {
        let scene = pair();
        let mut graph = RuntimeNodeGraph::new(scene.nodes());
        let c = NodeConstraint::new(ConstraintKind::Rotation, 42, 1.0);
        assert!(!c.process(2, scene.nodes(), &mut graph));
        assert_eq!(graph.get(2).unwrap().transform.rotation, Quat::IDENTITY);
    }

    #[test]
    fn axis_names_parse() {
        assert_eq!(AimAxis::from_name("NegativeZ"), Some(AimAxis::NegativeZ));
        assert_eq!(RollAxis::from_name("Y"), Some(RollAxis::Y));
        assert_eq!(RollAxis::from_name("W"), None);
    }
}

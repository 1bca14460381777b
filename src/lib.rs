//! VRM Engine - VRM/glTF 虚拟形象运行时
//!
//! 负责每帧的场景求值：
//! - glTF 节点层级（静态 Base 节点 + 可变 Runtime 节点）
//! - 关键帧动画采样
//! - 节点约束（Aim / Roll / Rotation）
//! - Morph Target 与 VRM 表情混合
//! - 顶点蒙皮计算
//! - SpringBone 物理（Verlet 积分 + 碰撞）
//! - Humanoid 姿势重定向

pub mod animation;
pub mod gizmo;
pub mod humanoid;
pub mod model;
pub mod morph;
pub mod physics;
pub mod skeleton;
pub mod skinning;

pub use animation::{Animation, Curve, WeightsCurve};
pub use gizmo::{GizmoDrawer, Rgba};
pub use humanoid::{HumanBones, HumanPose, VrmVersion};
pub use model::{BaseMesh, BaseNode, BaseScene, Bin, DrawItem, GltfRoot, RuntimeScene, Skin};
pub use morph::{Expression, ExpressionPreset, Expressions, MorphTargetKey};
pub use physics::{RuntimeSpringCollision, RuntimeSpringJoint, SpringBone, SpringCollider, SpringJoint};
pub use skeleton::{NodeConstraint, RuntimeNode, RuntimeNodeGraph, Transform};
pub use skinning::DeformedMesh;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VrmError {
    #[error("Accessor error: {0}")]
    Accessor(String),

    #[error("Index type error: {0}")]
    IndexType(String),

    #[error("Mesh error: {0}")]
    Mesh(String),

    #[error("Skin error: {0}")]
    Skin(String),

    #[error("Animation error: {0}")]
    Animation(String),

    #[error("Node error: {0}")]
    Node(String),
}

pub type Result<T> = std::result::Result<T, VrmError>;

//! SpringBone 物理
//!
//! 基于 Verlet 积分的弹簧骨骼：每个关节保存尾端的当前/上一帧位置，
//! 按阻力、刚度、重力推进后约束到固定长度，再与碰撞体求推出，
//! 最后把尾端方向换算回 head 节点的旋转。
//!
//! 模拟状态按 (骨骼组, 关节) 懒创建，保存在 [`RuntimeScene`](crate::model::RuntimeScene) 中。

mod collision;
pub mod config;
mod runtime_spring_joint;
mod spring_bone;

pub use collision::RuntimeSpringCollision;
pub use config::{get_config, reset_config, set_config, SpringConfig};
pub use runtime_spring_joint::RuntimeSpringJoint;
pub use spring_bone::{SpringBone, SpringCollider, SpringColliderGroup, SpringColliderShape, SpringJoint};

//! Humanoid 姿势提取与重定向

use glam::Vec3;

use super::{HumanBones, HumanPose};
use crate::model::BaseScene;
use crate::skeleton::RuntimeNodeGraph;

/// 从运行时层级提取规范化姿势
///
/// 规范化旋转 = WI * LI⁻¹ * L * WI⁻¹（WI: 初始世界旋转, LI: 初始本地旋转, L: 当前本地旋转），
/// 去掉了静止姿势本身的弯曲，可以应用到比例不同的骨架上。
pub fn extract_pose(base: &BaseScene, graph: &RuntimeNodeGraph) -> HumanPose {
    let mut pose = HumanPose::new();

    for &bone in HumanBones::ALL {
        let Some(index) = base.bone_node(bone) else {
            continue;
        };
        let (Some(base_node), Some(node)) = (base.node(index), graph.get(index)) else {
            continue;
        };

        let world_initial = base_node.world_initial_transform.rotation;
        let local_initial = base_node.initial_transform.rotation;
        let normalized = world_initial
            * local_initial.inverse()
            * node.transform.rotation
            * world_initial.inverse();
        pose.push(bone, normalized.normalize());

        if bone == HumanBones::Hips {
            pose.root_position =
                node.world_transform.translation - base_node.world_initial_transform.translation;
        }
    }

    pose
}

/// 把姿势写回运行时层级，最后做一次自顶向下的同步
///
/// 目标骨架上不存在的骨骼直接跳过。
pub fn apply_pose(base: &BaseScene, graph: &mut RuntimeNodeGraph, pose: &HumanPose) -> bool {
    for (bone, rotation) in pose.iter() {
        let Some(index) = base.bone_node(bone) else {
            continue;
        };
        let Some(base_node) = base.node(index) else {
            continue;
        };

        let world_initial = base_node.world_initial_transform.rotation;
        let local_initial = base_node.initial_transform.rotation;
        let local = local_initial * world_initial.inverse() * rotation * world_initial;

        let hips_translation = if bone == HumanBones::Hips {
            let target: Vec3 = base_node.world_initial_transform.translation + pose.root_position;
            let parent = graph.parent_world_matrix(index);
            crate::skeleton::is_invertible(&parent)
                .then(|| parent.inverse().transform_point3(target))
        } else {
            None
        };

        if let Some(node) = graph.get_mut(index) {
            node.transform.rotation = local.normalize();
            if let Some(translation) = hips_translation {
                node.transform.translation = translation;
            }
        }
    }

    graph.sync_hierarchy()
}

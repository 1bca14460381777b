//! 与骨架无关的 Humanoid 姿势

use glam::{Quat, Vec3};

use super::HumanBones;

/// Humanoid 姿势
///
/// `bones` 与 `rotations` 平行；旋转是去除静止姿势弯曲后的规范化本地旋转。
/// `root_position` 是 hips 相对初始世界位置的偏移。
#[derive(Clone, Debug, PartialEq, Default)]
pub struct HumanPose {
    pub root_position: Vec3,
    pub bones: Vec<HumanBones>,
    pub rotations: Vec<Quat>,
}

impl HumanPose {
    pub fn new() -> Self {
        Self::default()
    }

    /// 静止姿势：身体 22 根 + 手指 30 根，全部单位旋转（不含眼睛和下颚）
    pub fn initial() -> Self {
        let bones: Vec<HumanBones> = HumanBones::ALL
            .iter()
            .copied()
            .filter(|b| !matches!(b, HumanBones::LeftEye | HumanBones::RightEye | HumanBones::Jaw))
            .collect();
        let rotations = vec![Quat::IDENTITY; bones.len()];
        Self {
            root_position: Vec3::ZERO,
            bones,
            rotations,
        }
    }

    pub fn push(&mut self, bone: HumanBones, rotation: Quat) {
        self.bones.push(bone);
        self.rotations.push(rotation);
    }

    pub fn len(&self) -> usize {
        self.bones.len().min(self.rotations.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 按骨骼查找旋转
    pub fn rotation(&self, bone: HumanBones) -> Option<Quat> {
        self.iter().find(|(b, _)| *b == bone).map(|(_, q)| q)
    }

    pub fn iter(&self) -> impl Iterator<Item = (HumanBones, Quat)> + '_ {
        self.bones.iter().copied().zip(self.rotations.iter().copied())
    }
}

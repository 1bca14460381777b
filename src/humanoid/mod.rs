//! Humanoid 骨骼映射与姿势重定向

mod bones;
mod pose;
mod retarget;

pub use bones::{HumanBones, VrmVersion};
pub use pose::HumanPose;
pub use retarget::{apply_pose, extract_pose};

//! Humanoid 骨骼枚举

use crate::gizmo::Rgba;

/// VRM 规范版本（影响骨骼名/表情名的解析）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum VrmVersion {
    V0,
    #[default]
    V1,
}

macro_rules! human_bones {
    ($($variant:ident => $name:literal,)*) => {
        /// Humanoid 骨骼槽位
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum HumanBones {
            $($variant,)*
        }

        impl HumanBones {
            /// 所有骨骼（声明顺序）
            pub const ALL: &'static [HumanBones] = &[$(HumanBones::$variant,)*];

            /// VRM1 骨骼名
            pub fn name(self) -> &'static str {
                match self {
                    $(HumanBones::$variant => $name,)*
                }
            }
        }
    };
}

human_bones! {
    Hips => "hips",
    Spine => "spine",
    Chest => "chest",
    UpperChest => "upperChest",
    Neck => "neck",
    Head => "head",
    LeftEye => "leftEye",
    RightEye => "rightEye",
    Jaw => "jaw",
    // 手臂
    LeftShoulder => "leftShoulder",
    LeftUpperArm => "leftUpperArm",
    LeftLowerArm => "leftLowerArm",
    LeftHand => "leftHand",
    RightShoulder => "rightShoulder",
    RightUpperArm => "rightUpperArm",
    RightLowerArm => "rightLowerArm",
    RightHand => "rightHand",
    // 腿
    LeftUpperLeg => "leftUpperLeg",
    LeftLowerLeg => "leftLowerLeg",
    LeftFoot => "leftFoot",
    LeftToes => "leftToes",
    RightUpperLeg => "rightUpperLeg",
    RightLowerLeg => "rightLowerLeg",
    RightFoot => "rightFoot",
    RightToes => "rightToes",
    // 手指
    LeftThumbMetacarpal => "leftThumbMetacarpal",
    LeftThumbProximal => "leftThumbProximal",
    LeftThumbDistal => "leftThumbDistal",
    LeftIndexProximal => "leftIndexProximal",
    LeftIndexIntermediate => "leftIndexIntermediate",
    LeftIndexDistal => "leftIndexDistal",
    LeftMiddleProximal => "leftMiddleProximal",
    LeftMiddleIntermediate => "leftMiddleIntermediate",
    LeftMiddleDistal => "leftMiddleDistal",
    LeftRingProximal => "leftRingProximal",
    LeftRingIntermediate => "leftRingIntermediate",
    LeftRingDistal => "leftRingDistal",
    LeftLittleProximal => "leftLittleProximal",
    LeftLittleIntermediate => "leftLittleIntermediate",
    LeftLittleDistal => "leftLittleDistal",
    RightThumbMetacarpal => "rightThumbMetacarpal",
    RightThumbProximal => "rightThumbProximal",
    RightThumbDistal => "rightThumbDistal",
    RightIndexProximal => "rightIndexProximal",
    RightIndexIntermediate => "rightIndexIntermediate",
    RightIndexDistal => "rightIndexDistal",
    RightMiddleProximal => "rightMiddleProximal",
    RightMiddleIntermediate => "rightMiddleIntermediate",
    RightMiddleDistal => "rightMiddleDistal",
    RightRingProximal => "rightRingProximal",
    RightRingIntermediate => "rightRingIntermediate",
    RightRingDistal => "rightRingDistal",
    RightLittleProximal => "rightLittleProximal",
    RightLittleIntermediate => "rightLittleIntermediate",
    RightLittleDistal => "rightLittleDistal",
}

impl HumanBones {
    /// 从骨骼名解析
    ///
    /// VRM0 的拇指命名比 VRM1 少一节：
    /// `ThumbProximal` -> `ThumbMetacarpal`，`ThumbIntermediate` -> `ThumbProximal`。
    pub fn from_name(name: &str, version: VrmVersion) -> Option<Self> {
        if version == VrmVersion::V0 {
            match name {
                "leftThumbProximal" => return Some(Self::LeftThumbMetacarpal),
                "leftThumbIntermediate" => return Some(Self::LeftThumbProximal),
                "rightThumbProximal" => return Some(Self::RightThumbMetacarpal),
                "rightThumbIntermediate" => return Some(Self::RightThumbProximal),
                _ => {}
            }
        }
        Self::ALL.iter().copied().find(|bone| bone.name() == name)
    }

    pub fn is_finger(self) -> bool {
        self >= Self::LeftThumbMetacarpal
    }

    pub fn is_eye(self) -> bool {
        matches!(self, Self::LeftEye | Self::RightEye)
    }

    /// 调试形状的 (宽, 深)
    pub fn width_depth(self) -> (f32, f32) {
        match self {
            Self::Spine => (0.15, 0.10),
            Self::Hips | Self::Chest | Self::UpperChest => (0.20, 0.12),
            Self::Neck => (0.06, 0.06),
            Self::LeftHand | Self::RightHand => (0.01, 0.05),
            bone if bone.is_finger() => (0.01, 0.01),
            _ => (0.05, 0.05),
        }
    }

    /// 调试形状颜色
    pub fn color(self) -> Rgba {
        match self {
            Self::LeftShoulder
            | Self::LeftUpperArm
            | Self::LeftLowerArm
            | Self::LeftHand
            | Self::RightShoulder
            | Self::RightUpperArm
            | Self::RightLowerArm
            | Self::RightHand
            | Self::LeftUpperLeg
            | Self::LeftLowerLeg
            | Self::LeftFoot
            | Self::LeftToes
            | Self::RightUpperLeg
            | Self::RightLowerLeg
            | Self::RightFoot
            | Self::RightToes => Rgba::new(1.0, 0.8, 0.5, 1.0),
            bone if bone.is_finger() => Rgba::new(0.5, 0.5, 0.4, 1.0),
            _ => Rgba::new(0.5, 1.0, 0.8, 1.0),
        }
    }
}

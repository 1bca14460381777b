//! Morph Target 与 VRM 表情

mod expression;
mod manager;

pub use expression::{Expression, ExpressionMorphBind};
pub use manager::Expressions;

/// 表情预设
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExpressionPreset {
    Neutral,
    // 情绪
    Happy,
    Angry,
    Sad,
    Relaxed,
    Surprised,
    // 口型
    Aa,
    Ih,
    Ou,
    Ee,
    Oh,
    // 眨眼
    Blink,
    BlinkLeft,
    BlinkRight,
    // 视线
    LookUp,
    LookDown,
    LookLeft,
    LookRight,
}

impl ExpressionPreset {
    pub const ALL: [ExpressionPreset; 18] = [
        Self::Neutral,
        Self::Happy,
        Self::Angry,
        Self::Sad,
        Self::Relaxed,
        Self::Surprised,
        Self::Aa,
        Self::Ih,
        Self::Ou,
        Self::Ee,
        Self::Oh,
        Self::Blink,
        Self::BlinkLeft,
        Self::BlinkRight,
        Self::LookUp,
        Self::LookDown,
        Self::LookLeft,
        Self::LookRight,
    ];

    /// VRM1 名称
    pub fn name(self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Happy => "happy",
            Self::Angry => "angry",
            Self::Sad => "sad",
            Self::Relaxed => "relaxed",
            Self::Surprised => "surprised",
            Self::Aa => "aa",
            Self::Ih => "ih",
            Self::Ou => "ou",
            Self::Ee => "ee",
            Self::Oh => "oh",
            Self::Blink => "blink",
            Self::BlinkLeft => "blinkLeft",
            Self::BlinkRight => "blinkRight",
            Self::LookUp => "lookUp",
            Self::LookDown => "lookDown",
            Self::LookLeft => "lookLeft",
            Self::LookRight => "lookRight",
        }
    }

    /// VRM0 的 presetName
    pub fn vrm0_name(self) -> &'static str {
        match self {
            Self::Happy => "joy",
            Self::Sad => "sorrow",
            Self::Relaxed => "fun",
            Self::Aa => "a",
            Self::Ih => "i",
            Self::Ou => "u",
            Self::Ee => "e",
            Self::Oh => "o",
            Self::BlinkLeft => "blink_l",
            Self::BlinkRight => "blink_r",
            Self::LookUp => "lookup",
            Self::LookDown => "lookdown",
            Self::LookLeft => "lookleft",
            Self::LookRight => "lookright",
            other => other.name(),
        }
    }

    pub fn from_vrm1_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn from_vrm0_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.vrm0_name() == name)
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// (节点, Morph 下标) 键
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MorphTargetKey {
    pub node: usize,
    pub morph: usize,
}

impl MorphTargetKey {
    pub fn new(node: usize, morph: usize) -> Self {
        Self { node, morph }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_names() {
        assert_eq!(ExpressionPreset::from_vrm0_name("joy"), Some(ExpressionPreset::Happy));
        assert_eq!(ExpressionPreset::from_vrm0_name("blink_r"), Some(ExpressionPreset::BlinkRight));
        assert_eq!(ExpressionPreset::from_vrm0_name("surprised"), Some(ExpressionPreset::Surprised));
        assert_eq!(ExpressionPreset::from_vrm1_name("lookLeft"), Some(ExpressionPreset::LookLeft));
        assert_eq!(ExpressionPreset::from_vrm1_name("joy"), None);
        for (i, p) in ExpressionPreset::ALL.iter().enumerate() {
            assert_eq!(p.index(), i);
        }
    }
}

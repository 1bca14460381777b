//! VRM 表情

use super::ExpressionPreset;

/// 表情对 Morph Target 的绑定
#[derive(Clone, Debug, PartialEq)]
pub struct ExpressionMorphBind {
    /// 持有网格的节点
    pub node: usize,
    /// Morph Target 下标
    pub index: usize,
    /// 绑定权重 [0, 1]
    pub weight: f32,
}

/// 表情
#[derive(Clone, Debug, PartialEq)]
pub struct Expression {
    /// None 为自定义表情
    pub preset: Option<ExpressionPreset>,
    pub name: String,
    pub is_binary: bool,
    pub weight: f32,
    pub morph_binds: Vec<ExpressionMorphBind>,
}

impl Expression {
    pub fn new(preset: Option<ExpressionPreset>, name: impl Into<String>) -> Self {
        Self {
            preset,
            name: name.into(),
            is_binary: false,
            weight: 0.0,
            morph_binds: Vec::new(),
        }
    }

    pub fn add_morph_bind(&mut self, node: usize, index: usize, weight: f32) {
        self.morph_binds.push(ExpressionMorphBind { node, index, weight });
    }

    pub fn is_empty(&self) -> bool {
        self.morph_binds.is_empty()
    }

    /// 实际生效的权重：二值表情超过 0.5 视为 1，否则为 0
    pub fn effective_weight(&self) -> f32 {
        if self.is_binary {
            if self.weight > 0.5 {
                1.0
            } else {
                0.0
            }
        } else {
            self.weight
        }
    }
}

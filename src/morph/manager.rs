//! 表情管理器

use std::collections::HashMap;

use super::{Expression, ExpressionPreset, MorphTargetKey};

/// 表情集合：18 个预设 + 自定义表情
#[derive(Clone, Debug)]
pub struct Expressions {
    presets: Vec<Expression>,
    custom: Vec<Expression>,
    morph_target_map: HashMap<MorphTargetKey, f32>,
}

impl Default for Expressions {
    fn default() -> Self {
        Self::new()
    }
}

impl Expressions {
    pub fn new() -> Self {
        Self {
            presets: ExpressionPreset::ALL
                .iter()
                .map(|&p| Expression::new(Some(p), p.name()))
                .collect(),
            custom: Vec::new(),
            morph_target_map: HashMap::new(),
        }
    }

    pub fn preset(&self, preset: ExpressionPreset) -> &Expression {
        &self.presets[preset.index()]
    }

    pub fn preset_mut(&mut self, preset: ExpressionPreset) -> &mut Expression {
        &mut self.presets[preset.index()]
    }

    /// 添加自定义表情，返回其引用
    pub fn add_custom(&mut self, expression: Expression) -> &mut Expression {
        self.custom.push(expression);
        let last = self.custom.len() - 1;
        &mut self.custom[last]
    }

    /// 预设在前、自定义在后
    pub fn iter(&self) -> impl Iterator<Item = &Expression> {
        self.presets.iter().chain(self.custom.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Expression> {
        self.presets.iter_mut().chain(self.custom.iter_mut())
    }

    /// 按名称查找（预设名或自定义名）
    pub fn find_mut(&mut self, name: &str) -> Option<&mut Expression> {
        self.iter_mut().find(|e| e.name == name)
    }

    /// 设置表情权重，找不到时返回 false
    pub fn set_weight(&mut self, name: &str, weight: f32) -> bool {
        match self.find_mut(name) {
            Some(e) => {
                e.weight = weight;
                true
            }
            None => false,
        }
    }

    pub fn reset_weights(&mut self) {
        for e in self.iter_mut() {
            e.weight = 0.0;
        }
    }

    /// 汇总所有表情的 Morph 权重
    ///
    /// 每次调用先清空再累加 `bind.weight * expression.weight`；
    /// 多个表情作用于同一个键时直接相加，不做截断。
    pub fn eval_morph_target_map(&mut self) -> &HashMap<MorphTargetKey, f32> {
        self.morph_target_map.clear();
        let presets = self.presets.iter().chain(self.custom.iter());
        for expression in presets {
            let weight = expression.effective_weight();
            for bind in &expression.morph_binds {
                *self
                    .morph_target_map
                    .entry(MorphTargetKey::new(bind.node, bind.index))
                    .or_insert(0.0) += bind.weight * weight;
            }
        }
        &self.morph_target_map
    }

    /// 上一次 `eval_morph_target_map` 的结果
    pub fn morph_target_map(&self) -> &HashMap<MorphTargetKey, f32> {
        &self.morph_target_map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_accumulate_unclamped() {
        let mut expressions = Expressions::new();
        {
            let happy = expressions.preset_mut(ExpressionPreset::Happy);
            happy.add_morph_bind(3, 1, 0.6);
            happy.weight = 1.0;
        }
        let mut custom = Expression::new(None, "smirk");
        custom.add_morph_bind(3, 1, 0.6);
        custom.weight = 1.0;
        expressions.add_custom(custom);

        let map = expressions.eval_morph_target_map();
        let w = map[&MorphTargetKey::new(3, 1)];
        assert!((w - 1.2).abs() < 1e-6);
    }

    #[test]
    fn map_is_rebuilt_every_call() {
        let mut expressions = Expressions::new();
        expressions
            .preset_mut(ExpressionPreset::Aa)
            .add_morph_bind(0, 2, 1.0);
        assert!(expressions.set_weight("aa", 0.5));
        assert_eq!(expressions.eval_morph_target_map()[&MorphTargetKey::new(0, 2)], 0.5);
        expressions.reset_weights();
        assert_eq!(expressions.eval_morph_target_map()[&MorphTargetKey::new(0, 2)], 0.0);
        assert!(!expressions.set_weight("missing", 1.0));
    }
}

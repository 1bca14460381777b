//! 动画片段：按节点下标组织的通道曲线

use glam::{Quat, Vec3};
use std::collections::HashMap;

use super::{Curve, WeightsCurve};
use crate::skeleton::RuntimeNodeGraph;
use crate::Result;

/// 动画片段
#[derive(Clone, Debug, Default)]
pub struct Animation {
    pub name: String,
    pub translations: HashMap<usize, Curve<Vec3>>,
    pub rotations: HashMap<usize, Curve<Quat>>,
    pub scales: HashMap<usize, Curve<Vec3>>,
    pub weights: HashMap<usize, WeightsCurve>,
}

impl Animation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// 所有通道中最长的时间（秒）
    pub fn duration(&self) -> f32 {
        let t = self.translations.values().map(|c| c.max_seconds());
        let r = self.rotations.values().map(|c| c.max_seconds());
        let s = self.scales.values().map(|c| c.max_seconds());
        let w = self.weights.values().map(|c| c.max_seconds());
        t.chain(r).chain(s).chain(w).fold(0.0, f32::max)
    }

    pub fn add_translation(
        &mut self,
        node: usize,
        times: Vec<f32>,
        values: Vec<Vec3>,
        name: &str,
    ) -> Result<()> {
        self.translations.insert(node, Curve::new(name, times, values)?);
        Ok(())
    }

    pub fn add_rotation(
        &mut self,
        node: usize,
        times: Vec<f32>,
        values: Vec<Quat>,
        name: &str,
    ) -> Result<()> {
        self.rotations.insert(node, Curve::new(name, times, values)?);
        Ok(())
    }

    pub fn add_scale(
        &mut self,
        node: usize,
        times: Vec<f32>,
        values: Vec<Vec3>,
        name: &str,
    ) -> Result<()> {
        self.scales.insert(node, Curve::new(name, times, values)?);
        Ok(())
    }

    pub fn add_weights(
        &mut self,
        node: usize,
        times: Vec<f32>,
        values: Vec<f32>,
        name: &str,
    ) -> Result<()> {
        self.weights.insert(node, WeightsCurve::new(name, times, values)?);
        Ok(())
    }

    /// 采样 TRS 通道写入运行时节点的本地变换
    ///
    /// 指向不存在节点的通道被忽略。
    pub fn apply(&self, seconds: f32, repeat: bool, graph: &mut RuntimeNodeGraph) {
        for (&index, curve) in &self.translations {
            if let Some(node) = graph.get_mut(index) {
                node.transform.translation = curve.get_value(seconds, repeat);
            }
        }
        for (&index, curve) in &self.rotations {
            if let Some(node) = graph.get_mut(index) {
                node.transform.rotation = curve.get_value(seconds, repeat).normalize();
            }
        }
        for (&index, curve) in &self.scales {
            if let Some(node) = graph.get_mut(index) {
                node.scale = curve.get_value(seconds, repeat);
            }
        }
    }

    /// 采样权重通道：(节点下标, 权重)
    pub fn sample_weights(&self, seconds: f32, repeat: bool) -> impl Iterator<Item = (usize, &[f32])> {
        self.weights
            .iter()
            .map(move |(&index, curve)| (index, curve.get_value(seconds, repeat)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_spans_all_channels() {
        let mut a = Animation::new("walk");
        a.add_translation(0, vec![0.0, 1.0], vec![Vec3::ZERO, Vec3::X], "t").unwrap();
        a.add_weights(1, vec![0.0, 2.5], vec![0.0, 1.0], "w").unwrap();
        assert_eq!(a.duration(), 2.5);
        assert_eq!(Animation::new("empty").duration(), 0.0);
    }

    #[test]
    fn misaligned_channel_is_rejected() {
        let mut a = Animation::new("bad");
        assert!(a.add_rotation(0, vec![0.0, 1.0], vec![Quat::IDENTITY], "r").is_err());
        assert!(a.rotations.is_empty());
    }
}

//! 调试绘制接口
//!
//! 引擎只发出绘制命令，几何数据不跨越这个边界。

use glam::Vec3;

/// RGBA 颜色
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::WHITE
    }
}

/// 调试绘制器（由渲染端实现）
pub trait GizmoDrawer {
    fn draw_line(&mut self, from: Vec3, to: Vec3, color: Rgba);

    fn draw_sphere(&mut self, center: Vec3, radius: f32, color: Rgba);

    /// 胶囊体：两端点 + 半径
    fn draw_capsule(&mut self, head: Vec3, tail: Vec3, radius: f32, color: Rgba);
}

/// 只记录命令的绘制器，用于测试
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct GizmoRecorder {
    pub lines: Vec<(Vec3, Vec3, Rgba)>,
    pub spheres: Vec<(Vec3, f32, Rgba)>,
    pub capsules: Vec<(Vec3, Vec3, f32, Rgba)>,
}

#[cfg(test)]
impl GizmoDrawer for GizmoRecorder {
    fn draw_line(&mut self, from: Vec3, to: Vec3, color: Rgba) {
        self.lines.push((from, to, color));
    }

    fn draw_sphere(&mut self, center: Vec3, radius: f32, color: Rgba) {
        self.spheres.push((center, radius, color));
    }

    fn draw_capsule(&mut self, head: Vec3, tail: Vec3, radius: f32, color: Rgba) {
        self.capsules.push((head, tail, radius, color));
    }
}

//! 节点层级与运行时变换

mod constraint;
mod graph;
mod runtime_node;

pub use constraint::{AimAxis, ConstraintKind, NodeConstraint, RollAxis};
pub use graph::RuntimeNodeGraph;
pub use runtime_node::RuntimeNode;

use glam::{Mat4, Quat, Vec3};

/// 刚体变换（平移 + 旋转），缩放单独保存
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Transform {
    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self { translation, rotation }
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.translation)
    }

    /// 带缩放的 TRS 矩阵（缩放先于旋转应用）
    pub fn to_matrix_with_scale(&self, scale: Vec3) -> Mat4 {
        Mat4::from_scale_rotation_translation(scale, self.rotation, self.translation)
    }
}

/// 分解阈值：行列式或缩放分量低于此值视为退化矩阵
const DECOMPOSE_EPSILON: f32 = 1.0e-8;

/// 将矩阵分解为 (缩放, 旋转, 平移)
///
/// 含 NaN/Inf、不可逆或缩放为零的矩阵返回 `None`，调用方应保留旧状态。
pub fn try_decompose(m: &Mat4) -> Option<(Vec3, Quat, Vec3)> {
    if !m.is_finite() {
        return None;
    }
    let det = m.determinant();
    if det.abs() < DECOMPOSE_EPSILON {
        return None;
    }
    let (scale, rotation, translation) = m.to_scale_rotation_translation();
    if scale.abs().min_element() < DECOMPOSE_EPSILON
        || !scale.is_finite()
        || !rotation.is_finite()
        || !translation.is_finite()
    {
        return None;
    }
    Some((scale, rotation.normalize(), translation))
}

/// 矩阵是否可安全求逆
pub fn is_invertible(m: &Mat4) -> bool {
    m.is_finite() && m.determinant().abs() >= DECOMPOSE_EPSILON
}

/// 求从 `from` 方向旋转到 `to` 方向的最短旋转
///
/// 任一向量长度为零时返回单位旋转。
pub fn rotate_from_to(from: Vec3, to: Vec3) -> Quat {
    match (from.try_normalize(), to.try_normalize()) {
        (Some(a), Some(b)) => Quat::from_rotation_arc(a, b),
        _ => Quat::IDENTITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decompose_rejects_singular_matrix() {
        let m = Mat4::from_scale(Vec3::new(1.0, 0.0, 1.0));
        assert!(try_decompose(&m).is_none());

        let mut nan = Mat4::IDENTITY;
        nan.x_axis.x = f32::NAN;
        assert!(try_decompose(&nan).is_none());
    }

    #[test]
    fn decompose_recovers_trs() {
        let rotation = Quat::from_rotation_y(0.7);
        let m = Mat4::from_scale_rotation_translation(
            Vec3::new(2.0, 2.0, 2.0),
            rotation,
            Vec3::new(1.0, 2.0, 3.0),
        );
        let (s, r, t) = try_decompose(&m).unwrap();
        assert!((s - Vec3::splat(2.0)).length() < 1e-5);
        assert!(r.dot(rotation).abs() > 0.9999);
        assert!((t - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-5);
    }

    #[test]
    fn rotate_from_to_handles_zero_vector() {
        assert_eq!(rotate_from_to(Vec3::ZERO, Vec3::X), Quat::IDENTITY);
        let q = rotate_from_to(Vec3::X, Vec3::Y);
        assert!((q * Vec3::X - Vec3::Y).length() < 1e-5);
    }
}

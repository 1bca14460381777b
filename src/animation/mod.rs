//! 动画系统
//!
//! glTF 关键帧曲线的阶梯采样，以及按节点组织的动画片段。

mod clip;
mod curve;

pub use clip::Animation;
pub use curve::{Curve, WeightsCurve};

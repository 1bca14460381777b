//! 顶点蒙皮计算
//!
//! 每帧先叠加 Morph Target 差分，再按最多 4 根关节加权变换顶点。
//! 结果写入 [`DeformedMesh`] 的顶点缓冲，静态网格本身不变。

mod skinning;

pub use skinning::{compute_skinning_matrices, DeformedMesh};

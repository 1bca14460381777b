//! SpringBone 求解器配置
//!
//! 所有参数扁平化，运行时通过 `set_config` 调整。

use once_cell::sync::Lazy;
use std::sync::RwLock;

/// SpringBone 配置（扁平化，不嵌套）
#[derive(Debug, Clone, PartialEq)]
pub struct SpringConfig {
    // ========== 开关 ==========
    /// 是否启用弹簧骨骼模拟，默认 true
    /// 关闭后节点保持动画/静止姿势
    pub enabled: bool,

    // ========== 时间步 ==========
    /// 单帧最大时间步（秒），默认 0.1
    /// 卡顿时的超长帧会被截断，防止尾端飞出
    pub max_delta_time: f32,

    // ========== 碰撞 ==========
    /// 每个关节每帧最多处理的碰撞次数，默认 8
    pub max_collision_iterations: usize,

    // ========== VRM0 叶子节点 ==========
    /// 叶子节点自动生成的尾端长度（米），默认 0.07
    pub leaf_tail_length: f32,

    // ========== 全局缩放 ==========
    /// 刚度缩放（乘以模型原值），默认 1.0
    /// 越大 → 越快回到静止方向
    pub stiffness_scale: f32,
    /// 阻力缩放（乘以模型原值），默认 1.0
    /// 越大 → 惯性越小、停得越快
    pub drag_scale: f32,
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_delta_time: 0.1,
            max_collision_iterations: 8,
            leaf_tail_length: 0.07,
            stiffness_scale: 1.0,
            drag_scale: 1.0,
        }
    }
}

/// 全局配置实例
static SPRING_CONFIG: Lazy<RwLock<SpringConfig>> = Lazy::new(|| RwLock::new(SpringConfig::default()));

/// 获取当前配置（只读）
pub fn get_config() -> SpringConfig {
    SPRING_CONFIG
        .read()
        .map(|c| c.clone())
        .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
}

/// 手动设置配置（用于运行时调试）
pub fn set_config(config: SpringConfig) {
    match SPRING_CONFIG.write() {
        Ok(mut guard) => *guard = config,
        Err(poisoned) => *poisoned.into_inner() = config,
    }
}

/// 重置为默认配置
pub fn reset_config() {
    set_config(SpringConfig::default());
}

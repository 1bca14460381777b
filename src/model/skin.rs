//! 蒙皮数据

use glam::Mat4;

use crate::{Result, VrmError};

/// 蒙皮：关节节点列表 + 平行的逆绑定矩阵
#[derive(Clone, Debug)]
pub struct Skin {
    pub name: String,
    pub joints: Vec<usize>,
    pub bind_matrices: Vec<Mat4>,
    /// 骨架根节点（声明时蒙皮矩阵会抵消网格节点自身的运动）
    pub root: Option<usize>,
}

impl Skin {
    /// 创建蒙皮；关节数与逆绑定矩阵数不一致时返回错误
    pub fn new(
        name: impl Into<String>,
        joints: Vec<usize>,
        bind_matrices: Vec<Mat4>,
        root: Option<usize>,
    ) -> Result<Self> {
        let name = name.into();
        if joints.len() != bind_matrices.len() {
            return Err(VrmError::Skin(format!(
                "{}: {} joints but {} inverse bind matrices",
                name,
                joints.len(),
                bind_matrices.len()
            )));
        }
        Ok(Self {
            name,
            joints,
            bind_matrices,
            root,
        })
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }
}

//! 顶点蒙皮计算

use glam::{Mat4, Vec3};

use crate::model::{BaseMesh, JointBinding, Skin, Vertex};
use crate::skeleton::{is_invertible, RuntimeNodeGraph};

/// 计算蒙皮矩阵
///
/// `matrix[j] = rootInverse * World(joints[j]) * bind[j]`。
/// 声明了骨架根时 `rootInverse` 为网格节点当前世界矩阵的逆，
/// 抵消网格节点自身的运动；否则为单位矩阵。
pub fn compute_skinning_matrices(skin: &Skin, mesh_node: usize, graph: &RuntimeNodeGraph) -> Vec<Mat4> {
    let root_inverse = if skin.root.is_some() {
        let mesh_world = graph.world_matrix(mesh_node);
        if is_invertible(&mesh_world) {
            mesh_world.inverse()
        } else {
            Mat4::IDENTITY
        }
    } else {
        Mat4::IDENTITY
    };

    skin.joints
        .iter()
        .zip(&skin.bind_matrices)
        .map(|(&joint, bind)| root_inverse * graph.world_matrix(joint) * *bind)
        .collect()
}

/// 变形后的网格（运行时每个网格一份）
#[derive(Clone, Debug, Default)]
pub struct DeformedMesh {
    /// 每个 Morph Target 一个权重
    pub weights: Vec<f32>,
    /// 每帧被覆盖的顶点缓冲
    pub vertices: Vec<Vertex>,
}

impl DeformedMesh {
    pub fn new(mesh: &BaseMesh) -> Self {
        Self {
            weights: vec![0.0; mesh.morph_targets.len()],
            vertices: mesh.vertices.clone(),
        }
    }

    /// 设置 Morph 权重，下标越界时忽略
    pub fn set_weight(&mut self, index: usize, weight: f32) -> bool {
        match self.weights.get_mut(index) {
            Some(w) => {
                *w = weight;
                true
            }
            None => false,
        }
    }

    pub fn reset_weights(&mut self) {
        self.weights.iter_mut().for_each(|w| *w = 0.0);
    }

    /// 从静态网格重新计算顶点
    ///
    /// 缺失的 Morph 差分或越界的关节下标按无贡献处理。
    pub fn apply_morph_target_and_skinning(&mut self, mesh: &BaseMesh, skinning: Option<&[Mat4]>) {
        self.vertices.clear();
        self.vertices.extend_from_slice(&mesh.vertices);

        // ========== Morph ==========
        for (target, &weight) in mesh.morph_targets.iter().zip(&self.weights) {
            if weight == 0.0 {
                continue;
            }
            for (v, delta) in self.vertices.iter_mut().zip(&target.position_deltas) {
                v.position += *delta * weight;
            }
        }

        // ========== 蒙皮 ==========
        let Some(matrices) = skinning else {
            return;
        };
        if mesh.bindings.len() != self.vertices.len() {
            return;
        }
        for (v, binding) in self.vertices.iter_mut().zip(&mesh.bindings) {
            let (position, normal) = skin_vertex(v.position, v.normal, binding, matrices);
            v.position = position;
            v.normal = normal;
        }
    }
}

fn skin_vertex(position: Vec3, normal: Vec3, binding: &JointBinding, matrices: &[Mat4]) -> (Vec3, Vec3) {
    let mut pos = Vec3::ZERO;
    let mut norm = Vec3::ZERO;
    for i in 0..4 {
        let w = binding.weights[i];
        if w <= 0.0 {
            continue;
        }
        let Some(m) = matrices.get(binding.joints[i] as usize) else {
            continue;
        };
        pos += m.transform_point3(position) * w;
        norm += m.transform_vector3(normal) * w;
    }
    (pos, norm.normalize_or_zero())
}

//! 静态网格数据

use glam::{Vec3, Vec4};

use super::Vertex;
use crate::{Result, VrmError};

/// 顶点的骨骼绑定（最多 4 根）
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct JointBinding {
    pub joints: [u16; 4],
    pub weights: Vec4,
}

/// 绘制单元
#[derive(Clone, Debug, PartialEq)]
pub struct Primitive {
    pub draw_count: u32,
    pub material: Option<usize>,
}

/// Morph Target：与顶点平行的位置差分
#[derive(Clone, Debug, Default)]
pub struct MorphTarget {
    pub name: String,
    pub position_deltas: Vec<Vec3>,
}

/// 基础网格
#[derive(Clone, Debug, Default)]
pub struct BaseMesh {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub primitives: Vec<Primitive>,
    /// 为空（无蒙皮）或与 `vertices` 等长
    pub bindings: Vec<JointBinding>,
    pub morph_targets: Vec<MorphTarget>,
}

impl BaseMesh {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn is_skinned(&self) -> bool {
        !self.bindings.is_empty()
    }

    /// 追加顶点位置，返回起始偏移
    pub fn add_positions(&mut self, positions: &[Vec3]) -> usize {
        let offset = self.vertices.len();
        self.vertices.extend(positions.iter().map(|&position| Vertex {
            position,
            ..Default::default()
        }));
        offset
    }

    pub fn set_normals(&mut self, offset: usize, normals: &[Vec3]) -> Result<()> {
        let dst = self.range_mut(offset, normals.len(), "NORMAL")?;
        for (v, n) in dst.iter_mut().zip(normals) {
            v.normal = *n;
        }
        Ok(())
    }

    pub fn set_uvs(&mut self, offset: usize, uvs: &[glam::Vec2]) -> Result<()> {
        let dst = self.range_mut(offset, uvs.len(), "TEXCOORD_0")?;
        for (v, uv) in dst.iter_mut().zip(uvs) {
            v.uv = *uv;
        }
        Ok(())
    }

    /// 设置骨骼绑定；之前没有绑定的部分用零权重补齐
    pub fn set_bindings(&mut self, offset: usize, joints: &[[u16; 4]], weights: &[Vec4]) -> Result<()> {
        if joints.len() != weights.len() || offset + joints.len() > self.vertices.len() {
            return Err(VrmError::Mesh(format!(
                "{}: JOINTS_0 ({}) / WEIGHTS_0 ({}) do not match vertices",
                self.name,
                joints.len(),
                weights.len()
            )));
        }
        if self.bindings.len() < self.vertices.len() {
            self.bindings.resize(self.vertices.len(), JointBinding::default());
        }
        for (i, (j, w)) in joints.iter().zip(weights).enumerate() {
            self.bindings[offset + i] = JointBinding {
                joints: *j,
                weights: *w,
            };
        }
        Ok(())
    }

    /// 取得或创建第 `index` 个 Morph Target
    pub fn morph_target_mut(&mut self, index: usize) -> &mut MorphTarget {
        if self.morph_targets.len() <= index {
            self.morph_targets.resize_with(index + 1, MorphTarget::default);
        }
        &mut self.morph_targets[index]
    }

    /// 在顶点偏移 `offset` 处写入 Morph 差分；之前的部分补零
    pub fn set_morph_positions(&mut self, index: usize, offset: usize, deltas: &[Vec3]) -> Result<()> {
        if offset + deltas.len() > self.vertices.len() {
            return Err(VrmError::Mesh(format!(
                "{}: morph target {} longer than vertex buffer",
                self.name, index
            )));
        }
        let target = self.morph_target_mut(index);
        if target.position_deltas.len() < offset + deltas.len() {
            target.position_deltas.resize(offset + deltas.len(), Vec3::ZERO);
        }
        target.position_deltas[offset..offset + deltas.len()].copy_from_slice(deltas);
        Ok(())
    }

    /// 追加索引（加上顶点偏移）并登记一个图元
    pub fn add_primitive(&mut self, offset: u32, indices: &[u32], material: Option<usize>) -> Result<()> {
        let vertex_count = self.vertices.len() as u64;
        if let Some(bad) = indices.iter().find(|&&i| (i as u64 + offset as u64) >= vertex_count) {
            return Err(VrmError::Mesh(format!(
                "{}: index {} out of {} vertices",
                self.name,
                bad + offset,
                vertex_count
            )));
        }
        self.indices.extend(indices.iter().map(|i| i + offset));
        self.primitives.push(Primitive {
            draw_count: indices.len() as u32,
            material,
        });
        Ok(())
    }

    fn range_mut(&mut self, offset: usize, len: usize, what: &str) -> Result<&mut [Vertex]> {
        if offset + len > self.vertices.len() {
            return Err(VrmError::Mesh(format!(
                "{}: {} longer than vertex buffer",
                self.name, what
            )));
        }
        Ok(&mut self.vertices[offset..offset + len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_offset_indices() {
        let mut mesh = BaseMesh::new("m");
        let a = mesh.add_positions(&[Vec3::ZERO, Vec3::X, Vec3::Y]);
        mesh.add_primitive(a as u32, &[0, 1, 2], None).unwrap();
        let b = mesh.add_positions(&[Vec3::Z, Vec3::ONE, Vec3::NEG_X]);
        mesh.add_primitive(b as u32, &[0, 1, 2], Some(1)).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(mesh.primitives.len(), 2);
        assert!(mesh.add_primitive(0, &[9], None).is_err());
    }

    #[test]
    fn morph_targets_pad_to_vertex_offset() {
        let mut mesh = BaseMesh::new("m");
        mesh.add_positions(&[Vec3::ZERO; 2]);
        let offset = mesh.add_positions(&[Vec3::ZERO; 2]);
        mesh.set_morph_positions(0, offset, &[Vec3::X, Vec3::Y]).unwrap();
        assert_eq!(
            mesh.morph_targets[0].position_deltas,
            vec![Vec3::ZERO, Vec3::ZERO, Vec3::X, Vec3::Y]
        );
    }
}

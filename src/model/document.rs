//! glTF 文档视图与二进制访问器
//!
//! JSON 解析不在本 crate 内；调用方把已经解析好的文档填进这些结构，
//! 再通过 [`Bin::get_accessor`] 读取类型化的缓冲区数据。

use byteorder::{ByteOrder, LittleEndian};
use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

use crate::humanoid::VrmVersion;
use crate::physics::SpringColliderShape;
use crate::{Result, VrmError};

// ========== 访问器 ==========

/// 分量类型（glTF componentType）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentType {
    I8,
    U8,
    I16,
    U16,
    U32,
    F32,
}

impl ComponentType {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            5120 => Some(Self::I8),
            5121 => Some(Self::U8),
            5122 => Some(Self::I16),
            5123 => Some(Self::U16),
            5125 => Some(Self::U32),
            5126 => Some(Self::F32),
            _ => None,
        }
    }

    pub fn size(self) -> usize {
        match self {
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::U32 | Self::F32 => 4,
        }
    }
}

/// 元素类型（glTF type）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessorType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
}

impl AccessorType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "SCALAR" => Some(Self::Scalar),
            "VEC2" => Some(Self::Vec2),
            "VEC3" => Some(Self::Vec3),
            "VEC4" => Some(Self::Vec4),
            "MAT4" => Some(Self::Mat4),
            _ => None,
        }
    }

    pub fn component_count(self) -> usize {
        match self {
            Self::Scalar => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 => 4,
            Self::Mat4 => 16,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Accessor {
    pub buffer_view: Option<usize>,
    pub byte_offset: usize,
    pub component_type: ComponentType,
    pub accessor_type: AccessorType,
    pub count: usize,
}

impl Accessor {
    /// 单个元素的字节数
    pub fn element_size(&self) -> usize {
        self.component_type.size() * self.accessor_type.component_count()
    }
}

#[derive(Clone, Debug)]
pub struct BufferView {
    pub byte_offset: usize,
    pub byte_length: usize,
    pub byte_stride: Option<usize>,
}

// ========== 节点 / 网格 / 蒙皮 / 动画 ==========

#[derive(Clone, Debug, Default)]
pub struct GltfNode {
    pub name: String,
    pub children: Vec<usize>,
    pub translation: Option<[f32; 3]>,
    pub rotation: Option<[f32; 4]>,
    pub scale: Option<[f32; 3]>,
    /// 列主序矩阵；与 TRS 同时存在时优先
    pub matrix: Option<[f32; 16]>,
    pub mesh: Option<usize>,
    pub skin: Option<usize>,
    /// VRMC_node_constraint
    pub constraint: Option<ConstraintDesc>,
}

/// 图元属性；两个图元属性完全相同时共享同一个顶点缓冲
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrimitiveAttributes {
    pub position: Option<usize>,
    pub normal: Option<usize>,
    pub texcoord0: Option<usize>,
    pub joints0: Option<usize>,
    pub weights0: Option<usize>,
}

#[derive(Clone, Debug, Default)]
pub struct MorphTargetAttributes {
    pub position: Option<usize>,
}

#[derive(Clone, Debug, Default)]
pub struct GltfPrimitive {
    pub attributes: PrimitiveAttributes,
    pub indices: Option<usize>,
    pub material: Option<usize>,
    pub targets: Vec<MorphTargetAttributes>,
}

#[derive(Clone, Debug, Default)]
pub struct GltfMesh {
    pub name: String,
    pub primitives: Vec<GltfPrimitive>,
    pub target_names: Vec<String>,
}

#[derive(Clone, Debug, Default)]
pub struct GltfSkin {
    pub name: String,
    pub joints: Vec<usize>,
    pub inverse_bind_matrices: Option<usize>,
    pub skeleton: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct GltfSampler {
    pub input: usize,
    pub output: usize,
}

#[derive(Clone, Debug)]
pub struct GltfChannel {
    pub sampler: usize,
    pub node: Option<usize>,
    /// "translation" / "rotation" / "scale" / "weights"
    pub path: String,
}

#[derive(Clone, Debug, Default)]
pub struct GltfAnimation {
    pub name: String,
    pub samplers: Vec<GltfSampler>,
    pub channels: Vec<GltfChannel>,
}

// ========== VRM 扩展 ==========

/// VRMC_node_constraint 描述
#[derive(Clone, Debug)]
pub struct ConstraintDesc {
    /// "roll" / "aim" / "rotation"
    pub kind: String,
    pub source: usize,
    pub weight: Option<f32>,
    /// rollAxis 或 aimAxis
    pub axis: Option<String>,
}

#[derive(Clone, Debug)]
pub struct MorphBindDesc {
    /// VRM1 为节点下标，VRM0 为网格下标
    pub target: usize,
    pub index: usize,
    /// VRM1: [0, 1]，VRM0: [0, 100]
    pub weight: f32,
}

#[derive(Clone, Debug, Default)]
pub struct ExpressionDesc {
    /// 预设名（VRM0 为 presetName，VRM1 为键名），自定义表情为空
    pub preset: String,
    pub name: String,
    pub is_binary: bool,
    pub morph_binds: Vec<MorphBindDesc>,
}

#[derive(Clone, Debug)]
pub struct ColliderDesc {
    pub node: usize,
    pub shape: SpringColliderShape,
}

#[derive(Clone, Debug)]
pub struct SpringJointDesc {
    pub node: usize,
    pub stiffness: f32,
    pub drag_force: f32,
    pub hit_radius: f32,
    pub gravity_power: f32,
    pub gravity_dir: Vec3,
}

/// 弹簧骨骼组
///
/// VRM1 显式列出关节；VRM0 只给根节点，关节由层级递归生成。
#[derive(Clone, Debug)]
pub enum SpringDesc {
    Joints {
        name: String,
        joints: Vec<SpringJointDesc>,
        collider_groups: Vec<usize>,
    },
    Recursive {
        name: String,
        roots: Vec<usize>,
        stiffness: f32,
        drag_force: f32,
        hit_radius: f32,
        gravity_power: f32,
        gravity_dir: Vec3,
        collider_groups: Vec<usize>,
    },
}

#[derive(Clone, Debug, Default)]
pub struct VrmExtension {
    pub version: VrmVersion,
    /// (骨骼名, 节点下标)
    pub human_bones: Vec<(String, usize)>,
    pub expressions: Vec<ExpressionDesc>,
    pub colliders: Vec<ColliderDesc>,
    /// 每组是 `colliders` 的下标列表
    pub collider_groups: Vec<Vec<usize>>,
    pub springs: Vec<SpringDesc>,
}

/// 已解析的 glTF 文档
#[derive(Clone, Debug, Default)]
pub struct GltfRoot {
    pub nodes: Vec<GltfNode>,
    pub meshes: Vec<GltfMesh>,
    pub skins: Vec<GltfSkin>,
    pub animations: Vec<GltfAnimation>,
    pub accessors: Vec<Accessor>,
    pub buffer_views: Vec<BufferView>,
    pub vrm: Option<VrmExtension>,
}

// ========== 二进制读取 ==========

/// 可以从访问器读取的元素类型
pub trait AccessorElement: Sized {
    const COMPONENT: ComponentType;
    const TYPE: AccessorType;

    /// 从小端字节解码一个元素（`bytes` 长度保证足够）
    fn read(bytes: &[u8]) -> Self;
}

fn read_f32s<const N: usize>(bytes: &[u8]) -> [f32; N] {
    let mut out = [0.0; N];
    LittleEndian::read_f32_into(&bytes[..N * 4], &mut out);
    out
}

impl AccessorElement for f32 {
    const COMPONENT: ComponentType = ComponentType::F32;
    const TYPE: AccessorType = AccessorType::Scalar;
    fn read(bytes: &[u8]) -> Self {
        LittleEndian::read_f32(bytes)
    }
}

impl AccessorElement for Vec2 {
    const COMPONENT: ComponentType = ComponentType::F32;
    const TYPE: AccessorType = AccessorType::Vec2;
    fn read(bytes: &[u8]) -> Self {
        Vec2::from_array(read_f32s::<2>(bytes))
    }
}

impl AccessorElement for Vec3 {
    const COMPONENT: ComponentType = ComponentType::F32;
    const TYPE: AccessorType = AccessorType::Vec3;
    fn read(bytes: &[u8]) -> Self {
        Vec3::from_array(read_f32s::<3>(bytes))
    }
}

impl AccessorElement for Vec4 {
    const COMPONENT: ComponentType = ComponentType::F32;
    const TYPE: AccessorType = AccessorType::Vec4;
    fn read(bytes: &[u8]) -> Self {
        Vec4::from_array(read_f32s::<4>(bytes))
    }
}

impl AccessorElement for Quat {
    const COMPONENT: ComponentType = ComponentType::F32;
    const TYPE: AccessorType = AccessorType::Vec4;
    fn read(bytes: &[u8]) -> Self {
        Quat::from_array(read_f32s::<4>(bytes))
    }
}

impl AccessorElement for Mat4 {
    const COMPONENT: ComponentType = ComponentType::F32;
    const TYPE: AccessorType = AccessorType::Mat4;
    fn read(bytes: &[u8]) -> Self {
        Mat4::from_cols_array(&read_f32s::<16>(bytes))
    }
}

impl AccessorElement for u8 {
    const COMPONENT: ComponentType = ComponentType::U8;
    const TYPE: AccessorType = AccessorType::Scalar;
    fn read(bytes: &[u8]) -> Self {
        bytes[0]
    }
}

impl AccessorElement for u16 {
    const COMPONENT: ComponentType = ComponentType::U16;
    const TYPE: AccessorType = AccessorType::Scalar;
    fn read(bytes: &[u8]) -> Self {
        LittleEndian::read_u16(bytes)
    }
}

impl AccessorElement for u32 {
    const COMPONENT: ComponentType = ComponentType::U32;
    const TYPE: AccessorType = AccessorType::Scalar;
    fn read(bytes: &[u8]) -> Self {
        LittleEndian::read_u32(bytes)
    }
}

impl AccessorElement for [u8; 4] {
    const COMPONENT: ComponentType = ComponentType::U8;
    const TYPE: AccessorType = AccessorType::Vec4;
    fn read(bytes: &[u8]) -> Self {
        [bytes[0], bytes[1], bytes[2], bytes[3]]
    }
}

impl AccessorElement for [u16; 4] {
    const COMPONENT: ComponentType = ComponentType::U16;
    const TYPE: AccessorType = AccessorType::Vec4;
    fn read(bytes: &[u8]) -> Self {
        let mut out = [0u16; 4];
        LittleEndian::read_u16_into(&bytes[..8], &mut out);
        out
    }
}

/// GLB 的二进制块
#[derive(Clone, Debug, Default)]
pub struct Bin {
    pub bytes: Vec<u8>,
}

impl Bin {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// 读取访问器的全部元素
    ///
    /// 检查分量类型和元素类型与 `T` 一致，并对缓冲视图和二进制块做越界检查。
    pub fn get_accessor<T: AccessorElement>(&self, root: &GltfRoot, index: usize) -> Result<Vec<T>> {
        let accessor = root
            .accessors
            .get(index)
            .ok_or_else(|| VrmError::Accessor(format!("accessor {} not found", index)))?;
        if accessor.component_type != T::COMPONENT || accessor.accessor_type != T::TYPE {
            return Err(VrmError::Accessor(format!(
                "accessor {}: expected {:?}/{:?}, found {:?}/{:?}",
                index, T::COMPONENT, T::TYPE, accessor.component_type, accessor.accessor_type
            )));
        }
        let view_index = accessor
            .buffer_view
            .ok_or_else(|| VrmError::Accessor(format!("accessor {}: no bufferView", index)))?;
        let view = root
            .buffer_views
            .get(view_index)
            .ok_or_else(|| VrmError::Accessor(format!("bufferView {} not found", view_index)))?;

        let element_size = accessor.element_size();
        let stride = view.byte_stride.unwrap_or(element_size);
        if stride < element_size {
            return Err(VrmError::Accessor(format!(
                "accessor {}: stride {} < element size {}",
                index, stride, element_size
            )));
        }

        let overflow = || VrmError::Accessor(format!("accessor {}: byte range overflows", index));
        let start = view
            .byte_offset
            .checked_add(accessor.byte_offset)
            .ok_or_else(overflow)?;
        let view_end = view
            .byte_offset
            .checked_add(view.byte_length)
            .ok_or_else(overflow)?;
        let end = match accessor.count {
            0 => start,
            n => stride
                .checked_mul(n - 1)
                .and_then(|span| span.checked_add(start))
                .and_then(|last| last.checked_add(element_size))
                .ok_or_else(overflow)?,
        };
        if end > view_end || view_end > self.bytes.len() {
            return Err(VrmError::Accessor(format!(
                "accessor {}: range {}..{} out of buffer ({} bytes)",
                index,
                start,
                end,
                self.bytes.len()
            )));
        }

        Ok((0..accessor.count)
            .map(|i| {
                let offset = start + i * stride;
                T::read(&self.bytes[offset..offset + element_size])
            })
            .collect())
    }

    /// 读取索引缓冲，统一为 u32（支持 u8/u16/u32）
    pub fn get_indices(&self, root: &GltfRoot, index: usize) -> Result<Vec<u32>> {
        let accessor = root
            .accessors
            .get(index)
            .ok_or_else(|| VrmError::Accessor(format!("accessor {} not found", index)))?;
        match accessor.component_type {
            ComponentType::U8 => Ok(self
                .get_accessor::<u8>(root, index)?
                .into_iter()
                .map(u32::from)
                .collect()),
            ComponentType::U16 => Ok(self
                .get_accessor::<u16>(root, index)?
                .into_iter()
                .map(u32::from)
                .collect()),
            ComponentType::U32 => self.get_accessor::<u32>(root, index),
            other => Err(VrmError::IndexType(format!(
                "accessor {}: {:?} is not an index type",
                index, other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_with(accessor: Accessor, view: BufferView) -> GltfRoot {
        GltfRoot {
            accessors: vec![accessor],
            buffer_views: vec![view],
            ..Default::default()
        }
    }

    #[test]
    fn reads_strided_vec3() {
        let mut bytes = Vec::new();
        for v in [[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]] {
            for f in v {
                bytes.extend_from_slice(&f.to_le_bytes());
            }
            bytes.extend_from_slice(&[0u8; 4]);
        }
        let root = root_with(
            Accessor {
                buffer_view: Some(0),
                byte_offset: 0,
                component_type: ComponentType::F32,
                accessor_type: AccessorType::Vec3,
                count: 2,
            },
            BufferView {
                byte_offset: 0,
                byte_length: bytes.len(),
                byte_stride: Some(16),
            },
        );
        let bin = Bin::new(bytes);
        let values = bin.get_accessor::<Vec3>(&root, 0).unwrap();
        assert_eq!(values, vec![Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 5.0, 6.0)]);
    }

    #[test]
    fn huge_count_or_offset_is_an_error() {
        let view = BufferView {
            byte_offset: 0,
            byte_length: 12,
            byte_stride: None,
        };
        let accessor = Accessor {
            buffer_view: Some(0),
            byte_offset: 0,
            component_type: ComponentType::F32,
            accessor_type: AccessorType::Vec3,
            count: usize::MAX / 4,
        };
        let bin = Bin::new(vec![0u8; 12]);
        let root = root_with(accessor.clone(), view.clone());
        assert!(matches!(bin.get_accessor::<Vec3>(&root, 0), Err(VrmError::Accessor(_))));

        let root = root_with(
            Accessor {
                byte_offset: usize::MAX,
                count: 1,
                ..accessor.clone()
            },
            view.clone(),
        );
        assert!(matches!(bin.get_accessor::<Vec3>(&root, 0), Err(VrmError::Accessor(_))));

        let root = root_with(
            Accessor { count: 1, ..accessor },
            BufferView {
                byte_offset: usize::MAX,
                ..view
            },
        );
        assert!(matches!(bin.get_accessor::<Vec3>(&root, 0), Err(VrmError::Accessor(_))));
    }

    #[test]
    fn rejects_type_mismatch_and_overflow() {
        let root = root_with(
            Accessor {
                buffer_view: Some(0),
                byte_offset: 0,
                component_type: ComponentType::F32,
                accessor_type: AccessorType::Vec3,
                count: 4,
            },
            BufferView {
                byte_offset: 0,
                byte_length: 24,
                byte_stride: None,
            },
        );
        let bin = Bin::new(vec![0; 24]);
        assert!(matches!(bin.get_accessor::<Vec2>(&root, 0), Err(VrmError::Accessor(_))));
        assert!(matches!(bin.get_accessor::<Vec3>(&root, 0), Err(VrmError::Accessor(_))));
        assert!(bin.get_accessor::<Vec3>(&root, 7).is_err());
    }

    #[test]
    fn index_widths() {
        let mut bytes = vec![1u8, 2, 3, 0];
        bytes.extend_from_slice(&7u16.to_le_bytes());
        let root = GltfRoot {
            accessors: vec![
                Accessor {
                    buffer_view: Some(0),
                    byte_offset: 0,
                    component_type: ComponentType::U8,
                    accessor_type: AccessorType::Scalar,
                    count: 3,
                },
                Accessor {
                    buffer_view: Some(0),
                    byte_offset: 4,
                    component_type: ComponentType::U16,
                    accessor_type: AccessorType::Scalar,
                    count: 1,
                },
                Accessor {
                    buffer_view: Some(0),
                    byte_offset: 0,
                    component_type: ComponentType::F32,
                    accessor_type: AccessorType::Scalar,
                    count: 1,
                },
            ],
            buffer_views: vec![BufferView {
                byte_offset: 0,
                byte_length: 6,
                byte_stride: None,
            }],
            ..Default::default()
        };
        let bin = Bin::new(bytes);
        assert_eq!(bin.get_indices(&root, 0).unwrap(), vec![1, 2, 3]);
        assert_eq!(bin.get_indices(&root, 1).unwrap(), vec![7]);
        assert!(matches!(bin.get_indices(&root, 2), Err(VrmError::IndexType(_))));
    }
}

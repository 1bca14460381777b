//! VRM/glTF 模型：文档访问、基础场景与运行时场景

mod document;
mod loader;
mod mesh;
mod node;
mod runtime;
mod scene;
mod skin;

pub use document::{
    Accessor, AccessorElement, AccessorType, Bin, BufferView, ColliderDesc, ComponentType,
    ConstraintDesc, ExpressionDesc, GltfAnimation, GltfChannel, GltfMesh, GltfNode, GltfPrimitive,
    GltfRoot, GltfSampler, GltfSkin, MorphBindDesc, MorphTargetAttributes, PrimitiveAttributes,
    SpringDesc, SpringJointDesc, VrmExtension,
};
pub use loader::{parse_animation, parse_mesh, parse_skin};
pub use mesh::{BaseMesh, JointBinding, MorphTarget, Primitive};
pub use node::BaseNode;
pub use runtime::RuntimeScene;
pub use scene::BaseScene;
pub use skin::Skin;

use glam::{Mat4, Vec2, Vec3};

/// 顶点数据
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

/// 交给渲染端的绘制项
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawItem {
    pub mesh_index: usize,
    pub world_matrix: Mat4,
}

//! 运行时场景：每帧求值管线

use glam::Mat4;
use std::collections::HashMap;
use std::sync::Arc;

use super::{BaseScene, DrawItem};
use crate::gizmo::GizmoDrawer;
use crate::humanoid::{apply_pose, extract_pose, HumanPose};
use crate::morph::Expressions;
use crate::physics::{get_config, RuntimeSpringCollision, RuntimeSpringJoint, SpringConfig};
use crate::skeleton::{RuntimeNode, RuntimeNodeGraph};
use crate::skinning::{compute_skinning_matrices, DeformedMesh};

/// 按需创建网格的变形缓冲
fn deformed_entry<'a>(
    meshes: &'a mut HashMap<usize, DeformedMesh>,
    base: &BaseScene,
    mesh_index: usize,
) -> Option<&'a mut DeformedMesh> {
    let mesh = base.meshes.get(mesh_index)?;
    Some(meshes.entry(mesh_index).or_insert_with(|| {
        log::debug!("创建变形网格 {} ({})", mesh_index, mesh.name);
        DeformedMesh::new(mesh)
    }))
}

/// 运行时场景
///
/// 持有基础场景的共享引用、可变的节点层级，以及按需创建的缓存：
/// 变形网格（按网格下标）、弹簧关节状态（按 (骨骼组, 关节)）、碰撞状态（按骨骼组）。
/// 只在单线程中按帧驱动。
pub struct RuntimeScene {
    base: Arc<BaseScene>,
    graph: RuntimeNodeGraph,
    expressions: Expressions,

    deformed_meshes: HashMap<usize, DeformedMesh>,
    spring_joints: HashMap<(usize, usize), RuntimeSpringJoint>,
    spring_collisions: HashMap<usize, RuntimeSpringCollision>,

    /// 下一帧的弹簧模拟步长（消费后清零）
    next_spring_delta: f32,

    draw_items: Vec<DrawItem>,
    shape_matrices: Vec<Mat4>,
}

impl RuntimeScene {
    pub fn new(base: Arc<BaseScene>) -> Self {
        let graph = RuntimeNodeGraph::new(base.nodes());
        let expressions = base.expressions.clone();
        log::info!("创建运行时场景: {} 节点", graph.len());
        Self {
            base,
            graph,
            expressions,
            deformed_meshes: HashMap::new(),
            spring_joints: HashMap::new(),
            spring_collisions: HashMap::new(),
            next_spring_delta: 0.0,
            draw_items: Vec::new(),
            shape_matrices: Vec::new(),
        }
    }

    /// 回到静止姿势，丢弃所有缓存和模拟状态
    pub fn reset(&mut self) {
        self.graph.reset(self.base.nodes());
        self.expressions = self.base.expressions.clone();
        self.deformed_meshes.clear();
        self.spring_joints.clear();
        self.spring_collisions.clear();
        self.next_spring_delta = 0.0;
        log::info!("运行时场景已重置");
    }

    pub fn base(&self) -> &Arc<BaseScene> {
        &self.base
    }

    pub fn graph(&self) -> &RuntimeNodeGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut RuntimeNodeGraph {
        &mut self.graph
    }

    pub fn runtime_node(&self, index: usize) -> Option<&RuntimeNode> {
        self.graph.get(index)
    }

    pub fn runtime_node_mut(&mut self, index: usize) -> Option<&mut RuntimeNode> {
        self.graph.get_mut(index)
    }

    pub fn expressions(&self) -> &Expressions {
        &self.expressions
    }

    pub fn expressions_mut(&mut self) -> &mut Expressions {
        &mut self.expressions
    }

    /// 网格的变形缓冲（首次访问时创建）；网格不存在时返回 None
    pub fn deformed_mesh(&mut self, mesh_index: usize) -> Option<&mut DeformedMesh> {
        deformed_entry(&mut self.deformed_meshes, &self.base, mesh_index)
    }

    /// 弹簧关节的模拟状态（尚未模拟过时为 None）
    pub fn spring_joint(&self, bone: usize, joint: usize) -> Option<&RuntimeSpringJoint> {
        self.spring_joints.get(&(bone, joint))
    }

    // ========== 动画 ==========

    /// 采样动画写入本地变换和 Morph 权重；动画不存在时返回 false
    pub fn update_animation(&mut self, index: usize, seconds: f32, repeat: bool) -> bool {
        let base = Arc::clone(&self.base);
        let Some(animation) = base.animations.get(index) else {
            return false;
        };
        animation.apply(seconds, repeat, &mut self.graph);

        for (node, weights) in animation.sample_weights(seconds, repeat) {
            let Some(mesh) = base.node(node).and_then(|n| n.mesh) else {
                continue;
            };
            if let Some(deformed) = deformed_entry(&mut self.deformed_meshes, &base, mesh) {
                for (i, &w) in weights.iter().enumerate() {
                    deformed.set_weight(i, w);
                }
            }
        }
        true
    }

    pub fn set_next_spring_delta(&mut self, delta_time: f32) {
        self.next_spring_delta = delta_time;
    }

    // ========== 帧管线 ==========

    /// 求值一帧并返回绘制列表
    ///
    /// 顺序：约束 -> 世界矩阵 -> 弹簧骨骼 -> 表情 -> 蒙皮矩阵 -> 变形 -> 绘制项。
    pub fn drawables(&mut self) -> &[DrawItem] {
        let base = Arc::clone(&self.base);

        // ========== 约束 ==========
        for i in 0..self.graph.len() {
            let Some(constraint) = self.graph.get(i).and_then(|n| n.constraint.clone()) else {
                continue;
            };
            constraint.process(i, base.nodes(), &mut self.graph);
        }

        // ========== 世界矩阵 ==========
        let roots = self.graph.roots().to_vec();
        for root in roots {
            self.graph.calc_world_matrix(root, true);
        }

        // ========== 弹簧骨骼 ==========
        self.update_springs(&base, &get_config());

        // ========== 表情 ==========
        let morph_targets = self.expressions.eval_morph_target_map();
        for (key, &weight) in morph_targets {
            let Some(mesh) = base.node(key.node).and_then(|n| n.mesh) else {
                continue;
            };
            if let Some(deformed) = deformed_entry(&mut self.deformed_meshes, &base, mesh) {
                deformed.set_weight(key.morph, weight);
            }
        }

        // ========== 蒙皮 / 变形 / 绘制项 ==========
        self.draw_items.clear();
        for (i, node) in base.nodes().iter().enumerate() {
            let Some(mesh_index) = node.mesh else {
                continue;
            };
            let Some(mesh) = base.meshes.get(mesh_index) else {
                continue;
            };
            let skinning = node
                .skin
                .and_then(|s| base.skins.get(s))
                .map(|skin| compute_skinning_matrices(skin, i, &self.graph));
            if let Some(deformed) = deformed_entry(&mut self.deformed_meshes, &base, mesh_index) {
                deformed.apply_morph_target_and_skinning(mesh, skinning.as_deref());
            }
            self.draw_items.push(DrawItem {
                mesh_index,
                world_matrix: self.graph.world_matrix(i),
            });
        }

        &self.draw_items
    }

    /// 消费 `next_spring_delta` 推进所有弹簧关节
    fn update_springs(&mut self, base: &BaseScene, config: &SpringConfig) {
        let delta_time = std::mem::take(&mut self.next_spring_delta);
        if !config.enabled || delta_time <= 0.0 {
            return;
        }
        let delta_time = delta_time.min(config.max_delta_time);

        for (bi, bone) in base.spring_bones.iter().enumerate() {
            let collision = self
                .spring_collisions
                .entry(bi)
                .or_insert_with(|| RuntimeSpringCollision::new(bone, &base.spring_collider_groups));
            for (ji, joint) in bone.joints.iter().enumerate() {
                let state = self.spring_joints.entry((bi, ji)).or_insert_with(|| {
                    log::debug!("创建弹簧关节状态 {}[{}] (head = {})", bone.comment, ji, joint.head);
                    RuntimeSpringJoint::new(joint, base.nodes())
                });
                state.update(
                    joint,
                    base.nodes(),
                    &mut self.graph,
                    delta_time,
                    collision,
                    &base.spring_colliders,
                    config,
                );
            }
        }
    }

    /// 每个节点的调试形状世界矩阵
    pub fn shape_matrices(&mut self) -> &[Mat4] {
        self.shape_matrices.clear();
        for (i, node) in self.base.nodes().iter().enumerate() {
            self.shape_matrices
                .push(self.graph.world_matrix(i) * node.shape_matrix);
        }
        &self.shape_matrices
    }

    /// 输出碰撞体和弹簧关节的调试图元
    pub fn draw_gizmo(&self, gizmo: &mut dyn GizmoDrawer) {
        for collider in &self.base.spring_colliders {
            collider.draw_gizmo(&self.graph, gizmo);
        }
        for (bi, bone) in self.base.spring_bones.iter().enumerate() {
            for (ji, joint) in bone.joints.iter().enumerate() {
                if let Some(state) = self.spring_joints.get(&(bi, ji)) {
                    state.draw_gizmo(joint, &self.graph, gizmo);
                }
            }
        }
    }

    // ========== Humanoid ==========

    pub fn update_human_pose(&self) -> HumanPose {
        extract_pose(&self.base, &self.graph)
    }

    pub fn set_human_pose(&mut self, pose: &HumanPose) -> bool {
        apply_pose(&self.base, &mut self.graph, pose)
    }

    /// 自顶向下重新计算所有世界矩阵
    pub fn sync_hierarchy(&mut self) -> bool {
        self.graph.sync_hierarchy()
    }
}

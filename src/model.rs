mod animation;
mod draw;
mod flags;
mod image;
mod loader;
mod material;
mod mesh;
mod node;
mod skin;
mod transform;
mod vertex;

#[cfg(test)]
pub(crate) mod test_gltf;

pub use animation::*;
pub use draw::*;
pub use flags::*;
pub use image::*;
pub use material::*;
pub use mesh::*;
pub use node::*;
pub use skin::*;
pub use transform::*;
pub use vertex::*;

use ultraviolet::Mat4;

use crate::error::{ModelError, ModelResult};

/// A glTF scene flattened into shared vertex and index arrays plus a node hierarchy.
///
/// `nodes` is stored depth-first post-order: children come before their parent and root
/// trees follow the scene order. A [`NodeId`] is a position in that list.
#[derive(Clone, Debug)]
pub struct Model {
    pub nodes: Vec<Node>,
    pub root_nodes: Vec<NodeId>,
    pub skins: Vec<Skin>,
    pub images: Vec<TextureImage>,
    /// The last entry is the default material.
    pub materials: Vec<Material>,
    pub animations: Vec<Animation>,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub dimensions: Dimensions,
    pub metallic_roughness_workflow: bool,
    pub extensions: Vec<String>,
    pub file_loading_flags: FileLoadingFlags,
    /// Uniform scale applied on top of every root node.
    pub scale: f32,
}

impl Model {
    pub fn linear_nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, node)| (NodeId(i), node))
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn default_material(&self) -> usize {
        self.materials.len() - 1
    }

    /// Depth-first search through the scene for the node with glTF index `index`.
    pub fn node_from_index(&self, index: usize) -> Option<NodeId> {
        self.root_nodes
            .iter()
            .find_map(|root| self.find_node(*root, index))
    }

    fn find_node(&self, id: NodeId, index: usize) -> Option<NodeId> {
        let node = self.node(id);
        if node.index == index {
            return Some(id);
        }
        node.children
            .iter()
            .find_map(|child| self.find_node(*child, index))
    }

    /// Product of the local matrices from the root down to `id`.
    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let mut matrix = self.node(id).local_matrix();
        let mut parent = self.node(id).parent;
        while let Some(parent_id) = parent {
            let parent_node = self.node(parent_id);
            matrix = parent_node.local_matrix() * matrix;
            parent = parent_node.parent;
        }
        if self.scale != 1.0 {
            matrix = Mat4::from_scale(self.scale) * matrix;
        }
        matrix
    }

    /// Recomputes the uniform block of every mesh node from the current node transforms.
    pub fn update(&mut self) {
        for i in 0..self.nodes.len() {
            if self.nodes[i].mesh.is_none() {
                continue;
            }

            let id = NodeId(i);
            let world = self.world_matrix(id);
            let joints = self.nodes[i]
                .skin
                .and_then(|skin| self.skins.get(skin))
                .map(|skin| self.joint_matrices(skin, world));

            if let Some(mesh) = self.nodes[i].mesh.as_mut() {
                mesh.uniform.matrix = world;
                if let Some(joints) = joints {
                    mesh.uniform.joint_matrices[..joints.len()].copy_from_slice(&joints);
                    mesh.uniform.joint_count = joints.len() as f32;
                }
            }
        }
    }

    fn joint_matrices(&self, skin: &Skin, world: Mat4) -> Vec<Mat4> {
        if skin.joints.len() > MAX_NUM_JOINTS {
            log::warn!(
                "Skin {:?} has {} joints, only the first {} are used",
                skin.name,
                skin.joints.len(),
                MAX_NUM_JOINTS
            );
        }

        let inverse_world = world.inversed();
        skin.joints
            .iter()
            .take(MAX_NUM_JOINTS)
            .enumerate()
            .map(|(i, joint)| {
                inverse_world * self.world_matrix(*joint) * skin.inverse_bind_matrix(i)
            })
            .collect()
    }

    /// Poses the model at `time` seconds into animation `index`.
    /// Returns whether any channel had a keyframe interval containing `time`.
    pub fn update_animation(&mut self, index: usize, time: f32) -> ModelResult<bool> {
        let animation = self
            .animations
            .get(index)
            .ok_or(ModelError::AnimationOutOfRange {
                index,
                count: self.animations.len(),
            })?;

        let updated = animation.apply(&mut self.nodes, time);
        if updated {
            self.update();
        }
        Ok(updated)
    }

    /// Union of all primitive bounds in world space.
    pub fn scene_dimensions(&self) -> Dimensions {
        let mut min = Dimensions::empty().min;
        let mut max = Dimensions::empty().max;
        for (id, node) in self.linear_nodes() {
            let Some(mesh) = &node.mesh else {
                continue;
            };
            let world = if self
                .file_loading_flags
                .contains(FileLoadingFlags::PRE_TRANSFORM_VERTICES)
            {
                Mat4::identity()
            } else {
                self.world_matrix(id)
            };
            for primitive in &mesh.primitives {
                let (primitive_min, primitive_max) = primitive.dimensions.transformed(&world);
                min = min.min_by_component(primitive_min);
                max = max.max_by_component(primitive_max);
            }
        }
        Dimensions::new(min, max)
    }
}

use ultraviolet::Mat4;

use super::mesh::Mesh;
use super::transform::Transform;

/// Index into [`Model::nodes`](super::Model::nodes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Clone, Debug)]
pub struct Node {
    /// Index of the node in the glTF document.
    pub index: usize,
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub transform: Transform,
    pub matrix: Mat4,
    pub mesh: Option<Mesh>,
    /// Index into [`Model::skins`](super::Model::skins).
    pub skin: Option<usize>,
}

impl Node {
    pub fn local_matrix(&self) -> Mat4 {
        self.transform.matrix() * self.matrix
    }
}

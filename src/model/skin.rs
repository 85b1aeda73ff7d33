use ultraviolet::Mat4;

use super::node::NodeId;

#[derive(Clone, Debug)]
pub struct Skin {
    pub name: String,
    pub skeleton_root: Option<NodeId>,
    pub inverse_bind_matrices: Vec<Mat4>,
    pub joints: Vec<NodeId>,
}

impl Skin {
    /// Missing inverse bind matrices count as identity.
    pub fn inverse_bind_matrix(&self, joint: usize) -> Mat4 {
        self.inverse_bind_matrices
            .get(joint)
            .copied()
            .unwrap_or_else(Mat4::identity)
    }
}

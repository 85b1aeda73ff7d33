use ultraviolet::{Mat4, Vec3};

pub const MAX_NUM_JOINTS: usize = 128;

/// Per-mesh uniform block, laid out for a std140 uniform buffer.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct MeshUniform {
    pub matrix: Mat4,
    pub joint_matrices: [Mat4; MAX_NUM_JOINTS],
    pub joint_count: f32,
}

impl Default for MeshUniform {
    fn default() -> Self {
        Self {
            matrix: Mat4::identity(),
            joint_matrices: [Mat4::identity(); MAX_NUM_JOINTS],
            joint_count: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dimensions {
    pub min: Vec3,
    pub max: Vec3,
    pub size: Vec3,
    pub center: Vec3,
    pub radius: f32,
}

impl Dimensions {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min,
            max,
            size: max - min,
            center: (min + max) / 2.0,
            radius: (max - min).mag() / 2.0,
        }
    }

    /// Bounds that any real point extends.
    pub fn empty() -> Self {
        Self::new(Vec3::broadcast(f32::MAX), Vec3::broadcast(-f32::MAX))
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Axis-aligned bounds of this box after `transform`.
    pub fn transformed(&self, transform: &Mat4) -> (Vec3, Vec3) {
        let mut min = Vec3::broadcast(f32::MAX);
        let mut max = Vec3::broadcast(-f32::MAX);
        for corner in 0..8 {
            let point = Vec3::new(
                if corner & 1 == 0 { self.min.x } else { self.max.x },
                if corner & 2 == 0 { self.min.y } else { self.max.y },
                if corner & 4 == 0 { self.min.z } else { self.max.z },
            );
            let point = transform.transform_point3(point);
            min = min.min_by_component(point);
            max = max.max_by_component(point);
        }
        (min, max)
    }
}

#[derive(Clone, Debug)]
pub struct Primitive {
    pub first_index: u32,
    pub index_count: u32,
    pub first_vertex: u32,
    pub vertex_count: u32,
    /// Index into [`Model::materials`](super::Model::materials).
    pub material: usize,
    pub dimensions: Dimensions,
}

#[derive(Clone, Debug)]
pub struct Mesh {
    pub name: String,
    pub primitives: Vec<Primitive>,
    pub uniform: MeshUniform,
}

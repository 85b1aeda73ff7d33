use serde::{Deserialize, Serialize};
use ultraviolet::{Isometry3, Mat4, Rotor3, Vec3};

/// Decomposed node transform. Animation channels write into it directly.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Rotor3,
    pub scale: Vec3,
}

impl Transform {
    /// `rotation` is a glTF quaternion in `[x, y, z, w]` order.
    pub fn from_arrays(translation: [f32; 3], rotation: [f32; 4], scale: [f32; 3]) -> Self {
        Self {
            translation: Vec3::from(translation),
            rotation: Rotor3::from_quaternion_array(rotation),
            scale: Vec3::from(scale),
        }
    }

    pub fn matrix(&self) -> Mat4 {
        let isometry = Isometry3::new(self.translation, self.rotation);
        isometry.into_homogeneous_matrix() * Mat4::from_nonuniform_scale(self.scale)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::zero(),
            rotation: Rotor3::identity(),
            scale: Vec3::one(),
        }
    }
}

impl From<Transform> for Mat4 {
    fn from(transform: Transform) -> Self {
        transform.matrix()
    }
}

/// Column-major glTF matrix.
pub fn mat4_from_cols(cols: [[f32; 4]; 4]) -> Mat4 {
    Mat4::new(
        cols[0].into(),
        cols[1].into(),
        cols[2].into(),
        cols[3].into(),
    )
}

#[cfg(test)]
pub(crate) fn assert_vec3_near(actual: Vec3, expected: Vec3) {
    assert!(
        (actual - expected).mag() < 1e-4,
        "expected {:?}, got {:?}",
        expected,
        actual
    );
}

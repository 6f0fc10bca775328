//! Pose normalization: center, rescale and orient a freshly loaded mesh.

use std::f32::consts::{FRAC_PI_2, PI};

use rhino_math::{Mat4, Quat, Vec3};

use crate::mesh::Mesh;

/// Transform components that can be composed into a matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Translation
    pub translation: Vec3,

    /// Rotation (as quaternion)
    pub rotation: Quat,

    /// Scale
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Convert to a 4x4 transformation matrix.
    ///
    /// Order: Scale -> Rotate -> Translate (SRT)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// Settings for the one-time normalization pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Normalization {
    /// Rotation about +Y in radians
    pub yaw: f32,

    /// Turn the model an extra half turn so its back faces the camera
    pub flip_front: bool,

    /// Bounding box diagonal after scaling
    pub target_diameter: f32,
}

impl Default for Normalization {
    fn default() -> Self {
        Self {
            yaw: FRAC_PI_2,
            flip_front: false,
            target_diameter: Self::TARGET_DIAMETER,
        }
    }
}

impl Normalization {
    pub const TARGET_DIAMETER: f32 = 1.8;

    pub fn new(yaw: f32, flip_front: bool) -> Self {
        Self {
            yaw,
            flip_front,
            ..Default::default()
        }
    }

    /// Final yaw including the optional half turn.
    pub fn effective_yaw(&self) -> f32 {
        if self.flip_front {
            self.yaw + PI
        } else {
            self.yaw
        }
    }

    /// Model transform for a mesh as loaded.
    ///
    /// Computed only from the mesh's local bounds, which cover the vertices
    /// faces reference and nothing else. Calling it again for
    /// the same mesh (or after changing yaw/flip) yields the same result as
    /// the first call. The mesh is moved so its box center lands on the
    /// origin, scaled uniformly to `target_diameter`, then turned about +Y.
    /// Empty or zero-size meshes keep unit scale.
    pub fn transform_for(&self, mesh: &Mesh) -> Transform {
        let center = if mesh.bounds.is_empty() {
            Vec3::ZERO
        } else {
            mesh.center()
        };
        let size = mesh.size();
        let scale = if size > f32::EPSILON {
            self.target_diameter / size
        } else {
            1.0
        };
        let rotation = Quat::from_rotation_y(self.effective_yaw());

        Transform {
            translation: rotation * (-center * scale),
            rotation,
            scale: Vec3::splat(scale),
        }
    }

    /// Shorthand for `transform_for(mesh).to_matrix()`.
    pub fn model_matrix(&self, mesh: &Mesh) -> Mat4 {
        self.transform_for(mesh).to_matrix()
    }
}

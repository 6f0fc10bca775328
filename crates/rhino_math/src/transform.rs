// Transform utilities for Mat4
//
// glam::Mat4 already provides transform_point3()/transform_vector3(); this
// adds the bounding-box helper the normalization checks need.

use glam::{Mat4, Vec3};
use crate::Aabb;

/// Extension trait for Mat4 to provide additional transform utilities
pub trait Mat4Ext {
    /// Exact bounds of a point set after transformation.
    fn transformed_bounds(&self, points: &[Vec3]) -> Aabb;
}

impl Mat4Ext for Mat4 {
    fn transformed_bounds(&self, points: &[Vec3]) -> Aabb {
        points
            .iter()
            .fold(Aabb::EMPTY, |aabb, &p| aabb.include_point(self.transform_point3(p)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_corners(hi: Vec3) -> Vec<Vec3> {
        (0..8)
            .map(|i| {
                Vec3::new(
                    if i & 1 == 0 { 0.0 } else { hi.x },
                    if i & 2 == 0 { 0.0 } else { hi.y },
                    if i & 4 == 0 { 0.0 } else { hi.z },
                )
            })
            .collect()
    }

    #[test]
    fn test_transformed_bounds_identity() {
        let points = unit_corners(Vec3::ONE);
        let bounds = Mat4::IDENTITY.transformed_bounds(&points);

        assert!((bounds.min() - Vec3::ZERO).length() < 0.001);
        assert!((bounds.max() - Vec3::ONE).length() < 0.001);
    }

    #[test]
    fn test_transformed_bounds_translation() {
        let mat = Mat4::from_translation(Vec3::new(5.0, 5.0, 5.0));
        let bounds = mat.transformed_bounds(&unit_corners(Vec3::ONE));

        assert!((bounds.min() - Vec3::new(5.0, 5.0, 5.0)).length() < 0.001);
        assert!((bounds.max() - Vec3::new(6.0, 6.0, 6.0)).length() < 0.001);
    }

    #[test]
    fn test_quarter_turn_swaps_axes() {
        use std::f32::consts::FRAC_PI_2;

        let mat = Mat4::from_rotation_y(FRAC_PI_2);
        let extent = mat
            .transformed_bounds(&unit_corners(Vec3::new(4.0, 1.0, 2.0)))
            .extent();

        assert!((extent.x - 2.0).abs() < 0.001);
        assert!((extent.y - 1.0).abs() < 0.001);
        assert!((extent.z - 4.0).abs() < 0.001);
    }

    #[test]
    fn test_transformed_bounds_of_empty_set() {
        let bounds = Mat4::from_scale(Vec3::splat(2.0)).transformed_bounds(&[]);
        assert!(bounds.is_empty());
    }
}

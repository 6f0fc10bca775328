// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod camera;
mod interval;
mod transform;

pub use aabb::Aabb;
pub use camera::{Camera, OrbitControls};
pub use interval::Interval;
pub use transform::Mat4Ext;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recentering_translation_moves_bounds_to_origin() {
        let points = [Vec3::new(2.0, 4.0, 6.0), Vec3::new(4.0, 8.0, 10.0)];
        let bounds = Aabb::from_positions(&points);
        let moved = Mat4::from_translation(-bounds.centroid()).transformed_bounds(&points);
        assert!(moved.centroid().length() < 1e-6);
    }

    #[test]
    fn test_srt_matrix_applies_scale_before_rotation() {
        let m = Mat4::from_scale_rotation_translation(
            Vec3::splat(2.0),
            Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            Vec3::new(0.0, 1.0, 0.0),
        );
        let p = m.transform_point3(Vec3::X);
        // X scaled to 2, rotated onto -Z, then lifted by 1.
        assert!((p - Vec3::new(0.0, 1.0, -2.0)).length() < 1e-5);
    }
}

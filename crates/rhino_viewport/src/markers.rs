//! Per-frame marker instances for landmarks and the feature highlight.

use std::ops::Range;

use rhino_core::{OverlayState, Resolved};
use rhino_math::{Mat4, Vec3};

/// World-space radius of a landmark sphere
pub const LANDMARK_RADIUS: f32 = 0.02;

const LANDMARK_COLOR: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
const LANDMARK_EMISSIVE: f32 = 2.0;
const HOVERED_COLOR: [f32; 4] = [1.0, 1.0, 0.0, 1.0];
const HOVERED_EMISSIVE: f32 = 4.0;

/// #60a5fa at 25% opacity
pub const HIGHLIGHT_COLOR: [f32; 4] = [0.376, 0.647, 0.980, 0.25];

/// Instance data for one sphere: scale + translation, base color and
/// emissive strength. Instances carry no rotation.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MarkerInstance {
    pub model_matrix: [[f32; 4]; 4],
    pub color: [f32; 4],
    /// x = emissive intensity, yzw unused
    pub params: [f32; 4],
}

impl MarkerInstance {
    const ATTRIBS: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
        2 => Float32x4, 3 => Float32x4, 4 => Float32x4, 5 => Float32x4,
        6 => Float32x4, 7 => Float32x4
    ];

    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MarkerInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBS,
        }
    }

    fn sphere(center: Vec3, half_extents: Vec3, color: [f32; 4], emissive: f32) -> Self {
        let model = Mat4::from_translation(center) * Mat4::from_scale(half_extents);
        Self {
            model_matrix: model.to_cols_array_2d(),
            color,
            params: [emissive, 0.0, 0.0, 0.0],
        }
    }

    pub fn center(&self) -> Vec3 {
        Vec3::from_slice(&self.model_matrix[3][..3])
    }
}

/// Instances for one view, opaque markers first.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MarkerSet {
    pub instances: Vec<MarkerInstance>,
    pub opaque: Range<u32>,
    pub translucent: Range<u32>,
}

impl MarkerSet {
    /// Markers the overlay currently asks for.
    ///
    /// Landmark spheres only in landmarks mode (hovered one yellow and
    /// brighter); the highlight ellipsoid only for a selected feature.
    pub fn build(resolved: &Resolved, overlay: &OverlayState) -> Self {
        let mut instances = Vec::new();

        if overlay.show_landmarks() {
            for (i, landmark) in resolved.landmarks.iter().enumerate() {
                let (color, emissive) = if overlay.hovered() == Some(i) {
                    (HOVERED_COLOR, HOVERED_EMISSIVE)
                } else {
                    (LANDMARK_COLOR, LANDMARK_EMISSIVE)
                };
                instances.push(MarkerInstance::sphere(
                    landmark.position,
                    Vec3::splat(LANDMARK_RADIUS),
                    color,
                    emissive,
                ));
            }
        }
        let opaque = 0..instances.len() as u32;

        if let Some(feature) = overlay.selected().and_then(|i| resolved.features.get(i)) {
            instances.push(MarkerInstance::sphere(
                feature.center,
                feature.half_extents(),
                HIGHLIGHT_COLOR,
                0.0,
            ));
        }
        let translucent = opaque.end..instances.len() as u32;

        Self {
            instances,
            opaque,
            translucent,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhino_core::{ResolvedFeature, ResolvedLandmark};

    fn resolved() -> Resolved {
        Resolved {
            landmarks: (0..3)
                .map(|i| ResolvedLandmark {
                    name: format!("Point {}", i + 1),
                    position: Vec3::new(i as f32, 0.0, 0.0),
                })
                .collect(),
            features: vec![ResolvedFeature {
                name: "Dorsum".to_string(),
                center: Vec3::new(0.0, 1.0, 0.0),
                score: 1.0,
                radius: 0.3,
                scale: Vec3::new(0.3, 0.4, 0.3),
            }],
        }
    }

    #[test]
    fn test_no_markers_without_mode() {
        let set = MarkerSet::build(&resolved(), &OverlayState::new());
        assert!(set.is_empty());
        assert!(set.opaque.is_empty() && set.translucent.is_empty());
    }

    #[test]
    fn test_landmark_markers_with_single_hover() {
        let mut overlay = OverlayState::new();
        overlay.toggle_landmarks();
        overlay.pointer_enter(0);
        overlay.pointer_enter(2);

        let set = MarkerSet::build(&resolved(), &overlay);
        assert_eq!(set.opaque, 0..3);
        assert!(set.translucent.is_empty());

        let yellow: Vec<_> = set
            .instances
            .iter()
            .enumerate()
            .filter(|(_, m)| m.color == HOVERED_COLOR)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(yellow, vec![2]);
        assert_eq!(set.instances[2].params[0], HOVERED_EMISSIVE);
        assert_eq!(set.instances[1].center(), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_selected_feature_highlight() {
        let mut overlay = OverlayState::new();
        overlay.toggle_features();
        overlay.select_feature(0);

        let set = MarkerSet::build(&resolved(), &overlay);
        assert!(set.opaque.is_empty());
        assert_eq!(set.translucent, 0..1);

        let m = Mat4::from_cols_array_2d(&set.instances[0].model_matrix);
        let top = m.transform_point3(Vec3::Y);
        assert!((top - Vec3::new(0.0, 1.12, 0.0)).length() < 1e-5);
        assert_eq!(set.instances[0].color[3], 0.25);
    }

    #[test]
    fn test_stale_selection_index_draws_nothing() {
        let mut overlay = OverlayState::new();
        overlay.toggle_features();
        overlay.select_feature(7);

        assert!(MarkerSet::build(&resolved(), &overlay).is_empty());
    }
}

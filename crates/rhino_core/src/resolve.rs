//! World-space resolution of schema entries against a loaded mesh.

use rhino_math::{Mat4, Vec3};

use crate::mesh::Mesh;
use crate::schema::{FeatureEntry, LandmarkSchema};

/// A landmark with its world-space position.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedLandmark {
    pub name: String,
    pub position: Vec3,
}

/// A feature with its world-space center and highlight volume.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedFeature {
    pub name: String,
    pub center: Vec3,
    pub score: f32,
    pub radius: f32,
    pub scale: Vec3,
}

impl ResolvedFeature {
    /// Semi-axes of the highlight ellipsoid.
    pub fn half_extents(&self) -> Vec3 {
        self.scale * self.radius
    }
}

/// Output of [`resolve`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Resolved {
    pub landmarks: Vec<ResolvedLandmark>,
    pub features: Vec<ResolvedFeature>,
}

/// Per-feature scores that replace schema defaults, matched by position.
///
/// A `None` slot keeps the schema default for that feature only.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScoreOverrides(pub Vec<Option<f32>>);

impl ScoreOverrides {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn get(&self, index: usize) -> Option<f32> {
        self.0.get(index).copied().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<f32>> for ScoreOverrides {
    fn from(scores: Vec<f32>) -> Self {
        Self(scores.into_iter().map(Some).collect())
    }
}

impl From<Vec<Option<f32>>> for ScoreOverrides {
    fn from(scores: Vec<Option<f32>>) -> Self {
        Self(scores)
    }
}

/// Resolve every landmark and feature of `schema` on `mesh`.
///
/// Schema indices count triangle corners in face order (see
/// [`Mesh::corner_position`]). Positions are `model * local_vertex`. An
/// index past the last corner resolves to the zero vector.
pub fn resolve(
    mesh: &Mesh,
    model: &Mat4,
    schema: &LandmarkSchema,
    overrides: &ScoreOverrides,
) -> Resolved {
    let world = |index: usize| {
        mesh.corner_position(index)
            .map(|local| model.transform_point3(local))
            .unwrap_or(Vec3::ZERO)
    };

    let landmarks = schema
        .landmarks
        .iter()
        .map(|entry| ResolvedLandmark {
            name: entry.name.clone(),
            position: world(entry.vertex_index),
        })
        .collect();

    let features = schema
        .features
        .iter()
        .enumerate()
        .map(|(i, entry)| ResolvedFeature {
            name: entry.name.clone(),
            center: world(entry.vertex_index),
            score: overrides.get(i).unwrap_or(entry.score),
            radius: entry.radius.unwrap_or(FeatureEntry::DEFAULT_RADIUS),
            scale: Vec3::new(
                entry.scale_x.unwrap_or(FeatureEntry::DEFAULT_SCALE),
                entry.scale_y.unwrap_or(FeatureEntry::DEFAULT_SCALE),
                entry.scale_z.unwrap_or(FeatureEntry::DEFAULT_SCALE),
            ),
        })
        .collect();

    Resolved { landmarks, features }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Normalization;
    use crate::schema::LandmarkEntry;

    fn quad() -> Mesh {
        Mesh::new(
            vec![
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(4.0, 0.0, 0.0),
                Vec3::new(4.0, 2.0, 0.0),
                Vec3::new(2.0, 2.0, 1.0),
            ],
            vec![0, 1, 2, 0, 2, 3],
            None,
        )
    }

    fn schema() -> LandmarkSchema {
        LandmarkSchema {
            topology: "test-quad".to_string(),
            vertex_count: Some(4),
            landmarks: vec![
                LandmarkEntry {
                    name: "Tip".to_string(),
                    vertex_index: 2,
                },
                LandmarkEntry {
                    name: "Lost".to_string(),
                    vertex_index: 99,
                },
            ],
            features: vec![
                FeatureEntry {
                    name: "Bridge".to_string(),
                    vertex_index: 3,
                    score: 1.0,
                    radius: Some(0.3),
                    scale_x: Some(0.5),
                    scale_y: None,
                    scale_z: Some(2.0),
                },
                FeatureEntry {
                    name: "Base".to_string(),
                    vertex_index: 0,
                    score: 2.0,
                    radius: None,
                    scale_x: None,
                    scale_y: None,
                    scale_z: None,
                },
            ],
        }
    }

    #[test]
    fn test_positions_follow_model_matrix() {
        let mesh = quad();
        let model = Normalization::default().model_matrix(&mesh);
        let raw = resolve(&mesh, &Mat4::IDENTITY, &schema(), &ScoreOverrides::none());
        let normalized = resolve(&mesh, &model, &schema(), &ScoreOverrides::none());

        assert_eq!(raw.landmarks[0].position, Vec3::new(4.0, 2.0, 0.0));
        let expected = model.transform_point3(raw.landmarks[0].position);
        assert!((normalized.landmarks[0].position - expected).length() < 1e-6);

        let expected = model.transform_point3(raw.features[0].center);
        assert!((normalized.features[0].center - expected).length() < 1e-6);
    }

    #[test]
    fn test_out_of_range_index_is_zero() {
        let mesh = quad();
        let model = Mat4::from_translation(Vec3::splat(5.0));
        let resolved = resolve(&mesh, &model, &schema(), &ScoreOverrides::none());

        assert_eq!(resolved.landmarks[1].name, "Lost");
        assert_eq!(resolved.landmarks[1].position, Vec3::ZERO);
    }

    #[test]
    fn test_feature_defaults_and_scale() {
        let mesh = quad();
        let resolved = resolve(&mesh, &Mat4::IDENTITY, &schema(), &ScoreOverrides::none());

        let bridge = &resolved.features[0];
        assert_eq!(bridge.scale, Vec3::new(0.5, 1.0, 2.0));
        assert!((bridge.half_extents() - Vec3::new(0.15, 0.3, 0.6)).length() < 1e-6);

        let base = &resolved.features[1];
        assert_eq!(base.radius, 0.15);
        assert_eq!(base.scale, Vec3::ONE);
        assert_eq!(base.score, 2.0);
    }

    #[test]
    fn test_overrides_are_positional() {
        let mesh = quad();
        let overrides = ScoreOverrides::from(vec![3.5]);
        let resolved = resolve(&mesh, &Mat4::IDENTITY, &schema(), &overrides);

        assert_eq!(resolved.features[0].score, 3.5);
        // No override at index 1, schema default stays
        assert_eq!(resolved.features[1].score, 2.0);
    }

    #[test]
    fn test_missing_override_slot_keeps_default() {
        let mesh = quad();
        let overrides = ScoreOverrides::from(vec![None, Some(4.0)]);
        let resolved = resolve(&mesh, &Mat4::IDENTITY, &schema(), &overrides);

        assert_eq!(resolved.features[0].score, 1.0);
        assert_eq!(resolved.features[1].score, 4.0);
    }

    #[test]
    fn test_indices_count_triangle_corners() {
        let mesh = quad();
        let mut schema = schema();
        schema.landmarks = [3, 5, 6]
            .iter()
            .map(|&vertex_index| LandmarkEntry {
                name: format!("Corner {vertex_index}"),
                vertex_index,
            })
            .collect();
        let resolved = resolve(&mesh, &Mat4::IDENTITY, &schema, &ScoreOverrides::none());

        // Corners are v0 v1 v2 v0 v2 v3
        assert_eq!(resolved.landmarks[0].position, Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(resolved.landmarks[1].position, Vec3::new(2.0, 2.0, 1.0));
        assert_eq!(resolved.landmarks[2].position, Vec3::ZERO);
    }

    #[test]
    fn test_builtin_schema_on_small_mesh_resolves_to_origin() {
        let mesh = quad();
        let resolved = resolve(
            &mesh,
            &Mat4::IDENTITY,
            &LandmarkSchema::nasal(),
            &ScoreOverrides::none(),
        );

        assert_eq!(resolved.landmarks.len(), 11);
        assert_eq!(resolved.features.len(), 12);
        assert!(resolved.landmarks.iter().all(|l| l.position == Vec3::ZERO));
    }
}

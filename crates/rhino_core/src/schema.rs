//! Landmark schemas: named vertex-index tables tied to one mesh topology.
//!
//! Indices count triangle corners in face order and only mean something
//! for the topology they were authored against. A schema carries the
//! topology id and the corner count it expects, and
//! [`LandmarkSchema::validate`] reports entries a loaded mesh cannot
//! satisfy.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while loading a schema file.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid schema JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Schema '{0}' defines no landmarks or features")]
    Empty(String),
}

/// A single named anatomical point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LandmarkEntry {
    pub name: String,
    pub vertex_index: usize,
}

/// A scored anatomical region with its highlight volume.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureEntry {
    pub name: String,
    pub vertex_index: usize,
    #[serde(default = "FeatureEntry::default_score")]
    pub score: f32,
    #[serde(default)]
    pub radius: Option<f32>,
    #[serde(default)]
    pub scale_x: Option<f32>,
    #[serde(default)]
    pub scale_y: Option<f32>,
    #[serde(default)]
    pub scale_z: Option<f32>,
}

impl FeatureEntry {
    pub const DEFAULT_RADIUS: f32 = 0.15;
    pub const DEFAULT_SCALE: f32 = 1.0;

    fn default_score() -> f32 {
        1.0
    }

    fn new(name: &str, vertex_index: usize, radius: f32, scale: [f32; 3]) -> Self {
        Self {
            name: name.to_string(),
            vertex_index,
            score: Self::default_score(),
            radius: Some(radius),
            scale_x: Some(scale[0]),
            scale_y: Some(scale[1]),
            scale_z: Some(scale[2]),
        }
    }
}

/// Schema entry whose vertex index does not exist in a loaded mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct OutOfRange {
    pub name: String,
    pub vertex_index: usize,
}

/// Landmark and feature tables for one mesh topology.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LandmarkSchema {
    /// Identifier of the mesh topology the indices were authored for
    pub topology: String,

    /// Triangle corner count of that topology, if known
    #[serde(default)]
    pub vertex_count: Option<usize>,

    pub landmarks: Vec<LandmarkEntry>,
    pub features: Vec<FeatureEntry>,
}

impl LandmarkSchema {
    /// Topology id of the built-in nasal schema.
    pub const NASAL_TOPOLOGY: &'static str = "nasal-3ddfa-v2";

    /// Built-in nasal schema: 11 landmarks and 12 scored features.
    pub fn nasal() -> Self {
        let landmarks = [
            47800, 48700, 48600, 39900, 48750, 59800, 48300, 40100, 37300, 60810, 60740,
        ]
        .iter()
        .enumerate()
        .map(|(i, &vertex_index)| LandmarkEntry {
            name: format!("Point {}", i + 1),
            vertex_index,
        })
        .collect();

        let features = vec![
            FeatureEntry::new("Dorsum", 48550, 0.3, [0.3, 0.4, 0.3]),
            FeatureEntry::new("Width of Dorsum", 48560, 0.3, [0.3, 0.3, 0.5]),
            FeatureEntry::new("Tip Shape and Symmetry", 48600, 0.25, [0.25, 0.25, 0.25]),
            FeatureEntry::new("Saddle", 48470, 0.3, [0.3, 0.4, 0.3]),
            FeatureEntry::new("Hump", 48550, 0.25, [0.25, 0.3, 0.25]),
            FeatureEntry::new("Nasal Length", 48550, 0.4, [0.3, 0.7, 0.3]),
            FeatureEntry::new("Radix", 48470, 0.25, [0.25, 0.25, 0.25]),
            FeatureEntry::new("Alar Columellar Relation", 48650, 0.28, [0.25, 0.25, 0.3]),
            FeatureEntry::new("Tip Projection", 48600, 0.25, [0.3, 0.25, 0.3]),
            FeatureEntry::new("Tip Rotation", 48600, 0.25, [0.25, 0.25, 0.25]),
            FeatureEntry::new("Alar Flaring", 48650, 0.25, [0.25, 0.25, 0.3]),
            FeatureEntry::new("Nostril Ratio", 48550, 0.4, [0.3, 0.6, 0.3]),
        ];

        Self {
            topology: Self::NASAL_TOPOLOGY.to_string(),
            vertex_count: None,
            landmarks,
            features,
        }
    }

    /// Load a schema from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Parse a schema from JSON text.
    pub fn from_json(content: &str) -> Result<Self, SchemaError> {
        let schema: Self = serde_json::from_str(content)?;
        if schema.landmarks.is_empty() && schema.features.is_empty() {
            return Err(SchemaError::Empty(schema.topology));
        }
        Ok(schema)
    }

    /// Entries whose index is past the last of `corner_count` triangle
    /// corners.
    ///
    /// Indices count corners in face order, so pass
    /// [`Mesh::corner_count`](crate::Mesh::corner_count), not the number of
    /// vertex records. An empty result means every entry resolves to a real
    /// vertex. A mismatch with the declared topology count is logged.
    pub fn validate(&self, corner_count: usize) -> Vec<OutOfRange> {
        if let Some(expected) = self.vertex_count {
            if expected != corner_count {
                log::warn!(
                    "Schema '{}' expects {} corners, mesh has {}",
                    self.topology,
                    expected,
                    corner_count
                );
            }
        }

        self.landmarks
            .iter()
            .map(|l| (&l.name, l.vertex_index))
            .chain(self.features.iter().map(|f| (&f.name, f.vertex_index)))
            .filter(|(_, index)| *index >= corner_count)
            .map(|(name, vertex_index)| OutOfRange {
                name: name.clone(),
                vertex_index,
            })
            .collect()
    }
}

impl Default for LandmarkSchema {
    fn default() -> Self {
        Self::nasal()
    }
}

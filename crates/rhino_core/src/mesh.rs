//! Mesh geometry for reconstructed faces.
//!
//! Keeps the raw interleaved vertex records exactly as they were read, so
//! extra per-vertex channels (colors appended to `v` lines) survive loading.
//!
//! Schema indices do not address these records directly. They count
//! triangle corners in face order: corner `i` is vertex `indices[i]`, the
//! layout an unindexed position buffer expanded from the faces would have.

use rhino_math::{Aabb, Vec3};

/// A triangle mesh with its raw vertex records and derived attributes.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Interleaved vertex records, `stride` numbers per vertex
    pub vertex_data: Vec<f32>,

    /// Numbers per vertex record (3 for plain XYZ, 6 for XYZRGB, ...)
    pub stride: usize,

    /// Vertex positions (first three components of every record)
    pub positions: Vec<Vec3>,

    /// Per-vertex RGB in 0..=1, set by the color deriver
    pub colors: Option<Vec<[f32; 3]>>,

    /// Vertex normals, filled by `compute_normals`
    pub normals: Option<Vec<Vec3>>,

    /// Triangle indices (every 3 indices form a triangle)
    pub indices: Vec<u32>,

    /// Local-space bounds of the vertices that faces reference
    pub bounds: Aabb,
}

impl Mesh {
    /// Create a mesh from plain positions (stride 3).
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>, normals: Option<Vec<Vec3>>) -> Self {
        let vertex_data = positions.iter().flat_map(|p| p.to_array()).collect();
        let bounds = face_bounds(&positions, &indices);
        Self {
            vertex_data,
            stride: 3,
            positions,
            colors: None,
            normals,
            indices,
            bounds,
        }
    }

    /// Create a mesh from interleaved vertex records.
    ///
    /// `stride` must be at least 3; a trailing partial record is ignored.
    pub fn from_vertex_records(vertex_data: Vec<f32>, stride: usize, indices: Vec<u32>) -> Self {
        debug_assert!(stride >= 3, "vertex records need at least XYZ");
        let stride = stride.max(3);
        let positions: Vec<Vec3> = vertex_data
            .chunks_exact(stride)
            .map(|record| Vec3::new(record[0], record[1], record[2]))
            .collect();
        let bounds = face_bounds(&positions, &indices);
        Self {
            vertex_data,
            stride,
            positions,
            colors: None,
            normals: None,
            indices,
            bounds,
        }
    }

    /// Number of vertex records.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Get the number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Number of triangle corners (three per face).
    pub fn corner_count(&self) -> usize {
        self.indices.len()
    }

    /// Local position of vertex `index`.
    pub fn position(&self, index: usize) -> Option<Vec3> {
        self.positions.get(index).copied()
    }

    /// Local position behind triangle corner `corner`, in face order.
    pub fn corner_position(&self, corner: usize) -> Option<Vec3> {
        let vertex = *self.indices.get(corner)?;
        self.position(vertex as usize)
    }

    pub fn has_colors(&self) -> bool {
        self.colors.is_some()
    }

    /// Attach per-vertex colors; ignored if the count does not match.
    pub fn set_colors(&mut self, colors: Vec<[f32; 3]>) {
        if colors.len() == self.positions.len() {
            self.colors = Some(colors);
        } else {
            log::warn!(
                "Ignoring {} colors for a mesh with {} vertices",
                colors.len(),
                self.positions.len()
            );
        }
    }

    /// Compute smooth vertex normals by averaging face normals.
    ///
    /// Faces are counter-clockwise (OBJ convention). Vertices that belong to
    /// no valid face get +Y.
    pub fn compute_normals(&mut self) {
        let vertex_count = self.positions.len();
        let mut normals = vec![Vec3::ZERO; vertex_count];

        for face in self.indices.chunks_exact(3) {
            let i0 = face[0] as usize;
            let i1 = face[1] as usize;
            let i2 = face[2] as usize;

            if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
                continue;
            }

            let p0 = self.positions[i0];
            let edge1 = self.positions[i1] - p0;
            let edge2 = self.positions[i2] - p0;
            let face_normal = edge1.cross(edge2);

            normals[i0] += face_normal;
            normals[i1] += face_normal;
            normals[i2] += face_normal;
        }

        for normal in &mut normals {
            *normal = normal.try_normalize().unwrap_or(Vec3::Y);
        }

        self.normals = Some(normals);
    }

    /// Get the mesh center (center of bounding box).
    pub fn center(&self) -> Vec3 {
        self.bounds.centroid()
    }

    /// Get the mesh size (diagonal length of bounding box).
    pub fn size(&self) -> f32 {
        self.bounds.diagonal()
    }
}

/// Bounds of the vertices reached through `indices`.
///
/// A mesh without faces falls back to all of its positions.
fn face_bounds(positions: &[Vec3], indices: &[u32]) -> Aabb {
    if indices.is_empty() {
        return Aabb::from_positions(positions);
    }
    Aabb::from_positions(indices.iter().filter_map(|&i| positions.get(i as usize)))
}

//! Vertex colors from extra channels of the raw vertex records.

use crate::mesh::Mesh;

/// Per-channel gain applied to raw RGB before clamping to 1.0.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorGains {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl ColorGains {
    /// Gains of every viewer page, single and comparison alike (green
    /// slightly muted).
    pub const SINGLE_VIEW: ColorGains = ColorGains { r: 1.3, g: 1.1, b: 1.3 };
}

impl Default for ColorGains {
    fn default() -> Self {
        Self::SINGLE_VIEW
    }
}

/// Minimum record length that carries RGB after XYZ.
pub const COLOR_STRIDE: usize = 6;

/// Derive per-vertex colors from components 3..6 of each vertex record.
///
/// Returns `None` when records are shorter than [`COLOR_STRIDE`].
pub fn derive_vertex_colors(mesh: &Mesh, gains: ColorGains) -> Option<Vec<[f32; 3]>> {
    if mesh.stride < COLOR_STRIDE {
        return None;
    }

    let colors = mesh
        .vertex_data
        .chunks_exact(mesh.stride)
        .map(|record| {
            [
                (record[3] * gains.r).min(1.0),
                (record[4] * gains.g).min(1.0),
                (record[5] * gains.b).min(1.0),
            ]
        })
        .collect();

    Some(colors)
}

/// Derive and attach colors in place. Returns true if colors were attached.
///
/// Positions and bounds are untouched, so this can run before or after the
/// normalization pass measures the mesh.
pub fn apply_vertex_colors(mesh: &mut Mesh, gains: ColorGains) -> bool {
    match derive_vertex_colors(mesh, gains) {
        Some(colors) => {
            mesh.set_colors(colors);
            true
        }
        None => {
            log::debug!("Vertex stride {} carries no color, using default shading", mesh.stride);
            false
        }
    }
}

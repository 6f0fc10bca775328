//! Procedural geometry for overlay markers.

/// Marker vertex (position + normal) on the unit sphere
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MarkerVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl MarkerVertex {
    const ATTRIBS: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MarkerVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// Unit UV sphere centered at the origin.
///
/// `segments` around the equator, `rings` from pole to pole. Triangles wind
/// counter-clockwise seen from outside.
pub fn uv_sphere(segments: u32, rings: u32) -> (Vec<MarkerVertex>, Vec<u32>) {
    let segments = segments.max(3);
    let rings = rings.max(2);

    let mut vertices = Vec::with_capacity(((segments + 1) * (rings + 1)) as usize);
    for ring in 0..=rings {
        let theta = ring as f32 / rings as f32 * std::f32::consts::PI;
        let (sin_theta, cos_theta) = theta.sin_cos();

        for segment in 0..=segments {
            let phi = segment as f32 / segments as f32 * std::f32::consts::TAU;
            let (sin_phi, cos_phi) = phi.sin_cos();
            let p = [sin_theta * sin_phi, cos_theta, sin_theta * cos_phi];
            vertices.push(MarkerVertex {
                position: p,
                normal: p,
            });
        }
    }

    let row = segments + 1;
    let mut indices = Vec::with_capacity((segments * rings * 6) as usize);
    for ring in 0..rings {
        for segment in 0..segments {
            let a = ring * row + segment;
            let b = a + row;

            // Skip the zero-area triangles at the poles
            if ring != 0 {
                indices.extend_from_slice(&[a, b, a + 1]);
            }
            if ring != rings - 1 {
                indices.extend_from_slice(&[a + 1, b, b + 1]);
            }
        }
    }

    (vertices, indices)
}

//! Wavefront OBJ reader.
//!
//! Line-by-line parser for the subset written by face reconstruction
//! pipelines: `v` records with optional trailing channels (`v x y z r g b`)
//! and polygonal `f` records. Vertex records are stored interleaved and in
//! file order; faces are fan-triangulated in file order, which fixes the
//! triangle-corner numbering landmark tables use.
//!
//! # Supported Syntax
//!
//! - `v x y z [extra ...]` - every record must have the same component count
//! - `f a b c ...` with `v`, `v/vt`, `v//vn`, `v/vt/vn` tokens, 1-based or
//!   negative (relative) indices; polygons are fan-triangulated
//! - `vt`, `vn`, `o`, `g`, `s`, `usemtl`, `mtllib`, `#` comments are skipped

use std::path::Path;

use thiserror::Error;

use crate::mesh::Mesh;

/// Errors that can occur during OBJ parsing.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid number format at line {line}: {token}")]
    InvalidNumber { line: usize, token: String },

    #[error("Vertex record at line {line} has {found} components, expected {expected}")]
    InconsistentStride {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("Face at line {line} references vertex {index}, but only {count} are defined")]
    IndexOutOfRange { line: usize, index: i64, count: usize },

    #[error("No vertices found in OBJ data")]
    NoVertices,
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Parse OBJ text into a [`Mesh`] with raw vertex records preserved.
pub fn parse_obj(content: &str) -> ParseResult<Mesh> {
    let mut vertex_data: Vec<f32> = Vec::new();
    let mut stride: Option<usize> = None;
    let mut indices: Vec<u32> = Vec::new();

    for (i, raw) in content.lines().enumerate() {
        let line = i + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let mut tokens = trimmed.split_whitespace();
        let keyword = tokens.next().unwrap_or_default();

        match keyword {
            "v" => {
                let start = vertex_data.len();
                for token in tokens {
                    vertex_data.push(parse_float(token, line)?);
                }
                let found = vertex_data.len() - start;
                if found < 3 {
                    return Err(ParseError::Parse {
                        line,
                        message: format!("vertex needs at least 3 components, found {}", found),
                    });
                }
                match stride {
                    None => stride = Some(found),
                    Some(expected) if expected != found => {
                        return Err(ParseError::InconsistentStride { line, expected, found });
                    }
                    Some(_) => {}
                }
            }
            "f" => {
                let count = stride.map_or(0, |s| vertex_data.len() / s);
                let polygon = tokens
                    .map(|token| parse_face_vertex(token, count, line))
                    .collect::<ParseResult<Vec<u32>>>()?;

                if polygon.len() < 3 {
                    return Err(ParseError::Parse {
                        line,
                        message: format!("face needs at least 3 vertices, found {}", polygon.len()),
                    });
                }

                // Fan triangulation: (0, k, k+1)
                for k in 1..polygon.len() - 1 {
                    indices.extend_from_slice(&[polygon[0], polygon[k], polygon[k + 1]]);
                }
            }
            "vt" | "vn" | "vp" | "o" | "g" | "s" | "usemtl" | "mtllib" | "l" | "p" => {}
            other => {
                log::debug!("Skipping unsupported OBJ statement '{}' at line {}", other, line);
            }
        }
    }

    let stride = stride.ok_or(ParseError::NoVertices)?;
    Ok(Mesh::from_vertex_records(vertex_data, stride, indices))
}

/// Read and parse an OBJ file from disk.
pub fn load_obj<P: AsRef<Path>>(path: P) -> ParseResult<Mesh> {
    let path = path.as_ref();
    log::info!("Loading OBJ from {:?}", path);
    let content = std::fs::read_to_string(path)?;
    let mesh = parse_obj(&content)?;
    log::info!(
        "Loaded {} vertices (stride {}), {} triangles",
        mesh.vertex_count(),
        mesh.stride,
        mesh.triangle_count()
    );
    Ok(mesh)
}

fn parse_float(token: &str, line: usize) -> ParseResult<f32> {
    token.parse::<f32>().map_err(|_| ParseError::InvalidNumber {
        line,
        token: token.to_string(),
    })
}

/// Resolve the position part of a face token (`7`, `7/2`, `7//3`, `-1`).
fn parse_face_vertex(token: &str, count: usize, line: usize) -> ParseResult<u32> {
    let position = token.split('/').next().unwrap_or_default();
    let index: i64 = position.parse().map_err(|_| ParseError::InvalidNumber {
        line,
        token: token.to_string(),
    })?;

    let resolved = match index {
        i if i > 0 => i - 1,
        i if i < 0 => count as i64 + i,
        _ => {
            return Err(ParseError::Parse {
                line,
                message: "face index 0 is not valid in OBJ".to_string(),
            })
        }
    };

    if resolved < 0 || resolved >= count as i64 {
        return Err(ParseError::IndexOutOfRange { line, index, count });
    }

    Ok(resolved as u32)
}

//! Rhino Core - Mesh, landmark and session logic for the nasal result viewer.
//!
//! This crate provides:
//!
//! - **Geometry**: `Mesh`, the OBJ reader, vertex colors and pose normalization
//! - **Annotation**: landmark schemas, world-space resolution, overlay state
//! - **Scores**: totals and pre/post comparison rows
//! - **Session**: the key/value store written by uploads and read by views
//! - **Backend**: mesh fetching and image upload over HTTP
//!
//! # Example
//!
//! ```ignore
//! use rhino_core::{load_obj, resolve, LandmarkSchema, Normalization, ScoreOverrides};
//!
//! let mesh = load_obj("face_obj.obj")?;
//! let model = Normalization::default().model_matrix(&mesh);
//! let resolved = resolve(&mesh, &model, &LandmarkSchema::nasal(), &ScoreOverrides::none());
//! println!("Tip at {:?}", resolved.landmarks[2].position);
//! ```

pub mod color;
pub mod fetch;
pub mod mesh;
pub mod normalize;
pub mod obj;
pub mod overlay;
pub mod resolve;
pub mod schema;
pub mod scores;
pub mod session;
pub mod upload;

// Re-export commonly used types
pub use color::{apply_vertex_colors, derive_vertex_colors, ColorGains};
pub use fetch::{LoadError, MeshFetcher, MeshSource};
pub use mesh::Mesh;
pub use normalize::{Normalization, Transform};
pub use obj::{load_obj, parse_obj, ParseError};
pub use overlay::{OverlayState, ViewMode};
pub use resolve::{resolve, Resolved, ResolvedFeature, ResolvedLandmark, ScoreOverrides};
pub use schema::{LandmarkSchema, SchemaError};
pub use scores::{compare, format_total, total_score, ComparisonRow, ComparisonScores, Trend};
pub use session::{
    ComparisonSession, JsonFileStore, MemoryStore, SessionError, SessionStore, SingleSession,
};
pub use upload::{BackendClient, ComparisonUploadResponse, ImageSet, UploadError, UploadResponse};

//! Mesh retrieval from the results server or the local disk.

use std::path::PathBuf;

use thiserror::Error;

use crate::mesh::Mesh;
use crate::obj::{self, ParseError};

/// Errors that can occur while loading a mesh.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Request for {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Server returned {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to parse mesh '{name}': {source}")]
    Parse {
        name: String,
        #[source]
        source: ParseError,
    },
}

/// Where a view gets its mesh from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MeshSource {
    /// Viewable mesh name under `<base_url>/results/`
    Remote(String),
    /// OBJ file on disk
    Local(PathBuf),
}

impl MeshSource {
    /// Short label for window titles and log lines.
    pub fn label(&self) -> String {
        match self {
            MeshSource::Remote(name) => name.clone(),
            MeshSource::Local(path) => path.display().to_string(),
        }
    }
}

/// Blocking HTTP client for result meshes. Meant to run on a worker thread.
#[derive(Clone, Debug)]
pub struct MeshFetcher {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl MeshFetcher {
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:5000";

    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::blocking::Client::new(),
        }
    }

    /// URL of a result mesh.
    pub fn url_for(&self, mesh_name: &str) -> String {
        format!("{}/results/{}", self.base_url, mesh_name)
    }

    /// GET and parse one result mesh. No retries.
    pub fn fetch(&self, mesh_name: &str) -> Result<Mesh, LoadError> {
        let url = self.url_for(mesh_name);
        log::info!("Fetching mesh from {}", url);

        let transport = |source| LoadError::Transport {
            url: url.clone(),
            source,
        };

        let resp = self.http.get(&url).send().map_err(transport)?;
        if !resp.status().is_success() {
            return Err(LoadError::Status {
                url: url.clone(),
                status: resp.status().as_u16(),
            });
        }

        let body = resp.text().map_err(transport)?;
        let mesh = obj::parse_obj(&body).map_err(|source| LoadError::Parse {
            name: mesh_name.to_string(),
            source,
        })?;

        log::info!(
            "Fetched {}: {} vertices, {} triangles",
            mesh_name,
            mesh.vertex_count(),
            mesh.triangle_count()
        );
        Ok(mesh)
    }

    /// Load a mesh from either kind of source.
    pub fn load(&self, source: &MeshSource) -> Result<Mesh, LoadError> {
        match source {
            MeshSource::Remote(name) => self.fetch(name),
            MeshSource::Local(path) => obj::load_obj(path).map_err(|source| LoadError::Parse {
                name: path.display().to_string(),
                source,
            }),
        }
    }
}

impl Default for MeshFetcher {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BASE_URL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_trims_trailing_slash() {
        let fetcher = MeshFetcher::new("http://example.test:5000/");
        assert_eq!(
            fetcher.url_for("abc_obj.obj"),
            "http://example.test:5000/results/abc_obj.obj"
        );
    }

    #[test]
    fn test_local_source_loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face_obj.obj");
        std::fs::write(&path, "v 0 0 0 1 0 0\nv 1 0 0 0 1 0\nv 0 1 0 0 0 1\nf 1 2 3\n").unwrap();

        let mesh = MeshFetcher::default().load(&MeshSource::Local(path)).unwrap();
        assert_eq!(mesh.stride, 6);
    }

    #[test]
    fn test_local_parse_failure_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.obj");
        std::fs::write(&path, "v 0 0\n").unwrap();

        let err = MeshFetcher::default()
            .load(&MeshSource::Local(path))
            .unwrap_err();
        assert!(matches!(err, LoadError::Parse { ref name, .. } if name.ends_with("broken.obj")));
    }

    #[test]
    fn test_unreachable_server_is_transport_error() {
        // Port 9 (discard) on localhost is not expected to serve HTTP
        let fetcher = MeshFetcher::new("http://127.0.0.1:9");
        assert!(matches!(
            fetcher.fetch("x_obj.obj"),
            Err(LoadError::Transport { .. })
        ));
    }

    #[test]
    fn test_source_label() {
        assert_eq!(MeshSource::Remote("a_obj.obj".into()).label(), "a_obj.obj");
    }
}

//! Session store: result file names and scores handed over by an upload.
//!
//! The store is a flat key/value document. Typed sessions read it once
//! when a view opens and validate what they need up front.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::resolve::ScoreOverrides;
use crate::scores::{score_slot, ComparisonScores};

/// Stored result name of a single-session upload.
pub const KEY_RESULT: &str = "resultFilename";
/// Stored result name of the pre-op mesh in a comparison.
pub const KEY_RESULT_PRE: &str = "resultFilename_pre";
/// Stored result name of the post-op mesh in a comparison.
pub const KEY_RESULT_POST: &str = "resultFilename_post";
/// Per-feature scores of a single session (array of numbers).
pub const KEY_SCORES: &str = "noseScores";
/// Pre/post score arrays of a comparison (`{pre: [...], post: [...]}`).
pub const KEY_COMPARISON_SCORES: &str = "nose_scores";

/// Errors that can occur while reading or writing a session.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No '{key}' in session, run an upload first")]
    MissingInput { key: String },

    #[error("Session value '{key}' is malformed: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid session JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Key/value storage for session data.
pub trait SessionStore {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value) -> SessionResult<()>;
    fn remove(&mut self, key: &str) -> SessionResult<()>;
}

/// In-memory store.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> SessionResult<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> SessionResult<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// Store persisted as one JSON object on disk, rewritten on every change.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, Value>,
}

impl JsonFileStore {
    pub const DEFAULT_PATH: &'static str = "rhino_session.json";

    /// Open the store at `path`. A missing file is an empty store.
    pub fn open<P: AsRef<Path>>(path: P) -> SessionResult<Self> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            log::debug!("Session file {:?} does not exist yet", path);
            BTreeMap::new()
        };

        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> SessionResult<()> {
        let content = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl SessionStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> SessionResult<()> {
        self.values.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> SessionResult<()> {
        if self.values.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// Name of the viewable mesh for a stored result name.
///
/// The reconstruction stores `<id>.obj`; the viewable export next to it is
/// `<id>_obj.obj`. Only the first `.obj` is replaced.
pub fn mesh_name_for(result_name: &str) -> String {
    result_name.replacen(".obj", "_obj.obj", 1)
}

fn required_name(store: &dyn SessionStore, key: &str) -> SessionResult<String> {
    match store.get(key) {
        Some(Value::String(name)) if !name.is_empty() => Ok(name),
        Some(Value::Null) | None => Err(SessionError::MissingInput {
            key: key.to_string(),
        }),
        Some(Value::String(_)) => Err(SessionError::MissingInput {
            key: key.to_string(),
        }),
        Some(other) => Err(SessionError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a file name, found {}", other),
        }),
    }
}

/// Read an optional structured value. Values stored as JSON text are
/// decoded too; anything unreadable falls back to the default.
fn optional_value<T: DeserializeOwned + Default>(store: &dyn SessionStore, key: &str) -> T {
    let value = match store.get(key) {
        Some(Value::String(text)) => serde_json::from_str(&text).ok(),
        Some(Value::Null) | None => return T::default(),
        Some(other) => Some(other),
    };

    match value.map(serde_json::from_value::<T>) {
        Some(Ok(parsed)) => parsed,
        _ => {
            log::warn!("Ignoring malformed session value '{}'", key);
            T::default()
        }
    }
}

/// Inputs of the single-mesh view.
#[derive(Clone, Debug, PartialEq)]
pub struct SingleSession {
    pub result_name: String,
    pub scores: ScoreOverrides,
}

impl SingleSession {
    pub fn from_store(store: &dyn SessionStore) -> SessionResult<Self> {
        let result_name = required_name(store, KEY_RESULT)?;
        let slots: Vec<Value> = optional_value(store, KEY_SCORES);
        Ok(Self {
            result_name,
            scores: ScoreOverrides::from(slots.iter().map(score_slot).collect::<Vec<_>>()),
        })
    }

    pub fn mesh_name(&self) -> String {
        mesh_name_for(&self.result_name)
    }
}

/// Inputs of the pre/post comparison view.
#[derive(Clone, Debug, PartialEq)]
pub struct ComparisonSession {
    pub pre_name: String,
    pub post_name: String,
    pub scores: ComparisonScores,
}

impl ComparisonSession {
    pub fn from_store(store: &dyn SessionStore) -> SessionResult<Self> {
        let pre_name = required_name(store, KEY_RESULT_PRE)?;
        let post_name = required_name(store, KEY_RESULT_POST)?;
        let scores = optional_value(store, KEY_COMPARISON_SCORES);
        Ok(Self {
            pre_name,
            post_name,
            scores,
        })
    }

    pub fn pre_mesh_name(&self) -> String {
        mesh_name_for(&self.pre_name)
    }

    pub fn post_mesh_name(&self) -> String {
        mesh_name_for(&self.post_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mesh_name_for() {
        assert_eq!(mesh_name_for("abc123.obj"), "abc123_obj.obj");
        assert_eq!(mesh_name_for("a.obj.obj"), "a_obj.obj.obj");
        assert_eq!(mesh_name_for("plain"), "plain");
    }

    #[test]
    fn test_single_session_requires_filename() {
        let store = MemoryStore::new();
        let err = SingleSession::from_store(&store).unwrap_err();
        assert!(matches!(err, SessionError::MissingInput { ref key } if key == KEY_RESULT));
    }

    #[test]
    fn test_single_session_scores_default_to_empty() {
        let mut store = MemoryStore::new();
        store.set(KEY_RESULT, json!("face.obj")).unwrap();

        let session = SingleSession::from_store(&store).unwrap();
        assert_eq!(session.mesh_name(), "face_obj.obj");
        assert!(session.scores.is_empty());
    }

    #[test]
    fn test_scores_stored_as_json_text() {
        let mut store = MemoryStore::new();
        store.set(KEY_RESULT, json!("face.obj")).unwrap();
        store.set(KEY_SCORES, json!("[1, 2.5, 4]")).unwrap();

        let session = SingleSession::from_store(&store).unwrap();
        assert_eq!(session.scores, ScoreOverrides::from(vec![1.0, 2.5, 4.0]));
    }

    #[test]
    fn test_malformed_scores_fall_back() {
        let mut store = MemoryStore::new();
        store.set(KEY_RESULT, json!("face.obj")).unwrap();
        store.set(KEY_SCORES, json!({"not": "an array"})).unwrap();

        let session = SingleSession::from_store(&store).unwrap();
        assert!(session.scores.is_empty());
    }

    #[test]
    fn test_null_score_falls_back_per_entry() {
        let mut store = MemoryStore::new();
        store.set(KEY_RESULT, json!("face.obj")).unwrap();
        store.set(KEY_SCORES, json!([4, null, 2])).unwrap();

        let session = SingleSession::from_store(&store).unwrap();
        assert_eq!(session.scores.get(0), Some(4.0));
        assert_eq!(session.scores.get(1), None);
        assert_eq!(session.scores.get(2), Some(2.0));

        store
            .set(KEY_COMPARISON_SCORES, json!({"pre": [4, null, 2], "post": [1, 1, 1]}))
            .unwrap();
        store.set(KEY_RESULT_PRE, json!("pre.obj")).unwrap();
        store.set(KEY_RESULT_POST, json!("post.obj")).unwrap();
        let comparison = ComparisonSession::from_store(&store).unwrap();
        assert_eq!(comparison.scores.pre, vec![Some(4.0), None, Some(2.0)]);
    }

    #[test]
    fn test_comparison_session() {
        let mut store = MemoryStore::new();
        store.set(KEY_RESULT_PRE, json!("pre.obj")).unwrap();
        assert!(matches!(
            ComparisonSession::from_store(&store),
            Err(SessionError::MissingInput { ref key }) if key == KEY_RESULT_POST
        ));

        store.set(KEY_RESULT_POST, json!("post.obj")).unwrap();
        store
            .set(KEY_COMPARISON_SCORES, json!({"pre": [1, 2], "post": [3, 1]}))
            .unwrap();

        let session = ComparisonSession::from_store(&store).unwrap();
        assert_eq!(session.pre_mesh_name(), "pre_obj.obj");
        assert_eq!(session.post_mesh_name(), "post_obj.obj");
        assert_eq!(session.scores.post, vec![Some(3.0), Some(1.0)]);
    }

    #[test]
    fn test_non_string_filename_is_invalid() {
        let mut store = MemoryStore::new();
        store.set(KEY_RESULT, json!(42)).unwrap();
        assert!(matches!(
            SingleSession::from_store(&store),
            Err(SessionError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_json_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        assert!(store.get(KEY_RESULT).is_none());
        store.set(KEY_RESULT, json!("face.obj")).unwrap();
        store.set(KEY_SCORES, json!([4, 3])).unwrap();
        store.remove(KEY_SCORES).unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get(KEY_RESULT), Some(json!("face.obj")));
        assert!(reopened.get(KEY_SCORES).is_none());
    }

    #[test]
    fn test_json_file_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(matches!(JsonFileStore::open(&path), Err(SessionError::Json(_))));
    }
}

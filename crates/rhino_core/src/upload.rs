//! Client for the reconstruction backend's upload endpoints.
//!
//! The backend takes the four standard photographs (front, left profile,
//! right profile, basal), reconstructs a mesh and answers with the stored
//! result name plus scores. Responses are written to the session store
//! under the keys the viewer reads.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::multipart::Form;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::scores::ComparisonScores;
use crate::session::{
    SessionError, SessionStore, KEY_COMPARISON_SCORES, KEY_RESULT, KEY_RESULT_POST,
    KEY_RESULT_PRE, KEY_SCORES,
};

/// Errors that can occur while uploading images.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Image for '{field}' not found: {path:?}")]
    MissingImage { field: String, path: PathBuf },

    #[error("Failed to attach '{field}': {source}")]
    Attach {
        field: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Upload request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected backend response: {0}")]
    Response(#[from] serde_json::Error),

    #[error("Failed to save results: {0}")]
    Session(#[from] SessionError),
}

/// The four photographs of one session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageSet {
    pub front: PathBuf,
    pub left: PathBuf,
    pub right: PathBuf,
    pub basal: PathBuf,
}

impl ImageSet {
    pub fn new(
        front: impl Into<PathBuf>,
        left: impl Into<PathBuf>,
        right: impl Into<PathBuf>,
        basal: impl Into<PathBuf>,
    ) -> Self {
        Self {
            front: front.into(),
            left: left.into(),
            right: right.into(),
            basal: basal.into(),
        }
    }

    /// Views in upload order, with the multipart field name prefixed.
    fn fields(&self, prefix: &str) -> [(String, &Path); 4] {
        [
            (format!("{}front", prefix), self.front.as_path()),
            (format!("{}left", prefix), self.left.as_path()),
            (format!("{}right", prefix), self.right.as_path()),
            (format!("{}basal", prefix), self.basal.as_path()),
        ]
    }
}

/// Response of `POST /api/upload`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct UploadResponse {
    #[serde(rename = "3d_results")]
    pub result_name: String,

    #[serde(default)]
    pub nose_scores: Option<Vec<Option<f32>>>,

    #[serde(default)]
    pub message: Option<String>,
}

impl UploadResponse {
    /// Save the result name and scores for the single view.
    pub fn store_into(&self, store: &mut dyn SessionStore) -> Result<(), SessionError> {
        store.set(KEY_RESULT, json!(self.result_name))?;
        match &self.nose_scores {
            Some(scores) => store.set(KEY_SCORES, json!(scores)),
            // Scores of a previous session must not leak into this one
            None => store.remove(KEY_SCORES),
        }
    }
}

/// Response of `POST /api/upload_comparison`.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ComparisonUploadResponse {
    #[serde(rename = "3d_results_pre")]
    pub pre_name: String,

    #[serde(rename = "3d_results_post")]
    pub post_name: String,

    #[serde(default)]
    pub nose_scores: ComparisonScores,
}

impl ComparisonUploadResponse {
    /// Save both result names and the pre/post scores.
    pub fn store_into(&self, store: &mut dyn SessionStore) -> Result<(), SessionError> {
        store.set(KEY_RESULT_PRE, json!(self.pre_name))?;
        store.set(KEY_RESULT_POST, json!(self.post_name))?;
        store.set(KEY_COMPARISON_SCORES, serde_json::to_value(&self.nose_scores)?)
    }
}

/// Blocking client for the upload endpoints.
pub struct BackendClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl BackendClient {
    /// Reconstruction runs inside the request, so allow it a long time.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

    pub fn new(base_url: &str) -> Result<Self, UploadError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Upload one image set for reconstruction and scoring.
    pub fn upload(&self, images: &ImageSet) -> Result<UploadResponse, UploadError> {
        let form = build_form(&images.fields(""))?;
        let body = self.post("/api/upload", form)?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Upload a pre-op and a post-op image set for comparison.
    ///
    /// Pre-op views keep the single-upload field names; post-op views are
    /// prefixed with `post_`.
    pub fn upload_comparison(
        &self,
        pre: &ImageSet,
        post: &ImageSet,
    ) -> Result<ComparisonUploadResponse, UploadError> {
        let mut fields = pre.fields("").to_vec();
        fields.extend(post.fields("post_"));
        let form = build_form(&fields)?;
        let body = self.post("/api/upload_comparison", form)?;
        Ok(serde_json::from_str(&body)?)
    }

    fn post(&self, endpoint: &str, form: Form) -> Result<String, UploadError> {
        let url = format!("{}{}", self.base_url, endpoint);
        log::info!("Uploading images to {}", url);

        let resp = self.http.post(&url).multipart(form).send()?;
        let status = resp.status();
        let body = resp.text()?;

        if !status.is_success() {
            return Err(UploadError::Status {
                status: status.as_u16(),
                body,
            });
        }

        log::debug!("Backend response: {}", body);
        Ok(body)
    }
}

/// Check that every image exists, then attach them all.
fn build_form(fields: &[(String, &Path)]) -> Result<Form, UploadError> {
    check_images(fields)?;

    let mut form = Form::new();
    for (field, path) in fields {
        form = form.file(field.clone(), path).map_err(|source| UploadError::Attach {
            field: field.clone(),
            source,
        })?;
    }
    Ok(form)
}

fn check_images(fields: &[(String, &Path)]) -> Result<(), UploadError> {
    match fields.iter().find(|(_, path)| !path.is_file()) {
        Some((field, path)) => Err(UploadError::MissingImage {
            field: field.clone(),
            path: path.to_path_buf(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{ComparisonSession, MemoryStore, SingleSession};

    fn touch_images(dir: &Path, prefix: &str) -> ImageSet {
        let set = ImageSet::new(
            dir.join(format!("{}front.jpg", prefix)),
            dir.join(format!("{}left.jpg", prefix)),
            dir.join(format!("{}right.jpg", prefix)),
            dir.join(format!("{}basal.jpg", prefix)),
        );
        for (_, path) in set.fields("") {
            std::fs::write(path, b"jpeg").unwrap();
        }
        set
    }

    #[test]
    fn test_field_names() {
        let set = ImageSet::new("f", "l", "r", "b");
        let names: Vec<_> = set.fields("post_").into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["post_front", "post_left", "post_right", "post_basal"]);
    }

    #[test]
    fn test_missing_image_is_rejected_before_sending() {
        let dir = tempfile::tempdir().unwrap();
        let mut set = touch_images(dir.path(), "");
        set.basal = dir.path().join("nope.jpg");

        let err = check_images(&set.fields("")).unwrap_err();
        assert!(matches!(err, UploadError::MissingImage { ref field, .. } if field == "basal"));
    }

    #[test]
    fn test_complete_set_passes_check() {
        let dir = tempfile::tempdir().unwrap();
        let set = touch_images(dir.path(), "pre_");
        assert!(check_images(&set.fields("")).is_ok());
        assert!(build_form(&set.fields("")).is_ok());
    }

    #[test]
    fn test_single_response_round_trips_through_session() {
        let resp: UploadResponse = serde_json::from_str(
            r#"{"message": "ok", "saved_files": {}, "3d_results": "abc.obj", "nose_scores": [1, 2, 3]}"#,
        )
        .unwrap();

        let mut store = MemoryStore::new();
        resp.store_into(&mut store).unwrap();

        let session = SingleSession::from_store(&store).unwrap();
        assert_eq!(session.mesh_name(), "abc_obj.obj");
        assert_eq!(session.scores.get(2), Some(3.0));
    }

    #[test]
    fn test_single_response_without_scores_clears_old_ones() {
        let mut store = MemoryStore::new();
        store.set(KEY_SCORES, json!([4, 4])).unwrap();

        let resp: UploadResponse = serde_json::from_str(r#"{"3d_results": "abc.obj"}"#).unwrap();
        resp.store_into(&mut store).unwrap();

        assert!(store.get(KEY_SCORES).is_none());
    }

    #[test]
    fn test_comparison_response_round_trips_through_session() {
        let resp: ComparisonUploadResponse = serde_json::from_str(
            r#"{"3d_results_pre": "pre.obj", "3d_results_post": "post.obj",
                "nose_scores": {"pre": [2, 3], "post": [3, 3]}}"#,
        )
        .unwrap();

        let mut store = MemoryStore::new();
        resp.store_into(&mut store).unwrap();

        let session = ComparisonSession::from_store(&store).unwrap();
        assert_eq!(session.pre_name, "pre.obj");
        assert_eq!(session.scores.pre, vec![Some(2.0), Some(3.0)]);
    }

    #[test]
    fn test_response_without_result_is_an_error() {
        assert!(serde_json::from_str::<UploadResponse>(r#"{"message": "ok"}"#).is_err());
    }
}

//! Per-view state: load status, camera, overlay and screen placement.
//!
//! Nothing in here touches the GPU, so the whole interaction model can be
//! exercised without a window.

use rhino_core::{
    apply_vertex_colors, compare, resolve, ColorGains, ComparisonRow, ComparisonScores,
    LandmarkSchema, Mesh, Normalization, OverlayState, Resolved, ResolvedLandmark,
    ScoreOverrides,
};
use rhino_math::{Camera, Mat4, OrbitControls, Vec3};

use crate::markers::{MarkerSet, LANDMARK_RADIUS};
use crate::MeshData;

/// Everything needed to turn a loaded mesh into a viewable one.
#[derive(Clone, Debug)]
pub struct PrepareOptions {
    pub normalization: Normalization,
    pub gains: ColorGains,
    pub schema: LandmarkSchema,
    pub overrides: ScoreOverrides,
}

impl Default for PrepareOptions {
    fn default() -> Self {
        Self {
            normalization: Normalization::default(),
            gains: ColorGains::SINGLE_VIEW,
            schema: LandmarkSchema::nasal(),
            overrides: ScoreOverrides::none(),
        }
    }
}

/// A mesh after colors, normals, normalization and landmark resolution.
#[derive(Clone, Debug)]
pub struct PreparedMesh {
    pub data: MeshData,
    pub model: Mat4,
    pub resolved: Resolved,
    pub vertex_count: usize,
    pub triangle_count: usize,
    pub has_colors: bool,
}

impl PreparedMesh {
    /// Run the one-time pass over a freshly loaded mesh.
    ///
    /// Safe to call off the UI thread.
    pub fn prepare(mut mesh: Mesh, options: &PrepareOptions) -> Self {
        let has_colors = apply_vertex_colors(&mut mesh, options.gains);
        mesh.compute_normals();

        let missing = options.schema.validate(mesh.corner_count());
        if !missing.is_empty() {
            let names: Vec<_> = missing
                .iter()
                .map(|m| format!("{} ({})", m.name, m.vertex_index))
                .collect();
            log::warn!(
                "Mesh with {} triangle corners does not match topology '{}'; unresolved: {}",
                mesh.corner_count(),
                options.schema.topology,
                names.join(", ")
            );
        }

        let model = options.normalization.model_matrix(&mesh);
        let resolved = resolve(&mesh, &model, &options.schema, &options.overrides);

        Self {
            data: MeshData::from_core_mesh(&mesh),
            model,
            resolved,
            vertex_count: mesh.vertex_count(),
            triangle_count: mesh.triangle_count(),
            has_colors,
        }
    }
}

/// Load state of one view.
#[derive(Clone, Debug)]
pub enum ViewStatus {
    Loading,
    Ready(Box<PreparedMesh>),
    Failed(String),
}

/// Rectangle in egui points, origin top-left.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PaneRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PaneRect {
    pub const GAP: f32 = 8.0;

    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    pub fn aspect(&self) -> f32 {
        self.width / self.height.max(1.0)
    }

    /// Split into `count` side-by-side panes separated by [`PaneRect::GAP`].
    pub fn split(&self, count: usize) -> Vec<PaneRect> {
        if count == 0 {
            return Vec::new();
        }
        let gaps = Self::GAP * (count - 1) as f32;
        let width = ((self.width - gaps) / count as f32).max(1.0);

        (0..count)
            .map(|i| {
                PaneRect::new(
                    self.x + i as f32 * (width + Self::GAP),
                    self.y,
                    width,
                    self.height,
                )
            })
            .collect()
    }
}

/// One mesh pane with its own camera and overlay.
pub struct View {
    pub label: String,
    pub status: ViewStatus,
    pub camera: Camera,
    pub controls: OrbitControls,
    pub overlay: OverlayState,
    pub rect: Option<PaneRect>,
}

impl View {
    /// Camera distance of the single-result viewer
    pub const SINGLE_DISTANCE: f32 = 2.8;
    /// Camera distance of each comparison pane
    pub const COMPARISON_DISTANCE: f32 = 3.0;

    pub fn new(label: &str, distance: f32) -> Self {
        let camera = Camera::new(Vec3::new(0.0, 0.0, distance), Vec3::ZERO, 1.0);
        let controls = OrbitControls::horizontal(&camera);
        Self {
            label: label.to_string(),
            status: ViewStatus::Loading,
            camera,
            controls,
            overlay: OverlayState::new(),
            rect: None,
        }
    }

    pub fn prepared(&self) -> Option<&PreparedMesh> {
        match &self.status {
            ViewStatus::Ready(prepared) => Some(prepared.as_ref()),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.status, ViewStatus::Loading)
    }

    /// Advance the orbit controller by one frame. True while still moving.
    pub fn update_controls(&mut self) -> bool {
        self.controls.update(&mut self.camera)
    }

    /// Place the view on screen and match the camera aspect to it.
    pub fn set_pane(&mut self, rect: PaneRect) {
        self.rect = Some(rect);
        self.camera.set_aspect(rect.aspect());
    }

    /// Pointer drag over this view, in points.
    pub fn drag(&mut self, dx: f32, dy: f32) {
        let height = self.rect.map_or(1.0, |r| r.height);
        self.controls.drag(dx, dy, height);
    }

    /// Scroll wheel over this view (ignored while zoom is disabled).
    pub fn scroll(&mut self, delta: f32) {
        self.controls.scroll(delta);
    }

    /// Screen position (points) of a world point, if in front of the camera.
    pub fn project(&self, world: Vec3) -> Option<(f32, f32)> {
        let rect = self.rect?;
        let (x, y, _) = self.camera.project(world, (rect.width, rect.height))?;
        Some((rect.x + x, rect.y + y))
    }

    /// Re-pick the hovered landmark from the pointer position (points).
    pub fn update_hover(&mut self, pointer: Option<(f32, f32)>) {
        if !self.overlay.show_landmarks() {
            return;
        }
        let target = match (self.prepared(), self.rect, pointer) {
            (Some(prepared), Some(rect), Some((px, py))) if rect.contains(px, py) => pick_landmark(
                &self.camera,
                &prepared.resolved.landmarks,
                (px - rect.x, py - rect.y),
                (rect.width, rect.height),
            ),
            _ => None,
        };
        self.overlay.set_hover_target(target);
    }

    /// Marker instances for this frame.
    pub fn markers(&self) -> MarkerSet {
        match self.prepared() {
            Some(prepared) => MarkerSet::build(&prepared.resolved, &self.overlay),
            None => MarkerSet::default(),
        }
    }
}

/// Extra pick tolerance around a projected landmark sphere, in points
const PICK_SLACK: f32 = 3.0;

/// Landmark sphere under `pointer`, nearest to the camera if several overlap.
///
/// `pointer` and `size` are in the same units, relative to the view.
pub fn pick_landmark(
    camera: &Camera,
    landmarks: &[ResolvedLandmark],
    pointer: (f32, f32),
    size: (f32, f32),
) -> Option<usize> {
    landmarks
        .iter()
        .enumerate()
        .filter_map(|(i, landmark)| {
            let (x, y, depth) = camera.project(landmark.position, size)?;
            let distance = (landmark.position - camera.position).length();
            let radius = LANDMARK_RADIUS / camera.pixel_world_size(distance, size.1) + PICK_SLACK;
            let dx = x - pointer.0;
            let dy = y - pointer.1;
            (dx * dx + dy * dy <= radius * radius).then_some((i, depth))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

/// What the window shows.
pub enum PageKind {
    /// One result with landmark/feature overlay and total score
    Single,
    /// Pre-op and post-op results side by side with a comparison panel
    Comparison {
        scores: ComparisonScores,
        show_panel: bool,
    },
    /// Session lacks the inputs a view needs
    NoData { message: String },
}

/// Window content: a page layout and its views.
pub struct Page {
    pub title: String,
    pub kind: PageKind,
    pub views: Vec<View>,
}

impl Page {
    pub fn single(label: &str) -> Self {
        Self {
            title: "3D Face Viewer".to_string(),
            kind: PageKind::Single,
            views: vec![View::new(label, View::SINGLE_DISTANCE)],
        }
    }

    pub fn comparison(scores: ComparisonScores) -> Self {
        Self {
            title: "Pre-Op vs Post-Op Viewer".to_string(),
            kind: PageKind::Comparison {
                scores,
                show_panel: true,
            },
            views: vec![
                View::new("Pre-Op", View::COMPARISON_DISTANCE),
                View::new("Post-Op", View::COMPARISON_DISTANCE),
            ],
        }
    }

    pub fn no_data(message: &str) -> Self {
        Self {
            title: "No Data".to_string(),
            kind: PageKind::NoData {
                message: message.to_string(),
            },
            views: Vec::new(),
        }
    }

    /// Comparison rows against the pre-op view's features.
    ///
    /// Empty until the pre-op mesh is ready, or on other pages.
    pub fn comparison_rows(&self) -> Vec<ComparisonRow> {
        match (&self.kind, self.views.first().and_then(View::prepared)) {
            (PageKind::Comparison { scores, .. }, Some(pre)) => {
                compare(&pre.resolved.features, scores)
            }
            _ => Vec::new(),
        }
    }

    /// Index of the view containing a point (points).
    pub fn view_at(&self, x: f32, y: f32) -> Option<usize> {
        self.views
            .iter()
            .position(|v| v.rect.is_some_and(|r| r.contains(x, y)))
    }

    /// Advance every view's controller. True while any camera is moving.
    pub fn update_controls(&mut self) -> bool {
        self.views
            .iter_mut()
            .fold(false, |moving, view| view.update_controls() | moving)
    }
}

//! Hover and selection state of the landmark/feature overlay.
//!
//! The renderer reads this every frame; only UI events write it.

/// Which overlay is shown. The two are mutually exclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ViewMode {
    #[default]
    None,
    Landmarks,
    Features,
}

/// Transient overlay state owned by one view.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OverlayState {
    mode: ViewMode,
    hovered: Option<usize>,
    selected: Option<usize>,
}

impl OverlayState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn show_landmarks(&self) -> bool {
        self.mode == ViewMode::Landmarks
    }

    pub fn show_features(&self) -> bool {
        self.mode == ViewMode::Features
    }

    /// Currently hovered landmark, if any.
    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    /// Currently selected feature, if any.
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Turn the landmark overlay on or off. Leaves features mode.
    pub fn toggle_landmarks(&mut self) {
        self.mode = if self.show_landmarks() {
            ViewMode::None
        } else {
            ViewMode::Landmarks
        };
        self.clear_transient();
    }

    /// Turn the feature list on or off. Leaves landmarks mode.
    pub fn toggle_features(&mut self) {
        self.mode = if self.show_features() {
            ViewMode::None
        } else {
            ViewMode::Features
        };
        self.clear_transient();
    }

    /// Pointer entered landmark `index`; it becomes the only hovered one.
    pub fn pointer_enter(&mut self, index: usize) {
        if self.show_landmarks() {
            self.hovered = Some(index);
        }
    }

    /// Pointer left landmark `index`. Ignored unless `index` is hovered.
    pub fn pointer_leave(&mut self, index: usize) {
        if self.hovered == Some(index) {
            self.hovered = None;
        }
    }

    /// Move hover to whatever the picker found under the pointer this frame.
    pub fn set_hover_target(&mut self, target: Option<usize>) {
        match (self.hovered, target) {
            (Some(current), Some(next)) if current == next => {}
            (Some(current), next) => {
                self.pointer_leave(current);
                if let Some(next) = next {
                    self.pointer_enter(next);
                }
            }
            (None, Some(next)) => self.pointer_enter(next),
            (None, None) => {}
        }
    }

    /// Select feature `index`. Only valid while the feature list is shown.
    pub fn select_feature(&mut self, index: usize) {
        if self.show_features() {
            self.selected = Some(index);
        }
    }

    fn clear_transient(&mut self) {
        self.hovered = None;
        self.selected = None;
    }
}

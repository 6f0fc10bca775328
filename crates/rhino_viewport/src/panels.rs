//! egui panels and in-scene labels.
//!
//! Panels float over the 3D panes the way overlays sit on a canvas:
//! - Feature list (left) and total score (right) in features mode
//! - Collapsible comparison panel on the comparison page
//! - Loading/error placeholders per pane, and a "no data" page

use rhino_core::{format_total, total_score, ComparisonRow, ResolvedFeature, Trend, ViewMode};

use crate::view::{Page, PageKind, PaneRect, View, ViewStatus};

/// Shown under the total score.
pub const TOTAL_SCORE_TEXT: &str = "This score represents the combined evaluation of all 12 nasal \
    features. Higher scores indicate better symmetry, proportion, and aesthetic alignment of the \
    nose according to the model's assessment.";

const ACCENT: egui::Color32 = egui::Color32::from_rgb(37, 99, 235);
const SELECTED_ROW: egui::Color32 = egui::Color32::from_rgb(191, 219, 254);
const PANEL_MARGIN: f32 = 16.0;

/// Text color of a comparison row; `None` keeps the default.
pub fn trend_color(trend: Trend) -> Option<egui::Color32> {
    match trend {
        Trend::Improved => Some(egui::Color32::from_rgb(22, 163, 74)),
        Trend::Regressed => Some(egui::Color32::from_rgb(220, 38, 38)),
        Trend::Unchanged => None,
    }
}

/// Render the feature list.
///
/// Returns `Some(index)` when a row was clicked.
pub fn render_feature_list(
    ui: &mut egui::Ui,
    features: &[ResolvedFeature],
    selected: Option<usize>,
) -> Option<usize> {
    let mut clicked = None;

    egui::ScrollArea::vertical().show(ui, |ui| {
        for (i, feature) in features.iter().enumerate() {
            let is_selected = selected == Some(i);
            let name = if is_selected {
                egui::RichText::new(&feature.name).background_color(SELECTED_ROW)
            } else {
                egui::RichText::new(&feature.name)
            };

            ui.horizontal(|ui| {
                if ui.selectable_label(is_selected, name).clicked() {
                    clicked = Some(i);
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(
                        egui::RichText::new(feature.score.to_string())
                            .strong()
                            .color(egui::Color32::DARK_GRAY),
                    );
                });
            });
        }
    });

    clicked
}

/// Render the total-score panel body.
pub fn render_total_score(ui: &mut egui::Ui, features: &[ResolvedFeature]) {
    ui.label(
        egui::RichText::new(format_total(total_score(features)))
            .size(24.0)
            .strong()
            .color(ACCENT),
    );
    ui.add_space(6.0);
    ui.label(TOTAL_SCORE_TEXT);
}

/// Render the comparison rows.
pub fn render_comparison(ui: &mut egui::Ui, rows: &[ComparisonRow]) {
    if rows.is_empty() {
        ui.label("Waiting for the pre-op mesh...");
        return;
    }

    egui::Grid::new("comparison_rows")
        .num_columns(2)
        .striped(true)
        .show(ui, |ui| {
            for row in rows {
                ui.label(&row.name);
                let text = egui::RichText::new(row.text()).monospace();
                match trend_color(row.trend) {
                    Some(color) => ui.label(text.color(color)),
                    None => ui.label(text),
                };
                ui.end_row();
            }
        });
}

/// Paint a small label box with its bottom edge centered on `anchor`.
fn draw_label(painter: &egui::Painter, anchor: egui::Pos2, text: &str, size: f32) {
    let galley = painter.layout_no_wrap(
        text.to_string(),
        egui::FontId::proportional(size),
        egui::Color32::BLACK,
    );
    let padding = egui::vec2(6.0, 3.0);
    let rect = egui::Align2::CENTER_BOTTOM
        .anchor_size(anchor, galley.size() + padding * 2.0);

    painter.rect_filled(rect.translate(egui::vec2(0.0, 1.0)), 4.0, egui::Color32::from_black_alpha(40));
    painter.rect_filled(rect, 4.0, egui::Color32::WHITE);
    painter.galley(rect.min + padding, galley, egui::Color32::BLACK);
}

/// Hovered landmark name and selected feature name, anchored in the scene.
fn draw_scene_labels(painter: &egui::Painter, view: &View) {
    let Some(prepared) = view.prepared() else {
        return;
    };

    if let Some(landmark) = view
        .overlay
        .hovered()
        .and_then(|i| prepared.resolved.landmarks.get(i))
    {
        if let Some((x, y)) = view.project(landmark.position) {
            draw_label(painter, egui::pos2(x, y - 8.0), &landmark.name, 11.0);
        }
    }

    if let Some(feature) = view
        .overlay
        .selected()
        .and_then(|i| prepared.resolved.features.get(i))
    {
        if let Some((x, y)) = view.project(feature.center) {
            let tip = egui::pos2(x, y - 12.0);
            painter.add(egui::Shape::convex_polygon(
                vec![tip, tip + egui::vec2(-7.0, -9.0), tip + egui::vec2(7.0, -9.0)],
                egui::Color32::WHITE,
                egui::Stroke::NONE,
            ));
            draw_label(painter, tip - egui::vec2(0.0, 9.0), &feature.name, 15.0);
        }
    }
}

/// Loading spinner or error message centered in a pane.
fn draw_status(ctx: &egui::Context, index: usize, view: &View) {
    let Some(rect) = view.rect else {
        return;
    };
    let center = egui::pos2(rect.x + rect.width * 0.5, rect.y + rect.height * 0.5);

    let show = |add: &dyn Fn(&mut egui::Ui)| {
        egui::Area::new(egui::Id::new(("view_status", index)))
            .fixed_pos(center)
            .pivot(egui::Align2::CENTER_CENTER)
            .interactable(false)
            .show(ctx, |ui| add(ui));
    };

    match &view.status {
        ViewStatus::Loading => show(&|ui: &mut egui::Ui| {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label(format!("Loading {}...", view.label));
            });
        }),
        ViewStatus::Failed(message) => show(&|ui: &mut egui::Ui| {
            ui.vertical_centered(|ui| {
                ui.colored_label(egui::Color32::from_rgb(220, 38, 38), "Failed to load mesh");
                ui.label(message.as_str());
            });
        }),
        ViewStatus::Ready(_) => {}
    }
}

fn draw_toolbar(ctx: &egui::Context, page: &mut Page) {
    egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.heading(&page.title);
            ui.separator();

            match &mut page.kind {
                PageKind::Single => {
                    if let Some(view) = page.views.first_mut() {
                        let mode = view.overlay.mode();
                        if ui
                            .selectable_label(mode == ViewMode::Landmarks, "Landmarks")
                            .clicked()
                        {
                            view.overlay.toggle_landmarks();
                        }
                        if ui
                            .selectable_label(mode == ViewMode::Features, "Features")
                            .clicked()
                        {
                            view.overlay.toggle_features();
                        }
                    }
                }
                PageKind::Comparison { show_panel, .. } => {
                    let text = if *show_panel { "Hide Panel" } else { "Show Panel" };
                    if ui.button(text).clicked() {
                        *show_panel = !*show_panel;
                    }
                }
                PageKind::NoData { .. } => {}
            }
        });
    });
}

fn draw_single_panels(ctx: &egui::Context, view: &mut View) {
    if !view.overlay.show_features() {
        return;
    }
    let Some(prepared) = view.prepared() else {
        return;
    };
    let features = &prepared.resolved.features;
    let mut clicked = None;

    egui::Window::new("Facial Features")
        .anchor(egui::Align2::LEFT_TOP, [PANEL_MARGIN, PANEL_MARGIN])
        .resizable(false)
        .collapsible(false)
        .default_width(300.0)
        .show(ctx, |ui| {
            clicked = render_feature_list(ui, features, view.overlay.selected());
        });

    egui::Window::new("Total Score")
        .anchor(egui::Align2::RIGHT_TOP, [-PANEL_MARGIN, PANEL_MARGIN])
        .resizable(false)
        .collapsible(false)
        .default_width(260.0)
        .show(ctx, |ui| render_total_score(ui, features));

    if let Some(i) = clicked {
        view.overlay.select_feature(i);
    }
}

fn draw_comparison_panel(ctx: &egui::Context, rows: &[ComparisonRow]) {
    egui::Window::new("Feature Comparison")
        .anchor(egui::Align2::LEFT_TOP, [PANEL_MARGIN, PANEL_MARGIN])
        .resizable(false)
        .collapsible(false)
        .default_width(340.0)
        .show(ctx, |ui| render_comparison(ui, rows));
}

fn draw_no_data(ctx: &egui::Context, message: &str) {
    egui::CentralPanel::default().show(ctx, |ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(ui.available_height() * 0.35);
            ui.heading("No data to show");
            ui.label(message);
            ui.label("Run an upload first, then open the viewer again.");
        });
    });
}

/// Build the whole UI for one frame and lay out the 3D panes.
pub fn draw_page(ctx: &egui::Context, page: &mut Page) {
    draw_toolbar(ctx, page);

    if let PageKind::NoData { message } = &page.kind {
        draw_no_data(ctx, message);
        return;
    }

    let available = ctx.available_rect();
    let area = PaneRect::new(
        available.min.x,
        available.min.y,
        available.width(),
        available.height(),
    );
    let panes = area.split(page.views.len());
    for (view, pane) in page.views.iter_mut().zip(panes) {
        view.set_pane(pane);
    }

    let pointer = ctx
        .pointer_hover_pos()
        .filter(|_| !ctx.is_pointer_over_area())
        .map(|p| (p.x, p.y));

    let painter = ctx.layer_painter(egui::LayerId::new(
        egui::Order::Background,
        egui::Id::new("scene_labels"),
    ));

    let captions = page.views.len() > 1;
    for (i, view) in page.views.iter_mut().enumerate() {
        view.update_hover(pointer);
        draw_scene_labels(&painter, view);
        draw_status(ctx, i, view);

        if let (true, Some(rect)) = (captions, view.rect) {
            painter.text(
                egui::pos2(rect.x + rect.width - PANEL_MARGIN, rect.y + rect.height - PANEL_MARGIN),
                egui::Align2::RIGHT_BOTTOM,
                &view.label,
                egui::FontId::proportional(16.0),
                egui::Color32::DARK_GRAY,
            );
        }
    }

    match &page.kind {
        PageKind::Single => {
            if let Some(view) = page.views.first_mut() {
                draw_single_panels(ctx, view);
            }
        }
        PageKind::Comparison { show_panel, .. } => {
            if *show_panel {
                draw_comparison_panel(ctx, &page.comparison_rows());
            }
        }
        PageKind::NoData { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhino_core::ComparisonScores;

    #[test]
    fn test_trend_colors() {
        assert_eq!(
            trend_color(Trend::Improved),
            Some(egui::Color32::from_rgb(22, 163, 74))
        );
        assert_eq!(
            trend_color(Trend::Regressed),
            Some(egui::Color32::from_rgb(220, 38, 38))
        );
        assert_eq!(trend_color(Trend::Unchanged), None);
    }

    #[test]
    fn test_draw_page_lays_out_comparison_panes() {
        let ctx = egui::Context::default();
        let mut page = Page::comparison(ComparisonScores::default());

        let input = egui::RawInput {
            screen_rect: Some(egui::Rect::from_min_size(
                egui::Pos2::ZERO,
                egui::vec2(1000.0, 700.0),
            )),
            ..Default::default()
        };
        let _ = ctx.run(input, |ctx| draw_page(ctx, &mut page));

        let pre = page.views[0].rect.unwrap();
        let post = page.views[1].rect.unwrap();
        assert!(pre.y > 0.0, "panes start below the toolbar");
        assert!((pre.width - post.width).abs() < 1e-3);
        assert!(post.x > pre.x + pre.width);
    }

    #[test]
    fn test_draw_page_no_data_has_no_panes() {
        let ctx = egui::Context::default();
        let mut page = Page::no_data("No 'resultFilename' in session");

        let _ = ctx.run(egui::RawInput::default(), |ctx| draw_page(ctx, &mut page));
        assert!(page.views.is_empty());
    }
}

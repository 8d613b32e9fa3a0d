// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Drawing canvas for frame display and hint editing.
//!
//! This module provides the main canvas area where users view the current
//! frame and place, move, recolor and remove color hints.

use crate::app::Tool;
use crate::models::color_point::FramePointSet;
use crate::util::geometry::{self, ViewTransform};

/// Result of canvas interaction. Coordinates are frame pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CanvasAction {
    None,
    PickColor(u32, u32),
    AddPoint(u32, u32),
    SelectPoint(usize),
    Deselect,
    StartDragging(usize),
    DragPoint(u32, u32),
    StopDragging,
    RemovePoint(usize),
}

/// What the canvas draws this frame.
pub struct CanvasView<'a> {
    pub texture: Option<&'a egui::TextureHandle>,
    pub frame_size: (u32, u32),
    pub points: &'a FramePointSet,
    pub selected: Option<usize>,
    pub dragging: Option<usize>,
    pub tool: Tool,
    pub point_radius: f32,
}

/// Canvas output: the requested action and the hovered frame pixel.
pub struct CanvasOutput {
    pub action: CanvasAction,
    pub hover: Option<(u32, u32)>,
}

/// Display the main canvas area and handle mouse interactions.
pub fn show(ui: &mut egui::Ui, view: CanvasView<'_>, transform: &mut ViewTransform) -> CanvasOutput {
    let mut output = CanvasOutput {
        action: CanvasAction::None,
        hover: None,
    };

    ui.style_mut().visuals.extreme_bg_color = egui::Color32::from_gray(40);

    let Some(texture) = view.texture else {
        welcome(ui);
        return output;
    };

    let (area, response) = ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());
    let painter = ui.painter_at(area);
    painter.rect_filled(area, 0.0, egui::Color32::from_gray(40));

    // Zoom around the cursor
    if response.hovered() {
        let scroll = ui.input(|i| i.raw_scroll_delta.y);
        if scroll != 0.0 {
            if let Some(pos) = response.hover_pos() {
                transform.zoom_at((scroll * 0.002).exp(), pos, area);
            }
        }
    }

    let image_rect = geometry::image_rect(view.frame_size, area, transform);
    painter.image(
        texture.id(),
        image_rect,
        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
        egui::Color32::WHITE,
    );

    let to_frame = |pos: egui::Pos2| geometry::screen_to_frame(pos, image_rect, view.frame_size);
    let hit = |pos: egui::Pos2| {
        geometry::hit_test(view.points, pos, image_rect, view.frame_size, view.point_radius + 2.0)
    };

    output.hover = response.hover_pos().and_then(to_frame);
    let pointer = response.interact_pointer_pos();

    match view.tool {
        Tool::Hand => {
            if response.dragged() {
                transform.pan += response.drag_delta();
            }
            if response.double_clicked() {
                transform.reset();
            }
        }
        Tool::Eyedropper => {
            if response.clicked() || response.dragged() {
                if let Some((x, y)) = pointer.and_then(to_frame) {
                    output.action = CanvasAction::PickColor(x, y);
                }
            }
        }
        Tool::AddPoint => {
            if response.clicked() {
                if let Some((x, y)) = pointer.and_then(to_frame) {
                    output.action = CanvasAction::AddPoint(x, y);
                }
            }
        }
        Tool::EditPoint => {
            if response.drag_started() {
                if let Some(idx) = pointer.and_then(hit) {
                    output.action = CanvasAction::StartDragging(idx);
                }
            } else if response.dragged() && view.dragging.is_some() {
                if let Some((x, y)) = pointer.and_then(to_frame) {
                    output.action = CanvasAction::DragPoint(x, y);
                }
            } else if response.drag_stopped() && view.dragging.is_some() {
                output.action = CanvasAction::StopDragging;
            } else if response.clicked() {
                output.action = match pointer.and_then(hit) {
                    Some(idx) => CanvasAction::SelectPoint(idx),
                    None => CanvasAction::Deselect,
                };
            }
        }
        Tool::RemovePoint => {
            if response.clicked() {
                if let Some(idx) = pointer.and_then(hit) {
                    output.action = CanvasAction::RemovePoint(idx);
                }
            }
        }
    }

    draw_points(&painter, &view, image_rect);

    output
}

/// Draw every hint as a filled marker, outlining the selected one.
fn draw_points(painter: &egui::Painter, view: &CanvasView<'_>, image_rect: egui::Rect) {
    for (idx, point) in view.points.iter().enumerate() {
        let center = geometry::frame_to_screen(point.x, point.y, image_rect, view.frame_size);
        let [r, g, b] = point.color;
        painter.circle_filled(center, view.point_radius, egui::Color32::from_rgb(r, g, b));

        if view.selected == Some(idx) {
            painter.circle_stroke(center, view.point_radius + 2.0, egui::Stroke::new(2.0, egui::Color32::YELLOW));
        } else {
            painter.circle_stroke(center, view.point_radius, egui::Stroke::new(1.0, egui::Color32::BLACK));
        }
    }
}

fn welcome(ui: &mut egui::Ui) {
    ui.centered_and_justified(|ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(20.0);
            ui.heading(
                egui::RichText::new("ChromaHint")
                    .size(32.0)
                    .color(egui::Color32::from_gray(200)),
            );
            ui.label(
                egui::RichText::new("Interactive video colorization")
                    .size(14.0)
                    .color(egui::Color32::from_gray(150)),
            );
            ui.add_space(20.0);
            ui.label(
                egui::RichText::new("Open a video, an image sequence or a project to begin")
                    .color(egui::Color32::from_gray(180)),
            );
            ui.add_space(10.0);
            ui.label(
                egui::RichText::new("File → New Project...")
                    .weak()
                    .color(egui::Color32::from_gray(130)),
            );
        });
    });
}

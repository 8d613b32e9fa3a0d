// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Hint properties panel.
//!
//! This module provides the side panel listing the hints of the current
//! frame with their positions and colors.

use crate::models::color_point::{FramePointSet, Rgb};
use crate::models::project::ProjectState;

/// Result of properties panel interaction.
pub enum PropertiesAction {
    None,
    SelectPoint(usize),
    DeletePoint(usize),
    RecolorPoint(usize, Rgb),
    ClearPoints,
}

/// Display the properties panel.
pub fn show(
    ui: &mut egui::Ui,
    project: Option<&ProjectState>,
    points: &FramePointSet,
    selected: Option<usize>,
) -> PropertiesAction {
    let mut action = PropertiesAction::None;

    ui.heading("Hints");
    ui.separator();

    let Some(project) = project else {
        ui.label(egui::RichText::new("No project loaded").weak());
        return action;
    };

    ui.label(format!("Frame {}", project.current_frame + 1));
    ui.label(format!("{} hints on this frame", points.len()));
    ui.label(
        egui::RichText::new(format!(
            "{} frames annotated in project",
            project.annotated_frames().count()
        ))
        .weak(),
    );
    ui.separator();

    egui::ScrollArea::vertical()
        .max_height(ui.available_height() - 40.0)
        .show(ui, |ui| {
            for (idx, point) in points.iter().enumerate() {
                ui.horizontal(|ui| {
                    let mut color = point.color;
                    if ui.color_edit_button_srgb(&mut color).changed() {
                        action = PropertiesAction::RecolorPoint(idx, color);
                    }

                    let label = format!("#{} ({}, {})", idx + 1, point.x, point.y);
                    if ui.selectable_label(selected == Some(idx), label).clicked() {
                        action = PropertiesAction::SelectPoint(idx);
                    }

                    if ui.small_button("🗑").on_hover_text("Remove hint").clicked() {
                        action = PropertiesAction::DeletePoint(idx);
                    }
                });
            }
        });

    ui.separator();
    if ui
        .add_enabled(!points.is_empty(), egui::Button::new("Clear frame"))
        .clicked()
    {
        action = PropertiesAction::ClearPoints;
    }

    action
}

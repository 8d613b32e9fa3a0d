// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Toolbar and tool selection UI.
//!
//! This module provides the toolbar for picking the editing tool, the
//! scene mode and the color given to new hints.

use crate::app::{SceneMode, Tool};
use crate::models::color_point::Rgb;

/// Result of toolbar interaction.
pub enum ToolbarAction {
    None,
    /// The current color was changed by the user.
    ColorChanged(Rgb),
}

/// Display the toolbar with tool selection buttons.
pub fn show(
    ui: &mut egui::Ui,
    current_tool: &mut Tool,
    scene_mode: &mut SceneMode,
    current_color: &mut Rgb,
) -> ToolbarAction {
    let mut action = ToolbarAction::None;

    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 8.0;

        ui.label("Tools:");
        ui.separator();

        for (tool, label) in [
            (Tool::Hand, "✋ Hand"),
            (Tool::Eyedropper, "💧 Eyedropper"),
            (Tool::AddPoint, "➕ Add"),
            (Tool::EditPoint, "✏ Edit"),
            (Tool::RemovePoint, "➖ Remove"),
        ] {
            if ui.selectable_label(*current_tool == tool, label).clicked() {
                *current_tool = tool;
            }
        }

        ui.separator();

        // Hint color; recolors the selected point as well
        ui.label("Color:");
        if ui.color_edit_button_srgb(current_color).changed() {
            action = ToolbarAction::ColorChanged(*current_color);
        }

        ui.separator();

        ui.label("View:");
        for (mode, label) in [
            (SceneMode::Original, "Original"),
            (SceneMode::Grayscale, "Grayscale"),
            (SceneMode::Colorized, "Colorized"),
        ] {
            if ui.selectable_label(*scene_mode == mode, label).clicked() {
                *scene_mode = mode;
            }
        }

        ui.separator();

        let tool_text = match current_tool {
            Tool::Hand => "Drag to pan, scroll to zoom",
            Tool::Eyedropper => "Click or drag over the frame to pick a color",
            Tool::AddPoint => "Click to place a hint with the current color",
            Tool::EditPoint => "Click a hint to select it, drag to move it",
            Tool::RemovePoint => "Click a hint to remove it",
        };

        ui.label(egui::RichText::new(tool_text).italics().weak());
    });

    action
}

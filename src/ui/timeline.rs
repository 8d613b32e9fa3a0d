// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Video timeline scrubber control.
//!
//! This module provides the timeline for stepping through frames,
//! stepping with hint propagation, and starting colorization. Frame
//! numbers are shown one-based.

/// Result of timeline interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineAction {
    None,
    /// Jump to a zero-based frame index.
    Seek(usize),
    Previous,
    Next,
    /// Next frame, carrying the current hints along.
    NextWithPropagation,
    Colorize,
}

/// Display the timeline. `busy` disables everything that starts a request
/// or leaves the current frame.
pub fn show(
    ui: &mut egui::Ui,
    current: usize,
    frame_count: usize,
    busy: bool,
    can_colorize: bool,
) -> TimelineAction {
    let mut action = TimelineAction::None;
    let last = frame_count.saturating_sub(1);

    ui.horizontal(|ui| {
        let nav = !busy && frame_count > 0;

        if ui.add_enabled(nav && current > 0, egui::Button::new("⏮ Prev")).clicked() {
            action = TimelineAction::Previous;
        }
        if ui.add_enabled(nav && current < last, egui::Button::new("Next ⏭")).clicked() {
            action = TimelineAction::Next;
        }
        if ui
            .add_enabled(nav && current < last, egui::Button::new("Next + propagate ⏩"))
            .on_hover_text("Track the hints into the next frame")
            .clicked()
        {
            action = TimelineAction::NextWithPropagation;
        }

        ui.separator();

        let mut display = current + 1;
        let slider = egui::Slider::new(&mut display, 1..=frame_count.max(1)).text(format!("/ {}", frame_count));
        let response = ui.add_enabled(nav, slider);
        if response.changed() && display != current + 1 {
            action = TimelineAction::Seek(display - 1);
        }

        ui.separator();

        if ui
            .add_enabled(!busy && can_colorize, egui::Button::new("🎨 Colorize"))
            .clicked()
        {
            action = TimelineAction::Colorize;
        }
        if busy {
            ui.spinner();
        }
    });

    action
}

// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! ChromaHint - Interactive Video Colorization
//!
//! A cross-platform desktop application for colorizing grayscale videos
//! and image sequences from sparse user color hints.

use anyhow::Result;
use chromahint::app::ChromaHintApp;
use chromahint::config::Settings;

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let settings = Settings::load();

    // Configure egui options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 720.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("ChromaHint - Interactive Video Colorization"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "ChromaHint",
        options,
        Box::new(move |_cc| Ok(Box::new(ChromaHintApp::new(settings)))),
    )
    .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}

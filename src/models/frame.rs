// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Decoded video frames.
//!
//! A frame owns its RGB pixels. The gray and luminance views are derived
//! lazily the first time they are asked for and then kept with the frame,
//! so a frame served from the cache never recomputes them.

use crate::colorize::color::{self, LuminanceImage};
use image::{GrayImage, RgbImage};
use std::sync::OnceLock;

/// One decoded frame of the sequence.
#[derive(Debug)]
pub struct Frame {
    index: usize,
    rgb: RgbImage,
    gray: OnceLock<GrayImage>,
    luminance: OnceLock<LuminanceImage>,
}

impl Frame {
    pub fn new(index: usize, rgb: RgbImage) -> Self {
        Self {
            index,
            rgb,
            gray: OnceLock::new(),
            luminance: OnceLock::new(),
        }
    }

    /// Zero-based index of this frame in its source.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn width(&self) -> u32 {
        self.rgb.width()
    }

    pub fn height(&self) -> u32 {
        self.rgb.height()
    }

    pub fn size(&self) -> (u32, u32) {
        self.rgb.dimensions()
    }

    pub fn rgb(&self) -> &RgbImage {
        &self.rgb
    }

    /// Single-channel gray view, used by the tracker.
    pub fn gray(&self) -> &GrayImage {
        self.gray.get_or_init(|| image::imageops::grayscale(&self.rgb))
    }

    /// Gray view expanded back to three identical channels for display.
    pub fn gray_rgb(&self) -> RgbImage {
        let gray = self.gray();
        RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
            let v = gray.get_pixel(x, y)[0];
            image::Rgb([v, v, v])
        })
    }

    /// Lab L channel at full resolution, used by the compositor.
    pub fn luminance(&self) -> &LuminanceImage {
        self.luminance
            .get_or_init(|| color::rgb_to_luminance(&self.rgb))
    }
}

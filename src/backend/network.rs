// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! The boundary to a pretrained colorization network.

use image::RgbImage;
use ndarray::Array3;

/// A loaded colorization network.
///
/// The network works at a fixed square resolution `R`. A forward pass is
/// two calls: `set_image` with the gray frame, then `forward` with the hint
/// tensors. The session holds its lock across both, so an implementation
/// may keep the image between them.
pub trait ColorizationNetwork: Send {
    /// Side length `R` of the square input.
    fn resolution(&self) -> u32;

    /// Gray frame at `R x R`, three identical channels.
    fn set_image(&mut self, gray: &RgbImage);

    /// Predict chrominance from `2 x R x R` hint chroma and a `1 x R x R`
    /// mask. Returns `2 x R x R` Lab `a`/`b`.
    fn forward(
        &mut self,
        hint_chroma: &Array3<f32>,
        hint_mask: &Array3<bool>,
    ) -> anyhow::Result<Array3<f32>>;
}

// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Pre- and post-processing around the colorization network.
//!
//! `prepare` turns a frame and its hints into an [`InferenceRequest`] at
//! network resolution; `finish` turns the network's chrominance back into
//! a full-resolution RGB frame.

pub mod color;
pub mod compositor;
pub mod mapper;
pub mod rasterizer;

use crate::models::{color_point::FramePointSet, frame::Frame};
use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array3;

/// Inputs for one forward pass.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    /// Gray frame, three identical channels, `R x R`.
    pub gray: RgbImage,
    /// `2 x R x R` hint chrominance.
    pub hint_chroma: Array3<f32>,
    /// `1 x R x R` hint mask.
    pub hint_mask: Array3<bool>,
}

impl InferenceRequest {
    pub fn resolution(&self) -> u32 {
        self.gray.width()
    }
}

/// Chrominance predicted by the network, `2 x R x R`.
#[derive(Debug, Clone)]
pub struct InferenceResult {
    pub chroma: Array3<f32>,
}

/// Build the network inputs for `frame` with `points` as hints.
pub fn prepare(frame: &Frame, points: &FramePointSet, resolution: u32) -> InferenceRequest {
    let gray = imageops::resize(&frame.gray_rgb(), resolution, resolution, FilterType::CatmullRom);
    let planes = rasterizer::rasterize(points, frame.size(), resolution);

    InferenceRequest {
        gray,
        hint_chroma: planes.chroma_tensor(),
        hint_mask: planes.mask_tensor(),
    }
}

/// Combine the network output with the frame's own luminance.
pub fn finish(frame: &Frame, result: &InferenceResult) -> RgbImage {
    compositor::composite(frame.luminance(), &result.chroma)
}

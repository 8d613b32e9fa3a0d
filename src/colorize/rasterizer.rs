// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Hint rasterization.
//!
//! Burns a sparse point set into the two planes the colorization network
//! consumes: a color image with a filled square around every hint and a
//! mask marking where hints were drawn.

use super::{color, mapper};
use crate::models::color_point::FramePointSet;
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use ndarray::{Array3, Axis};

const MASK_ON: Luma<u8> = Luma([255]);

/// Hint planes at network resolution, in pixel layout.
#[derive(Debug, Clone)]
pub struct HintPlanes {
    pub color: RgbImage,
    pub mask: GrayImage,
}

impl HintPlanes {
    pub fn resolution(&self) -> u32 {
        self.mask.width()
    }

    /// Channel-first `1 x R x R` mask.
    pub fn mask_tensor(&self) -> Array3<bool> {
        let r = self.resolution() as usize;
        Array3::from_shape_fn((1, r, r), |(_, y, x)| {
            self.mask.get_pixel(x as u32, y as u32)[0] > 0
        })
    }

    /// Channel-first `2 x R x R` Lab chrominance of the hint colors.
    ///
    /// Luminance is dropped: it comes from the real frame, not the hints.
    /// Unmasked pixels are black, whose chrominance is zero.
    pub fn chroma_tensor(&self) -> Array3<f32> {
        let r = self.resolution() as usize;
        let mut ab = Array3::<f32>::zeros((2, r, r));
        for (x, y, px) in self.mask.enumerate_pixels() {
            if px[0] == 0 {
                continue;
            }
            let Rgb(rgb) = *self.color.get_pixel(x, y);
            let [_, a, b] = color::rgb_to_lab(rgb);
            ab[[0, y as usize, x as usize]] = a;
            ab[[1, y as usize, x as usize]] = b;
        }
        ab
    }
}

/// Draw every point of `points` into fresh `network x network` planes.
///
/// Points are mapped from `frame_size` into network space; each gets a
/// `2w+1` square clipped to the planes. Later points overwrite earlier
/// ones where squares overlap.
pub fn rasterize(points: &FramePointSet, frame_size: (u32, u32), network: u32) -> HintPlanes {
    let mut color_plane = RgbImage::new(network, network);
    let mut mask = GrayImage::new(network, network);
    let w = mapper::hint_half_width(frame_size, network);
    let side = 2 * w + 1;

    for point in points {
        let (nx, ny) = mapper::to_network_space((point.x, point.y), frame_size, network);
        let rect = Rect::at(nx as i32 - w as i32, ny as i32 - w as i32).of_size(side, side);
        draw_filled_rect_mut(&mut mask, rect, MASK_ON);
        draw_filled_rect_mut(&mut color_plane, rect, Rgb(point.color));
    }

    HintPlanes {
        color: color_plane,
        mask,
    }
}

/// Count of `true` mask cells, handy for logging.
pub fn masked_cells(mask: &Array3<bool>) -> usize {
    mask.index_axis(Axis(0), 0).iter().filter(|&&m| m).count()
}

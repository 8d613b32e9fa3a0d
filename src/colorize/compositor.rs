// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Output compositing.
//!
//! The network predicts chrominance at its own small resolution. This
//! module upsamples that prediction to the frame size and recombines it
//! with the frame's full-resolution luminance.

use super::color::{self, LuminanceImage};
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma, RgbImage};
use ndarray::{Array3, ArrayView2, Axis};

type ChromaPlane = ImageBuffer<Luma<f32>, Vec<f32>>;

// `image` clamps float samples to [0, 1] while resizing, so chroma is
// shifted into that range for the resize and shifted back afterwards.
const CHROMA_OFFSET: f32 = 128.0;
const CHROMA_SPAN: f32 = 256.0;

/// Build the displayable frame from full-resolution `L` and `2 x R x R`
/// network chrominance.
pub fn composite(luminance: &LuminanceImage, chroma: &Array3<f32>) -> RgbImage {
    assert_eq!(chroma.shape()[0], 2, "chrominance must have two channels");
    let (width, height) = luminance.dimensions();

    let a = upsample(chroma.index_axis(Axis(0), 0), width, height);
    let b = upsample(chroma.index_axis(Axis(0), 1), width, height);

    RgbImage::from_fn(width, height, |x, y| {
        let l = luminance.get_pixel(x, y)[0];
        image::Rgb(color::lab_to_rgb(
            l,
            a.get_pixel(x, y)[0],
            b.get_pixel(x, y)[0],
        ))
    })
}

/// Cubic resize of one chroma channel to frame size.
fn upsample(channel: ArrayView2<'_, f32>, width: u32, height: u32) -> ChromaPlane {
    let (rows, cols) = channel.dim();
    if (cols as u32, rows as u32) == (width, height) {
        return ChromaPlane::from_fn(width, height, |x, y| {
            Luma([channel[[y as usize, x as usize]]])
        });
    }

    let packed = ChromaPlane::from_fn(cols as u32, rows as u32, |x, y| {
        Luma([(channel[[y as usize, x as usize]] + CHROMA_OFFSET) / CHROMA_SPAN])
    });
    let mut resized = imageops::resize(&packed, width, height, FilterType::CatmullRom);
    for px in resized.pixels_mut() {
        px[0] = px[0] * CHROMA_SPAN - CHROMA_OFFSET;
    }
    resized
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_zero_chroma_gives_gray() {
        let frame = RgbImage::from_pixel(40, 30, Rgb([90, 160, 40]));
        let lum = color::rgb_to_luminance(&frame);
        let out = composite(&lum, &Array3::zeros((2, 8, 8)));

        assert_eq!(out.dimensions(), (40, 30));
        let px = out.get_pixel(20, 15).0;
        assert!((px[0] as i32 - px[1] as i32).abs() <= 1);
        assert!((px[1] as i32 - px[2] as i32).abs() <= 1);
    }

    #[test]
    fn test_uniform_chroma_restores_color() {
        let source = [200u8, 50, 50];
        let [l, a, b] = color::rgb_to_lab(source);
        let lum = LuminanceImage::from_pixel(64, 48, Luma([l]));

        let mut chroma = Array3::zeros((2, 16, 16));
        chroma.index_axis_mut(Axis(0), 0).fill(a);
        chroma.index_axis_mut(Axis(0), 1).fill(b);

        let out = composite(&lum, &chroma);
        for px in [out.get_pixel(0, 0).0, out.get_pixel(63, 47).0, out.get_pixel(30, 20).0] {
            for (got, want) in px.iter().zip(source) {
                assert!((*got as i32 - want as i32).abs() <= 2, "{:?}", px);
            }
        }
    }

    #[test]
    fn test_same_size_skips_resize() {
        let lum = LuminanceImage::from_pixel(4, 4, Luma([50.0]));
        let mut chroma = Array3::zeros((2, 4, 4));
        chroma[[0, 1, 2]] = 60.0;
        let out = composite(&lum, &chroma);
        let hot = out.get_pixel(2, 1).0;
        let cold = out.get_pixel(0, 0).0;
        assert!(hot[0] > cold[0]);
    }
}

// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! RGB <-> Lab conversions.
//!
//! Thin wrappers over `palette` so the rest of the crate works with
//! 8-bit pixels on one side and `L`, `a`, `b` floats on the other.

use image::{ImageBuffer, Luma, Rgb, RgbImage};
use palette::{FromColor, IntoColor, Lab, LinSrgb, Srgb};

/// Single-channel float image holding Lab `L` (0..=100).
pub type LuminanceImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Convert one 8-bit sRGB pixel to Lab (D65).
pub fn rgb_to_lab(rgb: [u8; 3]) -> [f32; 3] {
    let srgb: Srgb<f32> = Srgb::new(rgb[0], rgb[1], rgb[2]).into_format();
    let lin: LinSrgb<f32> = srgb.into_linear();
    let lab: Lab = Lab::from_color(lin);
    [lab.l, lab.a, lab.b]
}

/// Convert Lab back to 8-bit sRGB, clipping out-of-gamut values.
pub fn lab_to_rgb(l: f32, a: f32, b: f32) -> [u8; 3] {
    let lab: Lab = Lab::new(l, a, b);
    let lin: LinSrgb<f32> = lab.into_color();
    let srgb: Srgb<f32> = Srgb::from_linear(lin);
    [
        unit_to_u8(srgb.red),
        unit_to_u8(srgb.green),
        unit_to_u8(srgb.blue),
    ]
}

/// Lab `L` plane of an RGB image.
pub fn rgb_to_luminance(image: &RgbImage) -> LuminanceImage {
    LuminanceImage::from_fn(image.width(), image.height(), |x, y| {
        let Rgb(px) = *image.get_pixel(x, y);
        Luma([rgb_to_lab(px)[0]])
    })
}

fn unit_to_u8(v: f32) -> u8 {
    if v.is_nan() {
        return 0;
    }
    (v.clamp(0.0, 1.0) * 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_black_is_origin() {
        let [l, a, b] = rgb_to_lab([0, 0, 0]);
        assert!(l.abs() < 1e-3);
        assert_eq!((a, b), (0.0, 0.0));
    }

    #[test]
    fn test_gray_has_no_chroma() {
        let [l, a, b] = rgb_to_lab([128, 128, 128]);
        assert!(l > 50.0 && l < 56.0);
        assert!(a.abs() < 0.01 && b.abs() < 0.01);
    }

    #[test]
    fn test_red_roundtrip_within_one_level() {
        let [l, a, b] = rgb_to_lab([200, 50, 50]);
        assert!(a > 30.0, "red should have positive a, got {}", a);
        let back = lab_to_rgb(l, a, b);
        for (got, want) in back.iter().zip([200u8, 50, 50]) {
            assert!((*got as i32 - want as i32).abs() <= 1, "{:?}", back);
        }
    }

    #[test]
    fn test_out_of_gamut_is_clipped() {
        assert!(lab_to_rgb(120.0, 0.0, 0.0).iter().all(|&c| c == 255));
        assert!(lab_to_rgb(-5.0, 0.0, 0.0).iter().all(|&c| c == 0));
        let saturated = lab_to_rgb(50.0, 127.0, 0.0);
        assert_eq!(saturated[1], 0);
    }
}

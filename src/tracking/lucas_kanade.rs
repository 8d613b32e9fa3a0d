// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Pyramidal Lucas-Kanade point tracker.
//!
//! Coarse-to-fine iterative LK in the form OpenCV's `calcOpticalFlowPyrLK`
//! uses: the structure tensor is built once per level from the previous
//! frame, and only the mismatch against the next frame is recomputed on
//! each iteration.

use super::{PointTracker, TrackedPoint, TrackerParams};
use image::{GrayImage, ImageBuffer, Luma};

type FloatImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Takes a central-difference structure tensor to the units OpenCV tests
/// `minEigThreshold` in: its Scharr derivatives are 32 times a central
/// difference and its tensor is multiplied by 2^-20.
const EIGEN_SCALE: f32 = 32.0 * 32.0 / (1u32 << 20) as f32;

/// One pyramid level with its spatial derivatives.
struct Level {
    image: FloatImage,
    dx: FloatImage,
    dy: FloatImage,
}

impl Level {
    fn new(image: FloatImage) -> Self {
        let (dx, dy) = gradients(&image);
        Self { image, dx, dy }
    }

    fn contains_window(&self, x: f32, y: f32, half: f32) -> bool {
        let (w, h) = self.image.dimensions();
        x >= -half && y >= -half && x < w as f32 + half && y < h as f32 + half
    }
}

/// Built-in tracker.
#[derive(Debug, Clone, Copy, Default)]
pub struct PyramidalLk {
    params: TrackerParams,
}

impl PyramidalLk {
    pub fn new(params: TrackerParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TrackerParams {
        &self.params
    }

    fn build_pyramid(&self, gray: &GrayImage) -> Vec<Level> {
        let base = FloatImage::from_fn(gray.width(), gray.height(), |x, y| {
            Luma([gray.get_pixel(x, y)[0] as f32])
        });

        let mut images = vec![base];
        for _ in 0..self.params.max_level {
            let Some(last) = images.last() else { break };
            let (w, h) = last.dimensions();
            if (w + 1) / 2 < self.params.window_size || (h + 1) / 2 < self.params.window_size {
                break;
            }
            let down = pyr_down(last);
            images.push(down);
        }

        images.into_iter().map(Level::new).collect()
    }

    fn track_one(&self, prev: &[Level], next: &[Level], point: (f32, f32)) -> TrackedPoint {
        let half = (self.params.window_size / 2) as i32;
        let window_area = ((2 * half + 1) * (2 * half + 1)) as f32;
        let levels = prev.len().min(next.len());
        let top = levels - 1;
        let eps_sq = self.params.epsilon * self.params.epsilon;

        let top_scale = 1.0 / (1u32 << top) as f32;
        let mut next_pt = (point.0 * top_scale, point.1 * top_scale);
        let mut found = true;

        let mut template = Vec::with_capacity(window_area as usize);

        for level in (0..levels).rev() {
            let scale = 1.0 / (1u32 << level) as f32;
            let prev_pt = (point.0 * scale, point.1 * scale);
            if level != top {
                next_pt = (next_pt.0 * 2.0, next_pt.1 * 2.0);
            }

            let (pl, nl) = (&prev[level], &next[level]);
            if !pl.contains_window(prev_pt.0, prev_pt.1, half as f32) {
                if level == 0 {
                    found = false;
                }
                continue;
            }

            // Template and structure tensor around the previous position.
            template.clear();
            let (mut g11, mut g12, mut g22) = (0.0f32, 0.0f32, 0.0f32);
            for oy in -half..=half {
                for ox in -half..=half {
                    let sx = prev_pt.0 + ox as f32;
                    let sy = prev_pt.1 + oy as f32;
                    let ix = sample(&pl.dx, sx, sy);
                    let iy = sample(&pl.dy, sx, sy);
                    template.push((sample(&pl.image, sx, sy), ix, iy));
                    g11 += ix * ix;
                    g12 += ix * iy;
                    g22 += iy * iy;
                }
            }

            let det = g11 * g22 - g12 * g12;
            let min_eig = min_eigenvalue(g11, g12, g22, window_area);
            if min_eig < self.params.min_eigen_threshold || det < f32::EPSILON {
                if level == 0 {
                    found = false;
                }
                continue;
            }
            let inv_det = 1.0 / det;

            for _ in 0..self.params.max_iterations {
                if !nl.contains_window(next_pt.0, next_pt.1, half as f32) {
                    if level == 0 {
                        found = false;
                    }
                    break;
                }

                let (mut b1, mut b2) = (0.0f32, 0.0f32);
                let mut k = 0;
                for oy in -half..=half {
                    for ox in -half..=half {
                        let (i, ix, iy) = template[k];
                        let j = sample(&nl.image, next_pt.0 + ox as f32, next_pt.1 + oy as f32);
                        let diff = j - i;
                        b1 += diff * ix;
                        b2 += diff * iy;
                        k += 1;
                    }
                }

                let delta = (
                    (g12 * b2 - g22 * b1) * inv_det,
                    (g12 * b1 - g11 * b2) * inv_det,
                );
                next_pt = (next_pt.0 + delta.0, next_pt.1 + delta.1);

                if delta.0 * delta.0 + delta.1 * delta.1 <= eps_sq {
                    break;
                }
            }
        }

        let error = if found {
            window_error(&prev[0], &next[0], point, next_pt, half, window_area)
        } else {
            f32::INFINITY
        };

        TrackedPoint {
            x: next_pt.0,
            y: next_pt.1,
            found,
            error,
        }
    }
}

impl PointTracker for PyramidalLk {
    fn track(&self, prev: &GrayImage, next: &GrayImage, points: &[(f32, f32)]) -> Vec<TrackedPoint> {
        if points.is_empty() {
            return Vec::new();
        }
        let prev_pyr = self.build_pyramid(prev);
        let next_pyr = self.build_pyramid(next);
        points
            .iter()
            .map(|&p| self.track_one(&prev_pyr, &next_pyr, p))
            .collect()
    }
}

/// Smaller eigenvalue of the window's structure tensor, averaged over the
/// window and expressed in OpenCV's units.
fn min_eigenvalue(g11: f32, g12: f32, g22: f32, window_area: f32) -> f32 {
    let sum = g11 + g22;
    let spread = ((g11 - g22).powi(2) + 4.0 * g12 * g12).sqrt();
    (sum - spread) / (2.0 * window_area) * EIGEN_SCALE
}

/// Mean absolute difference between the two windows.
fn window_error(
    prev: &Level,
    next: &Level,
    from: (f32, f32),
    to: (f32, f32),
    half: i32,
    window_area: f32,
) -> f32 {
    let mut sum = 0.0f32;
    for oy in -half..=half {
        for ox in -half..=half {
            let i = sample(&prev.image, from.0 + ox as f32, from.1 + oy as f32);
            let j = sample(&next.image, to.0 + ox as f32, to.1 + oy as f32);
            sum += (j - i).abs();
        }
    }
    sum / window_area
}

/// Pixel with coordinates clamped to the image border.
fn texel(img: &FloatImage, x: i64, y: i64) -> f32 {
    let cx = x.clamp(0, img.width() as i64 - 1) as u32;
    let cy = y.clamp(0, img.height() as i64 - 1) as u32;
    img.get_pixel(cx, cy)[0]
}

/// Bilinear sample with replicated borders.
fn sample(img: &FloatImage, x: f32, y: f32) -> f32 {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (xi, yi) = (x0 as i64, y0 as i64);

    let top = texel(img, xi, yi) * (1.0 - fx) + texel(img, xi + 1, yi) * fx;
    let bottom = texel(img, xi, yi + 1) * (1.0 - fx) + texel(img, xi + 1, yi + 1) * fx;
    top * (1.0 - fy) + bottom * fy
}

/// Central-difference derivatives.
fn gradients(img: &FloatImage) -> (FloatImage, FloatImage) {
    let (w, h) = img.dimensions();
    let dx = FloatImage::from_fn(w, h, |x, y| {
        let (x, y) = (x as i64, y as i64);
        Luma([(texel(img, x + 1, y) - texel(img, x - 1, y)) * 0.5])
    });
    let dy = FloatImage::from_fn(w, h, |x, y| {
        let (x, y) = (x as i64, y as i64);
        Luma([(texel(img, x, y + 1) - texel(img, x, y - 1)) * 0.5])
    });
    (dx, dy)
}

/// Gaussian 5-tap blur followed by 2x decimation.
fn pyr_down(img: &FloatImage) -> FloatImage {
    const K: [f32; 5] = [1.0 / 16.0, 4.0 / 16.0, 6.0 / 16.0, 4.0 / 16.0, 1.0 / 16.0];
    let (w, h) = img.dimensions();

    let blurred_rows = FloatImage::from_fn(w, h, |x, y| {
        let v: f32 = (0..5)
            .map(|k| K[k] * texel(img, x as i64 + k as i64 - 2, y as i64))
            .sum();
        Luma([v])
    });

    FloatImage::from_fn((w + 1) / 2, (h + 1) / 2, |x, y| {
        let (sx, sy) = (2 * x as i64, 2 * y as i64);
        let v: f32 = (0..5)
            .map(|k| K[k] * texel(&blurred_rows, sx, sy + k as i64 - 2))
            .sum();
        Luma([v])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texture(width: u32, height: u32, shift_x: f32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            let fx = x as f32 - shift_x;
            let fy = y as f32;
            let v = 128.0 + 50.0 * (fx * 0.2).sin() + 50.0 * (fy * 0.25).cos();
            Luma([v.round().clamp(0.0, 255.0) as u8])
        })
    }

    #[test]
    fn test_zero_motion_keeps_position() {
        let img = texture(96, 80, 0.0);
        let tracker = PyramidalLk::default();
        let out = tracker.track(&img, &img, &[(10.0, 10.0), (50.0, 40.0)]);

        assert_eq!(out.len(), 2);
        for (tracked, expected) in out.iter().zip([(10.0, 10.0), (50.0, 40.0)]) {
            assert!(tracked.found);
            assert!((tracked.x - expected.0).abs() < 1e-3);
            assert!((tracked.y - expected.1).abs() < 1e-3);
            assert!(tracked.error < 1e-3);
        }
    }

    #[test]
    fn test_follows_horizontal_shift() {
        let prev = texture(96, 80, 0.0);
        let next = texture(96, 80, 3.0);
        let out = PyramidalLk::default().track(&prev, &next, &[(40.0, 30.0)]);

        assert!(out[0].found);
        assert!((out[0].x - 43.0).abs() < 0.5, "x = {}", out[0].x);
        assert!((out[0].y - 30.0).abs() < 0.5, "y = {}", out[0].y);
    }

    #[test]
    fn test_flat_image_loses_point() {
        let flat = GrayImage::from_pixel(64, 64, Luma([90]));
        let out = PyramidalLk::default().track(&flat, &flat, &[(32.0, 32.0)]);
        assert!(!out[0].found);
    }

    #[test]
    fn test_empty_input_is_empty() {
        let img = texture(32, 32, 0.0);
        assert!(PyramidalLk::default().track(&img, &img, &[]).is_empty());
    }

    #[test]
    fn test_pyramid_respects_window() {
        let tracker = PyramidalLk::default();
        assert_eq!(tracker.build_pyramid(&texture(96, 80, 0.0)).len(), 3);
        // 40x40 -> 20x20, then 10x10 would be smaller than the window.
        assert_eq!(tracker.build_pyramid(&texture(40, 40, 0.0)).len(), 2);
    }

    #[test]
    fn test_min_eigenvalue_matches_opencv_scale() {
        // Unit central-difference gradient on both axes, uncorrelated.
        let area = 15.0 * 15.0;
        let eig = min_eigenvalue(area, 0.0, area, area);
        assert!((eig - 1.0 / 1024.0).abs() < 1e-9);

        // Gradients along one direction only carry no corner information.
        assert!(min_eigenvalue(area, area, area, area).abs() < 1e-6);
    }

    #[test]
    fn test_sample_interpolates() {
        let img = FloatImage::from_fn(2, 1, |x, _| Luma([x as f32 * 10.0]));
        assert!((sample(&img, 0.5, 0.0) - 5.0).abs() < 1e-6);
        assert_eq!(sample(&img, -3.0, 0.0), 0.0);
        assert_eq!(sample(&img, 9.0, 0.0), 10.0);
    }
}

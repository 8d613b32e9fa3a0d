// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Geometric utility functions.
//!
//! This module provides the transformations between screen coordinates on
//! the canvas and pixel coordinates of the displayed frame, plus hit
//! testing of hint points.

use crate::models::color_point::FramePointSet;
use egui::{Pos2, Rect, Vec2};

/// Zoom and pan of the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    /// 1.0 fits the frame to the canvas.
    pub zoom: f32,
    /// Screen-space offset from the centered position.
    pub pan: Vec2,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Vec2::ZERO,
        }
    }
}

impl ViewTransform {
    pub const MIN_ZOOM: f32 = 0.1;
    pub const MAX_ZOOM: f32 = 32.0;

    /// Zoom by `factor`, keeping the frame point under `anchor` fixed.
    pub fn zoom_at(&mut self, factor: f32, anchor: Pos2, area: Rect) {
        let new_zoom = (self.zoom * factor).clamp(Self::MIN_ZOOM, Self::MAX_ZOOM);
        let applied = new_zoom / self.zoom;
        let center = area.center() + self.pan;
        let offset = anchor - center;
        self.pan += offset - offset * applied;
        self.zoom = new_zoom;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Screen rectangle of a `frame_size` image fitted into `area`, then zoomed
/// and panned.
pub fn image_rect(frame_size: (u32, u32), area: Rect, view: &ViewTransform) -> Rect {
    let (w, h) = (frame_size.0.max(1) as f32, frame_size.1.max(1) as f32);
    let fit = (area.width() / w).min(area.height() / h);
    let size = Vec2::new(w, h) * fit * view.zoom;
    Rect::from_center_size(area.center() + view.pan, size)
}

/// Frame pixel under a screen position, or `None` outside the frame.
pub fn screen_to_frame(pos: Pos2, image_rect: Rect, frame_size: (u32, u32)) -> Option<(u32, u32)> {
    if image_rect.width() <= 0.0 || image_rect.height() <= 0.0 {
        return None;
    }
    let fx = (pos.x - image_rect.min.x) / image_rect.width() * frame_size.0 as f32;
    let fy = (pos.y - image_rect.min.y) / image_rect.height() * frame_size.1 as f32;
    if fx < 0.0 || fy < 0.0 {
        return None;
    }
    let (x, y) = (fx.floor() as u32, fy.floor() as u32);
    (x < frame_size.0 && y < frame_size.1).then_some((x, y))
}

/// Screen position of the center of frame pixel `(x, y)`.
pub fn frame_to_screen(x: u32, y: u32, image_rect: Rect, frame_size: (u32, u32)) -> Pos2 {
    let sx = image_rect.width() / frame_size.0.max(1) as f32;
    let sy = image_rect.height() / frame_size.1.max(1) as f32;
    Pos2::new(
        image_rect.min.x + (x as f32 + 0.5) * sx,
        image_rect.min.y + (y as f32 + 0.5) * sy,
    )
}

/// Index of the point drawn under `pos`, if any.
///
/// Points drawn later sit on top, so on overlap the last one wins.
pub fn hit_test(
    points: &FramePointSet,
    pos: Pos2,
    image_rect: Rect,
    frame_size: (u32, u32),
    radius: f32,
) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, point) in points.iter().enumerate().rev() {
        let d = frame_to_screen(point.x, point.y, image_rect, frame_size).distance(pos);
        if d <= radius && best.map_or(true, |(_, bd)| d < bd) {
            best = Some((idx, d));
        }
    }
    best.map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::color_point::ColorPoint;

    fn area() -> Rect {
        Rect::from_min_size(Pos2::new(0.0, 0.0), Vec2::new(400.0, 400.0))
    }

    #[test]
    fn test_image_rect_fits_and_centers() {
        let rect = image_rect((200, 100), area(), &ViewTransform::default());
        assert_eq!(rect.width(), 400.0);
        assert_eq!(rect.height(), 200.0);
        assert_eq!(rect.min, Pos2::new(0.0, 100.0));
    }

    #[test]
    fn test_screen_frame_roundtrip() {
        let size = (200, 100);
        let rect = image_rect(size, area(), &ViewTransform::default());
        for (x, y) in [(0, 0), (199, 99), (57, 31)] {
            let screen = frame_to_screen(x, y, rect, size);
            assert_eq!(screen_to_frame(screen, rect, size), Some((x, y)));
        }
    }

    #[test]
    fn test_outside_frame_is_none() {
        let size = (200, 100);
        let rect = image_rect(size, area(), &ViewTransform::default());
        assert_eq!(screen_to_frame(Pos2::new(10.0, 50.0), rect, size), None);
        assert_eq!(screen_to_frame(Pos2::new(400.0, 200.0), rect, size), None);
        assert_eq!(screen_to_frame(Pos2::new(-1.0, 150.0), rect, size), None);
    }

    #[test]
    fn test_hit_test_prefers_top_point() {
        let size = (100, 100);
        let rect = Rect::from_min_size(Pos2::ZERO, Vec2::new(100.0, 100.0));
        let points: FramePointSet = [
            ColorPoint::new(10, 10, [0; 3]),
            ColorPoint::new(10, 10, [1; 3]),
            ColorPoint::new(50, 50, [2; 3]),
        ]
        .into_iter()
        .collect();

        assert_eq!(hit_test(&points, Pos2::new(11.0, 11.0), rect, size, 5.0), Some(1));
        assert_eq!(hit_test(&points, Pos2::new(52.0, 50.0), rect, size, 5.0), Some(2));
        assert_eq!(hit_test(&points, Pos2::new(80.0, 80.0), rect, size, 5.0), None);
    }

    #[test]
    fn test_zoom_keeps_anchor_fixed() {
        let size = (100, 100);
        let mut view = ViewTransform::default();
        let anchor = Pos2::new(300.0, 100.0);
        let before = screen_to_frame(anchor, image_rect(size, area(), &view), size);
        view.zoom_at(2.0, anchor, area());
        let after = screen_to_frame(anchor, image_rect(size, area(), &view), size);
        assert_eq!(view.zoom, 2.0);
        assert_eq!(before, after);
    }
}

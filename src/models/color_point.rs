// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Color hint data structures.
//!
//! This module defines the sparse color hints a user places on a frame
//! (or that propagation carries over from the previous frame) and the
//! per-frame collection they live in.

use serde::{Deserialize, Serialize};

/// An 8-bit RGB color in display color space.
pub type Rgb = [u8; 3];

/// Gray used for new points before the user picks a color.
pub const DEFAULT_POINT_COLOR: Rgb = [128, 128, 128];

/// A single color hint in original frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColorPoint {
    pub x: u32,
    pub y: u32,
    pub color: Rgb,
}

impl ColorPoint {
    pub fn new(x: u32, y: u32, color: Rgb) -> Self {
        Self { x, y, color }
    }

    /// Build a point from signed coordinates, rejecting anything outside
    /// `[0, width) x [0, height)`.
    pub fn checked(x: i64, y: i64, color: Rgb, width: u32, height: u32) -> Option<Self> {
        if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
            return None;
        }
        Some(Self::new(x as u32, y as u32, color))
    }

    /// Check if the point lies inside a frame of the given size.
    pub fn is_within(&self, width: u32, height: u32) -> bool {
        self.x < width && self.y < height
    }
}

/// Ordered color hints attached to one frame.
///
/// Order only matters where hint squares overlap during rasterization
/// (later points win) and for selection in the editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FramePointSet {
    points: Vec<ColorPoint>,
}

impl FramePointSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColorPoint> {
        self.points.iter()
    }

    pub fn as_slice(&self) -> &[ColorPoint] {
        &self.points
    }

    pub fn get(&self, index: usize) -> Option<&ColorPoint> {
        self.points.get(index)
    }

    /// Append a point if it is inside the frame. Returns whether it was kept.
    pub fn add(&mut self, point: ColorPoint, width: u32, height: u32) -> bool {
        if !point.is_within(width, height) {
            return false;
        }
        self.points.push(point);
        true
    }

    /// Remove the point at `index`, if any.
    pub fn remove(&mut self, index: usize) -> Option<ColorPoint> {
        if index < self.points.len() {
            Some(self.points.remove(index))
        } else {
            None
        }
    }

    pub fn set_color(&mut self, index: usize, color: Rgb) {
        if let Some(point) = self.points.get_mut(index) {
            point.color = color;
        }
    }

    /// Move a point. Out-of-frame targets are ignored.
    pub fn move_to(&mut self, index: usize, x: u32, y: u32, width: u32, height: u32) {
        if x >= width || y >= height {
            return;
        }
        if let Some(point) = self.points.get_mut(index) {
            point.x = x;
            point.y = y;
        }
    }

    /// Drop every point outside the frame. Returns the number dropped.
    pub fn retain_within(&mut self, width: u32, height: u32) -> usize {
        let before = self.points.len();
        self.points.retain(|p| p.is_within(width, height));
        before - self.points.len()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

impl FromIterator<ColorPoint> for FramePointSet {
    fn from_iter<I: IntoIterator<Item = ColorPoint>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a FramePointSet {
    type Item = &'a ColorPoint;
    type IntoIter = std::slice::Iter<'a, ColorPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_rejects_out_of_bounds() {
        let mut set = FramePointSet::new();
        assert!(set.add(ColorPoint::new(0, 0, [1, 2, 3]), 10, 10));
        assert!(set.add(ColorPoint::new(9, 9, [1, 2, 3]), 10, 10));
        assert!(!set.add(ColorPoint::new(10, 5, [1, 2, 3]), 10, 10));
        assert!(!set.add(ColorPoint::new(5, 10, [1, 2, 3]), 10, 10));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_checked_drops_negative_and_edge() {
        assert!(ColorPoint::checked(-1, 0, [0; 3], 4, 4).is_none());
        assert!(ColorPoint::checked(4, 0, [0; 3], 4, 4).is_none());
        assert_eq!(
            ColorPoint::checked(3, 3, [0; 3], 4, 4),
            Some(ColorPoint::new(3, 3, [0; 3]))
        );
    }

    #[test]
    fn test_retain_within_after_resize() {
        let mut set: FramePointSet = vec![
            ColorPoint::new(1, 1, [0; 3]),
            ColorPoint::new(50, 1, [0; 3]),
            ColorPoint::new(1, 50, [0; 3]),
        ]
        .into_iter()
        .collect();

        assert_eq!(set.retain_within(20, 20), 2);
        assert_eq!(set.as_slice(), &[ColorPoint::new(1, 1, [0; 3])]);
    }

    #[test]
    fn test_move_to_ignores_outside_target() {
        let mut set = FramePointSet::new();
        set.add(ColorPoint::new(2, 2, [0; 3]), 8, 8);
        set.move_to(0, 8, 3, 8, 8);
        assert_eq!(set.get(0).map(|p| (p.x, p.y)), Some((2, 2)));
        set.move_to(0, 7, 3, 8, 8);
        assert_eq!(set.get(0).map(|p| (p.x, p.y)), Some((7, 3)));
    }
}

// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Hint propagation to the next frame.
//!
//! Each hint is tracked from the previous frame into the next one. Hints
//! the tracker lost, or that land outside the next frame, are dropped;
//! the rest keep their color and move to the tracked position.

use super::{PointTracker, TrackedPoint};
use crate::models::{
    color_point::{ColorPoint, FramePointSet},
    frame::Frame,
};

/// Tracking error above which a point counts as a catastrophic failure.
pub const ERROR_THRESHOLD: f32 = 1e5;

/// Carry `points` from `prev` to `next`.
///
/// Chains from whatever points the previous frame holds, which may
/// themselves be propagated.
pub fn propagate(
    tracker: &dyn PointTracker,
    points: &FramePointSet,
    prev: &Frame,
    next: &Frame,
) -> FramePointSet {
    if points.is_empty() {
        return FramePointSet::new();
    }

    let positions: Vec<(f32, f32)> = points.iter().map(|p| (p.x as f32, p.y as f32)).collect();
    let tracked = tracker.track(prev.gray(), next.gray(), &positions);
    let result = filter_tracked(points, &tracked, next.width(), next.height());

    log::info!(
        "Propagated {} of {} points from frame {} to frame {}",
        result.len(),
        points.len(),
        prev.index() + 1,
        next.index() + 1
    );
    result
}

/// Keep the tracked points that are valid in a `width x height` frame.
pub fn filter_tracked(
    points: &FramePointSet,
    tracked: &[TrackedPoint],
    width: u32,
    height: u32,
) -> FramePointSet {
    points
        .iter()
        .zip(tracked)
        .filter(|(_, t)| t.found && t.error < ERROR_THRESHOLD)
        .filter_map(|(point, t)| {
            let x = nudge(t.x.round() as i64, width);
            let y = nudge(t.y.round() as i64, height);
            ColorPoint::checked(x, y, point.color, width, height)
        })
        .collect()
}

/// One-pixel correction for rounding that lands just past an edge.
fn nudge(v: i64, limit: u32) -> i64 {
    if v >= limit as i64 {
        v - 1
    } else if v < 0 {
        v + 1
    } else {
        v
    }
}

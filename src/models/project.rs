// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Project state management.
//!
//! This module manages the overall project state: the video being
//! colorized, the frame the user is looking at, and the color hints
//! attached to each frame.

use super::color_point::{ColorPoint, FramePointSet, Rgb};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// In-memory project owned by the editor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectState {
    pub video_file: String,
    /// Zero-based; the editor shows it one-based.
    pub current_frame: usize,
    color_points: BTreeMap<usize, FramePointSet>,
}

impl ProjectState {
    /// Create a new project for the given video source.
    pub fn new(video_file: String) -> Self {
        Self {
            video_file,
            current_frame: 0,
            color_points: BTreeMap::new(),
        }
    }

    /// Points stored for a frame, or an empty set if it was never touched.
    pub fn get_points(&self, frame: usize) -> FramePointSet {
        self.color_points.get(&frame).cloned().unwrap_or_default()
    }

    /// Overwrite the points of a frame. Empty sets are not kept.
    pub fn set_points(&mut self, frame: usize, points: FramePointSet) {
        if points.is_empty() {
            self.color_points.remove(&frame);
        } else {
            self.color_points.insert(frame, points);
        }
    }

    /// Frames that carry at least one hint, in ascending order.
    pub fn annotated_frames(&self) -> impl Iterator<Item = usize> + '_ {
        self.color_points.keys().copied()
    }

    pub fn total_points(&self) -> usize {
        self.color_points.values().map(FramePointSet::len).sum()
    }

    /// Convert into the on-disk shape.
    pub fn to_file(&self) -> ProjectFile {
        let color_points = self
            .color_points
            .iter()
            .filter(|(_, set)| !set.is_empty())
            .map(|(&frame, set)| (frame, set.iter().map(PointRecord::from).collect()))
            .collect();

        ProjectFile {
            video_file: self.video_file.clone(),
            current_frame: self.current_frame,
            color_points,
        }
    }

    /// Build a project from its on-disk shape.
    pub fn from_file(file: ProjectFile) -> Self {
        let color_points = file
            .color_points
            .into_iter()
            .map(|(frame, records)| {
                let set: FramePointSet = records.into_iter().map(ColorPoint::from).collect();
                (frame, set)
            })
            .filter(|(_, set)| !set.is_empty())
            .collect();

        Self {
            video_file: file.video_file,
            current_frame: file.current_frame,
            color_points,
        }
    }

    /// Drop stored points that do not fit the frame size, e.g. after the
    /// project is reopened against a differently sized source.
    pub fn retain_within(&mut self, width: u32, height: u32) -> usize {
        let mut dropped = 0;
        for set in self.color_points.values_mut() {
            dropped += set.retain_within(width, height);
        }
        self.color_points.retain(|_, set| !set.is_empty());
        dropped
    }
}

/// One persisted hint: `{"point": [x, y], "color": [r, g, b]}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointRecord {
    pub point: [u32; 2],
    pub color: Rgb,
}

impl From<&ColorPoint> for PointRecord {
    fn from(p: &ColorPoint) -> Self {
        Self {
            point: [p.x, p.y],
            color: p.color,
        }
    }
}

impl From<PointRecord> for ColorPoint {
    fn from(r: PointRecord) -> Self {
        ColorPoint::new(r.point[0], r.point[1], r.color)
    }
}

/// Complete project data for serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    pub video_file: String,
    pub current_frame: usize,
    #[serde(default)]
    pub color_points: BTreeMap<usize, Vec<PointRecord>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(points: &[(u32, u32)]) -> FramePointSet {
        points
            .iter()
            .map(|&(x, y)| ColorPoint::new(x, y, [200, 50, 50]))
            .collect()
    }

    #[test]
    fn test_get_points_defaults_to_empty() {
        let project = ProjectState::new("clip.mp4".into());
        assert!(project.get_points(7).is_empty());
    }

    #[test]
    fn test_set_empty_removes_frame() {
        let mut project = ProjectState::new("clip.mp4".into());
        project.set_points(2, set(&[(1, 1)]));
        assert_eq!(project.annotated_frames().collect::<Vec<_>>(), vec![2]);
        project.set_points(2, FramePointSet::new());
        assert_eq!(project.annotated_frames().count(), 0);
    }

    #[test]
    fn test_file_shape_uses_camel_case_and_pairs() {
        let mut project = ProjectState::new("clip.mp4".into());
        project.current_frame = 4;
        project.set_points(4, set(&[(10, 20)]));

        let json = serde_json::to_value(project.to_file()).unwrap();
        assert_eq!(json["videoFile"], "clip.mp4");
        assert_eq!(json["currentFrame"], 4);
        assert_eq!(json["colorPoints"]["4"][0]["point"], serde_json::json!([10, 20]));
        assert_eq!(json["colorPoints"]["4"][0]["color"], serde_json::json!([200, 50, 50]));
    }

    #[test]
    fn test_from_file_restores_points() {
        let mut project = ProjectState::new("clip.mp4".into());
        project.set_points(0, set(&[(1, 2), (3, 4)]));
        project.set_points(9, set(&[(5, 6)]));

        let restored = ProjectState::from_file(project.to_file());
        assert_eq!(restored, project);
        assert_eq!(restored.total_points(), 3);
    }

    #[test]
    fn test_retain_within_drops_empty_frames() {
        let mut project = ProjectState::new("clip.mp4".into());
        project.set_points(0, set(&[(1, 2), (300, 4)]));
        project.set_points(1, set(&[(300, 300)]));

        assert_eq!(project.retain_within(100, 100), 2);
        assert_eq!(project.annotated_frames().collect::<Vec<_>>(), vec![0]);
    }
}

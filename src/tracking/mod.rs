// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Point tracking between consecutive frames.
//!
//! Trackers share one interface so hint propagation does not care whether
//! flow comes from the built-in Lucas-Kanade or from OpenCV.

pub mod lucas_kanade;
#[cfg(feature = "video-opencv")]
pub mod opencv_lk;
pub mod propagator;

use image::GrayImage;
use serde::{Deserialize, Serialize};

pub use lucas_kanade::PyramidalLk;
pub use propagator::propagate;

/// Lucas-Kanade parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerParams {
    /// Full side of the square search window.
    pub window_size: u32,
    /// Highest pyramid level (0 = no pyramid).
    pub max_level: u32,
    pub max_iterations: u32,
    /// Stop once an update moves the point less than this many pixels.
    pub epsilon: f32,
    /// Minimum eigenvalue of the window-averaged structure tensor, in
    /// OpenCV's `minEigThreshold` units for both trackers.
    pub min_eigen_threshold: f32,
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            window_size: 15,
            max_level: 2,
            max_iterations: 10,
            epsilon: 0.03,
            min_eigen_threshold: 1e-4,
        }
    }
}

/// Tracker output for one input point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackedPoint {
    pub x: f32,
    pub y: f32,
    /// False when the tracker lost the point.
    pub found: bool,
    /// Mean absolute intensity difference over the window.
    pub error: f32,
}

/// Sparse feature tracker.
pub trait PointTracker: Send + Sync {
    /// Track `points` from `prev` into `next`. Returns one entry per input
    /// point, in input order.
    fn track(&self, prev: &GrayImage, next: &GrayImage, points: &[(f32, f32)]) -> Vec<TrackedPoint>;
}

/// The tracker used when nothing else is configured.
pub fn default_tracker(params: TrackerParams) -> Box<dyn PointTracker> {
    #[cfg(feature = "video-opencv")]
    {
        Box::new(opencv_lk::OpenCvLk::new(params))
    }
    #[cfg(not(feature = "video-opencv"))]
    {
        Box::new(PyramidalLk::new(params))
    }
}

// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! OpenCV-backed tracker (`video-opencv` feature).

use super::{PointTracker, TrackedPoint, TrackerParams};
use image::GrayImage;
use opencv::core::{self, Mat, Point2f, Scalar, Size, TermCriteria, Vector};
use opencv::prelude::*;
use opencv::video;

/// `calcOpticalFlowPyrLK` with the same parameters as the built-in tracker.
pub struct OpenCvLk {
    params: TrackerParams,
}

impl OpenCvLk {
    pub fn new(params: TrackerParams) -> Self {
        Self { params }
    }

    fn run(
        &self,
        prev: &GrayImage,
        next: &GrayImage,
        points: &[(f32, f32)],
    ) -> opencv::Result<Vec<TrackedPoint>> {
        let prev_mat = gray_to_mat(prev)?;
        let next_mat = gray_to_mat(next)?;
        let prev_pts: Vector<Point2f> = points.iter().map(|&(x, y)| Point2f::new(x, y)).collect();
        let mut next_pts = Vector::<Point2f>::new();
        let mut status = Vector::<u8>::new();
        let mut err = Vector::<f32>::new();

        let criteria = TermCriteria::new(
            core::TermCriteria_Type::COUNT as i32 + core::TermCriteria_Type::EPS as i32,
            self.params.max_iterations as i32,
            self.params.epsilon as f64,
        )?;
        let window = self.params.window_size as i32;

        video::calc_optical_flow_pyr_lk(
            &prev_mat,
            &next_mat,
            &prev_pts,
            &mut next_pts,
            &mut status,
            &mut err,
            Size::new(window, window),
            self.params.max_level as i32,
            criteria,
            0,
            self.params.min_eigen_threshold as f64,
        )?;

        let mut tracked = Vec::with_capacity(points.len());
        for i in 0..points.len() {
            let p = next_pts.get(i)?;
            tracked.push(TrackedPoint {
                x: p.x,
                y: p.y,
                found: status.get(i)? > 0,
                error: err.get(i)?,
            });
        }
        Ok(tracked)
    }
}

impl PointTracker for OpenCvLk {
    fn track(&self, prev: &GrayImage, next: &GrayImage, points: &[(f32, f32)]) -> Vec<TrackedPoint> {
        if points.is_empty() {
            return Vec::new();
        }
        match self.run(prev, next, points) {
            Ok(tracked) => tracked,
            Err(e) => {
                log::error!("OpenCV tracking failed: {}", e);
                points
                    .iter()
                    .map(|&(x, y)| TrackedPoint {
                        x,
                        y,
                        found: false,
                        error: f32::INFINITY,
                    })
                    .collect()
            }
        }
    }
}

fn gray_to_mat(gray: &GrayImage) -> opencv::Result<Mat> {
    let mut mat = Mat::new_rows_cols_with_default(
        gray.height() as i32,
        gray.width() as i32,
        core::CV_8UC1,
        Scalar::all(0.0),
    )?;
    mat.data_bytes_mut()?.copy_from_slice(gray.as_raw());
    Ok(mat)
}

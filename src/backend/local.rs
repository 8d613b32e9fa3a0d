// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Backend running the network in this process.

use super::session::{Completion, InferenceSession};
use super::{Backend, BackendError, BackendEvent, BackendOutput, FrameColorizer};
use crate::colorize;
use crate::models::{color_point::FramePointSet, frame::Frame};
use crate::tracking::{propagate, PointTracker};
use image::RgbImage;
use std::collections::VecDeque;
use std::sync::mpsc::TryRecvError;
use std::sync::Arc;

/// A colorization running on the inference worker.
struct Pending {
    frame_index: usize,
    points: FramePointSet,
    completion: Completion<RgbImage>,
}

pub struct LocalBackend {
    session: InferenceSession,
    tracker: Box<dyn PointTracker>,
    pending: Option<Pending>,
    events: VecDeque<BackendEvent>,
}

impl LocalBackend {
    pub fn new(session: InferenceSession, tracker: Box<dyn PointTracker>) -> Self {
        Self {
            session,
            tracker,
            pending: None,
            events: VecDeque::new(),
        }
    }

    pub fn session(&self) -> &InferenceSession {
        &self.session
    }

    fn finished(&mut self, frame_index: usize, image: Option<RgbImage>, points: FramePointSet) {
        self.events.push_back(BackendEvent::Finished(BackendOutput {
            frame_index,
            image,
            points,
        }));
    }
}

impl Backend for LocalBackend {
    fn describe(&self) -> String {
        match self.session.resolution() {
            Some(r) => format!("Local ({}x{})", r, r),
            None => "Local (no model)".to_string(),
        }
    }

    fn authenticate(&mut self) -> Result<(), BackendError> {
        if self.session.has_model() {
            Ok(())
        } else {
            Err(BackendError::NoModel)
        }
    }

    fn is_busy(&self) -> bool {
        self.pending.is_some() || self.session.is_busy()
    }

    fn colorize(&mut self, frame: Arc<Frame>, points: FramePointSet) -> Result<(), BackendError> {
        if self.is_busy() {
            return Err(BackendError::Busy);
        }
        // Full-resolution work stays off the UI thread.
        let frame_index = frame.index();
        let hints = points.clone();
        let composite_frame = Arc::clone(&frame);
        let completion = self.session.submit(
            move |resolution| colorize::prepare(&frame, &hints, resolution),
            move |result| colorize::finish(&composite_frame, &result),
        )?;
        self.pending = Some(Pending {
            frame_index,
            points,
            completion,
        });
        Ok(())
    }

    fn extrapolate(
        &mut self,
        from: Arc<Frame>,
        points: FramePointSet,
        to: Arc<Frame>,
    ) -> Result<(), BackendError> {
        if self.is_busy() {
            return Err(BackendError::Busy);
        }
        if points.is_empty() {
            self.finished(to.index(), None, FramePointSet::new());
            return Ok(());
        }

        let carried = propagate(self.tracker.as_ref(), &points, &from, &to);
        if !self.session.has_model() {
            // Propagation alone is still useful without a model.
            self.finished(to.index(), None, carried);
            return Ok(());
        }
        self.colorize(to, carried)
    }

    fn poll(&mut self) -> Option<BackendEvent> {
        if let Some(event) = self.events.pop_front() {
            return Some(event);
        }

        let pending = self.pending.as_ref()?;
        let outcome = match pending.completion.try_recv() {
            Ok(outcome) => outcome,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => {
                self.pending = None;
                return Some(BackendEvent::Failed(BackendError::Inference(
                    "inference worker exited without a result".into(),
                )));
            }
        };

        let pending = self.pending.take()?;
        Some(match outcome {
            Ok(image) => BackendEvent::Finished(BackendOutput {
                frame_index: pending.frame_index,
                image: Some(image),
                points: pending.points,
            }),
            Err(e) => BackendEvent::Failed(e.into()),
        })
    }

    fn colorizer(&self) -> Arc<dyn FrameColorizer> {
        Arc::new(self.session.clone())
    }
}

impl FrameColorizer for InferenceSession {
    fn colorize_frame(&self, frame: &Frame, points: &FramePointSet) -> Result<RgbImage, BackendError> {
        let resolution = self.resolution().ok_or(BackendError::NoModel)?;
        let request = colorize::prepare(frame, points, resolution);
        let result = self.run(&request)?;
        Ok(colorize::finish(frame, &result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::session::tests::ConstantNetwork;
    use crate::models::color_point::ColorPoint;
    use crate::tracking::TrackedPoint;
    use image::GrayImage;
    use std::time::{Duration, Instant};

    /// Shifts every point right by `dx`.
    struct ShiftTracker {
        dx: f32,
    }

    impl PointTracker for ShiftTracker {
        fn track(&self, _: &GrayImage, _: &GrayImage, points: &[(f32, f32)]) -> Vec<TrackedPoint> {
            points
                .iter()
                .map(|&(x, y)| TrackedPoint {
                    x: x + self.dx,
                    y,
                    found: true,
                    error: 0.0,
                })
                .collect()
        }
    }

    fn frame(index: usize) -> Arc<Frame> {
        Arc::new(Frame::new(index, RgbImage::from_pixel(40, 30, image::Rgb([128, 128, 128]))))
    }

    fn backend_with_model() -> LocalBackend {
        let session = InferenceSession::with_network(Box::new(ConstantNetwork {
            resolution: 8,
            chroma: [40.0, 0.0],
        }));
        LocalBackend::new(session, Box::new(ShiftTracker { dx: 2.0 }))
    }

    fn wait(backend: &mut LocalBackend) -> BackendEvent {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(event) = backend.poll() {
                return event;
            }
            assert!(Instant::now() < deadline, "no event within timeout");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_colorize_produces_frame_sized_image() {
        let mut backend = backend_with_model();
        assert!(backend.authenticate().is_ok());
        let points: FramePointSet = [ColorPoint::new(5, 5, [255, 0, 0])].into_iter().collect();

        backend.colorize(frame(3), points.clone()).unwrap();
        match wait(&mut backend) {
            BackendEvent::Finished(out) => {
                assert_eq!(out.frame_index, 3);
                assert_eq!(out.points, points);
                let image = out.image.unwrap();
                assert_eq!(image.dimensions(), (40, 30));
                // Positive `a` pushes gray toward red.
                let px = image.get_pixel(10, 10);
                assert!(px[0] > px[1]);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(!backend.is_busy());
    }

    #[test]
    fn test_second_colorize_while_pending_is_busy() {
        let mut backend = backend_with_model();
        backend.colorize(frame(0), FramePointSet::new()).unwrap();
        assert!(backend.is_busy());
        assert!(matches!(
            backend.colorize(frame(0), FramePointSet::new()),
            Err(BackendError::Busy)
        ));
        wait(&mut backend);
    }

    #[test]
    fn test_no_model() {
        let mut backend =
            LocalBackend::new(InferenceSession::new(), Box::new(ShiftTracker { dx: 0.0 }));
        assert!(matches!(backend.authenticate(), Err(BackendError::NoModel)));
        assert!(matches!(
            backend.colorize(frame(0), FramePointSet::new()),
            Err(BackendError::NoModel)
        ));
        assert!(!backend.is_busy());
    }

    #[test]
    fn test_extrapolate_empty_finishes_immediately() {
        let mut backend = backend_with_model();
        backend.extrapolate(frame(0), FramePointSet::new(), frame(1)).unwrap();
        match backend.poll() {
            Some(BackendEvent::Finished(out)) => {
                assert_eq!(out.frame_index, 1);
                assert!(out.image.is_none());
                assert!(out.points.is_empty());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_extrapolate_propagates_then_colorizes() {
        let mut backend = backend_with_model();
        let points: FramePointSet = [ColorPoint::new(5, 5, [0, 0, 255])].into_iter().collect();
        backend.extrapolate(frame(0), points, frame(1)).unwrap();

        match wait(&mut backend) {
            BackendEvent::Finished(out) => {
                assert_eq!(out.frame_index, 1);
                assert!(out.image.is_some());
                assert_eq!(out.points.as_slice(), &[ColorPoint::new(7, 5, [0, 0, 255])]);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_extrapolate_without_model_returns_points() {
        let mut backend =
            LocalBackend::new(InferenceSession::new(), Box::new(ShiftTracker { dx: 1.0 }));
        let points: FramePointSet = [ColorPoint::new(5, 5, [9, 9, 9])].into_iter().collect();
        backend.extrapolate(frame(0), points, frame(1)).unwrap();
        match backend.poll() {
            Some(BackendEvent::Finished(out)) => {
                assert!(out.image.is_none());
                assert_eq!(out.points.as_slice(), &[ColorPoint::new(6, 5, [9, 9, 9])]);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_blocking_colorizer() {
        let backend = backend_with_model();
        let colorizer = backend.colorizer();
        let image = colorizer
            .colorize_frame(&frame(0), &FramePointSet::new())
            .unwrap();
        assert_eq!(image.dimensions(), (40, 30));
    }
}

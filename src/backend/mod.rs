// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Colorization backends.
//!
//! The editor talks to one [`Backend`] at a time: either the network in
//! this process ([`local::LocalBackend`]) or a colorization server
//! ([`remote::RemoteBackend`]). Requests are fire-and-forget; results come
//! back through [`Backend::poll`], which the UI calls every repaint.

pub mod handler;
pub mod local;
pub mod network;
pub mod remote;
pub mod session;
pub mod wire;

use crate::models::{color_point::FramePointSet, frame::Frame};
use image::RgbImage;
use session::SessionError;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend is busy")]
    Busy,
    #[error("no colorization model is loaded")]
    NoModel,
    #[error("disconnected: {0}")]
    Disconnected(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("media error: {0}")]
    Media(String),
}

impl From<SessionError> for BackendError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Busy => BackendError::Busy,
            SessionError::NoModel => BackendError::NoModel,
            SessionError::Network(msg) => BackendError::Inference(msg),
        }
    }
}

/// Result of a finished request.
#[derive(Debug, Clone)]
pub struct BackendOutput {
    /// Frame the output belongs to.
    pub frame_index: usize,
    /// Colorized frame. `None` when nothing was colorized.
    pub image: Option<RgbImage>,
    /// Hints the image was produced from.
    pub points: FramePointSet,
}

#[derive(Debug)]
pub enum BackendEvent {
    Finished(BackendOutput),
    Failed(BackendError),
    /// The remote side could not be reached or answered garbage.
    Disconnected(String),
}

/// Synchronous colorization, used by the export loop.
pub trait FrameColorizer: Send + Sync {
    fn colorize_frame(&self, frame: &Frame, points: &FramePointSet) -> Result<RgbImage, BackendError>;
}

pub trait Backend {
    /// Short label for the status line.
    fn describe(&self) -> String;

    /// Check that the backend can serve requests.
    fn authenticate(&mut self) -> Result<(), BackendError>;

    fn is_busy(&self) -> bool;

    /// Start colorizing `frame` with `points`.
    fn colorize(&mut self, frame: Arc<Frame>, points: FramePointSet) -> Result<(), BackendError>;

    /// Carry `points` from `from` to `to`, then colorize `to` with them.
    fn extrapolate(
        &mut self,
        from: Arc<Frame>,
        points: FramePointSet,
        to: Arc<Frame>,
    ) -> Result<(), BackendError>;

    /// Next completed event, if any.
    fn poll(&mut self) -> Option<BackendEvent>;

    /// Handle for colorizing off the UI thread.
    fn colorizer(&self) -> Arc<dyn FrameColorizer>;
}

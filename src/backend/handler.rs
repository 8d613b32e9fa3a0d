// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Server half of the remote protocol.
//!
//! [`RemoteHandler`] answers the same three endpoints a colorization
//! server exposes, on top of a local [`InferenceSession`]. It does not
//! listen on a socket; an HTTP front end (or [`LoopbackTransport`]) feeds
//! it request bodies.

use super::remote::{Transport, TransportError};
use super::session::{InferenceSession, SessionError};
use super::wire::{self, ColorizeRequest, ExtrapolateRequest, ExtrapolateResponse};
use crate::colorize;
use crate::models::{color_point::FramePointSet, frame::Frame};
use crate::tracking::{propagate, PointTracker};
use image::RgbImage;
use std::sync::Arc;

/// Status code and body of a handled request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerResponse {
    pub status: u16,
    pub body: String,
}

impl HandlerResponse {
    fn ok(body: String) -> Self {
        Self { status: 200, body }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: message.into(),
        }
    }
}

pub struct RemoteHandler {
    session: InferenceSession,
    tracker: Box<dyn PointTracker>,
}

impl RemoteHandler {
    pub fn new(session: InferenceSession, tracker: Box<dyn PointTracker>) -> Self {
        Self { session, tracker }
    }

    pub fn handle(&self, endpoint: &str, body: &str) -> HandlerResponse {
        let endpoint = endpoint.trim_start_matches('/');
        let response = match endpoint {
            wire::AUTH_ENDPOINT => Ok(HandlerResponse::ok(String::new())),
            wire::COLORIZE_ENDPOINT => self.colorize(body),
            wire::EXTRAPOLATE_ENDPOINT => self.extrapolate(body),
            _ => Err(HandlerResponse::error(404, format!("unknown endpoint {}", endpoint))),
        };
        let response = response.unwrap_or_else(|e| e);
        if response.status != 200 {
            log::warn!("{} -> {} {}", endpoint, response.status, response.body);
        }
        response
    }

    fn colorize(&self, body: &str) -> Result<HandlerResponse, HandlerResponse> {
        let request: ColorizeRequest = serde_json::from_str(body).map_err(bad_request)?;
        let frame = Frame::new(0, wire::decode_image(&request.image).map_err(bad_request)?);
        let points = wire::points_from_wire(&request.color_points, frame.width(), frame.height());

        let image = self.render(&frame, &points)?;
        Ok(HandlerResponse::ok(wire::encode_png(&image).map_err(internal)?))
    }

    fn extrapolate(&self, body: &str) -> Result<HandlerResponse, HandlerResponse> {
        let request: ExtrapolateRequest = serde_json::from_str(body).map_err(bad_request)?;
        let from = Frame::new(0, wire::decode_image(&request.image_from).map_err(bad_request)?);
        let to = Frame::new(1, wire::decode_image(&request.image_to).map_err(bad_request)?);
        if from.size() != to.size() {
            return Err(HandlerResponse::error(400, "frames differ in size"));
        }

        let points = wire::points_from_wire(&request.color_points, from.width(), from.height());
        let carried = propagate(self.tracker.as_ref(), &points, &from, &to);
        let image = self.render(&to, &carried)?;

        let response = ExtrapolateResponse {
            image: Some(wire::encode_png(&image).map_err(internal)?),
            color_points: wire::points_to_wire(&carried),
        };
        Ok(HandlerResponse::ok(serde_json::to_string(&response).map_err(internal)?))
    }

    fn render(&self, frame: &Frame, points: &FramePointSet) -> Result<RgbImage, HandlerResponse> {
        let resolution = self
            .session
            .resolution()
            .ok_or_else(|| HandlerResponse::error(503, SessionError::NoModel.to_string()))?;
        let request = colorize::prepare(frame, points, resolution);
        let result = self.session.run(&request).map_err(|e| match e {
            SessionError::Busy | SessionError::NoModel => HandlerResponse::error(503, e.to_string()),
            SessionError::Network(_) => internal(e),
        })?;
        Ok(colorize::finish(frame, &result))
    }
}

fn bad_request(e: impl std::fmt::Display) -> HandlerResponse {
    HandlerResponse::error(400, e.to_string())
}

fn internal(e: impl std::fmt::Display) -> HandlerResponse {
    HandlerResponse::error(500, e.to_string())
}

/// Transport that hands requests straight to an in-process handler.
pub struct LoopbackTransport {
    handler: Arc<RemoteHandler>,
}

impl LoopbackTransport {
    pub fn new(handler: Arc<RemoteHandler>) -> Self {
        Self { handler }
    }
}

impl Transport for LoopbackTransport {
    fn post(&self, endpoint: &str, body: &str) -> Result<String, TransportError> {
        let response = self.handler.handle(endpoint, body);
        if response.status == 200 {
            Ok(response.body)
        } else {
            Err(TransportError::Status(response.status))
        }
    }
}

// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Backend talking to a colorization server over HTTP.
//!
//! Every request runs on its own worker thread. Any failure along the
//! way (transport error, non-200 status, unparsable body) is reported as
//! a disconnect; nothing is retried.

use super::wire::{self, ColorizeRequest, ExtrapolateRequest, ExtrapolateResponse};
use super::{Backend, BackendError, BackendEvent, BackendOutput, FrameColorizer};
use crate::models::{color_point::FramePointSet, frame::Frame};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::RgbImage;
use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid server address: {0}")]
    Url(#[from] url::ParseError),
    #[error("server answered HTTP {0}")]
    Status(u16),
    #[error("transport failure: {0}")]
    Io(String),
}

/// POSTs a JSON body to an endpoint relative to the server root.
pub trait Transport: Send + Sync {
    /// Body of a 200 response.
    fn post(&self, endpoint: &str, body: &str) -> Result<String, TransportError>;
}

/// Credentials for HTTP basic auth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    fn header_value(&self) -> String {
        let raw = format!("{}:{}", self.username, self.password);
        format!("Basic {}", STANDARD.encode(raw))
    }
}

pub struct HttpTransport {
    base: Url,
    credentials: Option<Credentials>,
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new(base_url: &str, credentials: Option<Credentials>) -> Result<Self, TransportError> {
        // Endpoints are joined onto the base, which only appends when the
        // base path ends with a slash.
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build();
        Ok(Self {
            base: Url::parse(&base)?,
            credentials,
            agent,
        })
    }

    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, TransportError> {
        Ok(self.base.join(endpoint)?)
    }
}

impl Transport for HttpTransport {
    fn post(&self, endpoint: &str, body: &str) -> Result<String, TransportError> {
        let url = self.endpoint_url(endpoint)?;
        let mut request = self
            .agent
            .post(url.as_str())
            .set("Content-Type", "application/json");
        if let Some(credentials) = &self.credentials {
            request = request.set("Authorization", &credentials.header_value());
        }

        match request.send_string(body) {
            Ok(response) if response.status() == 200 => response
                .into_string()
                .map_err(|e| TransportError::Io(e.to_string())),
            Ok(response) => Err(TransportError::Status(response.status())),
            Err(ureq::Error::Status(code, _)) => Err(TransportError::Status(code)),
            Err(ureq::Error::Transport(e)) => Err(TransportError::Io(e.to_string())),
        }
    }
}

/// Blocking request/response half, shared with worker threads.
#[derive(Clone)]
pub struct RemoteClient {
    transport: Arc<dyn Transport>,
}

impl RemoteClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn authenticate(&self) -> Result<(), BackendError> {
        self.transport
            .post(wire::AUTH_ENDPOINT, "")
            .map(|_| ())
            .map_err(disconnected)
    }

    pub fn colorize(&self, frame: &Frame, points: &FramePointSet) -> Result<RgbImage, BackendError> {
        let request = ColorizeRequest {
            image: wire::encode_png(frame.rgb()).map_err(|e| BackendError::Media(e.to_string()))?,
            color_points: wire::points_to_wire(points),
        };
        let body = serde_json::to_string(&request).map_err(|e| BackendError::Media(e.to_string()))?;

        let reply = self
            .transport
            .post(wire::COLORIZE_ENDPOINT, &body)
            .map_err(disconnected)?;
        let image = wire::parse_colorize_response(&reply).map_err(disconnected)?;
        check_size(&image, frame)?;
        Ok(image)
    }

    pub fn extrapolate(
        &self,
        from: &Frame,
        points: &FramePointSet,
        to: &Frame,
    ) -> Result<(Option<RgbImage>, FramePointSet), BackendError> {
        let media = |e: wire::WireError| BackendError::Media(e.to_string());
        let request = ExtrapolateRequest {
            image_from: wire::encode_png(from.rgb()).map_err(media)?,
            image_to: wire::encode_png(to.rgb()).map_err(media)?,
            color_points: wire::points_to_wire(points),
        };
        let body = serde_json::to_string(&request).map_err(|e| BackendError::Media(e.to_string()))?;

        let reply = self
            .transport
            .post(wire::EXTRAPOLATE_ENDPOINT, &body)
            .map_err(disconnected)?;
        let parsed: ExtrapolateResponse = serde_json::from_str(&reply).map_err(disconnected)?;

        let image = match parsed.image {
            Some(encoded) => {
                let image = wire::decode_image(&encoded).map_err(disconnected)?;
                check_size(&image, to)?;
                Some(image)
            }
            None => None,
        };
        let points = wire::points_from_wire(&parsed.color_points, to.width(), to.height());
        Ok((image, points))
    }
}

impl FrameColorizer for RemoteClient {
    fn colorize_frame(&self, frame: &Frame, points: &FramePointSet) -> Result<RgbImage, BackendError> {
        self.colorize(frame, points)
    }
}

fn disconnected(e: impl std::fmt::Display) -> BackendError {
    BackendError::Disconnected(e.to_string())
}

fn check_size(image: &RgbImage, frame: &Frame) -> Result<(), BackendError> {
    if image.dimensions() != frame.size() {
        return Err(BackendError::Disconnected(format!(
            "server returned a {:?} image for a {:?} frame",
            image.dimensions(),
            frame.size()
        )));
    }
    Ok(())
}

pub struct RemoteBackend {
    client: RemoteClient,
    label: String,
    pending: Option<Receiver<BackendEvent>>,
    events: VecDeque<BackendEvent>,
}

impl RemoteBackend {
    pub fn new(transport: Arc<dyn Transport>, label: impl Into<String>) -> Self {
        Self {
            client: RemoteClient::new(transport),
            label: label.into(),
            pending: None,
            events: VecDeque::new(),
        }
    }

    /// Backend for `base_url` over HTTP.
    pub fn connect(base_url: &str, credentials: Option<Credentials>) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(base_url, credentials)?;
        Ok(Self::new(Arc::new(transport), base_url))
    }

    fn spawn<F>(&mut self, work: F)
    where
        F: FnOnce(&RemoteClient) -> BackendEvent + Send + 'static,
    {
        let (sender, receiver) = channel();
        let client = self.client.clone();
        std::thread::spawn(move || {
            let _ = sender.send(work(&client));
        });
        self.pending = Some(receiver);
    }
}

fn outcome_event<T>(result: Result<T, BackendError>, finish: impl FnOnce(T) -> BackendOutput) -> BackendEvent {
    match result {
        Ok(value) => BackendEvent::Finished(finish(value)),
        Err(BackendError::Disconnected(reason)) => {
            log::warn!("Remote backend disconnected: {}", reason);
            BackendEvent::Disconnected(reason)
        }
        Err(e) => BackendEvent::Failed(e),
    }
}

impl Backend for RemoteBackend {
    fn describe(&self) -> String {
        format!("Remote ({})", self.label)
    }

    fn authenticate(&mut self) -> Result<(), BackendError> {
        self.client.authenticate()
    }

    fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    fn colorize(&mut self, frame: Arc<Frame>, points: FramePointSet) -> Result<(), BackendError> {
        if self.is_busy() {
            return Err(BackendError::Busy);
        }
        self.spawn(move |client| {
            let result = client.colorize(&frame, &points);
            outcome_event(result, |image| BackendOutput {
                frame_index: frame.index(),
                image: Some(image),
                points,
            })
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
            self.events.push_back(BackendEvent::Finished(BackendOutput {
                frame_index: to.index(),
                image: None,
                points: FramePointSet::new(),
            }));
            return Ok(());
        }
        self.spawn(move |client| {
            let result = client.extrapolate(&from, &points, &to);
            outcome_event(result, |(image, points)| BackendOutput {
                frame_index: to.index(),
                image,
                points,
            })
        });
        Ok(())
    }

    fn poll(&mut self) -> Option<BackendEvent> {
        if let Some(event) = self.events.pop_front() {
            return Some(event);
        }
        let receiver = self.pending.as_ref()?;
        match receiver.try_recv() {
            Ok(event) => {
                self.pending = None;
                Some(event)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.pending = None;
                Some(BackendEvent::Disconnected("request worker exited".into()))
            }
        }
    }

    fn colorizer(&self) -> Arc<dyn FrameColorizer> {
        Arc::new(self.client.clone())
    }
}

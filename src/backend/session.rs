// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Ownership of the colorization network.
//!
//! An [`InferenceSession`] holds at most one network and lets at most one
//! forward pass run at a time. A trigger that arrives while a pass is
//! running is rejected with [`SessionError::Busy`] instead of queued.

use super::network::ColorizationNetwork;
use crate::colorize::{InferenceRequest, InferenceResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a forward pass is already running")]
    Busy,
    #[error("no colorization model is loaded")]
    NoModel,
    #[error("network failed: {0}")]
    Network(String),
}

/// Completion of a submitted pass, after post-processing into `T`.
pub type Completion<T = InferenceResult> = Receiver<Result<T, SessionError>>;

struct Inner {
    network: Mutex<Option<Box<dyn ColorizationNetwork>>>,
    running: AtomicBool,
}

/// Shared handle to the network and its Idle/Running state.
#[derive(Clone)]
pub struct InferenceSession {
    inner: Arc<Inner>,
}

/// Marks the session Running until dropped.
struct RunningGuard {
    inner: Arc<Inner>,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.inner.running.store(false, Ordering::Release);
    }
}

impl Default for InferenceSession {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceSession {
    /// Session with no network loaded.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                network: Mutex::new(None),
                running: AtomicBool::new(false),
            }),
        }
    }

    pub fn with_network(network: Box<dyn ColorizationNetwork>) -> Self {
        let session = Self::new();
        session.load(network);
        session
    }

    /// Replace the loaded network. Waits for a running pass to finish.
    pub fn load(&self, network: Box<dyn ColorizationNetwork>) {
        log::info!("Loaded colorization network ({}x{})", network.resolution(), network.resolution());
        *self.network() = Some(network);
    }

    pub fn unload(&self) {
        *self.network() = None;
    }

    pub fn has_model(&self) -> bool {
        self.network().is_some()
    }

    /// Network resolution, if a network is loaded.
    pub fn resolution(&self) -> Option<u32> {
        self.network().as_ref().map(|n| n.resolution())
    }

    pub fn is_busy(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Run one pass on the calling thread.
    pub fn run(&self, request: &InferenceRequest) -> Result<InferenceResult, SessionError> {
        let _guard = self.acquire()?;
        self.forward(request)
    }

    /// Run one pass on a worker thread. `prepare` builds the request for
    /// the loaded resolution and `finish` post-processes the result, both
    /// on the worker, and the outcome arrives on the returned channel.
    /// Fails immediately when busy or when no network is loaded.
    ///
    /// The session is Running from this call until the forward pass ends;
    /// `finish` runs after it is Idle again.
    pub fn submit<T, P, F>(&self, prepare: P, finish: F) -> Result<Completion<T>, SessionError>
    where
        T: Send + 'static,
        P: FnOnce(u32) -> InferenceRequest + Send + 'static,
        F: FnOnce(InferenceResult) -> T + Send + 'static,
    {
        let guard = self.acquire()?;
        let resolution = self.resolution().ok_or(SessionError::NoModel)?;

        let (sender, receiver) = channel();
        let session = self.clone();
        std::thread::spawn(move || {
            let request = prepare(resolution);
            let result = session.forward(&request);
            drop(guard);
            let _ = sender.send(result.map(finish));
        });
        Ok(receiver)
    }

    fn acquire(&self) -> Result<RunningGuard, SessionError> {
        self.inner
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SessionError::Busy)?;
        Ok(RunningGuard {
            inner: Arc::clone(&self.inner),
        })
    }

    /// `set_image` and `forward` under one lock.
    fn forward(&self, request: &InferenceRequest) -> Result<InferenceResult, SessionError> {
        let mut slot = self.network();
        let network = slot.as_mut().ok_or(SessionError::NoModel)?;

        let r = network.resolution() as usize;
        assert_eq!(request.gray.dimensions(), (r as u32, r as u32), "gray input must be R x R");
        assert_eq!(request.hint_chroma.dim(), (2, r, r), "hint chroma must be 2 x R x R");
        assert_eq!(request.hint_mask.dim(), (1, r, r), "hint mask must be 1 x R x R");

        let start = Instant::now();
        network.set_image(&request.gray);
        let chroma = network
            .forward(&request.hint_chroma, &request.hint_mask)
            .map_err(|e| SessionError::Network(e.to_string()))?;
        if chroma.dim() != (2, r, r) {
            return Err(SessionError::Network(format!(
                "network returned shape {:?}, expected (2, {}, {})",
                chroma.dim(),
                r,
                r
            )));
        }
        log::info!("Forward pass took {:?}", start.elapsed());

        Ok(InferenceResult { chroma })
    }

    fn network(&self) -> MutexGuard<'_, Option<Box<dyn ColorizationNetwork>>> {
        self.inner
            .network
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

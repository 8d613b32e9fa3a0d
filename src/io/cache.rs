// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Decoded frame cache.
//!
//! Frames are decoded from the source on first access and kept in a
//! bounded LRU keyed by frame index. Hint points are not cached here;
//! they live in the project, which is the single source of truth for
//! them.

use super::media::{MediaError, VideoSource};
use crate::models::frame::Frame;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

pub const DEFAULT_FRAME_CACHE_SIZE: usize = 32;

pub struct FrameCache {
    source: Box<dyn VideoSource>,
    frames: LruCache<usize, Arc<Frame>>,
}

impl FrameCache {
    /// Cache in front of `source` holding up to `capacity` frames
    /// (at least one).
    pub fn new(source: Box<dyn VideoSource>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            source,
            frames: LruCache::new(capacity),
        }
    }

    pub fn frame_count(&self) -> usize {
        self.source.frame_count()
    }

    pub fn frame_size(&self) -> (u32, u32) {
        self.source.frame_size()
    }

    pub fn source_identifier(&self) -> String {
        self.source.identifier()
    }

    /// Cached frame, or decode it and cache it.
    pub fn get_frame(&mut self, index: usize) -> Result<Arc<Frame>, MediaError> {
        if let Some(frame) = self.frames.get(&index) {
            return Ok(Arc::clone(frame));
        }
        let rgb = self.source.read_frame(index)?;
        let frame = Arc::new(Frame::new(index, rgb));
        self.frames.put(index, Arc::clone(&frame));
        log::debug!("Decoded frame {} ({} cached)", index + 1, self.frames.len());
        Ok(frame)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.frames.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

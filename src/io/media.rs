// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Media file loading (images and videos).
//!
//! This module opens the frame sources the editor can colorize: a
//! directory of still images treated as one frame each, a single image
//! treated as a one-frame video, and, with the `video-opencv` feature,
//! regular video files.

use image::RgbImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Still image extensions accepted as frames.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// Video extensions handed to OpenCV.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm"];

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("cannot open {path}: {reason}")]
    Open { path: String, reason: String },
    #[error("frame {index} is out of range (source has {count} frames)")]
    OutOfRange { index: usize, count: usize },
    #[error("frame {index} is {got:?}, expected {expected:?}")]
    SizeMismatch {
        index: usize,
        got: (u32, u32),
        expected: (u32, u32),
    },
    #[error("failed to decode frame {index}: {reason}")]
    Decode { index: usize, reason: String },
}

/// Random-access source of RGB frames.
pub trait VideoSource: Send {
    fn frame_count(&self) -> usize;

    /// `(width, height)` shared by every frame.
    fn frame_size(&self) -> (u32, u32);

    /// Decode frame `index` (zero-based).
    fn read_frame(&mut self, index: usize) -> Result<RgbImage, MediaError>;

    /// Human-readable identifier, stored in project files.
    fn identifier(&self) -> String;
}

/// Open whatever lives at `path` as a frame source.
pub fn open_source(path: &Path) -> Result<Box<dyn VideoSource>, MediaError> {
    if path.is_dir() {
        return Ok(Box::new(ImageSequenceSource::open(path)?));
    }

    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase());
    match extension.as_deref() {
        Some(ext) if IMAGE_EXTENSIONS.contains(&ext) => {
            Ok(Box::new(ImageSequenceSource::single(path)?))
        }
        #[cfg(feature = "video-opencv")]
        Some(ext) if VIDEO_EXTENSIONS.contains(&ext) => {
            Ok(Box::new(opencv_source::OpenCvVideoSource::open(path)?))
        }
        _ => Err(MediaError::Open {
            path: path.display().to_string(),
            reason: format!("unsupported media type {:?}", extension),
        }),
    }
}

/// Frames stored as individual image files, ordered by file name.
pub struct ImageSequenceSource {
    identifier: String,
    files: Vec<PathBuf>,
    size: (u32, u32),
}

impl ImageSequenceSource {
    /// Every supported image in `dir`, sorted by name.
    pub fn open(dir: &Path) -> Result<Self, MediaError> {
        let open_err = |reason: String| MediaError::Open {
            path: dir.display().to_string(),
            reason,
        };

        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(|e| open_err(e.to_string()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_image_file(p))
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(open_err("directory contains no images".into()));
        }
        Self::from_files(dir.display().to_string(), files)
    }

    /// A single still image as a one-frame sequence.
    pub fn single(path: &Path) -> Result<Self, MediaError> {
        Self::from_files(path.display().to_string(), vec![path.to_path_buf()])
    }

    fn from_files(identifier: String, files: Vec<PathBuf>) -> Result<Self, MediaError> {
        let size = image::image_dimensions(&files[0]).map_err(|e| MediaError::Open {
            path: files[0].display().to_string(),
            reason: e.to_string(),
        })?;
        log::info!(
            "Opened image sequence {} ({} frames, {}x{})",
            identifier,
            files.len(),
            size.0,
            size.1
        );
        Ok(Self {
            identifier,
            files,
            size,
        })
    }
}

impl VideoSource for ImageSequenceSource {
    fn frame_count(&self) -> usize {
        self.files.len()
    }

    fn frame_size(&self) -> (u32, u32) {
        self.size
    }

    fn read_frame(&mut self, index: usize) -> Result<RgbImage, MediaError> {
        let path = self.files.get(index).ok_or(MediaError::OutOfRange {
            index,
            count: self.files.len(),
        })?;
        let image = image::open(path)
            .map_err(|e| MediaError::Decode {
                index,
                reason: e.to_string(),
            })?
            .to_rgb8();
        if image.dimensions() != self.size {
            return Err(MediaError::SizeMismatch {
                index,
                got: image.dimensions(),
                expected: self.size,
            });
        }
        Ok(image)
    }

    fn identifier(&self) -> String {
        self.identifier.clone()
    }
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| IMAGE_EXTENSIONS.contains(&s.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(feature = "video-opencv")]
mod opencv_source {
    use super::{MediaError, VideoSource};
    use image::RgbImage;
    use opencv::core::Mat;
    use opencv::prelude::*;
    use opencv::{imgproc, videoio};
    use std::path::Path;

    /// Video file decoded through OpenCV's `VideoCapture`.
    pub struct OpenCvVideoSource {
        identifier: String,
        capture: videoio::VideoCapture,
        frame_count: usize,
        size: (u32, u32),
        /// Index the next sequential `read` will return.
        position: usize,
    }

    impl OpenCvVideoSource {
        pub fn open(path: &Path) -> Result<Self, MediaError> {
            let identifier = path.display().to_string();
            let open_err = |reason: String| MediaError::Open {
                path: identifier.clone(),
                reason,
            };

            let capture = videoio::VideoCapture::from_file(&identifier, videoio::CAP_ANY)
                .map_err(|e| open_err(e.to_string()))?;
            if !capture.is_opened().map_err(|e| open_err(e.to_string()))? {
                return Err(open_err("VideoCapture refused the file".into()));
            }

            let prop = |id| capture.get(id).map_err(|e| open_err(e.to_string()));
            let frame_count = prop(videoio::CAP_PROP_FRAME_COUNT)? as usize;
            let width = prop(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
            let height = prop(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
            if frame_count == 0 || width == 0 || height == 0 {
                return Err(open_err("video reports no frames".into()));
            }

            log::info!(
                "Opened video {} ({} frames, {}x{})",
                identifier,
                frame_count,
                width,
                height
            );
            Ok(Self {
                identifier,
                capture,
                frame_count,
                size: (width, height),
                position: 0,
            })
        }
    }

    impl VideoSource for OpenCvVideoSource {
        fn frame_count(&self) -> usize {
            self.frame_count
        }

        fn frame_size(&self) -> (u32, u32) {
            self.size
        }

        fn read_frame(&mut self, index: usize) -> Result<RgbImage, MediaError> {
            if index >= self.frame_count {
                return Err(MediaError::OutOfRange {
                    index,
                    count: self.frame_count,
                });
            }
            let decode_err = |reason: String| MediaError::Decode { index, reason };

            // Sequential reads skip the seek.
            if index != self.position {
                self.capture
                    .set(videoio::CAP_PROP_POS_FRAMES, index as f64)
                    .map_err(|e| decode_err(e.to_string()))?;
            }

            let mut bgr = Mat::default();
            let ok = self
                .capture
                .read(&mut bgr)
                .map_err(|e| decode_err(e.to_string()))?;
            if !ok || bgr.empty() {
                return Err(decode_err("no frame returned".into()));
            }
            self.position = index + 1;

            let mut rgb = Mat::default();
            imgproc::cvt_color(&bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0)
                .map_err(|e| decode_err(e.to_string()))?;
            let bytes = rgb
                .data_bytes()
                .map_err(|e| decode_err(e.to_string()))?
                .to_vec();

            RgbImage::from_raw(self.size.0, self.size.1, bytes)
                .ok_or_else(|| decode_err("frame buffer has unexpected size".into()))
        }

        fn identifier(&self) -> String {
            self.identifier.clone()
        }
    }
}

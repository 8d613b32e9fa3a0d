// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Colorized sequence export.
//!
//! Every frame in the range is colorized with its stored hints and
//! written as `frame_NNNNN.png`. The loop runs on a background thread,
//! reports progress over a channel and checks a cancellation flag between
//! frames. A pass that has started always completes.

use super::media::VideoSource;
use crate::backend::FrameColorizer;
use crate::models::{frame::Frame, project::ProjectState};
use anyhow::{Context, Result};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportEvent {
    /// `done` of `total` frames written.
    Progress { done: usize, total: usize },
    Finished { written: usize },
    Cancelled { written: usize },
    Failed(String),
}

/// Handle to a running export.
pub struct ExportHandle {
    pub events: Receiver<ExportEvent>,
    cancel: Arc<AtomicBool>,
}

impl ExportHandle {
    /// Stop after the frame currently being colorized.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }
}

pub fn frame_file_name(index: usize) -> String {
    format!("frame_{:05}.png", index)
}

/// Start exporting `range` of `source` into `output_dir`.
pub fn spawn_export(
    mut source: Box<dyn VideoSource>,
    colorizer: Arc<dyn FrameColorizer>,
    project: ProjectState,
    output_dir: PathBuf,
    range: Range<usize>,
) -> ExportHandle {
    let (sender, receiver) = channel();
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);

    std::thread::spawn(move || {
        let result = run_export(
            source.as_mut(),
            colorizer.as_ref(),
            &project,
            &output_dir,
            range,
            &flag,
            &sender,
        );
        let last = match result {
            Ok(event) => event,
            Err(e) => {
                log::error!("Export failed: {:#}", e);
                ExportEvent::Failed(format!("{:#}", e))
            }
        };
        let _ = sender.send(last);
    });

    ExportHandle {
        events: receiver,
        cancel,
    }
}

/// The export loop. Returns the final event, `Finished` or `Cancelled`.
pub fn run_export(
    source: &mut dyn VideoSource,
    colorizer: &dyn FrameColorizer,
    project: &ProjectState,
    output_dir: &Path,
    range: Range<usize>,
    cancel: &AtomicBool,
    progress: &Sender<ExportEvent>,
) -> Result<ExportEvent> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let range = range.start..range.end.min(source.frame_count());
    let total = range.len();
    let mut written = 0;

    for index in range {
        if cancel.load(Ordering::Relaxed) {
            log::info!("Export cancelled after {} of {} frames", written, total);
            return Ok(ExportEvent::Cancelled { written });
        }

        let frame = Frame::new(index, source.read_frame(index)?);
        let points = project.get_points(index);
        let image = colorizer
            .colorize_frame(&frame, &points)
            .with_context(|| format!("Failed to colorize frame {}", index + 1))?;

        let path = output_dir.join(frame_file_name(index));
        image
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        written += 1;
        let _ = progress.send(ExportEvent::Progress { done: written, total });
    }

    log::info!("Exported {} frames to {}", written, output_dir.display());
    Ok(ExportEvent::Finished { written })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use crate::io::media::MediaError;
    use crate::models::color_point::{ColorPoint, FramePointSet};
    use image::{Rgb, RgbImage};
    use std::sync::Mutex;
    use std::time::Duration;

    struct SolidSource {
        frames: usize,
    }

    impl VideoSource for SolidSource {
        fn frame_count(&self) -> usize {
            self.frames
        }

        fn frame_size(&self) -> (u32, u32) {
            (4, 3)
        }

        fn read_frame(&mut self, index: usize) -> Result<RgbImage, MediaError> {
            Ok(RgbImage::from_pixel(4, 3, Rgb([index as u8; 3])))
        }

        fn identifier(&self) -> String {
            "solid".into()
        }
    }

    /// Paints the frame with the first hint color and records hint counts.
    struct HintColorizer {
        seen: Mutex<Vec<(usize, usize)>>,
        cancel_after: Option<(usize, Arc<AtomicBool>)>,
    }

    impl FrameColorizer for HintColorizer {
        fn colorize_frame(
            &self,
            frame: &Frame,
            points: &FramePointSet,
        ) -> Result<RgbImage, BackendError> {
            let mut seen = self.seen.lock().unwrap();
            seen.push((frame.index(), points.len()));
            if let Some((n, flag)) = &self.cancel_after {
                if seen.len() == *n {
                    flag.store(true, Ordering::Relaxed);
                }
            }
            let color = points.get(0).map(|p| p.color).unwrap_or([0, 0, 0]);
            Ok(RgbImage::from_pixel(frame.width(), frame.height(), Rgb(color)))
        }
    }

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("chromahint-export-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_exports_every_frame_with_its_points() {
        let dir = scratch("all");
        let mut project = ProjectState::new("solid".into());
        project.set_points(1, [ColorPoint::new(0, 0, [200, 0, 0])].into_iter().collect());
        let colorizer = HintColorizer {
            seen: Mutex::new(Vec::new()),
            cancel_after: None,
        };
        let (sender, receiver) = channel();

        let last = run_export(
            &mut SolidSource { frames: 3 },
            &colorizer,
            &project,
            &dir,
            0..10,
            &AtomicBool::new(false),
            &sender,
        )
        .unwrap();

        assert_eq!(last, ExportEvent::Finished { written: 3 });
        assert_eq!(*colorizer.seen.lock().unwrap(), vec![(0, 0), (1, 1), (2, 0)]);
        let written = image::open(dir.join("frame_00001.png")).unwrap().to_rgb8();
        assert_eq!(written.get_pixel(0, 0).0, [200, 0, 0]);
        assert!(dir.join("frame_00002.png").exists());
        let progress: Vec<ExportEvent> = receiver.try_iter().collect();
        assert_eq!(progress.last(), Some(&ExportEvent::Progress { done: 3, total: 3 }));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_cancel_is_checked_between_frames() {
        let dir = scratch("cancel");
        let flag = Arc::new(AtomicBool::new(false));
        let colorizer = HintColorizer {
            seen: Mutex::new(Vec::new()),
            cancel_after: Some((2, Arc::clone(&flag))),
        };
        let (sender, _receiver) = channel();

        let last = run_export(
            &mut SolidSource { frames: 5 },
            &colorizer,
            &ProjectState::default(),
            &dir,
            0..5,
            &flag,
            &sender,
        )
        .unwrap();

        // The pass that raised the flag still finishes and is written.
        assert_eq!(last, ExportEvent::Cancelled { written: 2 });
        assert!(dir.join("frame_00001.png").exists());
        assert!(!dir.join("frame_00002.png").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_spawned_export_reports_failure() {
        struct Refusing;
        impl FrameColorizer for Refusing {
            fn colorize_frame(&self, _: &Frame, _: &FramePointSet) -> Result<RgbImage, BackendError> {
                Err(BackendError::NoModel)
            }
        }

        let dir = scratch("failure");
        let handle = spawn_export(
            Box::new(SolidSource { frames: 2 }),
            Arc::new(Refusing),
            ProjectState::default(),
            dir.clone(),
            0..2,
        );
        let last = handle.events.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(last, ExportEvent::Failed(msg) if msg.contains("frame 1")));
        let _ = std::fs::remove_dir_all(&dir);
    }
}

//! Frame ingestion sources.
//!
//! This module provides the sources a session can read from:
//! - Live camera by index (feature: ingest-v4l2; index N is `/dev/videoN`)
//! - Local video files (feature: ingest-file-ffmpeg)
//! - Synthetic source (`stub://` paths, tests and demo)
//!
//! Every source produces RGB24 `Frame`s numbered from 1 within the session.
//! `next_frame` returns `Ok(None)` once the stream is exhausted.

pub mod file;
#[cfg(feature = "ingest-file-ffmpeg")]
pub(crate) mod file_ffmpeg;
#[cfg(feature = "ingest-v4l2")]
mod normalize;
pub mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::frame::Frame;
pub use file::FileSource;
pub use synthetic::{SyntheticConfig, SyntheticSource};
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::{V4l2Config, V4l2Source};

/// What to open.
#[derive(Clone, Debug)]
pub enum SourceSelector {
    /// Live camera by index.
    Camera { index: u32, target_fps: u32 },
    /// A previously staged local video file.
    File { path: PathBuf },
    /// Generated frames.
    Synthetic(SyntheticConfig),
}

impl SourceSelector {
    pub fn describe(&self) -> String {
        match self {
            SourceSelector::Camera { index, .. } => format!("camera {}", index),
            SourceSelector::File { path } => format!("file {}", path.display()),
            SourceSelector::Synthetic(cfg) => {
                format!("synthetic {}x{} x{}", cfg.width, cfg.height, cfg.frames)
            }
        }
    }
}

enum SourceBackend {
    Synthetic(SyntheticSource),
    File(FileSource),
    #[cfg(feature = "ingest-v4l2")]
    Camera(V4l2Source),
}

/// An open capture handle owned by one session.
pub struct VideoSource {
    backend: SourceBackend,
    description: String,
    frames_read: u64,
    exhausted: bool,
}

impl VideoSource {
    /// Open a source. Failure means the source is unavailable.
    pub fn open(selector: SourceSelector) -> Result<Self> {
        let description = selector.describe();
        let backend = match selector {
            SourceSelector::Synthetic(cfg) => SourceBackend::Synthetic(SyntheticSource::new(cfg)),
            SourceSelector::File { path } => SourceBackend::File(FileSource::open(&path)?),
            SourceSelector::Camera { index, target_fps } => open_camera(index, target_fps)?,
        };
        log::info!("opened {}", description);
        Ok(Self {
            backend,
            description,
            frames_read: 0,
            exhausted: false,
        })
    }

    /// Read the next frame, or `None` at end of stream.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.exhausted {
            return Ok(None);
        }
        let index = self.frames_read + 1;
        let frame = match &mut self.backend {
            SourceBackend::Synthetic(source) => source.next_frame(index),
            SourceBackend::File(source) => source.next_frame(index),
            #[cfg(feature = "ingest-v4l2")]
            SourceBackend::Camera(source) => source.next_frame(index).map(Some),
        }
        .with_context(|| format!("read frame {} from {}", index, self.description))?;

        match frame {
            Some(frame) => {
                self.frames_read = index;
                Ok(Some(frame))
            }
            None => {
                self.exhausted = true;
                log::info!(
                    "{}: end of stream after {} frames",
                    self.description,
                    self.frames_read
                );
                Ok(None)
            }
        }
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Release the capture handle.
    pub fn close(self) {
        log::info!(
            "closed {} ({} frames read)",
            self.description,
            self.frames_read
        );
    }
}

#[cfg(feature = "ingest-v4l2")]
fn open_camera(index: u32, target_fps: u32) -> Result<SourceBackend> {
    let mut source = V4l2Source::new(V4l2Config {
        device: format!("/dev/video{}", index),
        target_fps,
        ..V4l2Config::default()
    })?;
    source.connect()?;
    Ok(SourceBackend::Camera(source))
}

#[cfg(not(feature = "ingest-v4l2"))]
fn open_camera(index: u32, _target_fps: u32) -> Result<SourceBackend> {
    anyhow::bail!(
        "camera {} unavailable: live capture requires the ingest-v4l2 feature",
        index
    )
}

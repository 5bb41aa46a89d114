//! Local file frame source.
//!
//! `FileSource` decodes a staged local video file in-memory. Paths starting with
//! `stub://` produce synthetic frames instead, which keeps the file path testable
//! without a decoder.

use std::path::Path;

use anyhow::{anyhow, Result};

#[cfg(feature = "ingest-file-ffmpeg")]
use super::file_ffmpeg::FfmpegFileSource;
use super::synthetic::{SyntheticConfig, SyntheticSource};
use crate::frame::Frame;

pub struct FileSource {
    backend: FileBackend,
}

enum FileBackend {
    Synthetic(SyntheticSource),
    #[cfg(feature = "ingest-file-ffmpeg")]
    Ffmpeg(FfmpegFileSource),
}

impl FileSource {
    pub fn open(path: &Path) -> Result<Self> {
        let display = path.to_string_lossy();
        if display.starts_with("stub://") {
            return Ok(Self {
                backend: FileBackend::Synthetic(SyntheticSource::new(SyntheticConfig::default())),
            });
        }
        if !is_local_file_path(&display) {
            return Err(anyhow!(
                "file ingestion only supports local paths (no URL schemes): {}",
                display
            ));
        }
        if !path.is_file() {
            return Err(anyhow!("video file not found: {}", display));
        }
        Self::open_decoder(path)
    }

    #[cfg(feature = "ingest-file-ffmpeg")]
    fn open_decoder(path: &Path) -> Result<Self> {
        Ok(Self {
            backend: FileBackend::Ffmpeg(FfmpegFileSource::new(path)?),
        })
    }

    #[cfg(not(feature = "ingest-file-ffmpeg"))]
    fn open_decoder(path: &Path) -> Result<Self> {
        Err(anyhow!(
            "cannot decode {}: file ingestion requires the ingest-file-ffmpeg feature",
            path.display()
        ))
    }

    /// Decode the next frame, or `None` when the file is exhausted.
    pub fn next_frame(&mut self, index: u64) -> Result<Option<Frame>> {
        match &mut self.backend {
            FileBackend::Synthetic(source) => source.next_frame(index),
            #[cfg(feature = "ingest-file-ffmpeg")]
            FileBackend::Ffmpeg(source) => source.next_frame(index),
        }
    }
}

fn is_local_file_path(path: &str) -> bool {
    if path.trim().is_empty() {
        return false;
    }
    !path.contains("://")
}

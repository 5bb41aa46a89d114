//! Staging of uploaded videos.
//!
//! An uploaded video is copied to a temporary file before the frame source opens
//! it. The temporary file belongs to the session: it is removed after the capture
//! handle is released, and a failed removal is only a warning.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tempfile::Builder;

/// Upload extensions the stager accepts.
pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["mp4", "avi", "mov"];

/// Suffix of the staged copy.
pub const STAGED_SUFFIX: &str = ".mp4";

/// A staged copy of an uploaded video.
#[derive(Debug)]
pub struct StagedVideo {
    path: PathBuf,
    removed: bool,
}

impl StagedVideo {
    /// Copy `upload` into a new temporary file.
    pub fn stage(upload: &Path) -> Result<Self> {
        check_extension(upload)?;
        let mut reader = File::open(upload)
            .with_context(|| format!("failed to open upload {}", upload.display()))?;
        Self::stage_reader(&mut reader)
    }

    /// Copy an upload stream into a new temporary file.
    pub fn stage_reader<R: Read>(reader: &mut R) -> Result<Self> {
        let mut file = Builder::new()
            .prefix("zone-sentry-")
            .suffix(STAGED_SUFFIX)
            .tempfile()
            .context("failed to create temporary video file")?;
        let bytes = io::copy(reader, &mut file).context("failed to stage uploaded video")?;
        let (_, path) = file
            .keep()
            .map_err(|e| anyhow!("failed to keep staged video: {}", e))?;
        log::info!("staged upload ({} bytes) at {}", bytes, path.display());
        Ok(Self {
            path,
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the staged file. Call after the capture handle has been released.
    pub fn cleanup(mut self) -> Result<()> {
        self.remove()
    }

    fn remove(&mut self) -> Result<()> {
        if self.removed {
            return Ok(());
        }
        self.removed = true;
        std::fs::remove_file(&self.path).with_context(|| {
            format!(
                "could not delete temp file {}; it may still be in use",
                self.path.display()
            )
        })
    }
}

impl Drop for StagedVideo {
    fn drop(&mut self) {
        if let Err(e) = self.remove() {
            log::warn!("{:#}", e);
        }
    }
}

fn check_extension(upload: &Path) -> Result<()> {
    let ext = upload
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext {
        Some(ext) if ACCEPTED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(anyhow!(
            "unsupported upload {} (accepted: {})",
            upload.display(),
            ACCEPTED_EXTENSIONS.join(", ")
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn stages_and_removes_copy() -> Result<()> {
        let mut upload = Builder::new().suffix(".mov").tempfile()?;
        upload.write_all(b"not really a video")?;

        let staged = StagedVideo::stage(upload.path())?;
        let staged_path = staged.path().to_path_buf();
        assert!(staged_path.to_string_lossy().ends_with(".mp4"));
        assert_eq!(std::fs::read(&staged_path)?, b"not really a video");

        staged.cleanup()?;
        assert!(!staged_path.exists());
        Ok(())
    }

    #[test]
    fn drop_removes_copy() -> Result<()> {
        let path = {
            let staged = StagedVideo::stage_reader(&mut &b"bytes"[..])?;
            staged.path().to_path_buf()
        };
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn cleanup_of_missing_file_reports_error() -> Result<()> {
        let staged = StagedVideo::stage_reader(&mut &b"bytes"[..])?;
        std::fs::remove_file(staged.path())?;
        let err = staged.cleanup().unwrap_err();
        assert!(err.to_string().contains("could not delete temp file"));
        Ok(())
    }

    #[test]
    fn rejects_unsupported_extension() {
        let err = StagedVideo::stage(Path::new("clip.gif")).unwrap_err();
        assert!(err.to_string().contains("unsupported upload"));
    }
}

//! Captured frames.
//!
//! - `Frame`: RGB24 pixel buffer with dimensions and the capture index within a session.
//! - `WORKING_WIDTH`/`WORKING_HEIGHT`: the size every frame is resized to before
//!   detection, classification and presentation.

use anyhow::{anyhow, Context, Result};
use image::{imageops, imageops::FilterType, RgbImage};

/// Width frames are resized to before they enter the pipeline.
pub const WORKING_WIDTH: u32 = 640;

/// Height frames are resized to before they enter the pipeline.
pub const WORKING_HEIGHT: u32 = 480;

/// One captured frame. Pixels are row-major RGB, 3 bytes per pixel.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// 1-based capture index within the session.
    pub index: u64,
}

impl Frame {
    /// Wrap an RGB24 buffer, checking its length against the dimensions.
    pub fn from_rgb(data: Vec<u8>, width: u32, height: u32, index: u64) -> Result<Self> {
        let expected = rgb_len(width, height)?;
        if data.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
            index,
        })
    }

    /// Solid-color frame, mostly useful for synthetic sources and tests.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3], index: u64) -> Result<Self> {
        let len = rgb_len(width, height)?;
        let data = rgb.iter().copied().cycle().take(len).collect();
        Self::from_rgb(data, width, height, index)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Resize to `width`x`height`. Returns the frame unchanged when it already matches.
    pub fn resized(self, width: u32, height: u32) -> Result<Self> {
        if self.width == width && self.height == height {
            return Ok(self);
        }
        let index = self.index;
        let image = self.into_image()?;
        let resized = imageops::resize(&image, width, height, FilterType::Triangle);
        Self::from_rgb(resized.into_raw(), width, height, index)
    }

    /// Resize to the pipeline working size (640x480).
    pub fn to_working_size(self) -> Result<Self> {
        self.resized(WORKING_WIDTH, WORKING_HEIGHT)
    }

    pub fn to_image(&self) -> Result<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data.clone())
            .context("frame buffer does not match its dimensions")
    }

    pub fn into_image(self) -> Result<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data)
            .context("frame buffer does not match its dimensions")
    }
}

pub(crate) fn rgb_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(3))
        .ok_or_else(|| anyhow!("frame dimensions overflow"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_buffer() {
        let err = Frame::from_rgb(vec![0u8; 10], 2, 2, 1).unwrap_err();
        assert!(err.to_string().contains("expected 12 RGB bytes"));
    }

    #[test]
    fn resizes_to_working_size() -> Result<()> {
        let frame = Frame::filled(1280, 720, [10, 20, 30], 7)?;
        let resized = frame.to_working_size()?;
        assert_eq!(resized.width, WORKING_WIDTH);
        assert_eq!(resized.height, WORKING_HEIGHT);
        assert_eq!(resized.index, 7);
        assert_eq!(resized.pixels().len(), 640 * 480 * 3);
        assert_eq!(&resized.pixels()[..3], &[10, 20, 30]);
        Ok(())
    }

    #[test]
    fn resize_is_noop_at_target_size() -> Result<()> {
        let frame = Frame::filled(640, 480, [1, 2, 3], 1)?;
        let resized = frame.resized(640, 480)?;
        assert_eq!(resized.width, 640);
        assert_eq!(&resized.pixels()[..6], &[1, 2, 3, 1, 2, 3]);
        Ok(())
    }
}

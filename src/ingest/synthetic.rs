//! Synthetic frame source for tests and the demo.

use anyhow::{bail, Result};

use crate::frame::Frame;

#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    pub width: u32,
    pub height: u32,
    /// Frames produced before end of stream.
    pub frames: u64,
    /// Capture index at which the feed reports a read error, like a camera dropping out.
    pub fail_at: Option<u64>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            frames: 50,
            fail_at: None,
        }
    }
}

pub struct SyntheticSource {
    config: SyntheticConfig,
    produced: u64,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        log::info!(
            "SyntheticSource: {}x{}, {} frames",
            config.width,
            config.height,
            config.frames
        );
        Self {
            config,
            produced: 0,
        }
    }

    pub fn next_frame(&mut self, index: u64) -> Result<Option<Frame>> {
        if self.produced >= self.config.frames {
            return Ok(None);
        }
        if self.config.fail_at == Some(index) {
            bail!("synthetic feed dropped at frame {}", index);
        }
        self.produced += 1;
        let pixels = self.generate_pixels();
        Frame::from_rgb(pixels, self.config.width, self.config.height, index).map(Some)
    }

    /// Gradient that shifts with every frame.
    fn generate_pixels(&self) -> Vec<u8> {
        let pixel_count = (self.config.width as usize) * (self.config.height as usize) * 3;
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.produced) % 256) as u8;
        }
        pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_differ_between_captures() -> Result<()> {
        let mut source = SyntheticSource::new(SyntheticConfig {
            width: 4,
            height: 4,
            frames: 2,
            ..SyntheticConfig::default()
        });
        let a = source.next_frame(1)?.expect("first frame");
        let b = source.next_frame(2)?.expect("second frame");
        assert_ne!(a.pixels(), b.pixels());
        assert!(source.next_frame(3)?.is_none());
        Ok(())
    }
}

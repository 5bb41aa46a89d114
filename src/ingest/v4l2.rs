//! V4L2 live camera source.
//!
//! Opens a local device node (camera index N is `/dev/videoN`), asks for RGB24 and
//! falls back to YUYV, and converts every captured buffer to an RGB `Frame`.
//! A live camera has no end of stream; capture errors are returned to the caller.

use anyhow::{anyhow, Context, Result};
use ouroboros::self_referencing;

use super::normalize::{normalize_to_rgb, PixelFormat};
use crate::frame::Frame;

/// Configuration for a V4L2 source.
#[derive(Clone, Debug)]
pub struct V4l2Config {
    /// Device path (e.g., "/dev/video0")
    pub device: String,
    /// Requested frame rate; 0 keeps the device default.
    pub target_fps: u32,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
}

impl Default for V4l2Config {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            target_fps: 10,
            width: 640,
            height: 480,
        }
    }
}

pub struct V4l2Source {
    config: V4l2Config,
    state: Option<DeviceState>,
    pixel_format: PixelFormat,
    active_width: u32,
    active_height: u32,
}

#[self_referencing]
struct DeviceState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl V4l2Source {
    pub fn new(config: V4l2Config) -> Result<Self> {
        Ok(Self {
            active_width: config.width,
            active_height: config.height,
            config,
            state: None,
            pixel_format: PixelFormat::Rgb24,
        })
    }

    /// Open the device and start streaming.
    pub fn connect(&mut self) -> Result<()> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device = v4l::Device::with_path(&self.config.device)
            .with_context(|| format!("open v4l2 device {}", self.config.device))?;

        let format = self.negotiate_format(&mut device)?;
        let pixel_format = PixelFormat::from_fourcc(&format.fourcc.repr).ok_or_else(|| {
            anyhow!(
                "{} offers unsupported pixel format {} (need RGB3 or YUYV)",
                self.config.device,
                format.fourcc
            )
        })?;

        if self.config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(self.config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "V4l2Source: failed to set fps on {}: {}",
                    self.config.device,
                    err
                );
            }
        }

        self.pixel_format = pixel_format;
        self.active_width = format.width;
        self.active_height = format.height;

        let state = DeviceStateTryBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()?;
        self.state = Some(state);

        log::info!(
            "V4l2Source: connected to {} ({}x{}, {:?})",
            self.config.device,
            self.active_width,
            self.active_height,
            self.pixel_format
        );
        Ok(())
    }

    fn negotiate_format(&self, device: &mut v4l::Device) -> Result<v4l::Format> {
        use v4l::video::Capture;

        let mut format = device.format().context("read v4l2 format")?;
        format.width = self.config.width;
        format.height = self.config.height;

        for fourcc in [b"RGB3", b"YUYV"] {
            format.fourcc = v4l::FourCC::new(fourcc);
            match device.set_format(&format) {
                Ok(applied) if applied.fourcc == format.fourcc => return Ok(applied),
                Ok(applied) => log::debug!(
                    "V4l2Source: {} substituted {} for {}",
                    self.config.device,
                    applied.fourcc,
                    format.fourcc
                ),
                Err(err) => log::warn!(
                    "V4l2Source: failed to set {} on {}: {}",
                    format.fourcc,
                    self.config.device,
                    err
                ),
            }
        }
        device
            .format()
            .context("read v4l2 format after negotiation")
    }

    /// Capture the next frame.
    pub fn next_frame(&mut self, index: u64) -> Result<Frame> {
        use v4l::io::traits::CaptureStream;

        let state = self.state.as_mut().context("v4l2 device not connected")?;
        let (width, height, format) = (self.active_width, self.active_height, self.pixel_format);
        let rgb = state.with_mut(|fields| -> Result<Vec<u8>> {
            let (buf, _meta) = fields.stream.next().context("capture v4l2 frame")?;
            normalize_to_rgb(buf, width, height, format)
        })?;
        Frame::from_rgb(rgb, width, height, index)
    }
}

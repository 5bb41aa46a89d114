//! Local file frame source using FFmpeg.
//!
//! Decodes the best video stream of a file to RGB24, one frame per call. After the
//! last packet the decoder is flushed so trailing frames are not lost.

use std::path::Path;

use anyhow::{Context, Result};
use ffmpeg_next as ffmpeg;

use crate::frame::Frame;

pub(crate) struct FfmpegFileSource {
    path: String,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    eof_sent: bool,
}

impl FfmpegFileSource {
    pub(crate) fn new(path: &Path) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let display = path.display().to_string();
        let input = ffmpeg::format::input(&path)
            .with_context(|| format!("failed to open file input '{}' with ffmpeg", display))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow::anyhow!("{} has no video track", display))?;
        let stream_index = input_stream.index();
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        log::info!(
            "FileSource: opened {} ({}x{}, ffmpeg)",
            display,
            decoder.width(),
            decoder.height()
        );

        Ok(Self {
            path: display,
            input,
            stream_index,
            decoder,
            scaler,
            eof_sent: false,
        })
    }

    pub(crate) fn next_frame(&mut self, index: u64) -> Result<Option<Frame>> {
        let mut decoded = ffmpeg::frame::Video::empty();

        loop {
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                return self.convert(&decoded, index).map(Some);
            }
            if self.eof_sent {
                return Ok(None);
            }

            let mut sent = false;
            for (stream, packet) in self.input.packets() {
                if stream.index() != self.stream_index {
                    continue;
                }
                self.decoder
                    .send_packet(&packet)
                    .context("send packet to ffmpeg decoder")?;
                sent = true;
                break;
            }

            if !sent {
                log::debug!("FileSource: {} drained, flushing decoder", self.path);
                self.decoder.send_eof().context("flush ffmpeg decoder")?;
                self.eof_sent = true;
            }
        }
    }

    fn convert(&mut self, decoded: &ffmpeg::frame::Video, index: u64) -> Result<Frame> {
        let mut rgb_frame = ffmpeg::frame::Video::empty();
        self.scaler
            .run(decoded, &mut rgb_frame)
            .context("scale frame to RGB")?;
        let (pixels, width, height) = frame_to_pixels(&rgb_frame)?;
        Frame::from_rgb(pixels, width, height, index)
    }
}

fn frame_to_pixels(frame: &ffmpeg::frame::Video) -> Result<(Vec<u8>, u32, u32)> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    if stride == row_bytes {
        let packed = data
            .get(..row_bytes * height as usize)
            .context("ffmpeg frame is shorter than its dimensions")?;
        return Ok((packed.to_vec(), width, height));
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .context("ffmpeg frame row is out of bounds")?,
        );
    }

    Ok((pixels, width, height))
}

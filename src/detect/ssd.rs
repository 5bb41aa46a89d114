//! Input preparation and output decoding for the MobileNet-SSD person detector.
//!
//! These constants belong to the pretrained network and are not tunable.

use anyhow::{anyhow, Result};
use image::{imageops, imageops::FilterType};

use crate::detect::result::{label_for_class, BoundingBox, Detection};
use crate::frame::Frame;

/// Network input width and height.
pub const SSD_INPUT_SIZE: u32 = 300;

/// Pixel scale factor applied after mean subtraction.
pub const SSD_SCALE: f32 = 0.007843;

/// Mean subtracted from every channel.
pub const SSD_MEAN: f32 = 127.5;

/// Floats per detection row: `[image_id, class_id, confidence, x0, y0, x1, y1]`.
pub const SSD_ROW_LEN: usize = 7;

/// Build the `1x3x300x300` input blob for `frame`.
///
/// Channels are emitted in BGR order, which is what the Caffe weights were trained on.
pub fn blob_from_frame(frame: &Frame) -> Result<Vec<f32>> {
    let image = frame.to_image()?;
    let resized = imageops::resize(&image, SSD_INPUT_SIZE, SSD_INPUT_SIZE, FilterType::Triangle);

    let plane = (SSD_INPUT_SIZE * SSD_INPUT_SIZE) as usize;
    let mut blob = vec![0f32; plane * 3];
    for (i, pixel) in resized.pixels().enumerate() {
        let [r, g, b] = pixel.0;
        blob[i] = normalize(b);
        blob[plane + i] = normalize(g);
        blob[2 * plane + i] = normalize(r);
    }
    Ok(blob)
}

fn normalize(value: u8) -> f32 {
    (value as f32 - SSD_MEAN) * SSD_SCALE
}

/// Decode the flattened `1x1xNx7` detection tensor.
///
/// Coordinates are normalized by the network; they are scaled to `width`x`height`,
/// clamped to one frame beyond each edge and truncated to whole pixels. Rows with a
/// class id outside the label table are skipped.
pub fn decode_detections(output: &[f32], width: u32, height: u32) -> Result<Vec<Detection>> {
    if output.len() % SSD_ROW_LEN != 0 {
        return Err(anyhow!(
            "detection tensor length {} is not a multiple of {}",
            output.len(),
            SSD_ROW_LEN
        ));
    }

    let (w, h) = (width as f32, height as f32);
    let mut detections = Vec::new();
    for row in output.chunks_exact(SSD_ROW_LEN) {
        let class_id = row[1];
        if !class_id.is_finite() || class_id < 0.0 {
            log::debug!("skipping detection row with class id {}", class_id);
            continue;
        }
        let Some(label) = label_for_class(class_id as usize) else {
            log::debug!("skipping detection row with unknown class id {}", class_id);
            continue;
        };
        let bbox = BoundingBox::new(
            to_pixel(row[3], w),
            to_pixel(row[4], h),
            to_pixel(row[5], w),
            to_pixel(row[6], h),
        );
        detections.push(Detection::new(label, row[2], bbox));
    }
    Ok(detections)
}

/// Scale a normalized coordinate to pixels within `[-extent, 2 * extent]`. NaN maps to 0.
fn to_pixel(value: f32, extent: f32) -> i32 {
    (value * extent).clamp(-extent, 2.0 * extent) as i32
}

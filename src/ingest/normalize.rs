use anyhow::{anyhow, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PixelFormat {
    Rgb24,
    /// Packed YUV 4:2:2 (`Y0 U Y1 V`), the default format of most USB webcams.
    Yuyv,
}

impl PixelFormat {
    pub(crate) fn from_fourcc(fourcc: &[u8; 4]) -> Option<Self> {
        match fourcc {
            b"RGB3" => Some(PixelFormat::Rgb24),
            b"YUYV" => Some(PixelFormat::Yuyv),
            _ => None,
        }
    }
}

pub(crate) fn normalize_to_rgb(
    pixels: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<Vec<u8>> {
    match format {
        PixelFormat::Rgb24 => {
            let expected = plane_len(width, height, 3)?;
            if pixels.len() < expected {
                return Err(anyhow!(
                    "RGB frame length mismatch: expected {}, got {}",
                    expected,
                    pixels.len()
                ));
            }
            Ok(pixels[..expected].to_vec())
        }
        PixelFormat::Yuyv => yuyv_to_rgb(pixels, width, height),
    }
}

fn plane_len(width: u32, height: u32, bytes_per_pixel: usize) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(bytes_per_pixel))
        .ok_or_else(|| anyhow!("frame dimensions overflow"))
}

fn yuyv_to_rgb(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    if width % 2 != 0 {
        return Err(anyhow!("YUYV frames need an even width, got {}", width));
    }
    let expected = plane_len(width, height, 2)?;
    if pixels.len() < expected {
        return Err(anyhow!(
            "YUYV frame length mismatch: expected {}, got {}",
            expected,
            pixels.len()
        ));
    }

    let mut rgb = Vec::with_capacity(plane_len(width, height, 3)?);
    for chunk in pixels[..expected].chunks_exact(4) {
        let u = chunk[1] as f32 - 128.0;
        let v = chunk[3] as f32 - 128.0;
        for y in [chunk[0], chunk[2]] {
            let y = y as f32;
            rgb.push(clamp_to_u8(y + 1.402_f32 * v));
            rgb.push(clamp_to_u8(y - 0.344_136_f32 * u - 0.714_136_f32 * v));
            rgb.push(clamp_to_u8(y + 1.772_f32 * u));
        }
    }
    Ok(rgb)
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

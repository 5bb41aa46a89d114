//! Presentation of classified frames.
//!
//! `Overlay` describes what goes on top of a frame (zone, per-person boxes and
//! labels, the intrusion banner). Presenters consume it; nothing flows back into
//! the session.

use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use anyhow::{anyhow, Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};

use crate::classify::{DisplayLabel, FrameVerdict};
use crate::detect::BoundingBox;
use crate::frame::Frame;
use crate::zone::Rect;

pub const ZONE_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
pub const INTRUDER_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const AUTHORIZED_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

pub const BANNER_TEXT: &str = "Intrusion Detected!";
pub const BANNER_ORIGIN: (i32, i32) = (10, 40);

const LINE_THICKNESS: i32 = 2;
const LABEL_OFFSET: i32 = 10;
const LABEL_SCALE: f32 = 18.0;
const BANNER_SCALE: f32 = 30.0;

#[derive(Clone, Debug, PartialEq)]
pub struct OverlayBox {
    pub bbox: BoundingBox,
    pub label: DisplayLabel,
}

impl OverlayBox {
    pub fn color(&self) -> Rgb<u8> {
        match self.label {
            DisplayLabel::Intruder => INTRUDER_COLOR,
            DisplayLabel::Authorized => AUTHORIZED_COLOR,
        }
    }
}

/// Annotations for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Overlay {
    pub frame_index: u64,
    pub zone: Rect,
    pub boxes: Vec<OverlayBox>,
    /// Only set on the frame that triggered the alert.
    pub banner: bool,
}

impl Overlay {
    pub fn build(frame_index: u64, zone: Rect, verdict: &FrameVerdict, banner: bool) -> Self {
        Self {
            frame_index,
            zone,
            boxes: verdict
                .classified
                .iter()
                .map(|c| OverlayBox {
                    bbox: c.detection.bbox,
                    label: c.label,
                })
                .collect(),
            banner,
        }
    }

    pub fn intruder_count(&self) -> usize {
        self.boxes
            .iter()
            .filter(|b| b.label == DisplayLabel::Intruder)
            .count()
    }
}

/// Draw `overlay` onto `image`. Text needs a font; without one only rectangles are drawn.
pub fn annotate(image: &mut RgbImage, overlay: &Overlay, font: Option<&FontVec>) {
    let zone = &overlay.zone;
    draw_rect(image, zone.left, zone.top, zone.right, zone.bottom, ZONE_COLOR);

    for b in &overlay.boxes {
        let color = b.color();
        draw_rect(image, b.bbox.x0, b.bbox.y0, b.bbox.x1, b.bbox.y1, color);
        if let Some(font) = font {
            let y = b
                .bbox
                .y0
                .saturating_sub(LABEL_OFFSET)
                .saturating_sub(LABEL_SCALE as i32);
            draw_text_mut(
                image,
                color,
                b.bbox.x0,
                y,
                PxScale::from(LABEL_SCALE),
                font,
                b.label.as_str(),
            );
        }
    }

    if overlay.banner {
        if let Some(font) = font {
            let (x, y) = BANNER_ORIGIN;
            draw_text_mut(
                image,
                INTRUDER_COLOR,
                x,
                y - BANNER_SCALE as i32,
                PxScale::from(BANNER_SCALE),
                font,
                BANNER_TEXT,
            );
        }
    }
}

/// Hollow rectangle of `LINE_THICKNESS` px. Edges beyond the canvas are clipped
/// to just outside it, so arbitrarily large boxes stay cheap to draw.
fn draw_rect(image: &mut RgbImage, x0: i32, y0: i32, x1: i32, y1: i32, color: Rgb<u8>) {
    let margin = LINE_THICKNESS as i64;
    let (w, h) = (image.width() as i64, image.height() as i64);
    let clip_x = |v: i32| (v as i64).clamp(-margin, w + margin);
    let clip_y = |v: i32| (v as i64).clamp(-margin, h + margin);
    let (x0, x1, y0, y1) = (clip_x(x0), clip_x(x1), clip_y(y0), clip_y(y1));

    for inset in 0..margin {
        let width = x1 - x0 - 2 * inset;
        let height = y1 - y0 - 2 * inset;
        if width <= 0 || height <= 0 {
            return;
        }
        let rect = imageproc::rect::Rect::at((x0 + inset) as i32, (y0 + inset) as i32)
            .of_size(width as u32, height as u32);
        draw_hollow_rect_mut(image, rect, color);
    }
}

/// Display sink for classified frames.
pub trait Presenter {
    fn present(&mut self, frame: &Frame, overlay: &Overlay) -> Result<()>;
}

impl<P: Presenter + ?Sized> Presenter for Box<P> {
    fn present(&mut self, frame: &Frame, overlay: &Overlay) -> Result<()> {
        (**self).present(frame, overlay)
    }
}

/// Logs what each frame shows.
#[derive(Default)]
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn present(&mut self, frame: &Frame, overlay: &Overlay) -> Result<()> {
        if overlay.banner {
            log::info!(
                "frame {}: {} ({} intruder(s))",
                frame.index,
                BANNER_TEXT,
                overlay.intruder_count()
            );
        } else {
            log::debug!(
                "frame {}: {} person(s), {} in zone",
                frame.index,
                overlay.boxes.len(),
                overlay.intruder_count()
            );
        }
        Ok(())
    }
}

/// Writes annotated JPEG snapshots, for the alert frame only or for every frame.
pub struct SnapshotPresenter {
    dir: PathBuf,
    all_frames: bool,
    font: Option<FontVec>,
}

impl SnapshotPresenter {
    pub fn new<P: AsRef<Path>>(dir: P, all_frames: bool) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create snapshot directory {}", dir.display()))?;
        Ok(Self {
            dir,
            all_frames,
            font: None,
        })
    }

    /// Load a TTF/OTF font for labels and the banner.
    pub fn with_font<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read font {}", path.display()))?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| anyhow!("invalid font {}: {}", path.display(), e))?;
        self.font = Some(font);
        Ok(self)
    }

    fn snapshot_path(&self, overlay: &Overlay) -> PathBuf {
        let kind = if overlay.banner { "intrusion" } else { "frame" };
        self.dir
            .join(format!("{}_{:06}.jpg", kind, overlay.frame_index))
    }
}

impl Presenter for SnapshotPresenter {
    fn present(&mut self, frame: &Frame, overlay: &Overlay) -> Result<()> {
        if !overlay.banner && !self.all_frames {
            return Ok(());
        }
        let mut image = frame.to_image()?;
        annotate(&mut image, overlay, self.font.as_ref());
        let path = self.snapshot_path(overlay);
        image
            .save(&path)
            .with_context(|| format!("failed to write snapshot {}", path.display()))?;
        log::debug!("snapshot written to {}", path.display());
        Ok(())
    }
}

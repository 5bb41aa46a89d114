use anyhow::Result;

use crate::detect::result::Detection;
use crate::frame::Frame;

/// Person detector backend.
///
/// One forward pass per call. Implementations must not retry; a failed call
/// is reported by the session loop and the frame is treated as empty.
pub trait DetectorBackend {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame. Boxes are in pixel coordinates of `frame`.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<B: DetectorBackend + ?Sized> DetectorBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        (**self).detect(frame)
    }

    fn warm_up(&mut self) -> Result<()> {
        (**self).warm_up()
    }
}

use std::collections::HashMap;

use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;
use crate::frame::Frame;

/// Scripted backend for tests and the demo. Returns preset detections keyed by frame index.
#[derive(Default)]
pub struct StubBackend {
    script: HashMap<u64, Vec<Detection>>,
    calls: u64,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Detections returned for the frame with `index`. Frames without an entry yield none.
    pub fn on_frame(mut self, index: u64, detections: Vec<Detection>) -> Self {
        self.script.insert(index, detections);
        self
    }

    /// Number of `detect` calls so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        self.calls += 1;
        Ok(self.script.get(&frame.index).cloned().unwrap_or_default())
    }
}

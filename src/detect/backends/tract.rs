#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;
use crate::detect::ssd::{blob_from_frame, decode_detections, SSD_INPUT_SIZE};
use crate::frame::Frame;

/// Tract-based backend for an ONNX export of MobileNet-SSD.
///
/// The model must take a `1x3x300x300` f32 input and produce the `1x1xNx7` detection tensor.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>>,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let model_path = model_path.as_ref();
        let side = SSD_INPUT_SIZE as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, side, side)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self { model })
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let side = SSD_INPUT_SIZE as usize;
        let blob = blob_from_frame(frame)?;
        let input = tract_ndarray::Array4::from_shape_vec((1, 3, side, side), blob)
            .context("failed to shape SSD input blob")?
            .into_tensor();

        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let flat: Vec<f32> = view.iter().copied().collect();

        decode_detections(&flat, frame.width, frame.height)
    }
}

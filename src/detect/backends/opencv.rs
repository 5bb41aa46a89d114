#![cfg(feature = "backend-opencv")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use opencv::core::{Mat, Scalar};
use opencv::dnn;
use opencv::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;
use crate::detect::ssd::{blob_from_frame, decode_detections, SSD_INPUT_SIZE};
use crate::frame::Frame;

/// OpenCV DNN backend for the Caffe release of MobileNet-SSD.
///
/// Needs the network topology (`.prototxt`) and the trained weights (`.caffemodel`).
pub struct OpencvBackend {
    net: dnn::Net,
}

impl OpencvBackend {
    pub fn new<P: AsRef<Path>, W: AsRef<Path>>(prototxt: P, weights: W) -> Result<Self> {
        let prototxt = path_str(prototxt.as_ref())?;
        let weights = path_str(weights.as_ref())?;
        let mut net = dnn::read_net_from_caffe(prototxt, weights)
            .with_context(|| format!("failed to load Caffe model {} / {}", prototxt, weights))?;
        net.set_preferable_backend(dnn::DNN_BACKEND_OPENCV)
            .context("failed to select OpenCV DNN backend")?;
        net.set_preferable_target(dnn::DNN_TARGET_CPU)
            .context("failed to select CPU target")?;
        Ok(Self { net })
    }
}

impl DetectorBackend for OpencvBackend {
    fn name(&self) -> &'static str {
        "opencv"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let side = SSD_INPUT_SIZE as i32;
        let blob = blob_from_frame(frame)?;
        let input = Mat::from_slice(&blob)
            .context("wrap SSD input blob")?
            .reshape_nd(1, &[1, 3, side, side])
            .context("reshape SSD input blob")?
            .try_clone()
            .context("copy SSD input blob")?;

        self.net
            .set_input(&input, "", 1.0, Scalar::default())
            .context("set network input")?;
        let output = self.net.forward_single("").context("DNN forward pass failed")?;
        let flat = output
            .data_typed::<f32>()
            .context("network output was not a continuous f32 tensor")?;

        decode_detections(flat, frame.width, frame.height)
    }
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| anyhow!("model path {} is not valid UTF-8", path.display()))
}

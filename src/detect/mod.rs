//! Person detection.
//!
//! `DetectorBackend` is the boundary to the inference engine. Backends share the
//! MobileNet-SSD input/output handling in `ssd` and return plain `Detection`s;
//! classification happens elsewhere.

mod backend;
mod backends;
mod result;
pub mod ssd;

use std::path::Path;

use anyhow::{anyhow, Result};

pub use backend::DetectorBackend;
#[cfg(feature = "backend-opencv")]
pub use backends::OpencvBackend;
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use result::{label_for_class, BoundingBox, Detection, PERSON_LABEL, VOC_LABELS};

use crate::config::{BackendKind, DetectorSettings};

/// Construct the configured backend.
///
/// Missing model artifacts and construction failures are startup errors; the
/// session must not start without a working detector.
pub fn load_backend(settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    let mut backend: Box<dyn DetectorBackend> = match settings.backend {
        BackendKind::Opencv => {
            ensure_artifacts(&[&settings.prototxt, &settings.caffemodel])?;
            open_opencv(settings)?
        }
        BackendKind::Tract => {
            ensure_artifacts(&[&settings.onnx])?;
            open_tract(settings)?
        }
        BackendKind::Stub => Box::new(StubBackend::new()),
    };
    backend.warm_up()?;
    log::info!("detector backend '{}' ready", backend.name());
    Ok(backend)
}

fn ensure_artifacts(paths: &[&Path]) -> Result<()> {
    let missing: Vec<String> = paths
        .iter()
        .filter(|path| !path.is_file())
        .map(|path| path.display().to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(anyhow!(
            "model files not found: {} (place the detector artifacts at the configured paths)",
            missing.join(", ")
        ))
    }
}

#[cfg(feature = "backend-opencv")]
fn open_opencv(settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    Ok(Box::new(OpencvBackend::new(
        &settings.prototxt,
        &settings.caffemodel,
    )?))
}

#[cfg(not(feature = "backend-opencv"))]
fn open_opencv(_settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    Err(anyhow!(
        "the opencv detector backend requires the backend-opencv feature"
    ))
}

#[cfg(feature = "backend-tract")]
fn open_tract(settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    Ok(Box::new(TractBackend::new(&settings.onnx)?))
}

#[cfg(not(feature = "backend-tract"))]
fn open_tract(_settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    Err(anyhow!(
        "the tract detector backend requires the backend-tract feature"
    ))
}

//! Intrusion classification: which detected people stand inside the restricted zone.

use serde::Serialize;

use crate::detect::{Detection, PERSON_LABEL};
use crate::zone::Rect;

/// Detections must score strictly above this to be considered.
pub const CONFIDENCE_THRESHOLD: f32 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DisplayLabel {
    Intruder,
    Authorized,
}

impl DisplayLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayLabel::Intruder => "Intruder",
            DisplayLabel::Authorized => "Authorized",
        }
    }
}

impl std::fmt::Display for DisplayLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A person detection that passed the threshold and class filter.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassifiedDetection {
    pub detection: Detection,
    pub center: (i32, i32),
    pub in_zone: bool,
    pub label: DisplayLabel,
}

/// Classification of one frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct FrameVerdict {
    pub classified: Vec<ClassifiedDetection>,
    /// True when at least one person center is inside the zone.
    pub intrusion: bool,
}

impl FrameVerdict {
    pub fn intruders(&self) -> impl Iterator<Item = &ClassifiedDetection> {
        self.classified.iter().filter(|c| c.in_zone)
    }
}

/// Classify the detections of one frame against `zone`.
pub fn classify(detections: &[Detection], zone: &Rect) -> FrameVerdict {
    let classified: Vec<ClassifiedDetection> = detections
        .iter()
        .filter(|d| d.confidence > CONFIDENCE_THRESHOLD)
        .filter(|d| d.class_label == PERSON_LABEL)
        .map(|d| {
            let center = d.bbox.center();
            let in_zone = zone.contains(center.0, center.1);
            ClassifiedDetection {
                detection: d.clone(),
                center,
                in_zone,
                label: if in_zone {
                    DisplayLabel::Intruder
                } else {
                    DisplayLabel::Authorized
                },
            }
        })
        .collect();

    let intrusion = classified.iter().any(|c| c.in_zone);
    FrameVerdict {
        classified,
        intrusion,
    }
}

use serde::Serialize;

/// Class label that can trigger an intrusion.
pub const PERSON_LABEL: &str = "person";

/// Label table of the pretrained MobileNet-SSD (PASCAL VOC, index 0 is background).
pub const VOC_LABELS: [&str; 21] = [
    "background",
    "aeroplane",
    "bicycle",
    "bird",
    "boat",
    "bottle",
    "bus",
    "car",
    "cat",
    "chair",
    "cow",
    "diningtable",
    "dog",
    "horse",
    "motorbike",
    "person",
    "pottedplant",
    "sheep",
    "sofa",
    "train",
    "tvmonitor",
];

/// Look up a class index in the label table.
pub fn label_for_class(class_id: usize) -> Option<&'static str> {
    VOC_LABELS.get(class_id).copied()
}

/// Bounding box in integer pixel coordinates of the classified frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl BoundingBox {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Integer midpoint, truncating toward zero.
    pub fn center(&self) -> (i32, i32) {
        (midpoint(self.x0, self.x1), midpoint(self.y0, self.y1))
    }
}

fn midpoint(a: i32, b: i32) -> i32 {
    ((a as i64 + b as i64) / 2) as i32
}

/// Raw detector output for one object in one frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Detection {
    pub class_label: String,
    /// Score in 0..=1.
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(class_label: &str, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            class_label: class_label.to_string(),
            confidence,
            bbox,
        }
    }

    pub fn person(confidence: f32, bbox: BoundingBox) -> Self {
        Self::new(PERSON_LABEL, confidence, bbox)
    }
}

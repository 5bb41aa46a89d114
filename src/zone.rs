//! Restricted-zone geometry.

use serde::Serialize;

/// Fraction of the frame width covered by the restricted zone, measured from the right edge.
pub const ZONE_WIDTH_FRACTION: f64 = 0.60;

/// Axis-aligned rectangle in pixel coordinates. All four edges are inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.left <= x && x <= self.right && self.top <= y && y <= self.bottom
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

/// Restricted zone for a `width`x`height` frame: the right-most 60% of the frame, full height.
///
/// Recompute whenever the frame size may have changed.
pub fn compute_zone(width: u32, height: u32) -> Rect {
    let zone_width = (ZONE_WIDTH_FRACTION * width as f64).floor() as i32;
    let width = width as i32;
    Rect {
        left: width - zone_width,
        top: 0,
        right: width,
        bottom: height as i32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_for_vga_frame() {
        let zone = compute_zone(640, 480);
        assert_eq!(
            zone,
            Rect {
                left: 256,
                top: 0,
                right: 640,
                bottom: 480
            }
        );
        assert_eq!(zone.width(), 384);
        assert_eq!(zone.height(), 480);
    }

    #[test]
    fn zone_spans_right_edge_for_any_size() {
        for (w, h) in [(1, 1), (3, 7), (299, 300), (640, 480), (1920, 1080), (1001, 17)] {
            let zone = compute_zone(w, h);
            let expected_left = w as i32 - (0.60 * w as f64).floor() as i32;
            assert_eq!(zone.right, w as i32, "right edge for {}x{}", w, h);
            assert_eq!(zone.top, 0);
            assert_eq!(zone.bottom, h as i32);
            assert_eq!(zone.left, expected_left, "left edge for {}x{}", w, h);
        }
    }

    #[test]
    fn zero_sized_frame_yields_degenerate_zone() {
        let zone = compute_zone(0, 0);
        assert_eq!(zone.left, 0);
        assert_eq!(zone.right, 0);
        assert!(zone.contains(0, 0));
    }

    #[test]
    fn contains_is_inclusive() {
        let zone = compute_zone(640, 480);
        assert!(zone.contains(256, 0));
        assert!(zone.contains(640, 480));
        assert!(!zone.contains(255, 240));
        assert!(!zone.contains(641, 240));
        assert!(!zone.contains(300, -1));
        assert!(!zone.contains(300, 481));
    }
}

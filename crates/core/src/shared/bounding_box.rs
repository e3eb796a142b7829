use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle `(x1, y1)`–`(x2, y2)` in frame pixel coordinates.
///
/// Invariant: `x1 <= x2` and `y1 <= y2`, all coordinates finite. Use
/// [`BoundingBox::new`] for untrusted input; `from_corners` skips the check.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl BoundingBox {
    /// Validating constructor: `None` for inverted or non-finite corners.
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Option<Self> {
        let finite = [x1, y1, x2, y2].iter().all(|v| v.is_finite());
        if finite && x1 <= x2 && y1 <= y2 {
            Some(Self { x1, y1, x2, y2 })
        } else {
            None
        }
    }

    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        debug_assert!(x1 <= x2 && y1 <= y2, "corners must be ordered");
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    /// Clamps to `[0, width) x [0, height)` and rounds to whole pixels.
    ///
    /// Returns `None` when nothing of the box is visible.
    pub fn to_pixel_rect(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        if width == 0 || height == 0 {
            return None;
        }
        let max_x = (width - 1) as f64;
        let max_y = (height - 1) as f64;
        if self.x2 < 0.0 || self.y2 < 0.0 || self.x1 > max_x || self.y1 > max_y {
            return None;
        }
        let x1 = self.x1.clamp(0.0, max_x).round() as u32;
        let y1 = self.y1.clamp(0.0, max_y).round() as u32;
        let x2 = self.x2.clamp(0.0, max_x).round() as u32;
        let y2 = self.y2.clamp(0.0, max_y).round() as u32;
        Some((x1, y1, x2, y2))
    }
}

/// True iff the top-left corner of `inner` lies inside `outer`, edges inclusive.
///
/// An anchor-point test, not full-box containment: an item whose anchor
/// is inside a person's box counts as held even if the rest of it sticks
/// out.
pub fn contains(outer: &BoundingBox, inner: &BoundingBox) -> bool {
    (outer.x1..=outer.x2).contains(&inner.x1) && (outer.y1..=outer.y2).contains(&inner.y1)
}

/// Intersection over union, in `[0, 1]`. Disjoint, edge-touching and
/// zero-area pairs give 0.
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let ix1 = a.x1.max(b.x1);
    let iy1 = a.y1.max(b.y1);
    let ix2 = a.x2.min(b.x2);
    let iy2 = a.y2.min(b.y2);

    let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }

    let union = a.area() + b.area() - inter;
    if union <= 0.0 {
        return 0.0;
    }
    (inter / union).clamp(0.0, 1.0)
}

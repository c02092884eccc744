use std::fmt::{Display, Formatter};

use geo_types::{coord, Polygon, Rect};

use crate::geo_transform::Transform;

/// Rectangular extent `(left, bottom, right, top)` in CRS units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl Bounds {
    pub fn new(left: f64, bottom: f64, right: f64, top: f64) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }

    /// Extent covered by `width` x `height` pixels under `transform`.
    pub fn from_transform(transform: &Transform, width: usize, height: usize) -> Self {
        let (w, h) = (width as f64, height as f64);
        let corners = [
            transform.apply(0.0, 0.0),
            transform.apply(w, 0.0),
            transform.apply(0.0, h),
            transform.apply(w, h),
        ];
        let mut bounds = Self::new(f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for (x, y) in corners {
            bounds.left = bounds.left.min(x);
            bounds.right = bounds.right.max(x);
            bounds.bottom = bounds.bottom.min(y);
            bounds.top = bounds.top.max(y);
        }
        bounds
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Overlapping extent, `None` when the rectangles are disjoint.
    ///
    /// Rectangles that merely touch yield a degenerate extent with zero area.
    pub fn intersection(&self, other: &Bounds) -> Option<Bounds> {
        let inter = Bounds::new(
            self.left.max(other.left),
            self.bottom.max(other.bottom),
            self.right.min(other.right),
            self.top.min(other.top),
        );
        if inter.left > inter.right || inter.bottom > inter.top {
            return None;
        }
        Some(inter)
    }

    pub fn to_tuple(&self) -> (f64, f64, f64, f64) {
        (self.left, self.bottom, self.right, self.top)
    }

    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.left, y: self.bottom },
            coord! { x: self.right, y: self.top },
        )
    }

    pub fn to_polygon(&self) -> Polygon<f64> {
        self.to_rect().to_polygon()
    }
}

impl From<(f64, f64, f64, f64)> for Bounds {
    fn from(v: (f64, f64, f64, f64)) -> Self {
        Bounds::new(v.0, v.1, v.2, v.3)
    }
}

impl From<[f64; 4]> for Bounds {
    fn from(v: [f64; 4]) -> Self {
        Bounds::new(v[0], v[1], v[2], v[3])
    }
}

impl From<Rect<f64>> for Bounds {
    fn from(rect: Rect<f64>) -> Self {
        Bounds::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

impl Display for Bounds {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "BoundingBox(left={}, bottom={}, right={}, top={})",
            self.left, self.bottom, self.right, self.top
        )
    }
}

use gdal::{GeoTransform, GeoTransformEx};

use crate::bounds::Bounds;
use crate::errors::{Error, Result};

/// An affine transform mapping pixel `(col, row)` to projected `(x, y)`.
///
/// Coefficients are stored in the usual matrix order:
///
/// ```text
/// | a b c |     x = a * col + b * row + c
/// | d e f |     y = d * col + e * row + f
/// | 0 0 1 |
/// ```
///
/// `a` is the pixel width, `e` the (usually negative) pixel height, and
/// `(c, f)` the upper-left corner of the upper-left pixel.
///
/// GDAL orders the same six numbers differently; see [`Transform::to_gdal`].
///
/// # Example
///
/// ```rust
/// use georaster::Transform;
/// let transform = Transform::from_tuple(&[30.0, 0.0, 478000.0, 0.0, -30.0, 3108140.0]).unwrap();
/// assert_eq!(transform.apply(1.0, 1.0), (478030.0, 3108110.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

/// A transform as accepted by [`Raster::from_array`](crate::Raster::from_array).
#[derive(Debug, Clone, PartialEq)]
pub enum TransformSpec {
    Affine(Transform),
    /// `(a, b, c, d, e, f)`; anything but six values is rejected.
    Tuple(Vec<f64>),
}

impl From<Transform> for TransformSpec {
    fn from(value: Transform) -> Self {
        TransformSpec::Affine(value)
    }
}

impl From<[f64; 6]> for TransformSpec {
    fn from(value: [f64; 6]) -> Self {
        TransformSpec::Tuple(value.to_vec())
    }
}

impl From<Vec<f64>> for TransformSpec {
    fn from(value: Vec<f64>) -> Self {
        TransformSpec::Tuple(value)
    }
}

impl From<&[f64]> for TransformSpec {
    fn from(value: &[f64]) -> Self {
        TransformSpec::Tuple(value.to_vec())
    }
}

impl From<(f64, f64, f64, f64, f64, f64)> for TransformSpec {
    fn from(v: (f64, f64, f64, f64, f64, f64)) -> Self {
        TransformSpec::Tuple(vec![v.0, v.1, v.2, v.3, v.4, v.5])
    }
}

impl TryFrom<TransformSpec> for Transform {
    type Error = Error;

    fn try_from(value: TransformSpec) -> Result<Self> {
        match value {
            TransformSpec::Affine(transform) => Ok(transform),
            TransformSpec::Tuple(coefficients) => Transform::from_tuple(&coefficients),
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0)
    }

    pub fn from_tuple(coefficients: &[f64]) -> Result<Self> {
        match coefficients {
            &[a, b, c, d, e, f] => Ok(Self::new(a, b, c, d, e, f)),
            _ => Err(Error::BadArgument(format!(
                "transform needs to be an affine transform or 6 coefficients, got {} values",
                coefficients.len()
            ))),
        }
    }

    /// Convert from GDAL's `[c, a, b, f, d, e]` ordering.
    pub fn from_gdal(gt: &GeoTransform) -> Self {
        Self::new(gt[1], gt[2], gt[0], gt[4], gt[5], gt[3])
    }

    /// Convert to GDAL's `[c, a, b, f, d, e]` ordering.
    pub fn to_gdal(&self) -> GeoTransform {
        [self.c, self.a, self.b, self.f, self.d, self.e]
    }

    /// North-up transform fitting `width` x `height` pixels exactly into `bounds`.
    pub fn from_bounds(bounds: &Bounds, width: usize, height: usize) -> Self {
        Self::new(
            (bounds.right - bounds.left) / width as f64,
            0.0,
            bounds.left,
            0.0,
            (bounds.bottom - bounds.top) / height as f64,
            bounds.top,
        )
    }

    pub fn to_tuple(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }

    /// Apply to fractional pixel coordinates `(col, row)`.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        self.to_gdal().apply(col, row)
    }

    /// Wraps `GDALInvGeoTransform`; fails when the transform is singular.
    pub fn inverse(&self) -> Result<Self> {
        Ok(Self::from_gdal(&self.to_gdal().invert()?))
    }

    /// Move the origin by `(xoff, yoff)` in CRS units.
    pub fn translate(&self, xoff: f64, yoff: f64) -> Self {
        Self {
            c: self.c + xoff,
            f: self.f + yoff,
            ..*self
        }
    }

    /// Pixel size as `(x, y)`, both positive.
    pub fn resolution(&self) -> (f64, f64) {
        (
            (self.a * self.a + self.d * self.d).sqrt(),
            (self.b * self.b + self.e * self.e).sqrt(),
        )
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }
}

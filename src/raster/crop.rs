use std::path::PathBuf;
use std::str::FromStr;

use geo_types::Geometry;
use ndarray::s;

use crate::bounds::Bounds;
use crate::config::RasterConfig;
use crate::errors::{Error, Result};
use crate::geo_transform::Transform;
use crate::raster::warp::Resampling;
use crate::raster::{Raster, RasterArray};

/// Area to crop a raster to.
#[derive(Debug)]
pub enum CropRegion<'a> {
    /// The bounds of another raster.
    Raster(&'a Raster),
    Bounds(Bounds),
    /// Not supported yet.
    Geometry(Geometry<f64>),
}

impl<'a> From<&'a Raster> for CropRegion<'a> {
    fn from(raster: &'a Raster) -> Self {
        CropRegion::Raster(raster)
    }
}

impl From<Bounds> for CropRegion<'_> {
    fn from(bounds: Bounds) -> Self {
        CropRegion::Bounds(bounds)
    }
}

impl From<(f64, f64, f64, f64)> for CropRegion<'_> {
    fn from(bounds: (f64, f64, f64, f64)) -> Self {
        CropRegion::Bounds(bounds.into())
    }
}

impl From<Geometry<f64>> for CropRegion<'_> {
    fn from(geometry: Geometry<f64>) -> Self {
        CropRegion::Geometry(geometry)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CropMode {
    /// Keep the pixel grid: every pixel touching the region is kept.
    #[default]
    MatchPixel,
    /// Fit the region exactly, resampling onto a new grid.
    MatchExtent,
}

impl FromStr for CropMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "match_pixel" => Ok(CropMode::MatchPixel),
            "match_extent" => Ok(CropMode::MatchExtent),
            _ => Err(Error::InvalidMode {
                what: "crop mode",
                value: s.to_string(),
                expected: "match_pixel, match_extent",
            }),
        }
    }
}

/// Raster to intersect with in [`Raster::intersection`].
#[derive(Debug)]
pub enum IntersectionTarget<'a> {
    Raster(&'a Raster),
    Path(PathBuf),
}

impl<'a> From<&'a Raster> for IntersectionTarget<'a> {
    fn from(raster: &'a Raster) -> Self {
        IntersectionTarget::Raster(raster)
    }
}

impl From<PathBuf> for IntersectionTarget<'_> {
    fn from(path: PathBuf) -> Self {
        IntersectionTarget::Path(path)
    }
}

// Fractional pixel positions this close to an integer are snapped to it.
const GRID_SNAP: f64 = 1e-6;

fn snap(v: f64) -> f64 {
    let r = v.round();
    if (v - r).abs() < GRID_SNAP {
        r
    } else {
        v
    }
}

/// Pixel window `(col0, row0, col1, row1)` of every pixel touching `bounds`,
/// clipped to the raster.
fn touched_window(
    transform: &Transform,
    bounds: &Bounds,
    width: usize,
    height: usize,
) -> Result<(usize, usize, usize, usize)> {
    let inverse = transform.inverse()?;
    let corners = [
        inverse.apply(bounds.left, bounds.top),
        inverse.apply(bounds.right, bounds.top),
        inverse.apply(bounds.left, bounds.bottom),
        inverse.apply(bounds.right, bounds.bottom),
    ];
    let (mut col0, mut row0) = (f64::INFINITY, f64::INFINITY);
    let (mut col1, mut row1) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for (col, row) in corners {
        col0 = col0.min(snap(col).floor());
        row0 = row0.min(snap(row).floor());
        col1 = col1.max(snap(col).ceil());
        row1 = row1.max(snap(row).ceil());
    }
    let clip = |v: f64, max: usize| v.max(0.0).min(max as f64) as usize;
    let window = (
        clip(col0, width),
        clip(row0, height),
        clip(col1, width),
        clip(row1, height),
    );
    if window.0 >= window.2 || window.1 >= window.3 {
        return Err(Error::BadArgument(
            "Input shapes do not overlap raster".to_string(),
        ));
    }
    Ok(window)
}

impl Raster {
    /// Crop to a region.
    ///
    /// ```rust, no_run
    /// use georaster::{CropMode, Raster};
    ///
    /// let mut dem = Raster::open("dem.tif")?;
    /// let reference = Raster::open("reference.tif")?;
    /// dem.crop(&reference, CropMode::MatchPixel)?;
    /// # Ok::<(), georaster::errors::Error>(())
    /// ```
    pub fn crop<'a, R: Into<CropRegion<'a>>>(&mut self, region: R, mode: CropMode) -> Result<()> {
        let bounds = match region.into() {
            CropRegion::Raster(raster) => raster.bounds(),
            CropRegion::Bounds(bounds) => bounds,
            CropRegion::Geometry(_) => return Err(Error::NotImplemented("cropping to a geometry")),
        };
        let mut profile = self.profile()?;

        let array = match mode {
            CropMode::MatchPixel => {
                let (col0, row0, col1, row1) =
                    touched_window(&profile.transform, &bounds, profile.width, profile.height)?;
                let (x, y) = profile.transform.apply(col0 as f64, row0 as f64);
                profile.transform = Transform {
                    c: x,
                    f: y,
                    ..profile.transform
                };
                profile.width = col1 - col0;
                profile.height = row1 - row0;

                let current = self.current_array()?;
                let data = current.data().slice(s![.., row0..row1, col0..col1]).to_owned();
                match current.mask() {
                    Some(mask) => RasterArray::masked(
                        data,
                        mask.slice(s![.., row0..row1, col0..col1]).to_owned(),
                    )?,
                    None => RasterArray::new(data),
                }
            }
            CropMode::MatchExtent => {
                let (xres, yres) = profile.transform.resolution();
                profile.width = (bounds.width() / xres) as usize;
                profile.height = (bounds.height() / yres) as usize;
                if profile.width == 0 || profile.height == 0 {
                    return Err(Error::BadArgument(format!(
                        "{bounds} is smaller than one pixel"
                    )));
                }
                profile.transform = Transform::from_bounds(&bounds, profile.width, profile.height);
                self.warp_to(&profile, Resampling::Nearest)?
            }
        };
        self.update(Some(array), Some(profile))
    }

    /// Overlap of this raster's bounds with another raster's.
    ///
    /// Returns `None`, with a warning, when the overlap has zero area.
    /// Rasters in different CRSs are not supported.
    pub fn intersection<'a, T: Into<IntersectionTarget<'a>>>(
        &self,
        other: T,
    ) -> Result<Option<Bounds>> {
        let opened;
        let other = match other.into() {
            IntersectionTarget::Raster(raster) => raster,
            IntersectionTarget::Path(path) => {
                opened = Raster::open_with(&path, &RasterConfig::default().with_load_data(false))?;
                &opened
            }
        };
        if self.crs() != other.crs() {
            return Err(Error::NotImplemented(
                "intersection of rasters in different CRSs",
            ));
        }
        match self.bounds().intersection(&other.bounds()) {
            Some(bounds) if bounds.area() > 0.0 => Ok(Some(bounds)),
            _ => {
                log::warn!("Intersection is void");
                Ok(None)
            }
        }
    }
}

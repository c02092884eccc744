//! Geo-referenced rasters on top of [GDAL](http://gdal.org/).
//!
//! A [`Raster`] pairs a GDAL dataset with its pixels as an `ndarray` array
//! and the spatial metadata needed to work with them: CRS, affine transform,
//! bounds and nodata. It can be cropped, reprojected, shifted, sampled and
//! saved; decoding, projection math and warping are left to GDAL.
//!
//! ## Use
//!
//! ```rust, no_run
//! use georaster::{CropMode, Raster, ReprojectOptions, SampleOptions};
//!
//! let mut dem = Raster::open("dem.tif")?;
//! println!("{}", dem.info(true)?);
//!
//! dem.crop((478000.0, 3088490.0, 481190.0, 3108140.0), CropMode::MatchPixel)?;
//! let wgs84 = dem.reproject(&ReprojectOptions::to_crs(4326))?;
//!
//! let (x, y) = dem.ij2xy(10, 10, "center".parse()?);
//! let value = dem.value_at_coords(x, y, &SampleOptions::default().with_window(3))?;
//! # Ok::<(), georaster::errors::Error>(())
//! ```

#![crate_name = "georaster"]
#![crate_type = "lib"]
#![warn(clippy::unwrap_used)]

mod bounds;
pub mod config;
mod crs;
pub mod errors;
mod geo_transform;
pub mod interpolate;
pub mod raster;
pub mod satimg;
mod utils;

pub use bounds::Bounds;
pub use crs::{Crs, CrsSpec};
pub use geo_transform::{Transform, TransformSpec};
pub use interpolate::InterpMode;
pub use raster::{
    CropMode, CropRegion, DataType, DatasetAttrs, DiskState, DtypeSpec, Gcp, IntersectionTarget,
    LoadState, NodataSpec, PixelCoords, PixelOffset, Profile, Raster, RasterArray, RasterAttrs,
    RasterData, RasterSource, ReferenceGrid, ReprojectOptions, Resampling, Sample,
    SampleOptions, SampleResult, SaveOptions, Statistics,
};

#[cfg(test)]
mod test_utils;

//! Geo-referenced rasters

mod array;
mod attrs;
mod crop;
mod dataset;
mod gcp;
mod handle;
mod sample;
mod stats;
mod types;
mod warp;

pub use array::{RasterArray, RasterData};
pub use attrs::{DatasetAttrs, MaskFlags, RasterAttrs};
pub use crop::{CropMode, CropRegion, IntersectionTarget};
pub use dataset::{DiskState, LoadState, NodataSpec, Raster, RasterSource};
pub use gcp::{Gcp, SaveOptions};
pub(crate) use handle::DatasetHandle;
pub use handle::Profile;
pub use sample::{PixelCoords, PixelOffset, Sample, SampleOptions, SampleResult};
pub use stats::Statistics;
pub use types::{DataType, DtypeSpec, GDALDataType, Pixel};
pub use warp::{ReferenceGrid, ReprojectOptions, Resampling};

#[cfg(test)]
mod tests;

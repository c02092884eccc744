use bitflags::bitflags;

use crate::bounds::Bounds;
use crate::crs::Crs;
use crate::errors::{Error, Result};
use crate::geo_transform::Transform;
use crate::raster::handle::DatasetHandle;
use crate::raster::DataType;

bitflags! {
    /// Dataset attributes projected onto a [`Raster`](crate::Raster).
    ///
    /// Every flag in [`DatasetAttrs::DEFAULT`] is always read; the remaining
    /// flags select optional extras which can be costly for some formats.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DatasetAttrs: u32 {
        const BOUNDS = 1 << 0;
        const COUNT = 1 << 1;
        const CRS = 1 << 2;
        const DATASET_MASK = 1 << 3;
        const DRIVER = 1 << 4;
        const DTYPES = 1 << 5;
        const HEIGHT = 1 << 6;
        const INDEXES = 1 << 7;
        const NAME = 1 << 8;
        const NODATA = 1 << 9;
        const RES = 1 << 10;
        const SHAPE = 1 << 11;
        const TRANSFORM = 1 << 12;
        const WIDTH = 1 << 13;

        /// Default-domain metadata.
        const TAGS = 1 << 16;
        /// Natural block size of each band.
        const BLOCK_SHAPES = 1 << 17;
        /// Band descriptions.
        const DESCRIPTIONS = 1 << 18;

        const DEFAULT = Self::BOUNDS.bits()
            | Self::COUNT.bits()
            | Self::CRS.bits()
            | Self::DATASET_MASK.bits()
            | Self::DRIVER.bits()
            | Self::DTYPES.bits()
            | Self::HEIGHT.bits()
            | Self::INDEXES.bits()
            | Self::NAME.bits()
            | Self::NODATA.bits()
            | Self::RES.bits()
            | Self::SHAPE.bits()
            | Self::TRANSFORM.bits()
            | Self::WIDTH.bits();
    }
}

impl Default for DatasetAttrs {
    fn default() -> Self {
        DatasetAttrs::DEFAULT
    }
}

impl DatasetAttrs {
    /// Parse lower-case attribute names such as `"bounds"` or `"block_shapes"`.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        names.iter().try_fold(DatasetAttrs::empty(), |acc, name| {
            let name = name.as_ref();
            DatasetAttrs::from_name(&name.to_ascii_uppercase())
                .filter(|flag| *flag != DatasetAttrs::DEFAULT)
                .map(|flag| acc | flag)
                .ok_or_else(|| Error::InvalidMode {
                    what: "dataset attribute",
                    value: name.to_string(),
                    expected: "bounds, count, crs, dataset_mask, driver, dtypes, height, \
                               indexes, name, nodata, res, shape, transform, width, tags, \
                               block_shapes, descriptions",
                })
        })
    }

    /// Lower-case names of the flags set, in declaration order.
    pub fn names(&self) -> Vec<String> {
        self.iter_names()
            .filter(|(_, flag)| *flag != DatasetAttrs::DEFAULT)
            .map(|(name, _)| name.to_ascii_lowercase())
            .collect()
    }
}

bitflags! {
    /// `GMF_*` flags describing how a band's validity mask is derived.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MaskFlags: i32 {
        const ALL_VALID = 0x01;
        const PER_DATASET = 0x02;
        const ALPHA = 0x04;
        const NODATA = 0x08;
    }
}

/// Attributes read from the dataset handle, refreshed after every rebuild.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterAttrs {
    pub bounds: Bounds,
    pub count: usize,
    pub crs: Option<Crs>,
    /// Mask flags of each band.
    pub mask_flags: Vec<MaskFlags>,
    pub driver: String,
    pub dtypes: Vec<DataType>,
    pub height: usize,
    /// 1-based band indexes.
    pub indexes: Vec<usize>,
    pub name: String,
    /// Nodata of band 1.
    pub nodata: Option<f64>,
    pub nodatavals: Vec<Option<f64>>,
    pub res: (f64, f64),
    /// `(height, width)`.
    pub shape: (usize, usize),
    pub transform: Transform,
    pub width: usize,

    pub tags: Option<Vec<(String, String)>>,
    /// `(rows, cols)` per band.
    pub block_shapes: Option<Vec<(usize, usize)>>,
    pub descriptions: Option<Vec<String>>,
}

impl RasterAttrs {
    pub(crate) fn read(handle: &DatasetHandle, attrs: DatasetAttrs) -> Result<Self> {
        let (width, height, count) = (handle.width(), handle.height(), handle.count());
        let transform = handle.transform();
        let indexes: Vec<usize> = (1..=count).collect();
        let nodatavals = handle.nodatavals()?;
        let mask_flags = indexes
            .iter()
            .map(|&b| handle.mask_flags(b).map(MaskFlags::from_bits_truncate))
            .collect::<Result<Vec<_>>>()?;

        let tags = attrs
            .contains(DatasetAttrs::TAGS)
            .then(|| handle.tags());
        let block_shapes = match attrs.contains(DatasetAttrs::BLOCK_SHAPES) {
            true => Some(
                indexes
                    .iter()
                    .map(|&b| handle.block_shape(b))
                    .collect::<Result<Vec<_>>>()?,
            ),
            false => None,
        };
        let descriptions = match attrs.contains(DatasetAttrs::DESCRIPTIONS) {
            true => Some(
                indexes
                    .iter()
                    .map(|&b| handle.description(b))
                    .collect::<Result<Vec<_>>>()?,
            ),
            false => None,
        };

        Ok(Self {
            bounds: Bounds::from_transform(&transform, width, height),
            count,
            crs: handle.crs(),
            mask_flags,
            driver: handle.driver(),
            dtypes: handle.dtypes()?,
            height,
            indexes,
            name: handle.name(),
            nodata: nodatavals.first().copied().flatten(),
            nodatavals,
            res: transform.resolution(),
            shape: (height, width),
            transform,
            width,
            tags,
            block_shapes,
            descriptions,
        })
    }
}

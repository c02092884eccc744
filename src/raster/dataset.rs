use std::borrow::Cow;
use std::fmt::{Debug, Display, Formatter};
use std::path::{Path, PathBuf};

use crate::bounds::Bounds;
use crate::config::RasterConfig;
use crate::crs::{Crs, CrsSpec};
use crate::errors::{Error, Result};
use crate::geo_transform::{Transform, TransformSpec};
use crate::raster::attrs::RasterAttrs;
use crate::raster::handle::{DatasetHandle, Profile};
use crate::raster::stats::Statistics;
use crate::raster::{DataType, DtypeSpec, RasterArray, RasterData};

/// Where the pixels of a [`Raster`] originally came from.
#[derive(Debug, Clone, PartialEq)]
pub enum RasterSource {
    /// Absolute path of the file on disk.
    Path(PathBuf),
    Buffer,
    Array,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    MetadataOnly,
    Loaded(RasterArray),
}

/// Relationship between the in-memory raster and a file on disk.
///
/// Once `Diverged`, a raster never returns to `Matches`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskState {
    Detached,
    Matches,
    Diverged,
}

/// Nodata request for [`Raster::set_ndv`].
#[derive(Debug, Clone, PartialEq)]
pub enum NodataSpec {
    Scalar(f64),
    PerBand(Vec<f64>),
}

impl From<f64> for NodataSpec {
    fn from(value: f64) -> Self {
        NodataSpec::Scalar(value)
    }
}

impl From<Vec<f64>> for NodataSpec {
    fn from(values: Vec<f64>) -> Self {
        NodataSpec::PerBand(values)
    }
}

impl From<&[f64]> for NodataSpec {
    fn from(values: &[f64]) -> Self {
        NodataSpec::PerBand(values.to_vec())
    }
}

/// A geo-referenced raster: a GDAL dataset plus, once loaded, its pixels.
///
/// Every operation that changes pixels or metadata goes through
/// [`Raster::update`], which rebuilds the dataset in memory and re-reads all
/// attributes from it.
pub struct Raster {
    handle: DatasetHandle,
    source: RasterSource,
    state: LoadState,
    disk: DiskState,
    attrs: RasterAttrs,
    config: RasterConfig,
}

impl Raster {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, &RasterConfig::default())
    }

    pub fn open_with<P: AsRef<Path>>(path: P, config: &RasterConfig) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }
        let filename = std::fs::canonicalize(path)?;
        let handle = match config.as_memfile {
            true => DatasetHandle::open_as_memfile(&filename)?,
            false => DatasetHandle::open(&filename)?,
        };
        Self::from_handle(handle, RasterSource::Path(filename), config)
    }

    /// Open a raster from the bytes of a file in any format GDAL reads.
    pub fn from_buffer(bytes: Vec<u8>) -> Result<Self> {
        Self::from_buffer_with(bytes, &RasterConfig::default())
    }

    pub fn from_buffer_with(bytes: Vec<u8>, config: &RasterConfig) -> Result<Self> {
        let handle = DatasetHandle::from_bytes(bytes)?;
        Self::from_handle(handle, RasterSource::Buffer, config)
    }

    /// Build a raster from pixels and geo-referencing.
    ///
    /// A 2-D array becomes a single band. The storage type follows the array's
    /// element type.
    ///
    /// ```rust, no_run
    /// use georaster::Raster;
    /// use ndarray::Array2;
    ///
    /// let data = Array2::<f32>::zeros((100, 100));
    /// let transform = [30.0, 0.0, 478000.0, 0.0, -30.0, 3108140.0];
    /// let raster = Raster::from_array(data, transform, 32645, None)?;
    /// assert_eq!(raster.res(), (30.0, 30.0));
    /// # Ok::<(), georaster::errors::Error>(())
    /// ```
    pub fn from_array<D, T, C>(data: D, transform: T, crs: C, nodata: Option<f64>) -> Result<Self>
    where
        D: Into<RasterData>,
        T: Into<TransformSpec>,
        C: Into<CrsSpec>,
    {
        let data = data.into();
        let dtype = data.dtype;
        Self::from_array_typed(data, transform, crs, nodata, dtype)
    }

    /// Same as [`Raster::from_array`] with an explicit storage type.
    pub fn from_array_typed<D, T, C>(
        data: D,
        transform: T,
        crs: C,
        nodata: Option<f64>,
        dtype: DataType,
    ) -> Result<Self>
    where
        D: Into<RasterData>,
        T: Into<TransformSpec>,
        C: Into<CrsSpec>,
    {
        let array = data.into().array;
        let transform = Transform::try_from(transform.into())?;
        let crs = Crs::try_from(crs.into())?;
        if let Some(nodata) = nodata {
            check_nodata(nodata, dtype)?;
        }
        let (count, height, width) = array.shape();
        let profile = Profile {
            driver: "GTiff".to_string(),
            width,
            height,
            count,
            dtype,
            crs: Some(crs),
            transform,
            nodata: vec![nodata; count],
        };
        let mut handle = DatasetHandle::create(&profile)?;
        handle.write(&array)?;
        Self::from_handle(handle, RasterSource::Array, &RasterConfig::default())
    }

    pub(crate) fn from_handle(
        handle: DatasetHandle,
        source: RasterSource,
        config: &RasterConfig,
    ) -> Result<Self> {
        let attrs = RasterAttrs::read(&handle, config.attrs)?;
        let mut raster = Self {
            handle,
            source,
            state: LoadState::MetadataOnly,
            disk: DiskState::Detached,
            attrs,
            config: config.clone(),
        };
        if config.load_data {
            let bands = config.bands.clone();
            raster.load(bands.as_deref())?;
        }
        Ok(raster)
    }

    /// Read pixels from the dataset. `bands` are 1-based; all bands when `None`.
    ///
    /// Loading a subset of bands rebuilds the dataset with only those bands. This
    /// does not count as a modification: a raster read from a file still
    /// matches it afterwards.
    pub fn load(&mut self, bands: Option<&[usize]>) -> Result<()> {
        let array = self.handle.read(bands, self.config.masked)?;
        match bands {
            Some(bands) if bands.len() != self.count() || !is_identity(bands) => {
                let mut profile = self.profile()?;
                profile.count = bands.len();
                profile.nodata = bands
                    .iter()
                    .map(|b| self.attrs.nodatavals[b - 1])
                    .collect();
                let disk = self.disk;
                self.state = LoadState::MetadataOnly;
                self.update(Some(array), Some(profile))?;
                // narrowing the bands of a pristine file read is still a plain read
                self.disk = disk;
                self.load(None)
            }
            _ => {
                self.state = LoadState::Loaded(array);
                if self.disk == DiskState::Detached && matches!(self.source, RasterSource::Path(_)) {
                    self.disk = DiskState::Matches;
                }
                Ok(())
            }
        }
    }

    /// Rebuild the dataset in memory from new pixels and/or metadata.
    ///
    /// Missing arguments default to the current values. Masked cells of `data`
    /// are written as the band nodata. Without `data`, the current pixels and
    /// their mask are carried over. Pixels are reloaded if they were loaded before.
    pub fn update(&mut self, data: Option<RasterArray>, profile: Option<Profile>) -> Result<()> {
        let mut profile = match profile {
            Some(profile) => profile,
            None => self.profile()?,
        };
        if profile.driver == "VRT" {
            profile.driver = "GTiff".to_string();
        }
        let data = match data {
            Some(data) => data,
            None => match &self.state {
                LoadState::Loaded(array) => array.clone(),
                LoadState::MetadataOnly => self.handle.read(None, false)?,
            },
        };
        let (count, height, width) = data.shape();
        if (count, height, width) != (profile.count, profile.height, profile.width) {
            return Err(Error::ShapeMismatch {
                expected: vec![profile.count, profile.height, profile.width],
                actual: vec![count, height, width],
            });
        }

        let mut handle = DatasetHandle::create(&profile)?;
        handle.write(&data)?;
        self.handle = handle;
        self.attrs = RasterAttrs::read(&self.handle, self.config.attrs)?;
        self.disk = DiskState::Diverged;
        if self.is_loaded() {
            self.state = LoadState::Loaded(self.handle.read(None, self.config.masked)?);
        }
        Ok(())
    }

    pub fn data(&self) -> Result<&RasterArray> {
        match &self.state {
            LoadState::Loaded(array) => Ok(array),
            LoadState::MetadataOnly => Err(Error::NoData),
        }
    }

    /// Mutable access to the loaded pixels. The raster no longer matches disk.
    pub fn data_mut(&mut self) -> Result<&mut RasterArray> {
        match &mut self.state {
            LoadState::Loaded(array) => {
                self.disk = DiskState::Diverged;
                Ok(array)
            }
            LoadState::MetadataOnly => Err(Error::NoData),
        }
    }

    /// Replace the loaded pixels with an array of the same shape.
    pub fn set_data(&mut self, data: RasterArray) -> Result<()> {
        let current = self.data()?;
        if current.shape() != data.shape() {
            let (c, h, w) = current.shape();
            let (nc, nh, nw) = data.shape();
            return Err(Error::ShapeMismatch {
                expected: vec![c, h, w],
                actual: vec![nc, nh, nw],
            });
        }
        self.state = LoadState::Loaded(data);
        self.disk = DiskState::Diverged;
        Ok(())
    }

    /// Loaded pixels, or a fresh read when nothing is loaded.
    pub(crate) fn current_array(&self) -> Result<Cow<'_, RasterArray>> {
        match &self.state {
            LoadState::Loaded(array) => Ok(Cow::Borrowed(array)),
            LoadState::MetadataOnly => Ok(Cow::Owned(self.handle.read(None, self.config.masked)?)),
        }
    }

    pub(crate) fn handle(&self) -> &DatasetHandle {
        &self.handle
    }

    pub fn attrs(&self) -> &RasterAttrs {
        &self.attrs
    }

    pub fn config(&self) -> &RasterConfig {
        &self.config
    }

    pub fn profile(&self) -> Result<Profile> {
        self.handle.profile()
    }

    pub fn source(&self) -> &RasterSource {
        &self.source
    }

    /// Absolute path the raster was opened from.
    pub fn filename(&self) -> Option<&Path> {
        match &self.source {
            RasterSource::Path(path) => Some(path),
            _ => None,
        }
    }

    pub fn load_state(&self) -> &LoadState {
        &self.state
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, LoadState::Loaded(_))
    }

    pub fn disk_state(&self) -> DiskState {
        self.disk
    }

    /// `None` when never backed by a file, `Some(false)` after any mutation.
    pub fn matches_disk(&self) -> Option<bool> {
        match self.disk {
            DiskState::Detached => None,
            DiskState::Matches => Some(true),
            DiskState::Diverged => Some(false),
        }
    }

    pub fn width(&self) -> usize {
        self.attrs.width
    }

    pub fn height(&self) -> usize {
        self.attrs.height
    }

    pub fn count(&self) -> usize {
        self.attrs.count
    }

    /// `(height, width)`.
    pub fn shape(&self) -> (usize, usize) {
        self.attrs.shape
    }

    pub fn indexes(&self) -> &[usize] {
        &self.attrs.indexes
    }

    pub fn transform(&self) -> Transform {
        self.attrs.transform
    }

    pub fn crs(&self) -> Option<&Crs> {
        self.attrs.crs.as_ref()
    }

    pub fn bounds(&self) -> Bounds {
        self.attrs.bounds
    }

    pub fn res(&self) -> (f64, f64) {
        self.attrs.res
    }

    pub fn nodata(&self) -> Option<f64> {
        self.attrs.nodata
    }

    pub fn nodatavals(&self) -> &[Option<f64>] {
        &self.attrs.nodatavals
    }

    pub fn dtypes(&self) -> &[DataType] {
        &self.attrs.dtypes
    }

    pub fn driver(&self) -> &str {
        &self.attrs.driver
    }

    pub fn name(&self) -> &str {
        &self.attrs.name
    }

    /// Translate the raster by `(xoff, yoff)` in CRS units. Pixels are unchanged.
    pub fn shift(&mut self, xoff: f64, yoff: f64) -> Result<()> {
        let mut profile = self.profile()?;
        profile.transform = profile.transform.translate(xoff, yoff);
        self.update(None, Some(profile))
    }

    /// Set new nodata values.
    ///
    /// A scalar is used for every band. A list must hold one value per band,
    /// except on a single-band raster where only its first value is used. With
    /// `update_array`, pixels holding the previous nodata (or masked pixels) are
    /// rewritten to the new value.
    pub fn set_ndv<N: Into<NodataSpec>>(&mut self, ndv: N, update_array: bool) -> Result<()> {
        let count = self.count();
        let values = match ndv.into() {
            NodataSpec::Scalar(value) => {
                if count > 1 {
                    log::info!("Several raster bands: using nodata value {value} for all bands");
                }
                vec![value; count]
            }
            NodataSpec::PerBand(values) => match (values.first(), count) {
                (None, _) => {
                    return Err(Error::BadArgument("empty list of nodata values".to_string()))
                }
                (Some(&first), 1) => {
                    if values.len() > 1 {
                        log::info!("Only one raster band: using first nodata value {first}");
                    }
                    vec![first]
                }
                _ if values.len() != count => {
                    return Err(Error::BadArgument(format!(
                        "{} nodata values given for {} bands",
                        values.len(),
                        count
                    )))
                }
                _ => values,
            },
        };
        for (&value, &dtype) in values.iter().zip(self.dtypes()) {
            check_nodata(value, dtype)?;
        }

        let previous = self.attrs.nodatavals.clone();
        let mut profile = self.profile()?;
        profile.nodata = values.iter().map(|&v| Some(v)).collect();

        if !update_array {
            // cells under the old nodata keep their raw value
            let data = match &self.state {
                LoadState::Loaded(array) => Some(RasterArray::new(array.filled(&previous))),
                LoadState::MetadataOnly => None,
            };
            return self.update(data, Some(profile));
        }

        let mut array = match &self.state {
            LoadState::Loaded(array) => array.clone(),
            LoadState::MetadataOnly => self.handle.read(None, false)?,
        };
        rewrite_nodata(&mut array, &previous, &values);
        self.update(Some(array), Some(profile))
    }

    /// Change the storage type of every band.
    ///
    /// A per-band list is accepted but only its first type is used: a dataset
    /// holds a single storage type. With `update_array`, loaded pixels are cast
    /// to the new type first.
    pub fn set_dtypes<D: Into<DtypeSpec>>(&mut self, dtypes: D, update_array: bool) -> Result<()> {
        let dtype = match dtypes.into() {
            DtypeSpec::Single(dtype) => {
                if self.count() > 1 {
                    log::info!("Several raster bands: using data type {dtype} for all bands");
                }
                dtype
            }
            DtypeSpec::PerBand(dtypes) => {
                let first = *dtypes.first().ok_or_else(|| {
                    Error::BadArgument("empty list of data types".to_string())
                })?;
                if dtypes.iter().any(|d| *d != first) {
                    log::warn!("Bands cannot have different data types, using {first} for all bands");
                }
                first
            }
        };

        let mut profile = self.profile()?;
        profile.dtype = dtype;
        if !update_array {
            return self.update(None, Some(profile));
        }
        let mut array = self.current_array()?.into_owned();
        array.map_inplace(|v| *v = dtype.cast(*v));
        self.update(Some(array), Some(profile))
    }

    /// In-memory copy with identical geo-referencing, optionally with new pixels.
    pub fn copy(&self, new_array: Option<RasterArray>) -> Result<Raster> {
        let profile = Profile {
            driver: "GTiff".to_string(),
            ..self.profile()?
        };
        let array = match new_array {
            Some(array) => array,
            None => self.current_array()?.into_owned(),
        };
        let (count, height, width) = array.shape();
        let nodata = profile.nodata();
        let mut handle = DatasetHandle::create(&Profile {
            width,
            height,
            count,
            nodata: vec![nodata; count],
            ..profile
        })?;
        handle.write(&array)?;
        let config = RasterConfig {
            load_data: true,
            bands: None,
            as_memfile: false,
            ..self.config.clone()
        };
        Raster::from_handle(handle, RasterSource::Array, &config)
    }

    /// Human readable summary, with per-band statistics when `stats` is set.
    pub fn info(&self, stats: bool) -> Result<String> {
        let filename = self
            .filename()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "None".to_string());
        let crs = self
            .crs()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "None".to_string());
        let nodata = self
            .nodata()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "None".to_string());
        let dtypes: Vec<&str> = self.dtypes().iter().map(DataType::name).collect();
        let bounds = self.bounds();

        let mut lines = vec![
            format!("Driver:               {}", self.driver()),
            format!("Opened from file:     {filename}"),
            format!("Filename:             {}", self.name()),
            format!("Raster matches disk file?  {:?}", self.matches_disk()),
            format!("Size:                 {}, {}", self.width(), self.height()),
            format!("Number of bands:      {}", self.count()),
            format!("Data types:           {dtypes:?}"),
            format!("Coordinate System:    {crs}"),
            format!("NoData Value:         {nodata}"),
            format!("Pixel Size:           {}, {}", self.res().0, self.res().1),
            format!("Upper Left Corner:    {}, {}", bounds.left, bounds.top),
            format!("Lower Right Corner:   {}, {}", bounds.right, bounds.bottom),
        ];

        if stats {
            let array = self.current_array()?;
            if array.count() == 1 {
                lines.extend(Statistics::lines_for(&array.valid_values(0)));
            } else {
                for band in 0..array.count() {
                    lines.push(format!("Band {}:", band + 1));
                    lines.extend(Statistics::lines_for(&array.valid_values(band)));
                }
            }
        }

        Ok(lines.join("\n") + "\n")
    }

    /// Validity of each pixel over all bands: `true` where at least one band
    /// holds data.
    pub fn dataset_mask(&self) -> Result<ndarray::Array2<bool>> {
        let array = self.current_array()?;
        let (_, height, width) = array.shape();
        let mut valid = ndarray::Array2::from_elem((height, width), array.mask().is_none());
        if let Some(mask) = array.mask() {
            for band_mask in mask.outer_iter() {
                ndarray::Zip::from(&mut valid)
                    .and(&band_mask)
                    .for_each(|v, &m| *v |= !m);
            }
        }
        Ok(valid)
    }
}

fn is_identity(bands: &[usize]) -> bool {
    bands.iter().enumerate().all(|(i, &b)| b == i + 1)
}

fn check_nodata(nodata: f64, dtype: DataType) -> Result<()> {
    if !dtype.can_hold(nodata) {
        return Err(Error::BadArgument(format!(
            "nodata value {nodata} is beyond the valid range of {dtype}"
        )));
    }
    Ok(())
}

/// Replace previous nodata (or masked) pixels of each band with the new value.
fn rewrite_nodata(array: &mut RasterArray, previous: &[Option<f64>], values: &[f64]) {
    let mask = array.mask().cloned();
    for (band, mut data) in array.data_mut().outer_iter_mut().enumerate() {
        let Some(old) = previous.get(band).copied().flatten() else {
            continue;
        };
        let new = values[band];
        match &mask {
            Some(mask) => ndarray::Zip::from(&mut data)
                .and(&mask.index_axis(ndarray::Axis(0), band))
                .for_each(|v, &m| {
                    if m {
                        *v = new
                    }
                }),
            None => data.map_inplace(|v| {
                if crate::raster::array::is_nodata(*v, old) {
                    *v = new
                }
            }),
        }
    }
}

impl Display for Raster {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.info(false) {
            Ok(info) => f.write_str(&info),
            Err(_) => Err(std::fmt::Error),
        }
    }
}

impl Debug for Raster {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let attrs = &self.attrs;
        let mut s = f.debug_struct("Raster");
        for name in self.config.attrs.names() {
            match name.as_str() {
                "bounds" => s.field("bounds", &attrs.bounds),
                "count" => s.field("count", &attrs.count),
                "crs" => s.field("crs", &attrs.crs.as_ref().map(|c| c.to_string())),
                "dataset_mask" => s.field("mask_flags", &attrs.mask_flags),
                "driver" => s.field("driver", &attrs.driver),
                "dtypes" => s.field("dtypes", &attrs.dtypes),
                "height" => s.field("height", &attrs.height),
                "indexes" => s.field("indexes", &attrs.indexes),
                "name" => s.field("name", &attrs.name),
                "nodata" => s.field("nodata", &attrs.nodata),
                "res" => s.field("res", &attrs.res),
                "shape" => s.field("shape", &attrs.shape),
                "transform" => s.field("transform", &attrs.transform),
                "width" => s.field("width", &attrs.width),
                "tags" => s.field("tags", &attrs.tags),
                "block_shapes" => s.field("block_shapes", &attrs.block_shapes),
                "descriptions" => s.field("descriptions", &attrs.descriptions),
                _ => &mut s,
            };
        }
        s.finish_non_exhaustive()
    }
}

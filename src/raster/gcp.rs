//! Writing rasters to disk, and their ground control points.

use std::ffi::{c_int, CString};
use std::os::raw::c_char;
use std::path::Path;
use std::ptr::null_mut;

use gdal::spatial_ref::SpatialRef;
use gdal_sys::GDAL_GCP;
use ndarray::Array3;

use crate::crs::{Crs, CrsSpec};
use crate::errors::{Error, Result};
use crate::raster::handle::{DatasetHandle, Profile};
use crate::raster::{DataType, LoadState, Raster, RasterArray};
use crate::utils::{_check_rc, _last_cpl_err, _string};

/// A ground control point tying pixel `(row, col)` to a georeferenced position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gcp {
    pub row: f64,
    pub col: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Gcp {
    pub fn new(row: f64, col: f64, x: f64, y: f64) -> Self {
        Self {
            row,
            col,
            x,
            y,
            z: 0.0,
        }
    }
}

/// Parses `[row, col, x, y]` or `[row, col, x, y, z]`.
impl TryFrom<&[f64]> for Gcp {
    type Error = Error;

    fn try_from(values: &[f64]) -> Result<Self> {
        match *values {
            [row, col, x, y] => Ok(Gcp::new(row, col, x, y)),
            [row, col, x, y, z] => Ok(Gcp { row, col, x, y, z }),
            _ => Err(Error::BadArgument(format!(
                "a GCP needs 4 or 5 values (row, col, x, y[, z]), got {}",
                values.len()
            ))),
        }
    }
}

/// Options of [`Raster::save`].
#[derive(Debug, Clone)]
pub struct SaveOptions {
    /// Output driver short name.
    pub driver: String,
    /// Storage type, band 1's when `None`.
    pub dtype: Option<DataType>,
    /// Write this constant everywhere instead of the pixels.
    pub blank_value: Option<f64>,
    /// Driver creation options such as `("COMPRESS", "LZW")`.
    pub creation_options: Vec<(String, String)>,
    /// Metadata written in the default domain.
    pub tags: Vec<(String, String)>,
    pub gcps: Vec<Gcp>,
    pub gcp_crs: Option<CrsSpec>,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            driver: "GTiff".to_string(),
            dtype: None,
            blank_value: None,
            creation_options: Vec::new(),
            tags: Vec::new(),
            gcps: Vec::new(),
            gcp_crs: None,
        }
    }
}

impl SaveOptions {
    pub fn with_driver(mut self, driver: &str) -> Self {
        self.driver = driver.to_string();
        self
    }

    pub fn with_dtype(mut self, dtype: DataType) -> Self {
        self.dtype = Some(dtype);
        self
    }

    pub fn with_blank_value(mut self, value: f64) -> Self {
        self.blank_value = Some(value);
        self
    }

    pub fn with_creation_option(mut self, key: &str, value: &str) -> Self {
        self.creation_options.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_gcps<C: Into<CrsSpec>>(mut self, gcps: Vec<Gcp>, crs: C) -> Self {
        self.gcps = gcps;
        self.gcp_crs = Some(crs.into());
        self
    }
}

fn set_gcps(handle: &DatasetHandle, gcps: &[Gcp], crs: Option<&Crs>) -> Result<()> {
    let ids = (1..=gcps.len())
        .map(|i| CString::new(i.to_string()))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let info = CString::new("")?;
    let c_gcps: Vec<GDAL_GCP> = gcps
        .iter()
        .zip(&ids)
        .map(|(gcp, id)| GDAL_GCP {
            pszId: id.as_ptr() as *mut c_char,
            pszInfo: info.as_ptr() as *mut c_char,
            dfGCPPixel: gcp.col,
            dfGCPLine: gcp.row,
            dfGCPX: gcp.x,
            dfGCPY: gcp.y,
            dfGCPZ: gcp.z,
        })
        .collect();
    let wkt = CString::new(match crs {
        Some(crs) => crs.to_wkt()?,
        None => String::new(),
    })?;
    let rv = unsafe {
        gdal_sys::GDALSetGCPs(
            handle.c_dataset(),
            c_gcps.len() as c_int,
            c_gcps.as_ptr(),
            wkt.as_ptr(),
        )
    };
    _check_rc(rv)
}

/// Copy `handle` into a file at `path` with the driver `driver`.
fn create_copy(
    handle: &DatasetHandle,
    driver: &str,
    path: &Path,
    options: &[(String, String)],
) -> Result<()> {
    let c_driver_name = CString::new(driver)?;
    let c_driver = unsafe { gdal_sys::GDALGetDriverByName(c_driver_name.as_ptr()) };
    if c_driver.is_null() {
        return Err(Error::BadArgument(format!("unknown GDAL driver '{driver}'")));
    }
    let c_path = CString::new(path.to_string_lossy().as_ref())?;

    let mut c_options: *mut *mut c_char = null_mut();
    for (key, value) in options {
        let (key, value) = (CString::new(key.as_str())?, CString::new(value.as_str())?);
        c_options = unsafe { gdal_sys::CSLSetNameValue(c_options, key.as_ptr(), value.as_ptr()) };
    }
    let c_copy = unsafe {
        let c_copy = gdal_sys::GDALCreateCopy(
            c_driver,
            c_path.as_ptr(),
            handle.c_dataset(),
            0,
            c_options,
            None,
            null_mut(),
        );
        gdal_sys::CSLDestroy(c_options);
        c_copy
    };
    if c_copy.is_null() {
        return Err(_last_cpl_err(gdal_sys::CPLErr::CE_Failure));
    }
    unsafe { gdal_sys::GDALClose(c_copy) };
    Ok(())
}

impl Raster {
    /// Write the raster to `path`.
    ///
    /// Fails with [`Error::NoData`] when nothing is loaded and no
    /// `blank_value` is given. Setting GCPs clears the geotransform.
    ///
    /// ```rust, no_run
    /// use georaster::{Raster, SaveOptions};
    ///
    /// let dem = Raster::open("dem.tif")?;
    /// dem.save("dem_lzw.tif", &SaveOptions::default().with_creation_option("COMPRESS", "LZW"))?;
    /// # Ok::<(), georaster::errors::Error>(())
    /// ```
    pub fn save<P: AsRef<Path>>(&self, path: P, options: &SaveOptions) -> Result<()> {
        let (height, width) = self.shape();
        let array = match (options.blank_value, self.load_state()) {
            (Some(value), _) if !value.is_finite() => {
                return Err(Error::BadArgument(format!(
                    "blank value must be a finite number, got {value}"
                )))
            }
            (Some(value), _) => {
                RasterArray::new(Array3::from_elem((self.count(), height, width), value))
            }
            (None, LoadState::Loaded(array)) => array.clone(),
            (None, LoadState::MetadataOnly) => return Err(Error::NoData),
        };

        let base = self.profile()?;
        let profile = Profile {
            driver: "MEM".to_string(),
            dtype: options.dtype.unwrap_or(base.dtype),
            ..base
        };
        let mut handle = DatasetHandle::create(&profile)?;
        handle.write(&array)?;
        for (key, value) in &options.tags {
            handle.set_tag(key, value)?;
        }
        if !options.gcps.is_empty() {
            if !self.transform().is_identity() {
                log::warn!(
                    "A geotransform previously set is going to be cleared due to the setting of GCPs."
                );
            }
            let crs = options
                .gcp_crs
                .clone()
                .map(Crs::try_from)
                .transpose()?;
            set_gcps(&handle, &options.gcps, crs.as_ref())?;
        }

        let path = path.as_ref();
        log::debug!("Saving {} to {}", self.name(), path.display());
        create_copy(&handle, &options.driver, path, &options.creation_options)
    }

    /// Ground control points embedded in the dataset.
    pub fn gcps(&self) -> Vec<Gcp> {
        let c_dataset = self.handle().c_dataset();
        let count = unsafe { gdal_sys::GDALGetGCPCount(c_dataset) };
        let c_gcps = unsafe { gdal_sys::GDALGetGCPs(c_dataset) };
        if count <= 0 || c_gcps.is_null() {
            return Vec::new();
        }
        unsafe { std::slice::from_raw_parts(c_gcps, count as usize) }
            .iter()
            .map(|gcp| Gcp {
                row: gcp.dfGCPLine,
                col: gcp.dfGCPPixel,
                x: gcp.dfGCPX,
                y: gcp.dfGCPY,
                z: gcp.dfGCPZ,
            })
            .collect()
    }

    /// CRS of the ground control points, distinct from [`Raster::crs`].
    pub fn gcp_crs(&self) -> Option<Crs> {
        let c_dataset = self.handle().c_dataset();
        let c_wkt = unsafe { gdal_sys::GDALGetGCPProjection(c_dataset) };
        if c_wkt.is_null() {
            return None;
        }
        let wkt = _string(c_wkt);
        if wkt.is_empty() {
            return None;
        }
        SpatialRef::from_wkt(&wkt).ok().map(Crs::from_spatial_ref)
    }
}

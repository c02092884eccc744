//! Ownership of the GDAL dataset behind a [`Raster`](crate::Raster).

use std::ffi::c_int;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use gdal::{Dataset, DriverManager, Metadata};
use gdal_sys::{CPLErr, GDALDataType, GDALDatasetH, GDALRWFlag, GDALRasterBandH};
use ndarray::{s, Array2, Array3, Axis};

use crate::crs::Crs;
use crate::errors::{Error, Result};
use crate::geo_transform::Transform;
use crate::raster::types::with_pixel_type;
use crate::raster::{DataType, RasterArray};
use crate::utils::_last_cpl_err;

static MEM_FILE_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Unique `/vsimem/` path for an in-memory dataset.
pub(crate) fn mem_file_path(extension: &str) -> PathBuf {
    let n = MEM_FILE_COUNTER.fetch_add(1, Ordering::Relaxed);
    PathBuf::from(format!(
        "/vsimem/georaster_{}_{}.{}",
        std::process::id(),
        n,
        extension
    ))
}

/// Unlinks a `/vsimem/` file when dropped.
#[derive(Debug)]
struct MemFile {
    path: PathBuf,
}

impl Drop for MemFile {
    fn drop(&mut self) {
        // may already be gone if GDAL never flushed it
        let _ = gdal::vsi::unlink_mem_file(&self.path);
    }
}

/// Metadata needed to build a new dataset: the analogue of a rasterio profile.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    /// Driver short name. Anything but `MEM` is stored as an in-memory GTiff.
    pub driver: String,
    pub width: usize,
    pub height: usize,
    pub count: usize,
    pub dtype: DataType,
    pub crs: Option<Crs>,
    pub transform: Transform,
    /// Nodata value per band.
    pub nodata: Vec<Option<f64>>,
}

impl Profile {
    /// Band 1 nodata, as reported by `nodata`.
    pub fn nodata(&self) -> Option<f64> {
        self.nodata.first().copied().flatten()
    }

    /// Set the same nodata value on every band.
    pub fn with_nodata(mut self, nodata: Option<f64>) -> Self {
        self.nodata = vec![nodata; self.count];
        self
    }
}

/// An open GDAL dataset, possibly backed by a `/vsimem/` file it owns.
#[derive(Debug)]
pub(crate) struct DatasetHandle {
    // dropped before the mem file is unlinked
    dataset: Dataset,
    _mem_file: Option<MemFile>,
}

impl DatasetHandle {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            dataset: Dataset::open(path)?,
            _mem_file: None,
        })
    }

    /// Copy the file at `path` into `/vsimem/` and open the copy.
    pub fn open_as_memfile(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "tif".to_string());
        Self::from_bytes_with_extension(bytes, &extension)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_bytes_with_extension(bytes, "tif")
    }

    fn from_bytes_with_extension(bytes: Vec<u8>, extension: &str) -> Result<Self> {
        let path = mem_file_path(extension);
        gdal::vsi::create_mem_file(&path, bytes)?;
        let mem_file = MemFile { path };
        let dataset = Dataset::open(&mem_file.path)?;
        Ok(Self {
            dataset,
            _mem_file: Some(mem_file),
        })
    }

    /// Create an empty in-memory dataset described by `profile`.
    pub fn create(profile: &Profile) -> Result<Self> {
        let (driver_name, mem_file) = match profile.driver.as_str() {
            "MEM" => ("MEM", None),
            _ => ("GTiff", Some(MemFile {
                path: mem_file_path("tif"),
            })),
        };
        let driver = DriverManager::get_driver_by_name(driver_name)?;
        let path = mem_file
            .as_ref()
            .map(|m| m.path.clone())
            .unwrap_or_default();
        let mut dataset = with_pixel_type!(profile.dtype, T => driver.create_with_band_type::<T, _>(
            &path,
            profile.width,
            profile.height,
            profile.count,
        )?);
        dataset.set_geo_transform(&profile.transform.to_gdal())?;
        if let Some(crs) = &profile.crs {
            dataset.set_spatial_ref(crs.spatial_ref())?;
        }
        let handle = Self {
            dataset,
            _mem_file: mem_file,
        };
        for (index, nodata) in profile.nodata.iter().enumerate() {
            handle.set_nodata(index + 1, *nodata)?;
        }
        Ok(handle)
    }

    pub fn c_dataset(&self) -> GDALDatasetH {
        #[allow(unused_unsafe)]
        unsafe {
            self.dataset.c_dataset()
        }
    }

    pub fn width(&self) -> usize {
        self.dataset.raster_size().0
    }

    pub fn height(&self) -> usize {
        self.dataset.raster_size().1
    }

    pub fn count(&self) -> usize {
        self.dataset.raster_count()
    }

    pub fn transform(&self) -> Transform {
        self.dataset
            .geo_transform()
            .map(|gt| Transform::from_gdal(&gt))
            .unwrap_or_default()
    }

    pub fn crs(&self) -> Option<Crs> {
        if self.dataset.projection().is_empty() {
            return None;
        }
        self.dataset.spatial_ref().ok().map(Crs::from_spatial_ref)
    }

    pub fn driver(&self) -> String {
        self.dataset.driver().short_name()
    }

    /// Dataset description, usually the path it was opened from.
    pub fn name(&self) -> String {
        self.dataset.description().unwrap_or_default()
    }

    fn c_band(&self, index: usize) -> Result<GDALRasterBandH> {
        let count = self.count();
        if index == 0 || index > count {
            return Err(Error::InvalidBand { band: index, count });
        }
        let c_band =
            unsafe { gdal_sys::GDALGetRasterBand(self.c_dataset(), index as c_int) };
        if c_band.is_null() {
            return Err(_last_cpl_err(CPLErr::CE_Failure));
        }
        Ok(c_band)
    }

    pub fn dtype(&self, index: usize) -> Result<DataType> {
        let c_band = self.c_band(index)?;
        DataType::from_gdal_type(unsafe { gdal_sys::GDALGetRasterDataType(c_band) })
    }

    pub fn dtypes(&self) -> Result<Vec<DataType>> {
        (1..=self.count()).map(|b| self.dtype(b)).collect()
    }

    pub fn nodata(&self, index: usize) -> Result<Option<f64>> {
        let c_band = self.c_band(index)?;
        let mut has_nodata: c_int = 0;
        let value = unsafe { gdal_sys::GDALGetRasterNoDataValue(c_band, &mut has_nodata) };
        Ok((has_nodata != 0).then_some(value))
    }

    pub fn nodatavals(&self) -> Result<Vec<Option<f64>>> {
        (1..=self.count()).map(|b| self.nodata(b)).collect()
    }

    pub fn set_nodata(&self, index: usize, nodata: Option<f64>) -> Result<()> {
        let c_band = self.c_band(index)?;
        let rv = match nodata {
            Some(value) => unsafe { gdal_sys::GDALSetRasterNoDataValue(c_band, value) },
            None => unsafe { gdal_sys::GDALDeleteRasterNoDataValue(c_band) },
        };
        if rv != CPLErr::CE_None {
            return Err(_last_cpl_err(rv));
        }
        Ok(())
    }

    /// `GMF_*` flags of the band's mask.
    pub fn mask_flags(&self, index: usize) -> Result<i32> {
        let c_band = self.c_band(index)?;
        Ok(unsafe { gdal_sys::GDALGetMaskFlags(c_band) })
    }

    /// Natural block size as `(rows, cols)`.
    pub fn block_shape(&self, index: usize) -> Result<(usize, usize)> {
        let c_band = self.c_band(index)?;
        let (mut cols, mut rows): (c_int, c_int) = (0, 0);
        unsafe { gdal_sys::GDALGetBlockSize(c_band, &mut cols, &mut rows) };
        Ok((rows as usize, cols as usize))
    }

    pub fn description(&self, index: usize) -> Result<String> {
        let c_band = self.c_band(index)?;
        Ok(crate::utils::_string(unsafe {
            gdal_sys::GDALGetDescription(c_band as gdal_sys::GDALMajorObjectH)
        }))
    }

    /// Default-domain metadata as `(key, value)` pairs.
    pub fn tags(&self) -> Vec<(String, String)> {
        self.dataset
            .metadata_domain("")
            .unwrap_or_default()
            .into_iter()
            .filter_map(|item| {
                item.split_once('=')
                    .map(|(k, v)| (k.to_string(), v.to_string()))
            })
            .collect()
    }

    pub fn profile(&self) -> Result<Profile> {
        let dtype = match self.count() {
            0 => DataType::Float64,
            _ => self.dtype(1)?,
        };
        Ok(Profile {
            driver: self.driver(),
            width: self.width(),
            height: self.height(),
            count: self.count(),
            dtype,
            crs: self.crs(),
            transform: self.transform(),
            nodata: self.nodatavals()?,
        })
    }

    fn band_io(
        &self,
        index: usize,
        flag: GDALRWFlag::Type,
        offset: (usize, usize),
        size: (usize, usize),
        buffer: &mut [f64],
    ) -> Result<()> {
        let c_band = self.c_band(index)?;
        if size.0 == 0 || size.1 == 0 {
            return Ok(());
        }
        let rv = unsafe {
            gdal_sys::GDALRasterIO(
                c_band,
                flag,
                offset.0 as c_int,
                offset.1 as c_int,
                size.0 as c_int,
                size.1 as c_int,
                buffer.as_mut_ptr() as *mut std::ffi::c_void,
                size.0 as c_int,
                size.1 as c_int,
                GDALDataType::GDT_Float64,
                0,
                0,
            )
        };
        if rv != CPLErr::CE_None {
            return Err(_last_cpl_err(rv));
        }
        Ok(())
    }

    /// Read a window of band `index`. `window` is `(col_off, row_off)` and
    /// `size` is `(cols, rows)`; both must lie inside the raster.
    pub fn read_window(
        &self,
        index: usize,
        window: (usize, usize),
        size: (usize, usize),
    ) -> Result<Array2<f64>> {
        let mut data = vec![0.0; size.0 * size.1];
        self.band_io(index, GDALRWFlag::GF_Read, window, size, &mut data)?;
        Ok(Array2::from_shape_vec((size.1, size.0), data)?)
    }

    /// Read a window that may extend past the raster edges. Cells outside are
    /// set to `fill`. `window` is `(col_off, row_off)` and `size` `(cols, rows)`.
    pub fn read_window_boundless(
        &self,
        index: usize,
        window: (isize, isize),
        size: (usize, usize),
        fill: f64,
    ) -> Result<Array2<f64>> {
        let mut out = Array2::from_elem((size.1, size.0), fill);
        let (width, height) = (self.width() as isize, self.height() as isize);
        let col0 = window.0.max(0);
        let row0 = window.1.max(0);
        let col1 = window.0.saturating_add(size.0 as isize).min(width);
        let row1 = window.1.saturating_add(size.1 as isize).min(height);
        if col0 >= col1 || row0 >= row1 {
            return Ok(out);
        }
        let inner = self.read_window(
            index,
            (col0 as usize, row0 as usize),
            ((col1 - col0) as usize, (row1 - row0) as usize),
        )?;
        let (r, c) = ((row0 - window.1) as usize, (col0 - window.0) as usize);
        out.slice_mut(s![r..r + inner.nrows(), c..c + inner.ncols()])
            .assign(&inner);
        Ok(out)
    }

    pub fn read_band(&self, index: usize) -> Result<Array2<f64>> {
        self.read_window(index, (0, 0), (self.width(), self.height()))
    }

    /// Read the 1-based `bands` (all when `None`), masking nodata when `masked`.
    pub fn read(&self, bands: Option<&[usize]>, masked: bool) -> Result<RasterArray> {
        let indexes: Vec<usize> = match bands {
            Some(bands) => bands.to_vec(),
            None => (1..=self.count()).collect(),
        };
        let mut data = Array3::zeros((indexes.len(), self.height(), self.width()));
        let mut nodata = Vec::with_capacity(indexes.len());
        for (i, &band) in indexes.iter().enumerate() {
            data.index_axis_mut(Axis(0), i).assign(&self.read_band(band)?);
            nodata.push(self.nodata(band)?);
        }
        if masked {
            Ok(RasterArray::masked_equal(data, &nodata))
        } else {
            Ok(RasterArray::new(data))
        }
    }

    /// Write `array` into every band, replacing masked cells with the band nodata.
    pub fn write(&mut self, array: &RasterArray) -> Result<()> {
        let (count, rows, cols) = array.shape();
        let expected = vec![self.count(), self.height(), self.width()];
        if vec![count, rows, cols] != expected {
            return Err(Error::ShapeMismatch {
                expected,
                actual: vec![count, rows, cols],
            });
        }
        let filled = array.filled(&self.nodatavals()?);
        for (i, band) in filled.axis_iter(Axis(0)).enumerate() {
            let mut buffer: Vec<f64> = band.iter().copied().collect();
            self.band_io(
                i + 1,
                GDALRWFlag::GF_Write,
                (0, 0),
                (cols, rows),
                &mut buffer,
            )?;
        }
        Ok(())
    }

    /// Fill every band with a constant.
    pub fn fill(&mut self, value: f64) -> Result<()> {
        for index in 1..=self.count() {
            let c_band = self.c_band(index)?;
            let rv = unsafe { gdal_sys::GDALFillRaster(c_band, value, 0.0) };
            if rv != CPLErr::CE_None {
                return Err(_last_cpl_err(rv));
            }
        }
        Ok(())
    }

    pub fn set_tag(&mut self, key: &str, value: &str) -> Result<()> {
        self.dataset.set_metadata_item(key, value, "")?;
        Ok(())
    }
}

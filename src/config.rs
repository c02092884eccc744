//! Runtime configuration
//!
//! Two kinds of settings live here:
//!
//! * [`GdalConfig`] holds process-wide GDAL options (cache size, worker threads,
//!   PROJ search path, debug output). They are applied through GDAL's
//!   `CPLSetConfigOption` and override the equivalent environment variables.
//! * [`RasterConfig`] controls how a [`Raster`](crate::Raster) is opened: which
//!   dataset attributes are projected onto it, whether pixels are loaded eagerly,
//!   which bands, and whether nodata cells are masked.
//!
//! ```rust, no_run
//! use georaster::config::{GdalConfig, RasterConfig};
//! use georaster::{DatasetAttrs, Raster};
//!
//! GdalConfig::default().with_cache_max_mb(512).with_debug_logging(true).apply()?;
//!
//! let config = RasterConfig::default()
//!     .with_attrs(DatasetAttrs::TAGS)
//!     .with_load_data(false);
//! let raster = Raster::open_with("dem.tif", &config)?;
//! # Ok::<(), georaster::errors::Error>(())
//! ```

use std::path::PathBuf;

use gdal::errors::CplErrType;

use crate::errors::Result;
use crate::raster::DatasetAttrs;

/// GDAL library options applied once per process.
#[derive(Debug, Clone, Default)]
pub struct GdalConfig {
    cache_max_mb: Option<usize>,
    num_threads: Option<usize>,
    proj_data: Option<PathBuf>,
    debug_logging: bool,
}

impl GdalConfig {
    pub fn with_cache_max_mb(mut self, megabytes: usize) -> Self {
        self.cache_max_mb = Some(megabytes);
        self
    }

    /// Number of worker threads GDAL may use for warping and compression.
    pub fn with_num_threads(mut self, threads: usize) -> Self {
        self.num_threads = Some(threads);
        self
    }

    /// Directory holding `proj.db`.
    pub fn with_proj_data<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.proj_data = Some(path.into());
        self
    }

    pub fn with_debug_logging(mut self, debug: bool) -> Self {
        self.debug_logging = debug;
        self
    }

    /// Push the options into GDAL and route GDAL messages into [`log`].
    pub fn apply(&self) -> Result<()> {
        setup_logging(self.debug_logging);
        if let Some(cache) = self.cache_max_mb {
            gdal::config::set_config_option("GDAL_CACHEMAX", &cache.to_string())?;
        }
        if let Some(threads) = self.num_threads {
            gdal::config::set_config_option("GDAL_NUM_THREADS", &threads.to_string())?;
        }
        if let Some(proj_data) = &self.proj_data {
            gdal::config::set_config_option("PROJ_DATA", &proj_data.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Forward GDAL's error handler output to the [`log`] facade.
pub fn setup_logging(debug: bool) {
    if debug && gdal::config::set_config_option("CPL_DEBUG", "ON").is_err() {
        log::debug!("Failed to set GDAL debug level");
    }

    gdal::config::set_error_handler(|sev, _ec, msg| match sev {
        CplErrType::Debug => log::debug!("GDAL: {msg}"),
        CplErrType::Warning => log::warn!("GDAL: {msg}"),
        CplErrType::Failure | CplErrType::Fatal => log::error!("GDAL: {msg}"),
        CplErrType::None => {}
    });
}

/// Options used when opening a [`Raster`](crate::Raster).
#[derive(Debug, Clone)]
pub struct RasterConfig {
    pub(crate) attrs: DatasetAttrs,
    pub(crate) load_data: bool,
    pub(crate) bands: Option<Vec<usize>>,
    pub(crate) masked: bool,
    pub(crate) as_memfile: bool,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            attrs: DatasetAttrs::default(),
            load_data: true,
            bands: None,
            masked: true,
            as_memfile: false,
        }
    }
}

impl RasterConfig {
    /// Project these attributes in addition to the default set.
    pub fn with_attrs(mut self, extra: DatasetAttrs) -> Self {
        self.attrs |= extra;
        self
    }

    pub fn with_load_data(mut self, load_data: bool) -> Self {
        self.load_data = load_data;
        self
    }

    /// Bands to load, 1-based. All bands are loaded when unset.
    pub fn with_bands(mut self, bands: Vec<usize>) -> Self {
        self.bands = Some(bands);
        self
    }

    pub fn with_masked(mut self, masked: bool) -> Self {
        self.masked = masked;
        self
    }

    /// Copy the file into `/vsimem/` and open the in-memory copy.
    pub fn with_memfile(mut self, as_memfile: bool) -> Self {
        self.as_memfile = as_memfile;
        self
    }

    pub fn attrs(&self) -> DatasetAttrs {
        self.attrs
    }

    pub fn masked(&self) -> bool {
        self.masked
    }
}

use std::ffi::c_void;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use ndarray::{Array2, Array3};

use crate::Raster;

/// A struct that contains a temporary directory and a path to a file in that directory.
pub struct TempFixture {
    _temp_dir: tempfile::TempDir,
    temp_path: PathBuf,
}

impl TempFixture {
    /// Creates a temporary directory and path to a non-existent file with given `name`.
    /// Useful for writing results to during testing
    ///
    /// Returns the struct `TempFixture` that contains the temp dir (for clean-up on `drop`)
    /// as well as the empty file path.
    pub fn empty(name: &str) -> Self {
        let _temp_dir = tempfile::tempdir().unwrap();
        let temp_path = _temp_dir.path().join(name);
        Self {
            _temp_dir,
            temp_path,
        }
    }

    /// Saves `raster` as a GeoTIFF named `name` in a temporary directory.
    pub fn saved(name: &str, raster: &Raster) -> Self {
        let staging = Self::empty(name);
        raster
            .save(staging.path(), &crate::SaveOptions::default())
            .unwrap();
        staging
    }

    pub fn path(&self) -> &Path {
        &self.temp_path
    }
}

impl AsRef<Path> for TempFixture {
    fn as_ref(&self) -> &Path {
        self.path()
    }
}

/// Scoped value for temporarily suppressing thread-local GDAL log messages.
///
/// Useful for tests that expect GDAL errors and want to keep the output log clean
/// of distracting yet expected error messages.
pub(crate) struct SuppressGDALErrorLog {
    // Make !Sync and !Send, and force use of `new`.
    _private: PhantomData<*mut c_void>,
}

impl SuppressGDALErrorLog {
    pub(crate) fn new() -> Self {
        unsafe { gdal_sys::CPLPushErrorHandler(Some(gdal_sys::CPLQuietErrorHandler)) };
        SuppressGDALErrorLog {
            _private: PhantomData,
        }
    }
}

impl Drop for SuppressGDALErrorLog {
    fn drop(&mut self) {
        unsafe { gdal_sys::CPLPopErrorHandler() };
    }
}

/// 30 m UTM 45N transform rooted at (478000, 3108140).
pub const UTM_TRANSFORM: [f64; 6] = [30.0, 0.0, 478000.0, 0.0, -30.0, 3108140.0];
pub const UTM_EPSG: u32 = 32645;

/// Single band `f32` DEM where each pixel holds `row * width + col`.
pub fn ramp_dem(width: usize, height: usize) -> Raster {
    let data = Array2::from_shape_fn((height, width), |(r, c)| (r * width + c) as f32);
    Raster::from_array(data, UTM_TRANSFORM, UTM_EPSG, Some(-9999.0)).unwrap()
}

/// Multi band `i16` raster where band `b` holds `100 * b + row + col`.
pub fn multiband(count: usize, width: usize, height: usize, nodata: Option<f64>) -> Raster {
    let data = Array3::from_shape_fn((count, height, width), |(b, r, c)| {
        (100 * b + r + c) as i16
    });
    Raster::from_array(data, UTM_TRANSFORM, UTM_EPSG, nodata).unwrap()
}

/// Assert numerical difference between two expressions is less than
/// 64-bit machine epsilon or a specified epsilon.
///
/// # Examples:
/// ```rust, ignore
/// use std::f64::consts::{PI, E};
/// assert_near!(PI / E, 1.1557273497909217);
/// // with specified epsilon
/// assert_near!(PI / E, 1.15572734, epsilon = 1e-8);
/// ```
#[macro_export]
macro_rules! assert_near {
    ($left:expr, $right:expr) => {
        assert_near!($left, $right, epsilon = f64::EPSILON)
    };
    ($left:expr, $right:expr, epsilon = $ep:expr) => {
        assert!(
            ($left - $right).abs() < $ep,
            "|{} - {}| = {} is greater than epsilon {:.4e}",
            $left,
            $right,
            ($left - $right).abs(),
            $ep
        )
    };
    ($left:expr, $right:expr, epsilon = $ep:expr, field = $field:expr) => {
        assert!(
            ($left - $right).abs() < $ep,
            "field {}: |{} - {}| = {} is greater than epsilon {:.4e}",
            $field,
            $left,
            $right,
            ($left - $right).abs(),
            $ep
        )
    };
    // Pseudo-specialization
    (Bounds, $left:expr, $right:expr, epsilon = $ep:expr) => {
        assert_near!($left.left, $right.left, epsilon = $ep, field = "left");
        assert_near!($left.bottom, $right.bottom, epsilon = $ep, field = "bottom");
        assert_near!($left.right, $right.right, epsilon = $ep, field = "right");
        assert_near!($left.top, $right.top, epsilon = $ep, field = "top");
    };
}

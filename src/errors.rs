use std::ffi::NulError;
use std::path::PathBuf;

use gdal::errors::GdalError;
use gdal_sys::CPLErr;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Gdal(#[from] GdalError),
    #[error("CPL error class: '{class:?}', error number: '{number}', error msg: '{msg}'")]
    CplError {
        class: CPLErr::Type,
        number: i32,
        msg: String,
    },
    #[error("FfiNulError")]
    FfiNulError(#[from] NulError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Ndarray(#[from] ndarray::ShapeError),

    #[error("Bad argument: '{0}'")]
    BadArgument(String),
    #[error("Unrecognized {what}: '{value}', expected one of {expected}")]
    InvalidMode {
        what: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("Not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("File not found: '{}'", .0.display())]
    NotFound(PathBuf),
    #[error("No data loaded, and alternative blank value not set")]
    NoData,
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("Window at (row {row}, col {col}) of size {size} is outside of a {width}x{height} raster")]
    WindowOutOfBounds {
        row: isize,
        col: isize,
        size: usize,
        width: usize,
        height: usize,
    },
    #[error("Band {band} does not exist, raster has {count} band(s)")]
    InvalidBand { band: usize, count: usize },
}

use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub use gdal_sys::GDALDataType;

use crate::errors::{Error, Result};

/// Storage type of a raster band.
///
/// Pixels are always handled as `f64` in memory; the data type only decides how
/// GDAL stores them and how values are cast when the type changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    UInt8,
    UInt16,
    Int16,
    UInt32,
    Int32,
    Float32,
    Float64,
}

impl DataType {
    pub fn gdal_type(&self) -> GDALDataType::Type {
        match self {
            DataType::UInt8 => GDALDataType::GDT_Byte,
            DataType::UInt16 => GDALDataType::GDT_UInt16,
            DataType::Int16 => GDALDataType::GDT_Int16,
            DataType::UInt32 => GDALDataType::GDT_UInt32,
            DataType::Int32 => GDALDataType::GDT_Int32,
            DataType::Float32 => GDALDataType::GDT_Float32,
            DataType::Float64 => GDALDataType::GDT_Float64,
        }
    }

    pub fn from_gdal_type(value: GDALDataType::Type) -> Result<Self> {
        Ok(match value {
            GDALDataType::GDT_Byte => DataType::UInt8,
            GDALDataType::GDT_UInt16 => DataType::UInt16,
            GDALDataType::GDT_Int16 => DataType::Int16,
            GDALDataType::GDT_UInt32 => DataType::UInt32,
            GDALDataType::GDT_Int32 => DataType::Int32,
            GDALDataType::GDT_Float32 => DataType::Float32,
            GDALDataType::GDT_Float64 => DataType::Float64,
            other => {
                return Err(Error::BadArgument(format!(
                    "unsupported GDALDataType {other}"
                )))
            }
        })
    }

    /// numpy-style name, as reported in `dtypes`.
    pub fn name(&self) -> &'static str {
        match self {
            DataType::UInt8 => "uint8",
            DataType::UInt16 => "uint16",
            DataType::Int16 => "int16",
            DataType::UInt32 => "uint32",
            DataType::Int32 => "int32",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
        }
    }

    pub fn is_integer(&self) -> bool {
        !matches!(self, DataType::Float32 | DataType::Float64)
    }

    /// Convert `value` the way an array cast to this type would: truncation
    /// towards zero and saturation for integers, NaN becoming 0.
    pub fn cast(&self, value: f64) -> f64 {
        match self {
            DataType::UInt8 => value as u8 as f64,
            DataType::UInt16 => value as u16 as f64,
            DataType::Int16 => value as i16 as f64,
            DataType::UInt32 => value as u32 as f64,
            DataType::Int32 => value as i32 as f64,
            DataType::Float32 => value as f32 as f64,
            DataType::Float64 => value,
        }
    }

    /// Whether `value` is representable in this type: exactly for integers,
    /// within range for floats, where NaN and infinities are allowed.
    pub fn can_hold(&self, value: f64) -> bool {
        match self {
            DataType::Float64 => true,
            DataType::Float32 => !value.is_finite() || value.abs() <= f32::MAX as f64,
            _ => self.cast(value) == value,
        }
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "uint8" | "u8" | "byte" => DataType::UInt8,
            "uint16" | "u16" => DataType::UInt16,
            "int16" | "i16" => DataType::Int16,
            "uint32" | "u32" => DataType::UInt32,
            "int32" | "i32" => DataType::Int32,
            "float32" | "f32" => DataType::Float32,
            "float64" | "f64" | "float" => DataType::Float64,
            _ => {
                return Err(Error::BadArgument(format!(
                    "data type '{s}' not understood"
                )))
            }
        })
    }
}

/// Data type request for [`Raster::set_dtypes`](crate::Raster::set_dtypes).
#[derive(Debug, Clone, PartialEq)]
pub enum DtypeSpec {
    Single(DataType),
    PerBand(Vec<DataType>),
}

impl From<DataType> for DtypeSpec {
    fn from(value: DataType) -> Self {
        DtypeSpec::Single(value)
    }
}

impl From<Vec<DataType>> for DtypeSpec {
    fn from(value: Vec<DataType>) -> Self {
        DtypeSpec::PerBand(value)
    }
}

impl FromStr for DtypeSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(DtypeSpec::Single(s.parse()?))
    }
}

/// Primitive pixel types an array can be built from.
pub trait Pixel: Copy + gdal::raster::GdalType {
    const DTYPE: DataType;

    fn to_f64(self) -> f64;
}

macro_rules! impl_pixel {
    ($t:ty, $dtype:ident) => {
        impl Pixel for $t {
            const DTYPE: DataType = DataType::$dtype;

            fn to_f64(self) -> f64 {
                self as f64
            }
        }
    };
}

impl_pixel!(u8, UInt8);
impl_pixel!(u16, UInt16);
impl_pixel!(i16, Int16);
impl_pixel!(u32, UInt32);
impl_pixel!(i32, Int32);
impl_pixel!(f32, Float32);
impl_pixel!(f64, Float64);

/// Evaluate `$body` with `$t` bound to the primitive type matching `$dtype`.
macro_rules! with_pixel_type {
    ($dtype:expr, $t:ident => $body:expr) => {
        match $dtype {
            $crate::raster::DataType::UInt8 => {
                type $t = u8;
                $body
            }
            $crate::raster::DataType::UInt16 => {
                type $t = u16;
                $body
            }
            $crate::raster::DataType::Int16 => {
                type $t = i16;
                $body
            }
            $crate::raster::DataType::UInt32 => {
                type $t = u32;
                $body
            }
            $crate::raster::DataType::Int32 => {
                type $t = i32;
                $body
            }
            $crate::raster::DataType::Float32 => {
                type $t = f32;
                $body
            }
            $crate::raster::DataType::Float64 => {
                type $t = f64;
                $body
            }
        }
    };
}

pub(crate) use with_pixel_type;

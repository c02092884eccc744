//! Satellite and DEM products recognised from their file names.
//!
//! ```rust, no_run
//! use georaster::satimg::SatelliteImage;
//!
//! let img = SatelliteImage::open("srtm_06_01.tif")?;
//! assert_eq!(img.meta().product.as_deref(), Some("SRTMv4.1"));
//! println!("{}", img.width());
//! # Ok::<(), georaster::errors::Error>(())
//! ```

use std::ops::{Deref, DerefMut};
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};

use crate::config::RasterConfig;
use crate::errors::{Error, Result};
use crate::raster::{Raster, RasterArray};

/// Metadata parsed from a product file name. Unknown fields are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SatImgMeta {
    pub satellite: Option<String>,
    pub sensor: Option<String>,
    pub product: Option<String>,
    pub version: Option<String>,
    pub tile_name: Option<String>,
    pub datetime: Option<NaiveDateTime>,
}

fn srtm_date() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(2000, 2, 15)?.and_hms_opt(0, 0, 0)
}

fn digits(s: &str, range: std::ops::Range<usize>) -> Option<u32> {
    s.get(range)
        .filter(|d| d.bytes().all(|b| b.is_ascii_digit()))?
        .parse()
        .ok()
}

/// `YYYYMMDD`
fn parse_ymd(s: &str) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(digits(s, 0..4)? as i32, digits(s, 4..6)?, digits(s, 6..8)?)?
        .and_hms_opt(0, 0, 0)
}

/// `MMDDYYYYhhmmss`
fn parse_mdy_hms(s: &str) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(digits(s, 4..8)? as i32, digits(s, 0..2)?, digits(s, 2..4)?)?
        .and_hms_opt(digits(s, 8..10)?, digits(s, 10..12)?, digits(s, 12..14)?)
}

fn owned(s: &str) -> Option<String> {
    Some(s.to_string())
}

fn is_sw_tile(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 7
        && matches!(b[0].to_ascii_uppercase(), b'N' | b'S')
        && matches!(b[3].to_ascii_uppercase(), b'E' | b'W')
        && b[1..3].iter().chain(&b[4..7]).all(u8::is_ascii_digit)
}

/// Recognise the product a file belongs to from its name.
///
/// Supported: TanDEM-X (`TDM1_`), ArcticDEM/REMA (`SETSM_`), ASTER L1A
/// (`AST_L1A_`), IceBridge (`ILAKS1B_`), SRTM v4.1 (`srtm_`), ASTER GDEM
/// (`ASTGTM2_`), SRTMGL1 (`N00E015.hgt`) and NASADEM (`NASADEM_HGT_`).
pub fn parse_metadata_from_filename<P: AsRef<Path>>(name: P) -> SatImgMeta {
    let stem = name
        .as_ref()
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let parts: Vec<&str> = stem.split('_').collect();
    let part = |i: usize| parts.get(i).copied();

    let mut meta = SatImgMeta::default();
    match parts.as_slice() {
        ["TDM1", "DEM", ..] => {
            meta.satellite = owned("TanDEM-X");
            meta.sensor = owned("TanDEM-X");
            meta.product = owned("TDM1");
            meta.version = owned("1.0");
            meta.tile_name = part(4).map(str::to_string);
        }
        ["SETSM", sensor, date, ..] => {
            meta.satellite = owned("WorldView");
            meta.sensor = owned(sensor);
            meta.product = owned("ArcticDEM/REMA");
            meta.version = parts.iter().find(|p| p.starts_with('v')).map(|v| v.to_string());
            meta.datetime = parse_ymd(date);
        }
        ["AST", "L1A", id, ..] => {
            meta.satellite = owned("Terra");
            meta.sensor = owned("ASTER");
            meta.product = owned("L1A");
            meta.version = id.get(0..3).map(str::to_string);
            meta.datetime = id.get(3..17).and_then(parse_mdy_hms);
        }
        ["ILAKS1B", date, ..] => {
            meta.satellite = owned("IceBridge");
            meta.sensor = owned("UAF-LS");
            meta.product = owned("ILAKS1B");
            meta.datetime = parse_ymd(date);
        }
        ["srtm", x, y, ..] => {
            meta.satellite = owned("SRTM");
            meta.sensor = owned("SRTM");
            meta.product = owned("SRTMv4.1");
            meta.version = owned("v4.1");
            meta.tile_name = Some(format!("{x}_{y}"));
            meta.datetime = srtm_date();
        }
        ["ASTGTM2", tile, ..] => {
            meta.satellite = owned("Terra");
            meta.sensor = owned("ASTER");
            meta.product = owned("ASTGTM2");
            meta.version = owned("2");
            meta.tile_name = owned(tile);
        }
        ["NASADEM", "HGT", tile, ..] => {
            meta.satellite = owned("SRTM");
            meta.sensor = owned("SRTM");
            meta.product = owned("NASADEM-HGT");
            meta.version = owned("1");
            meta.tile_name = owned(tile);
            meta.datetime = srtm_date();
        }
        [tile] if is_sw_tile(tile) => {
            meta.satellite = owned("SRTM");
            meta.sensor = owned("SRTM");
            meta.product = owned("SRTMGL1");
            meta.version = owned("v3");
            meta.tile_name = owned(tile);
            meta.datetime = srtm_date();
        }
        _ => log::debug!("No product recognised in file name '{stem}'"),
    }
    meta
}

/// Latitude and longitude of the south-west corner named by `tile`, such as
/// `N14W065`, `W065N14` or `N014W065`.
pub fn sw_naming_to_latlon(tile: &str) -> Result<(i32, i32)> {
    let bad = || Error::BadArgument(format!("'{tile}' is not a south-west tile name"));
    let upper = tile.to_ascii_uppercase();

    let mut lat = None;
    let mut lon = None;
    let mut rest = upper.as_str();
    while let Some(hemisphere) = rest.chars().next() {
        if !hemisphere.is_ascii() {
            return Err(bad());
        }
        let end = rest[1..]
            .find(|c: char| !c.is_ascii_digit())
            .map_or(rest.len(), |i| i + 1);
        let value: i32 = rest[1..end].parse().map_err(|_| bad())?;
        match hemisphere {
            'N' => lat = Some(value),
            'S' => lat = Some(-value),
            'E' => lon = Some(value),
            'W' => lon = Some(-value),
            _ => return Err(bad()),
        }
        rest = &rest[end..];
    }
    Ok((lat.ok_or_else(bad)?, lon.ok_or_else(bad)?))
}

/// South-west corner tile name of the 1x1 degree tile holding `(lat, lon)`.
///
/// Latitude wraps into `[-90, 90)` and longitude into `[-180, 180)`.
pub fn latlon_to_sw_naming((lat, lon): (f64, f64)) -> String {
    let lat = (lat + 90.0).rem_euclid(180.0) - 90.0;
    let lon = (lon + 180.0).rem_euclid(360.0) - 180.0;
    let ns = if lat < 0.0 { 'S' } else { 'N' };
    let ew = if lon < 0.0 { 'W' } else { 'E' };
    format!(
        "{ns}{:02}{ew}{:03}",
        lat.floor().abs() as u32,
        lon.floor().abs() as u32
    )
}

/// A [`Raster`] carrying the metadata of the product it was read from.
#[derive(Debug)]
pub struct SatelliteImage {
    raster: Raster,
    meta: SatImgMeta,
}

impl SatelliteImage {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, &RasterConfig::default(), true)
    }

    /// Open `path`, parsing the product metadata from its name when
    /// `read_from_filename` is set.
    pub fn open_with<P: AsRef<Path>>(
        path: P,
        config: &RasterConfig,
        read_from_filename: bool,
    ) -> Result<Self> {
        let raster = Raster::open_with(path.as_ref(), config)?;
        let meta = match read_from_filename {
            true => parse_metadata_from_filename(path.as_ref()),
            false => SatImgMeta::default(),
        };
        Ok(Self { raster, meta })
    }

    pub fn from_raster(raster: Raster, meta: SatImgMeta) -> Self {
        Self { raster, meta }
    }

    pub fn meta(&self) -> &SatImgMeta {
        &self.meta
    }

    pub fn meta_mut(&mut self) -> &mut SatImgMeta {
        &mut self.meta
    }

    pub fn into_raster(self) -> Raster {
        self.raster
    }

    /// Independent copy, optionally with new pixels, keeping the metadata.
    pub fn copy(&self, new_array: Option<RasterArray>) -> Result<Self> {
        Ok(Self {
            raster: self.raster.copy(new_array)?,
            meta: self.meta.clone(),
        })
    }
}

impl Deref for SatelliteImage {
    type Target = Raster;

    fn deref(&self) -> &Raster {
        &self.raster
    }
}

impl DerefMut for SatelliteImage {
    fn deref_mut(&mut self) -> &mut Raster {
        &mut self.raster
    }
}

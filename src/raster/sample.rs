//! Pixel/coordinate conversions and value extraction.

use std::collections::BTreeMap;
use std::str::FromStr;

use ndarray::{s, Array1, Array2, Axis};

use crate::errors::{Error, Result};
use crate::interpolate::{interpolate, InterpMode};
use crate::raster::array::is_nodata;
use crate::raster::{LoadState, Raster};

/// Position within a pixel that a coordinate refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelOffset {
    Center,
    /// The pixel corner, also parsed from `"corner"`.
    UpperLeft,
    UpperRight,
    LowerLeft,
    LowerRight,
}

impl PixelOffset {
    /// Offset as `(col, row)` fractions of a pixel.
    fn fractions(&self) -> (f64, f64) {
        match self {
            PixelOffset::Center => (0.5, 0.5),
            PixelOffset::UpperLeft => (0.0, 0.0),
            PixelOffset::UpperRight => (1.0, 0.0),
            PixelOffset::LowerLeft => (0.0, 1.0),
            PixelOffset::LowerRight => (1.0, 1.0),
        }
    }
}

impl FromStr for PixelOffset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "center" => Ok(PixelOffset::Center),
            "corner" | "ul" => Ok(PixelOffset::UpperLeft),
            "ur" => Ok(PixelOffset::UpperRight),
            "ll" => Ok(PixelOffset::LowerLeft),
            "lr" => Ok(PixelOffset::LowerRight),
            _ => Err(Error::InvalidMode {
                what: "pixel offset",
                value: s.to_string(),
                expected: "center, corner, ul, ur, ll, lr",
            }),
        }
    }
}

/// Coordinates of every pixel, see [`Raster::coords`].
#[derive(Debug, Clone, PartialEq)]
pub enum PixelCoords {
    /// x per column and y per row.
    Axes { x: Array1<f64>, y: Array1<f64> },
    /// x and y of every pixel, shaped `(height, width)`.
    Grid { x: Array2<f64>, y: Array2<f64> },
}

/// Options of [`Raster::value_at_coords`].
pub struct SampleOptions<'a> {
    /// 1-based band; every band when `None`.
    pub band: Option<usize>,
    /// Leave nodata pixels out of the result.
    pub masked: bool,
    /// Odd side length of a square window centred on the pixel.
    pub window: Option<usize>,
    pub return_window: bool,
    /// Allow windows reaching past the raster edge, filled with nodata.
    pub boundless: bool,
    /// Reduces the window values; the mean by default.
    pub reducer: Option<&'a dyn Fn(&[f64]) -> Option<f64>>,
    /// Coordinates are longitude/latitude. Not supported yet.
    pub latlon: bool,
}

impl Default for SampleOptions<'_> {
    fn default() -> Self {
        Self {
            band: None,
            masked: false,
            window: None,
            return_window: false,
            boundless: true,
            reducer: None,
            latlon: false,
        }
    }
}

impl<'a> SampleOptions<'a> {
    pub fn with_band(mut self, band: usize) -> Self {
        self.band = Some(band);
        self
    }

    pub fn with_masked(mut self, masked: bool) -> Self {
        self.masked = masked;
        self
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = Some(window);
        self
    }

    pub fn with_return_window(mut self, return_window: bool) -> Self {
        self.return_window = return_window;
        self
    }

    pub fn with_boundless(mut self, boundless: bool) -> Self {
        self.boundless = boundless;
        self
    }

    pub fn with_reducer(mut self, reducer: &'a dyn Fn(&[f64]) -> Option<f64>) -> Self {
        self.reducer = Some(reducer);
        self
    }
}

/// Extracted value: one for a single band, or one per band number.
#[derive(Debug, Clone, PartialEq)]
pub enum Sample {
    Single(Option<f64>),
    PerBand(BTreeMap<usize, Option<f64>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SampleResult {
    pub value: Sample,
    /// Raw window of each band, when requested.
    pub windows: Option<BTreeMap<usize, Array2<f64>>>,
}

fn mean(values: &[f64]) -> Option<f64> {
    match values.len() {
        0 => None,
        n => Some(values.iter().sum::<f64>() / n as f64),
    }
}

impl Raster {
    /// Pixel `(row, col)` holding the coordinate `(x, y)`.
    ///
    /// Pixels far outside the raster saturate at the `isize` limits. Fails for
    /// coordinates without a pixel position, such as NaN.
    pub fn xy2ij(&self, x: f64, y: f64) -> Result<(isize, isize)> {
        let (col, row) = self.transform().inverse()?.apply(x, y);
        if !col.is_finite() || !row.is_finite() {
            return Err(Error::BadArgument(format!(
                "no pixel holds the coordinate ({x}, {y})"
            )));
        }
        Ok((row.floor() as isize, col.floor() as isize))
    }

    /// Coordinate of pixel `(i, j)` = `(row, col)`.
    pub fn ij2xy(&self, i: isize, j: isize, offset: PixelOffset) -> (f64, f64) {
        let (fc, fr) = offset.fractions();
        self.transform().apply(j as f64 + fc, i as f64 + fr)
    }

    /// Whether a column `xi` / row `yj` pair lies outside the raster. With
    /// `index` unset, `(xi, yj)` are coordinates and are converted first.
    pub fn outside_image(&self, xi: f64, yj: f64, index: bool) -> Result<bool> {
        let (xi, yj) = match index {
            true => (xi, yj),
            false => {
                let (row, col) = self.xy2ij(xi, yj)?;
                (col as f64, row as f64)
            }
        };
        Ok(!(xi >= 0.0 && yj >= 0.0 && xi < self.width() as f64 && yj < self.height() as f64))
    }

    /// Coordinates of every pixel.
    pub fn coords(&self, offset: PixelOffset, grid: bool) -> PixelCoords {
        let transform = self.transform();
        let (fc, fr) = offset.fractions();
        if grid {
            let (height, width) = self.shape();
            let x = Array2::from_shape_fn((height, width), |(r, c)| {
                transform.apply(c as f64 + fc, r as f64 + fr).0
            });
            let y = Array2::from_shape_fn((height, width), |(r, c)| {
                transform.apply(c as f64 + fc, r as f64 + fr).1
            });
            PixelCoords::Grid { x, y }
        } else {
            let x = Array1::from_shape_fn(self.width(), |c| transform.apply(c as f64 + fc, fr).0);
            let y = Array1::from_shape_fn(self.height(), |r| transform.apply(fc, r as f64 + fr).1);
            PixelCoords::Axes { x, y }
        }
    }

    fn check_band(&self, band: usize) -> Result<()> {
        if band == 0 || band > self.count() {
            return Err(Error::InvalidBand {
                band,
                count: self.count(),
            });
        }
        Ok(())
    }

    /// Square window of `size` pixels from `(row0, col0)` of the 1-based `band`,
    /// with a mask marking nodata and out-of-raster cells.
    fn sample_window(
        &self,
        band: usize,
        row0: isize,
        col0: isize,
        size: usize,
    ) -> Result<(Array2<f64>, Array2<bool>)> {
        let nodata = self.nodatavals()[band - 1];
        let fill = nodata.unwrap_or(0.0);
        let (height, width) = (self.height() as isize, self.width() as isize);
        let inside = |r: isize, c: isize| r >= 0 && c >= 0 && r < height && c < width;
        let is_nodata_value = |v: f64| nodata.map(|nd| is_nodata(v, nd)).unwrap_or(false);

        match self.load_state() {
            LoadState::Loaded(array) => {
                let mut values = Array2::from_elem((size, size), fill);
                let mut mask = Array2::from_elem((size, size), true);
                for ((i, j), v) in values.indexed_iter_mut() {
                    let (r, c) = (row0.saturating_add(i as isize), col0.saturating_add(j as isize));
                    if inside(r, c) {
                        let (r, c) = (r as usize, c as usize);
                        *v = array.data()[[band - 1, r, c]];
                        mask[[i, j]] = array.is_masked_at(band - 1, r, c) || is_nodata_value(*v);
                    }
                }
                Ok((values, mask))
            }
            LoadState::MetadataOnly => {
                let values =
                    self.handle()
                        .read_window_boundless(band, (col0, row0), (size, size), fill)?;
                let mask = Array2::from_shape_fn((size, size), |(i, j)| {
                    !inside(row0.saturating_add(i as isize), col0.saturating_add(j as isize))
                        || is_nodata_value(values[[i, j]])
                });
                Ok((values, mask))
            }
        }
    }

    /// Value(s) of the pixel holding `(x, y)`, or a reduction of the window
    /// centred on it.
    ///
    /// ```rust, no_run
    /// use georaster::{Raster, SampleOptions, Sample};
    ///
    /// let dem = Raster::open("dem.tif")?;
    /// let result = dem.value_at_coords(478015.0, 3108125.0, &SampleOptions::default().with_window(3))?;
    /// if let Sample::Single(Some(mean)) = result.value {
    ///     println!("3x3 mean: {mean}");
    /// }
    /// # Ok::<(), georaster::errors::Error>(())
    /// ```
    pub fn value_at_coords(&self, x: f64, y: f64, options: &SampleOptions<'_>) -> Result<SampleResult> {
        if options.latlon {
            return Err(Error::NotImplemented("sampling at longitude/latitude"));
        }
        if let Some(window) = options.window {
            if window % 2 != 1 {
                return Err(Error::BadArgument("Window must be an odd number.".to_string()));
            }
        }

        let (row, col) = self.xy2ij(x, y)?;
        let size = options.window.unwrap_or(1);
        let half = (size / 2) as isize;
        let (row0, col0) = (row.saturating_sub(half), col.saturating_sub(half));
        if !options.boundless {
            let (w, h) = (self.width() as isize, self.height() as isize);
            let span = size as isize;
            if row0 < 0
                || col0 < 0
                || row0.saturating_add(span) > h
                || col0.saturating_add(span) > w
            {
                return Err(Error::WindowOutOfBounds {
                    row: row0,
                    col: col0,
                    size,
                    width: self.width(),
                    height: self.height(),
                });
            }
        }

        let bands = match options.band {
            Some(band) => {
                self.check_band(band)?;
                vec![band]
            }
            None => self.indexes().to_vec(),
        };

        let mut values = BTreeMap::new();
        let mut windows = BTreeMap::new();
        for band in bands {
            let (window, mask) = self.sample_window(band, row0, col0, size)?;
            let value = match options.window {
                Some(_) => {
                    let kept: Vec<f64> = window
                        .iter()
                        .zip(mask.iter())
                        .filter(|(_, &m)| !(options.masked && m))
                        .map(|(&v, _)| v)
                        .collect();
                    match options.reducer {
                        Some(reducer) => reducer(&kept),
                        None => mean(&kept),
                    }
                }
                None => (!(options.masked && mask[[0, 0]])).then(|| window[[0, 0]]),
            };
            values.insert(band, value);
            windows.insert(band, window);
        }

        let value = match (options.band, values.len()) {
            (Some(_), _) | (None, 1) => Sample::Single(values.into_values().next().flatten()),
            _ => Sample::PerBand(values),
        };
        Ok(SampleResult {
            value,
            windows: options.return_window.then_some(windows),
        })
    }

    /// Interpolate band `band` (1-based) at each point.
    ///
    /// Each point uses the pixels within `nsize` rows and columns of the pixel
    /// holding it. Points outside the raster, or whose interpolation fails,
    /// yield NaN.
    pub fn interp_points(
        &self,
        points: &[(f64, f64)],
        nsize: usize,
        mode: InterpMode,
        band: usize,
    ) -> Result<Vec<f64>> {
        self.check_band(band)?;
        let array = self.current_array()?;
        let mut values = array.band(band - 1).to_owned();
        if let Some(mask) = array.mask() {
            ndarray::Zip::from(&mut values)
                .and(&mask.index_axis(Axis(0), band - 1))
                .for_each(|v, &m| {
                    if m {
                        *v = f64::NAN
                    }
                });
        }

        let PixelCoords::Axes { x: xx, y: yy } = self.coords(PixelOffset::Center, false) else {
            unreachable!("coords without grid returns axes")
        };
        let (height, width) = self.shape();
        let n = nsize as isize;

        let mut out = Vec::with_capacity(points.len());
        for &(x, y) in points {
            if !x.is_finite() || !y.is_finite() {
                out.push(f64::NAN);
                continue;
            }
            let (row, col) = self.xy2ij(x, y)?;
            if self.outside_image(col as f64, row as f64, true)? {
                out.push(f64::NAN);
                continue;
            }
            let r0 = (row - n).max(0) as usize;
            let c0 = (col - n).max(0) as usize;
            let r1 = ((row + n + 1) as usize).min(height);
            let c1 = ((col + n + 1) as usize).min(width);
            let xs = xx.slice(s![c0..c1]).to_vec();
            let ys = yy.slice(s![r0..r1]).to_vec();
            let z = values.slice(s![r0..r1, c0..c1]);

            let value = match interpolate(&xs, &ys, z, x, y, mode) {
                Ok(value) => value,
                Err(e) => {
                    log::warn!("Interpolation failed for ({x}, {y}) at row {row}, col {col}: {e}");
                    log::debug!("x: {xs:?}\ny: {ys:?}\nz: {z}");
                    f64::NAN
                }
            };
            out.push(value);
        }
        Ok(out)
    }
}

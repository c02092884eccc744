//! Reprojection and resampling onto a new grid.

use std::ffi::{c_int, CString};
use std::path::PathBuf;
use std::ptr::{null, null_mut};
use std::str::FromStr;

use gdal::spatial_ref::CoordTransform;
use gdal_sys::GDALResampleAlg;

use crate::bounds::Bounds;
use crate::config::RasterConfig;
use crate::crs::{Crs, CrsSpec};
use crate::errors::{Error, Result};
use crate::geo_transform::Transform;
use crate::raster::handle::{DatasetHandle, Profile};
use crate::raster::{DataType, Raster, RasterArray, RasterData};
use crate::utils::{_check_rc, _last_cpl_err};

/// Resampling algorithm used when warping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resampling {
    #[default]
    Nearest,
    Bilinear,
    Cubic,
    CubicSpline,
    Lanczos,
    Average,
    Mode,
    Max,
    Min,
    Med,
    Q1,
    Q3,
}

impl Resampling {
    pub fn to_gdal(&self) -> GDALResampleAlg::Type {
        match self {
            Resampling::Nearest => GDALResampleAlg::GRA_NearestNeighbour,
            Resampling::Bilinear => GDALResampleAlg::GRA_Bilinear,
            Resampling::Cubic => GDALResampleAlg::GRA_Cubic,
            Resampling::CubicSpline => GDALResampleAlg::GRA_CubicSpline,
            Resampling::Lanczos => GDALResampleAlg::GRA_Lanczos,
            Resampling::Average => GDALResampleAlg::GRA_Average,
            Resampling::Mode => GDALResampleAlg::GRA_Mode,
            Resampling::Max => GDALResampleAlg::GRA_Max,
            Resampling::Min => GDALResampleAlg::GRA_Min,
            Resampling::Med => GDALResampleAlg::GRA_Med,
            Resampling::Q1 => GDALResampleAlg::GRA_Q1,
            Resampling::Q3 => GDALResampleAlg::GRA_Q3,
        }
    }
}

impl FromStr for Resampling {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "nearest" => Resampling::Nearest,
            "bilinear" => Resampling::Bilinear,
            "cubic" => Resampling::Cubic,
            "cubic_spline" => Resampling::CubicSpline,
            "lanczos" => Resampling::Lanczos,
            "average" => Resampling::Average,
            "mode" => Resampling::Mode,
            "max" => Resampling::Max,
            "min" => Resampling::Min,
            "med" => Resampling::Med,
            "q1" => Resampling::Q1,
            "q3" => Resampling::Q3,
            _ => {
                return Err(Error::InvalidMode {
                    what: "resampling",
                    value: s.to_string(),
                    expected: "nearest, bilinear, cubic, cubic_spline, lanczos, average, mode, \
                               max, min, med, q1, q3",
                })
            }
        })
    }
}

/// A raster whose grid (CRS, size and bounds) is copied by [`Raster::reproject`].
#[derive(Debug)]
pub enum ReferenceGrid<'a> {
    Raster(&'a Raster),
    /// Opened without loading pixels.
    Path(PathBuf),
}

impl<'a> From<&'a Raster> for ReferenceGrid<'a> {
    fn from(raster: &'a Raster) -> Self {
        ReferenceGrid::Raster(raster)
    }
}

impl From<PathBuf> for ReferenceGrid<'_> {
    fn from(path: PathBuf) -> Self {
        ReferenceGrid::Path(path)
    }
}

impl ReferenceGrid<'_> {
    fn grid(&self) -> Result<(Crs, (usize, usize), Bounds)> {
        let opened;
        let raster = match self {
            ReferenceGrid::Raster(raster) => *raster,
            ReferenceGrid::Path(path) => {
                opened = Raster::open_with(path, &RasterConfig::default().with_load_data(false))?;
                &opened
            }
        };
        let crs = raster
            .crs()
            .cloned()
            .ok_or_else(|| Error::BadArgument("reference raster has no CRS".to_string()))?;
        Ok((crs, (raster.width(), raster.height()), raster.bounds()))
    }
}

/// Target grid of [`Raster::reproject`].
///
/// Exactly one of `dst_ref` and `dst_crs` must be given, and at most one of
/// `dst_size` and `dst_res`.
#[derive(Debug, Default)]
pub struct ReprojectOptions<'a> {
    pub dst_ref: Option<ReferenceGrid<'a>>,
    pub dst_crs: Option<CrsSpec>,
    /// `(width, height)` in pixels.
    pub dst_size: Option<(usize, usize)>,
    pub dst_bounds: Option<Bounds>,
    /// `(x, y)` pixel size in target CRS units.
    pub dst_res: Option<(f64, f64)>,
    /// Nodata of the output raster. Defaults to the source nodata.
    pub nodata: Option<f64>,
    /// Storage type of the output raster. Defaults to the type of band 1.
    pub dtype: Option<DataType>,
    pub resampling: Resampling,
}

impl<'a> ReprojectOptions<'a> {
    pub fn to_ref<R: Into<ReferenceGrid<'a>>>(dst_ref: R) -> Self {
        Self {
            dst_ref: Some(dst_ref.into()),
            ..Default::default()
        }
    }

    pub fn to_crs<C: Into<CrsSpec>>(dst_crs: C) -> Self {
        Self {
            dst_crs: Some(dst_crs.into()),
            ..Default::default()
        }
    }

    pub fn with_size(mut self, width: usize, height: usize) -> Self {
        self.dst_size = Some((width, height));
        self
    }

    pub fn with_bounds<B: Into<Bounds>>(mut self, bounds: B) -> Self {
        self.dst_bounds = Some(bounds.into());
        self
    }

    pub fn with_res(mut self, xres: f64, yres: f64) -> Self {
        self.dst_res = Some((xres, yres));
        self
    }

    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.nodata = Some(nodata);
        self
    }

    pub fn with_dtype(mut self, dtype: DataType) -> Self {
        self.dtype = Some(dtype);
        self
    }

    pub fn with_resampling(mut self, resampling: Resampling) -> Self {
        self.resampling = resampling;
        self
    }
}

/// Warp every band of `src` onto the grid of `dst`.
pub(crate) fn reproject_dataset(
    src: &DatasetHandle,
    dst: &DatasetHandle,
    resampling: Resampling,
) -> Result<()> {
    let rv = unsafe {
        gdal_sys::GDALReprojectImage(
            src.c_dataset(),
            null(),
            dst.c_dataset(),
            null(),
            resampling.to_gdal(),
            0.0,
            0.0,
            None,
            null_mut(),
            null_mut(),
        )
    };
    _check_rc(rv)
}

/// GDAL's suggested output grid for warping `src` into `dst_crs`, as
/// `(width, height, transform)`.
pub(crate) fn suggested_warp_output(
    src: &DatasetHandle,
    dst_crs: &Crs,
) -> Result<(usize, usize, Transform)> {
    let dst_wkt = CString::new(dst_crs.to_wkt()?)?;
    let c_dataset = src.c_dataset();
    let transformer = unsafe {
        gdal_sys::GDALCreateGenImgProjTransformer(
            c_dataset,
            null(),
            null_mut(),
            dst_wkt.as_ptr(),
            0,
            0.0,
            0,
        )
    };
    if transformer.is_null() {
        return Err(_last_cpl_err(gdal_sys::CPLErr::CE_Failure));
    }
    let mut gt = [0.0; 6];
    let (mut pixels, mut lines): (c_int, c_int) = (0, 0);
    let rv = unsafe {
        let rv = gdal_sys::GDALSuggestedWarpOutput(
            c_dataset,
            Some(gdal_sys::GDALGenImgProjTransform),
            transformer,
            gt.as_mut_ptr(),
            &mut pixels,
            &mut lines,
        );
        gdal_sys::GDALDestroyGenImgProjTransformer(transformer);
        rv
    };
    _check_rc(rv)?;
    Ok((pixels as usize, lines as usize, Transform::from_gdal(&gt)))
}

impl Raster {
    /// In-memory `MEM` copy of the current pixels, the source of every warp.
    fn warp_source(&self) -> Result<DatasetHandle> {
        let array = self.current_array()?;
        let profile = Profile {
            driver: "MEM".to_string(),
            ..self.profile()?
        };
        let mut src = DatasetHandle::create(&profile)?;
        src.write(&array)?;
        Ok(src)
    }

    /// Warp the current pixels onto the grid described by `profile`. Cells
    /// receiving no data are set to the profile's nodata, or 0 without one.
    pub(crate) fn warp_to(&self, profile: &Profile, resampling: Resampling) -> Result<RasterArray> {
        let src = self.warp_source()?;
        let mut dst = DatasetHandle::create(&Profile {
            driver: "MEM".to_string(),
            ..profile.clone()
        })?;
        if let Some(nodata) = profile.nodata() {
            dst.fill(nodata)?;
        }
        reproject_dataset(&src, &dst, resampling)?;
        dst.read(None, false)
    }

    /// Reproject onto a new grid, returning a new raster.
    ///
    /// The pixels are warped from memory, loading them first if needed.
    ///
    /// ```rust, no_run
    /// use georaster::{Raster, ReprojectOptions, Resampling};
    ///
    /// let dem = Raster::open("dem.tif")?;
    /// let utm = dem.reproject(
    ///     &ReprojectOptions::to_crs(32645)
    ///         .with_res(30.0, 30.0)
    ///         .with_resampling(Resampling::Bilinear),
    /// )?;
    /// # Ok::<(), georaster::errors::Error>(())
    /// ```
    pub fn reproject(&self, options: &ReprojectOptions<'_>) -> Result<Raster> {
        let (dst_crs, dst_size, dst_bounds, dst_res) =
            match (&options.dst_ref, &options.dst_crs) {
                (Some(_), Some(_)) => {
                    return Err(Error::BadArgument(
                        "Either of `dst_ref` or `dst_crs` must be set. Not both.".to_string(),
                    ))
                }
                (None, None) => {
                    return Err(Error::BadArgument(
                        "One of `dst_ref` or `dst_crs` must be set.".to_string(),
                    ))
                }
                (Some(reference), None) => {
                    let (crs, size, bounds) = reference.grid()?;
                    (crs, Some(size), Some(bounds), None)
                }
                (None, Some(crs)) => (
                    Crs::try_from(crs.clone())?,
                    options.dst_size,
                    options.dst_bounds,
                    options.dst_res,
                ),
            };
        if dst_size.is_some() && dst_res.is_some() {
            return Err(Error::BadArgument(
                "dst_size and dst_res both specified. Specify only one.".to_string(),
            ));
        }

        let (width, height, transform) = match (dst_size, dst_bounds, dst_res) {
            (Some((width, height)), Some(bounds), _) => {
                (width, height, Transform::from_bounds(&bounds, width, height))
            }
            (None, Some(bounds), Some(res)) => {
                let (width, height) = size_for_resolution(&bounds, res);
                let transform = Transform::new(res.0, 0.0, bounds.left, 0.0, -res.1, bounds.top);
                (width, height, transform)
            }
            (size, bounds, res) => {
                let (sw, sh, suggested) = suggested_warp_output(&self.warp_source()?, &dst_crs)?;
                let suggested_bounds = Bounds::from_transform(&suggested, sw, sh);
                match (size, bounds, res) {
                    (Some((width, height)), _, _) => (
                        width,
                        height,
                        Transform::from_bounds(&suggested_bounds, width, height),
                    ),
                    (None, Some(bounds), _) => {
                        let (width, height) = size_for_resolution(&bounds, suggested.resolution());
                        (width, height, Transform::from_bounds(&bounds, width, height))
                    }
                    (None, None, Some(res)) => {
                        let (width, height) = size_for_resolution(&suggested_bounds, res);
                        let transform = Transform::new(
                            res.0,
                            0.0,
                            suggested_bounds.left,
                            0.0,
                            -res.1,
                            suggested_bounds.top,
                        );
                        (width, height, transform)
                    }
                    (None, None, None) => (sw, sh, suggested),
                }
            }
        };

        let dtype = match options.dtype {
            Some(dtype) => dtype,
            None => self.profile()?.dtype,
        };
        let count = self.count();
        let dst_nodata = options.nodata.or(self.nodata());
        let profile = Profile {
            driver: "MEM".to_string(),
            width,
            height,
            count,
            dtype,
            crs: Some(dst_crs.clone()),
            transform,
            nodata: vec![dst_nodata; count],
        };
        let array = self.warp_to(&profile, options.resampling)?;
        Raster::from_array_typed(
            RasterData::new(array, dtype),
            transform,
            dst_crs,
            dst_nodata,
            dtype,
        )
    }

    /// Bounds reprojected into `out_crs`.
    ///
    /// Each edge is densified with `min(max(width, height), densify_pts_max)`
    /// points so that curved edges are enclosed.
    pub fn bounds_projected<C: Into<CrsSpec>>(
        &self,
        out_crs: C,
        densify_pts_max: usize,
    ) -> Result<Bounds> {
        let src_crs = self
            .crs()
            .ok_or_else(|| Error::BadArgument("raster has no CRS".to_string()))?;
        let dst_crs = Crs::try_from(out_crs.into())?;
        let densify_pts = self.width().max(self.height()).min(densify_pts_max);
        let bounds = self.bounds();

        let n = densify_pts + 2;
        let mut xs = Vec::with_capacity(4 * n);
        let mut ys = Vec::with_capacity(4 * n);
        for i in 0..n {
            let t = i as f64 / (n - 1) as f64;
            let x = bounds.left + t * bounds.width();
            let y = bounds.bottom + t * bounds.height();
            xs.extend([x, x, bounds.left, bounds.right]);
            ys.extend([bounds.bottom, bounds.top, y, y]);
        }
        let mut zs = vec![0.0; xs.len()];
        let transform = CoordTransform::new(src_crs.spatial_ref(), dst_crs.spatial_ref())?;
        transform.transform_coords(&mut xs, &mut ys, &mut zs)?;

        let mut out = Bounds::new(
            f64::INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
        );
        for (&x, &y) in xs.iter().zip(&ys).filter(|(x, y)| x.is_finite() && y.is_finite()) {
            out.left = out.left.min(x);
            out.right = out.right.max(x);
            out.bottom = out.bottom.min(y);
            out.top = out.top.max(y);
        }
        Ok(out)
    }
}

/// Pixel count fitting `bounds` at `res`, rounded up.
fn size_for_resolution(bounds: &Bounds, res: (f64, f64)) -> (usize, usize) {
    (
        (bounds.width() / res.0).ceil() as usize,
        (bounds.height().abs() / res.1).ceil() as usize,
    )
}

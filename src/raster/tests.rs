use std::collections::BTreeMap;

use ndarray::{s, Array2, Array3};

use crate::config::RasterConfig;
use crate::errors::Error;
use crate::interpolate::InterpMode;
use crate::raster::{
    CropMode, DataType, DatasetAttrs, DtypeSpec, PixelCoords, PixelOffset, Raster, RasterArray,
    RasterSource, ReprojectOptions, Sample, SampleOptions,
};
use crate::test_utils::{
    multiband, ramp_dem, SuppressGDALErrorLog, TempFixture, UTM_EPSG, UTM_TRANSFORM,
};
use crate::{assert_near, Bounds, SaveOptions, Transform};

fn subgrid(col_off: usize, row_off: usize, width: usize, height: usize) -> Raster {
    let [a, b, c, d, e, f] = UTM_TRANSFORM;
    let transform = Transform::new(
        a,
        b,
        c + a * col_off as f64,
        d,
        e,
        f + e * row_off as f64,
    );
    Raster::from_array(Array2::<u8>::zeros((height, width)), transform, UTM_EPSG, None).unwrap()
}

#[test]
fn test_open_missing() {
    let err = Raster::open("no_such_file.tif").unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn test_from_array_attributes() {
    let dem = ramp_dem(10, 8);
    assert_eq!(dem.shape(), (8, 10));
    assert_eq!(dem.count(), 1);
    assert_eq!(dem.indexes(), &[1]);
    assert_eq!(dem.res(), (30.0, 30.0));
    assert_eq!(dem.nodata(), Some(-9999.0));
    assert_eq!(dem.dtypes(), &[DataType::Float32]);
    assert_eq!(dem.crs().and_then(|crs| crs.to_epsg()), Some(UTM_EPSG));
    assert_eq!(dem.source(), &RasterSource::Array);
    assert_eq!(dem.filename(), None);
    assert_eq!(
        dem.bounds(),
        Bounds::new(478000.0, 3108140.0 - 8.0 * 30.0, 478300.0, 3108140.0)
    );
    assert_eq!(dem.data().unwrap().get(0, 2, 3), Some(23.0));
}

#[test]
fn test_from_array_bad_transform() {
    let data = Array2::<f32>::zeros((2, 2));
    let err = Raster::from_array(data, vec![30.0, 0.0, 478000.0], UTM_EPSG, None).unwrap_err();
    assert!(matches!(err, Error::BadArgument(_)));
}

#[test]
fn test_from_array_nodata_out_of_range() {
    let data = Array2::<u8>::zeros((2, 2));
    let err = Raster::from_array(data, UTM_TRANSFORM, UTM_EPSG, Some(-1.0)).unwrap_err();
    assert!(matches!(err, Error::BadArgument(_)));
}

#[test]
fn test_save_and_reopen() {
    let dem = ramp_dem(10, 8);
    let fixture = TempFixture::saved("dem.tif", &dem);
    let saved = Raster::open(&fixture).unwrap();

    assert_eq!(saved.transform(), dem.transform());
    assert_eq!(saved.crs().and_then(|crs| crs.to_epsg()), Some(UTM_EPSG));
    assert_eq!(saved.nodata(), Some(-9999.0));
    assert_eq!(saved.dtypes(), &[DataType::Float32]);
    assert_eq!(saved.data().unwrap().data(), dem.data().unwrap().data());
    assert_eq!(saved.driver(), "GTiff");
    assert!(saved.filename().is_some_and(|p| p.is_absolute()));
    assert_eq!(saved.matches_disk(), Some(true));
}

#[test]
fn test_save_without_data() {
    let fixture = TempFixture::saved("dem.tif", &ramp_dem(4, 4));
    let lazy = Raster::open_with(&fixture, &RasterConfig::default().with_load_data(false)).unwrap();
    assert!(!lazy.is_loaded());
    assert!(matches!(lazy.data(), Err(Error::NoData)));

    let out = TempFixture::empty("out.tif");
    let err = lazy.save(&out, &SaveOptions::default()).unwrap_err();
    assert!(matches!(err, Error::NoData));
}

#[test]
fn test_from_buffer() {
    let fixture = TempFixture::saved("dem.tif", &ramp_dem(6, 5));
    let bytes = std::fs::read(&fixture).unwrap();
    let raster = Raster::from_buffer(bytes).unwrap();
    assert_eq!(raster.filename(), None);
    assert_eq!(raster.matches_disk(), None);
    assert_eq!(raster.shape(), (5, 6));
    assert_eq!(raster.data().unwrap().get(0, 4, 5), Some(29.0));
}

#[test]
fn test_open_as_memfile() {
    let fixture = TempFixture::saved("dem.tif", &ramp_dem(6, 5));
    let raster = Raster::open_with(&fixture, &RasterConfig::default().with_memfile(true)).unwrap();
    assert!(raster.filename().is_some());
    assert_eq!(raster.data().unwrap().get(0, 1, 1), Some(7.0));
}

#[test]
fn test_load_band_subset() {
    let fixture = TempFixture::saved("multi.tif", &multiband(3, 5, 4, Some(-1.0)));
    let mut raster =
        Raster::open_with(&fixture, &RasterConfig::default().with_load_data(false)).unwrap();
    assert_eq!(raster.count(), 3);

    raster.load(Some(&[2])).unwrap();
    assert_eq!(raster.count(), 1);
    assert_eq!(raster.data().unwrap().count(), 1);
    assert_eq!(raster.data().unwrap().get(0, 1, 2), Some(103.0));
    assert_eq!(raster.nodatavals(), &[Some(-1.0)]);
    assert_eq!(raster.matches_disk(), Some(true));

    let opened =
        Raster::open_with(&fixture, &RasterConfig::default().with_bands(vec![3, 1])).unwrap();
    assert_eq!(opened.count(), 2);
    assert_eq!(opened.data().unwrap().get(0, 0, 0), Some(200.0));
    assert_eq!(opened.data().unwrap().get(1, 0, 0), Some(0.0));
    assert_eq!(opened.matches_disk(), Some(true));
}

#[test]
fn test_masked_load() {
    let mut data = Array2::from_shape_fn((3, 3), |(r, c)| (r * 3 + c) as f32);
    data[[1, 1]] = -9999.0;
    let dem = Raster::from_array(data.clone(), UTM_TRANSFORM, UTM_EPSG, Some(-9999.0)).unwrap();
    assert!(dem.data().unwrap().is_masked_at(0, 1, 1));
    assert_eq!(dem.data().unwrap().get(0, 1, 1), None);

    let fixture = TempFixture::saved("dem.tif", &dem);
    let unmasked = Raster::open_with(&fixture, &RasterConfig::default().with_masked(false)).unwrap();
    assert!(!unmasked.data().unwrap().is_masked());
    assert_eq!(unmasked.data().unwrap().get(0, 1, 1), Some(-9999.0));

    let mask = dem.dataset_mask().unwrap();
    assert!(!mask[[1, 1]]);
    assert!(mask[[0, 0]]);
}

#[test]
fn test_set_data_shape_mismatch() {
    let mut dem = ramp_dem(4, 3);
    let err = dem
        .set_data(RasterArray::new(Array3::zeros((1, 4, 3))))
        .unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch { .. }));

    dem.set_data(RasterArray::new(Array3::ones((1, 3, 4)))).unwrap();
    assert_eq!(dem.data().unwrap().get(0, 2, 3), Some(1.0));
}

#[test]
fn test_crop_match_pixel() {
    let fixture = TempFixture::saved("dem.tif", &ramp_dem(10, 10));
    let mut dem = Raster::open(&fixture).unwrap();
    let reference = subgrid(2, 3, 4, 3);
    let expected = dem.intersection(&reference).unwrap().unwrap();

    dem.crop(&reference, CropMode::MatchPixel).unwrap();
    assert_eq!(dem.bounds(), expected);
    assert_eq!(dem.shape(), (3, 4));
    assert_eq!(dem.res(), (30.0, 30.0));
    assert_eq!(dem.data().unwrap().get(0, 0, 0), Some(32.0));
    assert_eq!(dem.data().unwrap().get(0, 2, 3), Some(55.0));
    assert_eq!(dem.matches_disk(), Some(false));
}

#[test]
fn test_crop_match_pixel_partial_pixels() {
    let mut dem = ramp_dem(10, 10);
    let [_, _, left, _, _, top] = UTM_TRANSFORM;
    // every pixel touched by the rectangle is kept
    let bounds = (left + 65.0, top - 200.0, left + 125.0, top - 95.0);
    dem.crop(bounds, CropMode::MatchPixel).unwrap();
    assert_eq!(
        dem.bounds(),
        Bounds::new(left + 60.0, top - 210.0, left + 150.0, top - 90.0)
    );
    assert_eq!(dem.data().unwrap().get(0, 0, 0), Some(32.0));
}

#[test]
fn test_crop_match_extent() {
    let mut dem = ramp_dem(10, 10);
    let [_, _, left, _, _, top] = UTM_TRANSFORM;
    let bounds = Bounds::new(left + 60.0, top - 150.0, left + 180.0, top - 60.0);
    dem.crop(bounds, CropMode::MatchExtent).unwrap();
    assert_eq!(dem.shape(), (3, 4));
    assert_eq!(dem.bounds(), bounds);
    assert_eq!(dem.data().unwrap().get(0, 0, 0), Some(22.0));
}

#[test]
fn test_crop_errors() {
    let mut dem = ramp_dem(10, 10);
    let far = (0.0, 0.0, 10.0, 10.0);
    assert!(matches!(
        dem.crop(far, CropMode::MatchPixel),
        Err(Error::BadArgument(_))
    ));
    let point = geo_types::Geometry::Point(geo_types::Point::new(478100.0, 3108000.0));
    assert!(matches!(
        dem.crop(point, CropMode::MatchPixel),
        Err(Error::NotImplemented(_))
    ));
}

#[test_log::test]
fn test_intersection() {
    let dem = ramp_dem(10, 10);
    let inside = subgrid(2, 3, 4, 3);
    assert_eq!(dem.intersection(&inside).unwrap(), Some(inside.bounds()));

    let outside = subgrid(20, 0, 4, 3);
    assert_eq!(dem.intersection(&outside).unwrap(), None);

    let other_crs = Raster::from_array(
        Array2::<u8>::zeros((2, 2)),
        [0.001, 0.0, 86.0, 0.0, -0.001, 28.0],
        4326,
        None,
    )
    .unwrap();
    assert!(matches!(
        dem.intersection(&other_crs),
        Err(Error::NotImplemented(_))
    ));
}

#[test]
fn test_copy_is_independent() {
    let mut dem = ramp_dem(5, 4);
    dem.data_mut().unwrap().map_inplace(|v| *v += 5.0);
    let copy = dem.copy(None).unwrap();

    assert_eq!(copy.bounds(), dem.bounds());
    assert_eq!(copy.crs(), dem.crs());
    assert_eq!(copy.transform(), dem.transform());
    assert_eq!(copy.res(), dem.res());
    assert_eq!(copy.nodata(), dem.nodata());
    assert_eq!(copy.dtypes(), dem.dtypes());
    assert_eq!(copy.filename(), None);
    assert_eq!(copy.data().unwrap(), dem.data().unwrap());

    dem.data_mut().unwrap().map_inplace(|v| *v += 5.0);
    assert_ne!(copy.data().unwrap(), dem.data().unwrap());
}

#[test]
fn test_copy_with_new_array() {
    let dem = ramp_dem(5, 4);
    let copy = dem
        .copy(Some(RasterArray::new(Array3::from_elem((1, 4, 5), 2.0))))
        .unwrap();
    assert_eq!(copy.bounds(), dem.bounds());
    assert!(copy.data().unwrap().data().iter().all(|&v| v == 2.0));
}

#[test_log::test]
fn test_set_ndv_broadcast() {
    let mut raster = multiband(3, 5, 4, None);
    raster.set_ndv(5.0, false).unwrap();
    assert_eq!(raster.nodatavals(), &[Some(5.0); 3]);

    raster.set_ndv(vec![1.0, 2.0, 3.0], false).unwrap();
    assert_eq!(raster.nodatavals(), &[Some(1.0), Some(2.0), Some(3.0)]);

    let err = raster.set_ndv(vec![1.0, 2.0], false).unwrap_err();
    assert!(matches!(err, Error::BadArgument(_)));

    let mut dem = ramp_dem(4, 3);
    dem.set_ndv(vec![-1.0, -2.0], false).unwrap();
    assert_eq!(dem.nodatavals(), &[Some(-1.0)]);
}

#[test]
fn test_set_ndv_update_array() {
    let mut data = Array2::from_shape_fn((3, 4), |(r, c)| (r * 4 + c) as f32);
    data[[2, 1]] = -9999.0;
    let mut dem = Raster::from_array(data, UTM_TRANSFORM, UTM_EPSG, Some(-9999.0)).unwrap();

    dem.set_ndv(-1.0, true).unwrap();
    assert_eq!(dem.nodata(), Some(-1.0));
    let array = dem.data().unwrap();
    assert_eq!(array.data()[[0, 2, 1]], -1.0);
    assert!(array.is_masked_at(0, 2, 1));
    assert_eq!(array.get(0, 0, 0), Some(0.0));
    assert_eq!(dem.matches_disk(), Some(false));

    let err = dem.set_ndv(f64::MAX, false);
    assert!(err.is_err());
}

#[test]
fn test_set_ndv_keeps_old_nodata_cells() {
    let mut data = Array2::from_shape_fn((3, 4), |(r, c)| (r * 4 + c) as f32);
    data[[2, 1]] = -9999.0;
    let mut dem = Raster::from_array(data, UTM_TRANSFORM, UTM_EPSG, Some(-9999.0)).unwrap();

    dem.set_ndv(-1.0, false).unwrap();
    let array = dem.data().unwrap();
    assert_eq!(array.get(0, 2, 1), Some(-9999.0));
    assert_eq!(array.get(0, 0, 0), Some(0.0));
}

#[test]
fn test_float_nodata_in_range() {
    let data = Array2::from_shape_fn((3, 4), |(r, c)| (r * 4 + c) as f32);
    let mut dem = Raster::from_array(data, UTM_TRANSFORM, UTM_EPSG, Some(0.1)).unwrap();
    assert_near!(dem.nodata().unwrap(), 0.1, epsilon = 1e-6);

    dem.set_ndv(-0.3, false).unwrap();
    assert_near!(dem.nodata().unwrap(), -0.3, epsilon = 1e-6);
    assert!(matches!(dem.set_ndv(1e39, false), Err(Error::BadArgument(_))));

    let mut ints = multiband(1, 3, 3, None);
    assert!(matches!(ints.set_ndv(0.1, false), Err(Error::BadArgument(_))));
}

#[test_log::test]
fn test_set_dtypes() {
    let mut dem = ramp_dem(4, 3);
    dem.data_mut().unwrap().map_inplace(|v| *v += 0.6);
    dem.set_dtypes(DataType::Int32, true).unwrap();
    assert_eq!(dem.dtypes(), &[DataType::Int32]);
    assert_eq!(dem.data().unwrap().get(0, 0, 1), Some(1.0));

    let mut raster = multiband(2, 3, 3, None);
    raster
        .set_dtypes(DtypeSpec::PerBand(vec![DataType::Float32, DataType::Int32]), false)
        .unwrap();
    assert_eq!(raster.dtypes(), &[DataType::Float32; 2]);
}

#[test]
fn test_shift() {
    let fixture = TempFixture::saved("dem.tif", &ramp_dem(5, 4));
    let mut dem = Raster::open(&fixture).unwrap();
    let before = dem.bounds();
    let data = dem.data().unwrap().clone();

    dem.shift(100.0, -50.0).unwrap();
    let expected = Bounds::new(
        before.left + 100.0,
        before.bottom - 50.0,
        before.right + 100.0,
        before.top - 50.0,
    );
    assert_near!(Bounds, dem.bounds(), expected, epsilon = 1e-6);
    assert_eq!(dem.data().unwrap(), &data);
    assert_eq!(dem.matches_disk(), Some(false));
}

#[test]
fn test_update_keeps_mask() {
    let fixture = TempFixture::saved("dem.tif", &ramp_dem(4, 3));
    let mut dem = Raster::open(&fixture).unwrap();
    dem.data_mut().unwrap().mask_mut().unwrap()[[0, 0, 0]] = true;

    dem.shift(1.0, 0.0).unwrap();
    let array = dem.data().unwrap();
    assert!(array.is_masked_at(0, 0, 0));
    assert_eq!(array.data()[[0, 0, 0]], -9999.0);
    assert_eq!(array.get(0, 0, 1), Some(1.0));

    dem.set_dtypes(DataType::Float64, false).unwrap();
    assert!(dem.data().unwrap().is_masked_at(0, 0, 0));
    assert_eq!(dem.data().unwrap().get(0, 2, 3), Some(11.0));
}

#[test]
fn test_matches_disk() {
    let dem = ramp_dem(4, 3);
    assert_eq!(dem.matches_disk(), None);

    let fixture = TempFixture::saved("dem.tif", &dem);
    let mut opened = Raster::open(&fixture).unwrap();
    assert_eq!(opened.matches_disk(), Some(true));
    opened.data_mut().unwrap();
    assert_eq!(opened.matches_disk(), Some(false));

    let mut opened = Raster::open(&fixture).unwrap();
    opened.set_ndv(-1.0, false).unwrap();
    assert_eq!(opened.matches_disk(), Some(false));
    // loading again does not restore the flag
    opened.load(None).unwrap();
    assert_eq!(opened.matches_disk(), Some(false));
}

#[test]
fn test_coords() {
    let dem = ramp_dem(5, 4);
    let PixelCoords::Axes { x, y } = dem.coords(PixelOffset::UpperLeft, false) else {
        panic!("expected axes");
    };
    assert_eq!(x.len(), 5);
    assert_eq!(y.len(), 4);
    assert_eq!(x[0], 478000.0);
    assert_eq!(x[1], 478030.0);
    assert_eq!(y[0], 3108140.0);
    assert_eq!(y[1], 3108110.0);

    let PixelCoords::Grid { x, y } = dem.coords(PixelOffset::Center, true) else {
        panic!("expected grid");
    };
    assert_eq!(x.dim(), (4, 5));
    assert_eq!(x[[3, 2]], 478075.0);
    assert_eq!(y[[3, 2]], 3108035.0);
}

#[test]
fn test_xy2ij_ij2xy() {
    let dem = ramp_dem(5, 4);
    let (x, y) = dem.ij2xy(2, 3, PixelOffset::Center);
    assert_eq!((x, y), (478105.0, 3108065.0));
    assert_eq!(dem.xy2ij(x, y).unwrap(), (2, 3));
    assert_eq!(dem.ij2xy(2, 3, PixelOffset::LowerRight), (478120.0, 3108050.0));
    assert_eq!(dem.xy2ij(477990.0, 3108150.0).unwrap(), (-1, -1));
}

#[test]
fn test_outside_image() {
    let dem = ramp_dem(5, 4);
    assert!(dem.outside_image(5.0, 4.0, true).unwrap());
    assert!(dem.outside_image(5.0, 0.0, true).unwrap());
    assert!(dem.outside_image(-1.0, 0.0, true).unwrap());
    assert!(!dem.outside_image(4.0, 3.0, true).unwrap());
    assert!(!dem.outside_image(478010.0, 3108130.0, false).unwrap());
    assert!(dem.outside_image(477990.0, 3108130.0, false).unwrap());
}

#[test]
fn test_far_and_nan_coordinates() {
    let dem = ramp_dem(5, 4);
    assert!(dem.outside_image(1e30, 3108130.0, false).unwrap());
    assert!(dem.outside_image(f64::NAN, 0.0, true).unwrap());
    assert!(matches!(
        dem.xy2ij(f64::NAN, 3108130.0),
        Err(Error::BadArgument(_))
    ));

    let options = SampleOptions::default().with_window(3).with_masked(true);
    let far = dem.value_at_coords(1e30, -1e30, &options).unwrap();
    assert_eq!(far.value, Sample::Single(None));

    let lazy_fixture = TempFixture::saved("dem.tif", &dem);
    let lazy =
        Raster::open_with(&lazy_fixture, &RasterConfig::default().with_load_data(false)).unwrap();
    let far = lazy.value_at_coords(-1e30, 1e30, &options).unwrap();
    assert_eq!(far.value, Sample::Single(None));

    let bounded = options.with_boundless(false);
    assert!(matches!(
        dem.value_at_coords(1e30, 3108130.0, &bounded),
        Err(Error::WindowOutOfBounds { .. })
    ));
    assert!(dem
        .value_at_coords(f64::NAN, 3108130.0, &SampleOptions::default())
        .is_err());
}

#[test]
fn test_value_at_coords() {
    let dem = ramp_dem(6, 5);
    let (x, y) = dem.ij2xy(2, 3, PixelOffset::Center);

    let single = dem.value_at_coords(x, y, &SampleOptions::default()).unwrap();
    assert_eq!(single.value, Sample::Single(Some(15.0)));
    assert_eq!(single.windows, None);

    let options = SampleOptions::default().with_window(3).with_return_window(true);
    let mean = dem.value_at_coords(x, y, &options).unwrap();
    let expected = Array2::from_shape_fn((3, 3), |(r, c)| ((r + 1) * 6 + c + 2) as f64);
    assert_eq!(mean.value, Sample::Single(Some(expected.mean().unwrap())));
    assert_eq!(mean.windows, Some(BTreeMap::from([(1, expected)])));

    let max = |values: &[f64]| values.iter().copied().reduce(f64::max);
    let reduced = dem
        .value_at_coords(x, y, &SampleOptions::default().with_window(3).with_reducer(&max))
        .unwrap();
    assert_eq!(reduced.value, Sample::Single(Some(22.0)));
}

#[test]
fn test_value_at_coords_loaded_and_unloaded_agree() {
    let fixture = TempFixture::saved("dem.tif", &ramp_dem(6, 5));
    let loaded = Raster::open(&fixture).unwrap();
    let lazy = Raster::open_with(&fixture, &RasterConfig::default().with_load_data(false)).unwrap();
    let (x, y) = loaded.ij2xy(0, 0, PixelOffset::Center);
    let options = SampleOptions::default().with_window(3).with_masked(true);
    assert_eq!(
        loaded.value_at_coords(x, y, &options).unwrap(),
        lazy.value_at_coords(x, y, &options).unwrap()
    );
}

#[test]
fn test_value_at_coords_edges() {
    let dem = ramp_dem(5, 4);
    let (x, y) = dem.ij2xy(0, 0, PixelOffset::Center);

    let masked = SampleOptions::default().with_window(3).with_masked(true);
    let value = dem.value_at_coords(x, y, &masked).unwrap().value;
    assert_eq!(value, Sample::Single(Some(3.0)));

    let unmasked = SampleOptions::default().with_window(3);
    let value = dem.value_at_coords(x, y, &unmasked).unwrap().value;
    assert_eq!(value, Sample::Single(Some((12.0 - 5.0 * 9999.0) / 9.0)));

    let strict = SampleOptions::default().with_window(3).with_boundless(false);
    assert!(matches!(
        dem.value_at_coords(x, y, &strict),
        Err(Error::WindowOutOfBounds { .. })
    ));

    let even = SampleOptions::default().with_window(2);
    assert!(matches!(
        dem.value_at_coords(x, y, &even),
        Err(Error::BadArgument(_))
    ));

    let latlon = SampleOptions {
        latlon: true,
        ..Default::default()
    };
    assert!(matches!(
        dem.value_at_coords(x, y, &latlon),
        Err(Error::NotImplemented(_))
    ));
}

#[test]
fn test_value_at_coords_multiband() {
    let raster = multiband(3, 5, 4, None);
    let (x, y) = raster.ij2xy(1, 2, PixelOffset::Center);

    let all = raster.value_at_coords(x, y, &SampleOptions::default()).unwrap();
    assert_eq!(
        all.value,
        Sample::PerBand(BTreeMap::from([(1, Some(3.0)), (2, Some(103.0)), (3, Some(203.0))]))
    );

    let one = raster
        .value_at_coords(x, y, &SampleOptions::default().with_band(2))
        .unwrap();
    assert_eq!(one.value, Sample::Single(Some(103.0)));

    assert!(matches!(
        raster.value_at_coords(x, y, &SampleOptions::default().with_band(4)),
        Err(Error::InvalidBand { band: 4, count: 3 })
    ));
}

#[test_log::test]
fn test_interp_points() {
    let dem = ramp_dem(8, 8);
    let (x, y) = dem.ij2xy(3, 4, PixelOffset::Center);
    for mode in [
        InterpMode::Linear,
        InterpMode::Cubic,
        InterpMode::Quintic,
        InterpMode::Nearest,
    ] {
        let values = dem.interp_points(&[(x, y)], 2, mode, 1).unwrap();
        assert_eq!(values, vec![28.0], "{mode:?}");
    }

    // the ramp is linear in both directions
    let values = dem
        .interp_points(&[(x + 10.0, y - 5.0)], 1, InterpMode::Linear, 1)
        .unwrap();
    assert_near!(values[0], 28.0 + 1.0 / 3.0 + 8.0 / 6.0, epsilon = 1e-9);

    let outside = dem
        .interp_points(&[(0.0, 0.0)], 1, InterpMode::Linear, 1)
        .unwrap();
    assert!(outside[0].is_nan());
}

#[test]
fn test_interp_points_mean() {
    let data = Array2::<f32>::from_elem((5, 5), 4.0);
    let flat = Raster::from_array(data, UTM_TRANSFORM, UTM_EPSG, None).unwrap();
    let (x, y) = flat.ij2xy(2, 2, PixelOffset::Center);
    let values = flat.interp_points(&[(x, y)], 1, InterpMode::Mean, 1).unwrap();
    assert_eq!(values, vec![4.0]);
}

#[test_log::test]
fn test_interp_points_failure_keeps_batch() {
    let dem = ramp_dem(8, 8);
    let (x, y) = dem.ij2xy(3, 4, PixelOffset::Center);
    // a single node cannot be interpolated away from its centre
    let values = dem
        .interp_points(
            &[(x + 10.0, y), (x, y), (f64::NAN, y)],
            0,
            InterpMode::Linear,
            1,
        )
        .unwrap();
    assert_eq!(values.len(), 3);
    assert!(values[0].is_nan());
    assert_eq!(values[1], 28.0);
    assert!(values[2].is_nan());
}

#[test]
fn test_reproject_res_and_bounds() {
    let dem = ramp_dem(10, 10);
    let bounds = Bounds::new(478000.0, 3107840.0, 478300.0, 3108140.0);
    let out = dem
        .reproject(
            &ReprojectOptions::to_crs(UTM_EPSG)
                .with_bounds(bounds)
                .with_res(70.0, 70.0),
        )
        .unwrap();
    // ceil(300 / 70) = 5, bounds grow right and down
    assert_eq!(out.shape(), (5, 5));
    assert_eq!(out.res(), (70.0, 70.0));
    assert_near!(
        Bounds,
        out.bounds(),
        Bounds::new(478000.0, 3108140.0 - 350.0, 478350.0, 3108140.0),
        epsilon = 1e-6
    );
    assert_eq!(out.nodata(), Some(-9999.0));
    assert_eq!(out.matches_disk(), None);
}

#[test]
fn test_reproject_to_reference() {
    let dem = ramp_dem(10, 10);
    let reference = subgrid(2, 3, 4, 3);
    let out = dem.reproject(&ReprojectOptions::to_ref(&reference)).unwrap();
    assert_eq!(out.shape(), (3, 4));
    assert_eq!(out.bounds(), reference.bounds());
    assert_eq!(
        out.data().unwrap().data().slice(s![0, .., ..]),
        dem.data().unwrap().data().slice(s![0, 3..6, 2..6])
    );
}

#[test]
fn test_reproject_to_crs() {
    let dem = ramp_dem(10, 10);
    let out = dem
        .reproject(&ReprojectOptions::to_crs(4326).with_nodata(-1.0).with_dtype(DataType::Float64))
        .unwrap();
    assert_eq!(out.crs().and_then(|crs| crs.to_epsg()), Some(4326));
    assert_eq!(out.nodata(), Some(-1.0));
    assert_eq!(out.dtypes(), &[DataType::Float64]);
    let bounds = out.bounds();
    assert!(bounds.left > 86.0 && bounds.right < 87.0, "{bounds}");
    assert!(bounds.bottom > 28.0 && bounds.top < 28.2, "{bounds}");
}

#[test]
fn test_reproject_bad_arguments() {
    let _nolog = SuppressGDALErrorLog::new();
    let dem = ramp_dem(4, 4);
    let both = ReprojectOptions {
        dst_crs: Some(UTM_EPSG.into()),
        ..ReprojectOptions::to_ref(&dem)
    };
    assert!(matches!(dem.reproject(&both), Err(Error::BadArgument(_))));
    assert!(matches!(
        dem.reproject(&ReprojectOptions::default()),
        Err(Error::BadArgument(_))
    ));
    let size_and_res = ReprojectOptions::to_crs(UTM_EPSG)
        .with_size(4, 4)
        .with_res(10.0, 10.0);
    assert!(matches!(
        dem.reproject(&size_and_res),
        Err(Error::BadArgument(_))
    ));
}

#[test]
fn test_bounds_projected() {
    let dem = ramp_dem(10, 10);
    let same = dem.bounds_projected(UTM_EPSG, 5000).unwrap();
    assert_near!(Bounds, same, dem.bounds(), epsilon = 1e-6);

    let wgs84 = dem.bounds_projected(4326, 5000).unwrap();
    assert!(wgs84.left < wgs84.right && wgs84.bottom < wgs84.top);
    assert!(wgs84.left > 86.0 && wgs84.right < 87.0, "{wgs84}");
}

#[test]
fn test_info() {
    let dem = ramp_dem(4, 3);
    let info = dem.info(true).unwrap();
    assert!(info.contains("Driver:               GTiff"));
    assert!(info.contains("Opened from file:     None"));
    assert!(info.contains("Size:                 4, 3"));
    assert!(info.contains("NoData Value:         -9999"));
    assert!(info.contains("[MAXIMUM]:"));
    assert_eq!(dem.to_string(), dem.info(false).unwrap());

    let raster = multiband(2, 3, 3, None);
    let info = raster.info(true).unwrap();
    assert!(info.contains("Band 1:"));
    assert!(info.contains("Band 2:"));
}

#[test]
fn test_debug_lists_attributes() {
    let fixture = TempFixture::saved("dem.tif", &ramp_dem(4, 3));
    let config = RasterConfig::default().with_attrs(DatasetAttrs::TAGS | DatasetAttrs::BLOCK_SHAPES);
    let dem = Raster::open_with(&fixture, &config).unwrap();
    let debug = format!("{dem:?}");
    assert!(debug.starts_with("Raster {"));
    assert!(debug.contains("transform"));
    assert!(debug.contains("block_shapes"));
    assert!(dem.attrs().tags.is_some());
    assert!(dem.attrs().descriptions.is_none());
}

use ndarray::{Array2, Array3, ArrayView2, Axis, Zip};

use crate::errors::{Error, Result};
use crate::raster::{DataType, Pixel};

/// Pixel values of a raster, shaped `(bands, rows, cols)`.
///
/// When a mask is present, `true` marks a nodata cell. The value stored under
/// a masked cell is whatever was read from the dataset and carries no meaning.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterArray {
    data: Array3<f64>,
    mask: Option<Array3<bool>>,
}

impl RasterArray {
    pub fn new(data: Array3<f64>) -> Self {
        Self { data, mask: None }
    }

    pub fn masked(data: Array3<f64>, mask: Array3<bool>) -> Result<Self> {
        if data.shape() != mask.shape() {
            return Err(Error::ShapeMismatch {
                expected: data.shape().to_vec(),
                actual: mask.shape().to_vec(),
            });
        }
        Ok(Self {
            data,
            mask: Some(mask),
        })
    }

    /// Mask every cell equal to the band's nodata value (NaN matches NaN).
    pub fn masked_equal(data: Array3<f64>, nodata: &[Option<f64>]) -> Self {
        let mut mask = Array3::from_elem(data.raw_dim(), false);
        for (b, (mut band_mask, band)) in mask
            .axis_iter_mut(Axis(0))
            .zip(data.axis_iter(Axis(0)))
            .enumerate()
        {
            if let Some(Some(ndv)) = nodata.get(b) {
                Zip::from(&mut band_mask)
                    .and(&band)
                    .for_each(|m, &v| *m = is_nodata(v, *ndv));
            }
        }
        Self {
            data,
            mask: Some(mask),
        }
    }

    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array3<f64> {
        &mut self.data
    }

    pub fn mask(&self) -> Option<&Array3<bool>> {
        self.mask.as_ref()
    }

    pub fn mask_mut(&mut self) -> Option<&mut Array3<bool>> {
        self.mask.as_mut()
    }

    pub fn is_masked(&self) -> bool {
        self.mask.is_some()
    }

    pub fn into_parts(self) -> (Array3<f64>, Option<Array3<bool>>) {
        (self.data, self.mask)
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn count(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn band(&self, index: usize) -> ArrayView2<'_, f64> {
        self.data.index_axis(Axis(0), index)
    }

    pub fn is_masked_at(&self, band: usize, row: usize, col: usize) -> bool {
        self.mask
            .as_ref()
            .map(|m| m[[band, row, col]])
            .unwrap_or(false)
    }

    /// Value at a cell, `None` when masked.
    pub fn get(&self, band: usize, row: usize, col: usize) -> Option<f64> {
        if self.is_masked_at(band, row, col) {
            return None;
        }
        self.data.get([band, row, col]).copied()
    }

    /// Unmasked values of one band.
    pub fn valid_values(&self, band: usize) -> Vec<f64> {
        let values = self.data.index_axis(Axis(0), band);
        match &self.mask {
            Some(mask) => values
                .iter()
                .zip(mask.index_axis(Axis(0), band).iter())
                .filter(|(_, &m)| !m)
                .map(|(&v, _)| v)
                .collect(),
            None => values.iter().copied().collect(),
        }
    }

    /// Copy of the data with masked cells replaced by the band's fill value.
    pub fn filled(&self, fill: &[Option<f64>]) -> Array3<f64> {
        let mut out = self.data.clone();
        if let Some(mask) = &self.mask {
            for (b, (mut band, band_mask)) in out
                .axis_iter_mut(Axis(0))
                .zip(mask.axis_iter(Axis(0)))
                .enumerate()
            {
                if let Some(Some(value)) = fill.get(b) {
                    Zip::from(&mut band)
                        .and(&band_mask)
                        .for_each(|v, &m| {
                            if m {
                                *v = *value
                            }
                        });
                }
            }
        }
        out
    }

    /// Apply `f` to every value, masked or not.
    pub fn map_inplace<F: FnMut(&mut f64)>(&mut self, f: F) {
        self.data.map_inplace(f);
    }
}

impl From<Array3<f64>> for RasterArray {
    fn from(data: Array3<f64>) -> Self {
        RasterArray::new(data)
    }
}

impl From<Array2<f64>> for RasterArray {
    fn from(data: Array2<f64>) -> Self {
        RasterArray::new(data.insert_axis(Axis(0)))
    }
}

/// Pixel input for [`Raster::from_array`](crate::Raster::from_array), remembering
/// the element type the values came from.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterData {
    pub(crate) array: RasterArray,
    pub(crate) dtype: DataType,
}

impl RasterData {
    pub fn new(array: RasterArray, dtype: DataType) -> Self {
        Self { array, dtype }
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }
}

impl<T: Pixel> From<Array2<T>> for RasterData {
    fn from(data: Array2<T>) -> Self {
        RasterData::new(data.mapv(T::to_f64).into(), T::DTYPE)
    }
}

impl<T: Pixel> From<Array3<T>> for RasterData {
    fn from(data: Array3<T>) -> Self {
        RasterData::new(data.mapv(T::to_f64).into(), T::DTYPE)
    }
}

impl From<RasterArray> for RasterData {
    fn from(array: RasterArray) -> Self {
        RasterData::new(array, DataType::Float64)
    }
}

pub(crate) fn is_nodata(value: f64, nodata: f64) -> bool {
    value == nodata || (value.is_nan() && nodata.is_nan())
}

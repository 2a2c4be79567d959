//! Main Raster type

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, RasterElement};
use ndarray::{s, Array2};

/// A georeferenced 2D raster grid.
///
/// `Raster<T>` stores values of type `T` in row-major order together with
/// the affine placement of the grid and an optional no-data marker.
///
/// # Example
///
/// ```
/// use swathflow_core::Raster;
///
/// let mut raster: Raster<f64> = Raster::new(100, 100);
/// raster.set(10, 20, 42.0).unwrap();
/// assert_eq!(raster.get(10, 20).unwrap(), 42.0);
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    /// Raster data stored in row-major order (row, col)
    data: Array2<T>,
    /// Affine transformation
    transform: GeoTransform,
    /// No-data value
    nodata: Option<T>,
}

/// Inclusive window of cells, `[row_min, row_max] x [col_min, col_max]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellWindow {
    pub row_min: usize,
    pub row_max: usize,
    pub col_min: usize,
    pub col_max: usize,
}

impl CellWindow {
    pub fn rows(&self) -> usize {
        self.row_max - self.row_min + 1
    }

    pub fn cols(&self) -> usize {
        self.col_max - self.col_min + 1
    }
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Create a raster from row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self::from_array(array))
    }

    /// Create a raster from nested rows; every row must have the same length
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != width) {
            return Err(Error::InvalidDimensions { width, height });
        }
        Self::from_vec(rows.into_iter().flatten().collect(), height, width)
    }

    /// Create a raster from an ndarray
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            nodata: None,
        }
    }

    /// Create a zeroed raster of another cell type with this raster's placement
    pub fn with_same_meta<U: RasterElement>(&self, rows: usize, cols: usize) -> Raster<U> {
        Raster {
            data: Array2::zeros((rows, cols)),
            transform: self.transform,
            nodata: None,
        }
    }

    /// Create a raster with the same dimensions and metadata, filled with a value
    pub fn like(&self, fill_value: T) -> Self {
        Self {
            data: Array2::from_elem(self.data.dim(), fill_value),
            transform: self.transform,
            nodata: self.nodata,
        }
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the raster is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Get value at (row, col) without bounds checking
    ///
    /// # Safety
    /// Caller must ensure row < self.rows() and col < self.cols()
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> T {
        unsafe { *self.data.uget((row, col)) }
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    /// Get a mutable reference to the underlying array
    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    // Metadata

    /// Get the geotransform
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Set the geotransform
    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    /// Get the no-data value
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Set the no-data value
    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Cell size (assumes square cells)
    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Geographic bounds (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols(), self.rows())
    }

    // Coordinate conversion

    /// Convert pixel coordinates to geographic coordinates (cell centre)
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(col, row)
    }

    /// Convert geographic coordinates to fractional pixel coordinates
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        self.transform.geo_to_pixel(x, y)
    }

    // Value checks

    /// Check if a value is no-data
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Number of cells holding a valid value
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|&&v| !self.is_nodata(v)).count()
    }

    // Masking and cropping

    /// Set every cell flagged in `mask` to missing.
    ///
    /// Returns the number of cells that were valid before and are now missing.
    pub fn apply_mask(&mut self, mask: &Array2<bool>) -> Result<usize> {
        if mask.dim() != self.shape() {
            let (er, ec) = self.shape();
            let (ar, ac) = mask.dim();
            return Err(Error::SizeMismatch { er, ec, ar, ac });
        }

        let marker = self.nodata.unwrap_or_else(T::default_nodata);
        if !T::is_float() && self.nodata.is_none() {
            self.nodata = Some(marker);
        }

        let nodata = self.nodata;
        let mut newly_missing = 0;
        for (value, &flagged) in self.data.iter_mut().zip(mask.iter()) {
            if flagged {
                if !value.is_nodata(nodata) {
                    newly_missing += 1;
                }
                *value = marker;
            }
        }
        Ok(newly_missing)
    }

    /// Smallest window containing every valid cell, or `None` if there are none
    pub fn valid_window(&self) -> Option<CellWindow> {
        let mut window: Option<CellWindow> = None;

        for ((row, col), &value) in self.data.indexed_iter() {
            if self.is_nodata(value) {
                continue;
            }
            window = Some(match window {
                None => CellWindow {
                    row_min: row,
                    row_max: row,
                    col_min: col,
                    col_max: col,
                },
                Some(w) => CellWindow {
                    row_min: w.row_min.min(row),
                    row_max: w.row_max.max(row),
                    col_min: w.col_min.min(col),
                    col_max: w.col_max.max(col),
                },
            });
        }

        window
    }

    /// Copy of the cells inside `window`, with the transform moved so every
    /// retained cell keeps its map position
    pub fn crop(&self, window: CellWindow) -> Result<Self> {
        if window.row_min > window.row_max
            || window.col_min > window.col_max
            || window.row_max >= self.rows()
            || window.col_max >= self.cols()
        {
            return Err(Error::IndexOutOfBounds {
                row: window.row_max,
                col: window.col_max,
                rows: self.rows(),
                cols: self.cols(),
            });
        }

        let data = self
            .data
            .slice(s![window.row_min..=window.row_max, window.col_min..=window.col_max])
            .to_owned();

        Ok(Self {
            data,
            transform: self.transform.offset(window.col_min, window.row_min),
            nodata: self.nodata,
        })
    }

    // Statistics

    /// Calculate basic statistics (min, max, mean, count of valid cells)
    pub fn statistics(&self) -> RasterStatistics<T> {
        let mut min: Option<T> = None;
        let mut max: Option<T> = None;
        let mut sum: f64 = 0.0;
        let mut count: usize = 0;

        for &value in self.data.iter() {
            if self.is_nodata(value) {
                continue;
            }

            if min.map_or(true, |m| value < m) {
                min = Some(value);
            }
            if max.map_or(true, |m| value > m) {
                max = Some(value);
            }

            if let Some(v) = value.to_f64() {
                sum += v;
                count += 1;
            }
        }

        let mean = if count > 0 {
            Some(sum / count as f64)
        } else {
            None
        };

        RasterStatistics {
            min,
            max,
            mean,
            valid_count: count,
            nodata_count: self.len() - count,
        }
    }
}

/// Basic statistics for a raster
#[derive(Debug, Clone)]
pub struct RasterStatistics<T> {
    pub min: Option<T>,
    pub max: Option<T>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bordered() -> Raster<f64> {
        // 5x6 grid with a NaN frame two columns wide on the right
        let mut raster = Raster::filled(5, 6, f64::NAN);
        raster.set_transform(GeoTransform::new(0.0, 50.0, 10.0, -10.0));
        for row in 1..4 {
            for col in 1..4 {
                raster.set(row, col, (row * 10 + col) as f64).unwrap();
            }
        }
        raster
    }

    #[test]
    fn test_raster_creation() {
        let raster: Raster<f32> = Raster::new(100, 200);
        assert_eq!(raster.rows(), 100);
        assert_eq!(raster.cols(), 200);
        assert_eq!(raster.shape(), (100, 200));
    }

    #[test]
    fn test_from_rows_rejects_ragged_input() {
        let ragged = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(Raster::<f64>::from_rows(ragged).is_err());

        let ok = Raster::<f64>::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(ok.get(1, 0).unwrap(), 3.0);
    }

    #[test]
    fn test_valid_window() {
        let raster = bordered();
        let window = raster.valid_window().unwrap();
        assert_eq!(
            window,
            CellWindow { row_min: 1, row_max: 3, col_min: 1, col_max: 3 }
        );

        let empty: Raster<f64> = Raster::filled(3, 3, f64::NAN);
        assert!(empty.valid_window().is_none());
    }

    #[test]
    fn test_crop_keeps_map_positions() {
        let raster = bordered();
        let window = raster.valid_window().unwrap();
        let cropped = raster.crop(window).unwrap();

        assert_eq!(cropped.shape(), (3, 3));
        assert_eq!(cropped.get(0, 0).unwrap(), 11.0);
        assert_eq!(cropped.pixel_to_geo(0, 0), raster.pixel_to_geo(1, 1));
        assert_eq!(cropped.pixel_to_geo(2, 2), raster.pixel_to_geo(3, 3));
    }

    #[test]
    fn test_apply_mask() {
        let mut raster: Raster<f64> = Raster::filled(2, 2, 5.0);
        let mut mask = Array2::from_elem((2, 2), false);
        mask[(0, 1)] = true;

        assert_eq!(raster.apply_mask(&mask).unwrap(), 1);
        assert!(raster.get(0, 1).unwrap().is_nan());
        assert_eq!(raster.valid_count(), 3);

        let wrong = Array2::from_elem((3, 2), false);
        assert!(raster.apply_mask(&wrong).is_err());
    }

    #[test]
    fn test_raster_statistics() {
        let mut raster: Raster<f32> = Raster::new(10, 10);
        for i in 0..10 {
            for j in 0..10 {
                raster.set(i, j, (i * 10 + j) as f32).unwrap();
            }
        }

        let stats = raster.statistics();
        assert_eq!(stats.min, Some(0.0));
        assert_eq!(stats.max, Some(99.0));
        assert_eq!(stats.valid_count, 100);
    }
}

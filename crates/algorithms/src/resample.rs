//! Bilinear resampling
//!
//! Samples are taken between cell centres. Positions inside the grid
//! extent but outside the hull of cell centres clamp to the edge cells;
//! positions outside the extent are NaN. A missing support cell with a
//! non-zero weight makes the sample NaN.

use ndarray::Array2;
use crate::maybe_rayon::*;
use swathflow_core::raster::Raster;
use swathflow_core::{Algorithm, Error, Result};

/// Parameters for resampling
#[derive(Debug, Clone, Default)]
pub struct ResampleParams {
    /// Target cell size; the ceiling of the native cell size when `None`
    pub cell_size: Option<f64>,
}

/// Bilinear resampling algorithm
#[derive(Debug, Clone, Default)]
pub struct Resample;

impl Algorithm for Resample {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = ResampleParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Bilinear Resample"
    }

    fn description(&self) -> &'static str {
        "Resample a DEM to a new cell size over the same extent"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        resample(&input, &params)
    }
}

/// Lower support index, upper support index and fraction along one axis
fn support(f: f64, n: usize) -> Option<(usize, usize, f64)> {
    if n == 0 || f.is_nan() || f < -0.5 || f > n as f64 - 0.5 {
        return None;
    }
    let f = f.clamp(0.0, (n - 1) as f64);
    let i0 = (f.floor() as usize).min(n.saturating_sub(2));
    let i1 = (i0 + 1).min(n - 1);
    Some((i0, i1, f - i0 as f64))
}

/// Bilinear estimate of `dem` at map position (x, y)
pub fn sample_bilinear(dem: &Raster<f64>, x: f64, y: f64) -> f64 {
    let (col, row) = dem.geo_to_pixel(x, y);
    let (rows, cols) = dem.shape();

    let (Some((c0, c1, tx)), Some((r0, r1, ty))) =
        (support(col - 0.5, cols), support(row - 0.5, rows))
    else {
        return f64::NAN;
    };

    let taps = [
        (r0, c0, (1.0 - tx) * (1.0 - ty)),
        (r0, c1, tx * (1.0 - ty)),
        (r1, c0, (1.0 - tx) * ty),
        (r1, c1, tx * ty),
    ];

    let mut value = 0.0;
    for (r, c, w) in taps {
        if w == 0.0 {
            continue;
        }
        let z = unsafe { dem.get_unchecked(r, c) };
        if dem.is_nodata(z) {
            return f64::NAN;
        }
        value += w * z;
    }
    value
}

/// Resample `dem` to a new cell size covering the same extent.
///
/// The output keeps the upper-left corner; its shape is the extent divided
/// by the target cell size, rounded up.
pub fn resample(dem: &Raster<f64>, params: &ResampleParams) -> Result<Raster<f64>> {
    let native = dem.cell_size();
    let target = params.cell_size.unwrap_or_else(|| native.ceil());

    if target.is_nan() || target <= 0.0 {
        return Err(Error::InvalidParameter {
            name: "target_cellsize",
            value: target.to_string(),
            reason: "must be positive".into(),
        });
    }

    let (src_rows, src_cols) = dem.shape();
    let scale = native / target;
    let rows = (src_rows as f64 * scale - 1e-9).ceil().max(1.0) as usize;
    let cols = (src_cols as f64 * scale - 1e-9).ceil().max(1.0) as usize;
    let transform = dem.transform().with_cell_size(target);

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            (0..cols)
                .map(|col| {
                    let (x, y) = transform.pixel_to_geo(col, row);
                    sample_bilinear(dem, x, y)
                })
                .collect::<Vec<f64>>()
        })
        .collect();

    tracing::debug!(
        "resampled {}x{} @ {} -> {}x{} @ {}",
        src_rows,
        src_cols,
        native,
        rows,
        cols,
        target
    );

    let mut output = dem.with_same_meta::<f64>(rows, cols);
    output.set_transform(transform);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use swathflow_core::GeoTransform;

    /// z = x + 2y on a 10x10 grid, cellsize 10, origin (0, 100)
    fn linear() -> Raster<f64> {
        let mut dem = Raster::new(10, 10);
        dem.set_transform(GeoTransform::new(0.0, 100.0, 10.0, -10.0));
        for row in 0..10 {
            for col in 0..10 {
                let (x, y) = dem.pixel_to_geo(col, row);
                dem.set(row, col, x + 2.0 * y).unwrap();
            }
        }
        dem
    }

    #[test]
    fn test_sample_reproduces_linear_surface() {
        let dem = linear();
        for &(x, y) in &[(5.0, 95.0), (12.5, 50.0), (47.3, 61.9), (95.0, 5.0)] {
            assert_relative_eq!(sample_bilinear(&dem, x, y), x + 2.0 * y, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_edges_clamp_and_outside_is_nan() {
        let dem = linear();
        // within half a cell of the border: clamps to the edge centre
        assert_relative_eq!(sample_bilinear(&dem, 1.0, 95.0), 5.0 + 190.0, epsilon = 1e-9);
        assert!(sample_bilinear(&dem, -1.0, 50.0).is_nan());
        assert!(sample_bilinear(&dem, 50.0, 100.5).is_nan());
    }

    #[test]
    fn test_missing_support_is_nan() {
        let mut dem = linear();
        dem.set(4, 4, f64::NAN).unwrap();
        let (x, y) = dem.pixel_to_geo(4, 4);
        assert!(sample_bilinear(&dem, x + 3.0, y).is_nan());
        // exactly on a neighbouring centre the missing cell has no weight
        let (x, y) = dem.pixel_to_geo(5, 4);
        assert_relative_eq!(sample_bilinear(&dem, x, y), x + 2.0 * y, epsilon = 1e-9);
    }

    #[test]
    fn test_resample_shape_and_values() {
        let dem = linear();
        let out = resample(&dem, &ResampleParams { cell_size: Some(20.0) }).unwrap();
        assert_eq!(out.shape(), (5, 5));
        assert_eq!(out.cell_size(), 20.0);

        let (x, y) = out.pixel_to_geo(2, 2);
        assert_relative_eq!(out.get(2, 2).unwrap(), x + 2.0 * y, epsilon = 1e-9);

        let out = resample(&dem, &ResampleParams { cell_size: Some(30.0) }).unwrap();
        assert_eq!(out.shape(), (4, 4), "100 / 30 rounds up to 4");
    }

    #[test]
    fn test_default_target_is_ceiling() {
        let mut dem = linear();
        dem.set_transform(GeoTransform::new(0.0, 125.0, 12.5, -12.5));
        let out = resample(&dem, &ResampleParams::default()).unwrap();
        assert_eq!(out.cell_size(), 13.0);
        assert_eq!(out.shape(), (10, 10));
    }

    #[test]
    fn test_rejects_non_positive_target() {
        let err = resample(&linear(), &ResampleParams { cell_size: Some(0.0) }).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "target_cellsize", .. }));
    }
}

//! Flat and singular region detection
//!
//! Cells whose eight-direction gradient is exactly zero or infinite have
//! no defined log-gradient. Connected groups of such cells that cover at
//! least the minimum flat area are treated as invalid terrain (lakes,
//! sea, fill artefacts); smaller groups are ordinary pits or crests and
//! are kept.

use ndarray::Array2;
use swathflow_core::raster::Raster;
use swathflow_core::{Algorithm, Connectivity, Error, Result};

use super::{area_to_pixels_round, label_components};
use crate::terrain::gradient8;

/// Parameters for flat region detection
#[derive(Debug, Clone)]
pub struct FlatRegionParams {
    /// Minimum area of a flat region, in map units squared
    pub min_flat_area: f64,
    /// Adjacency used to group candidate cells
    pub connectivity: Connectivity,
}

impl Default for FlatRegionParams {
    fn default() -> Self {
        Self {
            min_flat_area: 1e5,
            connectivity: Connectivity::Eight,
        }
    }
}

/// Flat region detector
#[derive(Debug, Clone, Default)]
pub struct FlatRegionDetector;

impl Algorithm for FlatRegionDetector {
    type Input = Raster<f64>;
    type Output = Array2<bool>;
    type Params = FlatRegionParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Flat Region Detection"
    }

    fn description(&self) -> &'static str {
        "Mask connected regions of zero or singular gradient larger than an area threshold"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        detect_flat_regions(&input, &params)
    }
}

/// Mask of the flat regions of `dem`, same shape as the grid.
pub fn detect_flat_regions(dem: &Raster<f64>, params: &FlatRegionParams) -> Result<Array2<bool>> {
    if params.min_flat_area.is_nan() || params.min_flat_area < 0.0 {
        return Err(Error::InvalidParameter {
            name: "min_flat_area",
            value: params.min_flat_area.to_string(),
            reason: "must be a non-negative area".into(),
        });
    }

    let gradient = gradient8(dem)?;
    let candidates = gradient
        .data()
        .mapv(|g| g == 0.0 || g.is_infinite());

    let min_pixels = area_to_pixels_round(params.min_flat_area, dem.cell_size());
    let components = label_components(&candidates, params.connectivity);
    let mask = components.mask_at_least(min_pixels);

    tracing::debug!(
        "flat regions: {} candidate components, min {} pixels, {} cells masked",
        components.count(),
        min_pixels,
        mask.iter().filter(|&&m| m).count()
    );

    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use swathflow_core::GeoTransform;

    /// 12x12 grid, cellsize 10, rising in every direction away from a
    /// horizontal zero-elevation patch in row 5 starting at column 1.
    fn dem_with_patch(len: usize) -> Raster<f64> {
        let patch: Vec<(usize, usize)> = (1..=len).map(|c| (5, c)).collect();
        let mut dem = Raster::new(12, 12);
        dem.set_transform(GeoTransform::new(0.0, 120.0, 10.0, -10.0));
        for row in 0..12usize {
            for col in 0..12usize {
                let d = patch
                    .iter()
                    .map(|&(r, c)| row.abs_diff(r).max(col.abs_diff(c)))
                    .min()
                    .unwrap_or(0);
                dem.set(row, col, d as f64 * 10.0).unwrap();
            }
        }
        dem
    }

    fn params() -> FlatRegionParams {
        FlatRegionParams {
            min_flat_area: 1000.0,
            connectivity: Connectivity::Eight,
        }
    }

    #[test]
    fn test_patch_below_threshold_is_kept() {
        let mask = detect_flat_regions(&dem_with_patch(9), &params()).unwrap();
        assert_eq!(mask.iter().filter(|&&m| m).count(), 0, "9 cells < 10 pixels");
    }

    #[test]
    fn test_patch_at_threshold_is_masked() {
        let mask = detect_flat_regions(&dem_with_patch(10), &params()).unwrap();
        assert_eq!(mask.iter().filter(|&&m| m).count(), 10);
        for col in 1..=10 {
            assert!(mask[(5, col)], "patch cell (5, {}) should be masked", col);
        }
    }

    #[test]
    fn test_missing_cells_are_not_candidates() {
        let mut dem = Raster::filled(6, 6, f64::NAN);
        dem.set_transform(GeoTransform::new(0.0, 6.0, 1.0, -1.0));
        let mask = detect_flat_regions(
            &dem,
            &FlatRegionParams { min_flat_area: 1.0, ..Default::default() },
        )
        .unwrap();
        assert!(mask.iter().all(|&m| !m));
    }

    #[test]
    fn test_flat_grid_is_one_region() {
        let mut dem = Raster::filled(20, 20, 5.0);
        dem.set_transform(GeoTransform::new(0.0, 200.0, 10.0, -10.0));
        let mask = detect_flat_regions(&dem, &FlatRegionParams::default()).unwrap();
        // 400 cells x 100 m2 = 40 000 m2 < 1e5
        assert!(mask.iter().all(|&m| !m));

        let mask = detect_flat_regions(
            &dem,
            &FlatRegionParams { min_flat_area: 40_000.0, ..Default::default() },
        )
        .unwrap();
        assert!(mask.iter().all(|&m| m));
    }

    #[test]
    fn test_negative_area_is_rejected() {
        let dem = dem_with_patch(3);
        let err = detect_flat_regions(
            &dem,
            &FlatRegionParams { min_flat_area: -1.0, ..Default::default() },
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { name: "min_flat_area", .. }));
    }
}

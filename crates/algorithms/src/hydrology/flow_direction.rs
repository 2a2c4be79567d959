//! D8 flow direction
//!
//! Flow direction encoding:
//! ```text
//!   4  3  2
//!   5  0  1
//!   6  7  8
//! ```
//! 0 = outlet, pit or missing cell; 1-8 = direction to the steepest
//! downslope neighbour.

use ndarray::Array2;
use crate::maybe_rayon::*;
use swathflow_core::raster::Raster;
use swathflow_core::{Algorithm, Error, Result};

use super::{D8_DIST, D8_OFFSETS};

/// Flow direction algorithm (D8)
#[derive(Debug, Clone, Default)]
pub struct FlowDirection;

impl Algorithm for FlowDirection {
    type Input = Raster<f64>;
    type Output = Raster<u8>;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Flow Direction (D8)"
    }

    fn description(&self) -> &'static str {
        "Calculate D8 flow direction from a carved DEM"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        flow_direction(&input)
    }
}

/// Calculate D8 flow direction from a DEM.
///
/// Run [`carve_depressions`](super::carve_depressions) first; on a raw DEM
/// every pit and flat cell gets code 0.
pub fn flow_direction(dem: &Raster<f64>) -> Result<Raster<u8>> {
    let (rows, cols) = dem.shape();
    let cell_size = dem.cell_size();

    let output_data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0u8; cols];

            for (col, out) in row_data.iter_mut().enumerate() {
                let center = unsafe { dem.get_unchecked(row, col) };
                if dem.is_nodata(center) {
                    continue;
                }

                let mut max_drop = 0.0_f64;
                let mut best_dir: u8 = 0;

                for (idx, &(dr, dc)) in D8_OFFSETS.iter().enumerate() {
                    let nr = row as isize + dr;
                    let nc = col as isize + dc;

                    if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                        continue;
                    }

                    let neighbor = unsafe { dem.get_unchecked(nr as usize, nc as usize) };
                    if dem.is_nodata(neighbor) {
                        continue;
                    }

                    let drop = (center - neighbor) / (D8_DIST[idx] * cell_size);
                    if drop > max_drop {
                        max_drop = drop;
                        best_dir = (idx + 1) as u8;
                    }
                }

                *out = best_dir;
            }

            row_data
        })
        .collect();

    let mut output = dem.with_same_meta::<u8>(rows, cols);
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use swathflow_core::GeoTransform;

    fn plane(f: impl Fn(usize, usize) -> f64) -> Raster<f64> {
        let mut dem = Raster::new(5, 5);
        dem.set_transform(GeoTransform::new(0.0, 5.0, 1.0, -1.0));
        for row in 0..5 {
            for col in 0..5 {
                dem.set(row, col, f(row, col)).unwrap();
            }
        }
        dem
    }

    #[test]
    fn test_slope_east() {
        let fdir = flow_direction(&plane(|_, c| (5 - c) as f64 * 10.0)).unwrap();
        assert_eq!(fdir.get(2, 2).unwrap(), 1);
    }

    #[test]
    fn test_slope_south() {
        let fdir = flow_direction(&plane(|r, _| (5 - r) as f64 * 10.0)).unwrap();
        assert_eq!(fdir.get(2, 2).unwrap(), 7);
    }

    #[test]
    fn test_diagonal() {
        let fdir = flow_direction(&plane(|r, c| (10 - r - c) as f64 * 10.0)).unwrap();
        assert_eq!(fdir.get(2, 2).unwrap(), 8);
    }

    #[test]
    fn test_pit_and_void() {
        let mut dem = plane(|_, _| 10.0);
        dem.set(2, 2, 1.0).unwrap();
        dem.set(0, 0, f64::NAN).unwrap();

        let fdir = flow_direction(&dem).unwrap();
        assert_eq!(fdir.get(2, 2).unwrap(), 0);
        assert_eq!(fdir.get(0, 0).unwrap(), 0);
        // (1, 1) drains into the pit, never into the void
        assert_eq!(fdir.get(1, 1).unwrap(), 8);
    }
}

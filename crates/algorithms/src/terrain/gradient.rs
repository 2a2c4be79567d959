//! Eight-direction gradient
//!
//! For each cell, the steepest descent towards any of its eight
//! neighbours:
//!
//! ```text
//! g = max(0, max_n (z - z_n) / (d_n * cellsize))
//! ```
//!
//! with `d_n` = 1 for edge neighbours and sqrt(2) for corners. Cells with
//! no lower neighbour (flats, pits) get exactly 0.

use ndarray::Array2;
use crate::maybe_rayon::*;
use swathflow_core::raster::Raster;
use swathflow_core::{Algorithm, Error, Result};

use crate::hydrology::{D8_DIST, D8_OFFSETS};

/// Eight-direction gradient algorithm
#[derive(Debug, Clone, Default)]
pub struct Gradient8;

impl Algorithm for Gradient8 {
    type Input = Raster<f64>;
    type Output = Raster<f64>;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Gradient (8 directions)"
    }

    fn description(&self) -> &'static str {
        "Steepest downward slope from each cell to its eight neighbours"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        gradient8(&input)
    }
}

/// Calculate the eight-direction gradient of a DEM.
///
/// Missing neighbours are ignored; a missing centre cell yields NaN.
/// Values are dimensionless (elevation units per map unit).
pub fn gradient8(dem: &Raster<f64>) -> Result<Raster<f64>> {
    let (rows, cols) = dem.shape();
    let cell_size = dem.cell_size();

    if !(cell_size > 0.0) {
        return Err(Error::InvalidParameter {
            name: "cellsize",
            value: cell_size.to_string(),
            reason: "must be positive".into(),
        });
    }

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            for (col, out) in row_data.iter_mut().enumerate() {
                let center = unsafe { dem.get_unchecked(row, col) };
                if dem.is_nodata(center) {
                    continue;
                }

                let mut steepest = 0.0_f64;
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
                    if drop > steepest {
                        steepest = drop;
                    }
                }

                *out = steepest;
            }

            row_data
        })
        .collect();

    let mut output = dem.with_same_meta::<f64>(rows, cols);
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

    #[test]
    fn test_gradient_of_plane() {
        // z drops 5 per 10 m column step towards the east
        let mut dem = Raster::new(5, 5);
        dem.set_transform(GeoTransform::new(0.0, 50.0, 10.0, -10.0));
        for row in 0..5 {
            for col in 0..5 {
                dem.set(row, col, 100.0 - 5.0 * col as f64).unwrap();
            }
        }

        let g = gradient8(&dem).unwrap();
        assert_relative_eq!(g.get(2, 2).unwrap(), 0.5, epsilon = 1e-12);
        // Eastmost column has nothing lower
        assert_eq!(g.get(2, 4).unwrap(), 0.0);
    }

    #[test]
    fn test_flat_and_pit_are_zero() {
        let mut dem: Raster<f64> = Raster::filled(3, 3, 10.0);
        dem.set(1, 1, 2.0).unwrap();

        let g = gradient8(&dem).unwrap();
        assert_eq!(g.get(1, 1).unwrap(), 0.0);
        assert!(g.get(0, 0).unwrap() > 0.0);
    }

    #[test]
    fn test_missing_cells() {
        let mut dem: Raster<f64> = Raster::filled(3, 3, 10.0);
        dem.set(0, 0, f64::NAN).unwrap();
        dem.set(1, 1, 9.0).unwrap();

        let g = gradient8(&dem).unwrap();
        assert!(g.get(0, 0).unwrap().is_nan());
        assert!(g.get(0, 1).unwrap() > 0.0);
    }
}

//! Flow accumulation
//!
//! Number of upstream cells draining through each cell along D8 flow
//! directions, computed by a topological sweep from the headwaters.

use ndarray::Array2;
use swathflow_core::raster::Raster;
use swathflow_core::{Algorithm, Error, Result};

use super::d8_target;

/// Flow accumulation algorithm
#[derive(Debug, Clone, Default)]
pub struct FlowAccumulation;

impl Algorithm for FlowAccumulation {
    type Input = Raster<u8>;
    type Output = Raster<f64>;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Flow Accumulation"
    }

    fn description(&self) -> &'static str {
        "Calculate upstream contributing cells from D8 flow direction"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        flow_accumulation(&input)
    }
}

/// Calculate flow accumulation from a D8 flow direction raster.
///
/// Headwater cells (nothing flows in) have accumulation 0; a cell that
/// receives the whole 3x3 neighbourhood has 8.
pub fn flow_accumulation(flow_dir: &Raster<u8>) -> Result<Raster<f64>> {
    let (rows, cols) = flow_dir.shape();

    let mut in_degree = Array2::<u32>::zeros((rows, cols));
    for ((row, col), &dir) in flow_dir.data().indexed_iter() {
        if let Some(target) = d8_target(row, col, dir, rows, cols) {
            in_degree[target] += 1;
        }
    }

    let mut queue: Vec<(usize, usize)> = in_degree
        .indexed_iter()
        .filter(|(_, &n)| n == 0)
        .map(|(idx, _)| idx)
        .collect();
    let mut accumulation = Array2::<f64>::zeros((rows, cols));

    while let Some((row, col)) = queue.pop() {
        let dir = flow_dir.data()[(row, col)];
        let Some(target) = d8_target(row, col, dir, rows, cols) else {
            continue;
        };

        accumulation[target] += accumulation[(row, col)] + 1.0;

        in_degree[target] = in_degree[target].saturating_sub(1);
        if in_degree[target] == 0 {
            queue.push(target);
        }
    }

    let mut output = flow_dir.with_same_meta::<f64>(rows, cols);
    *output.data_mut() = accumulation;

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydrology::flow_direction;
    use swathflow_core::GeoTransform;

    #[test]
    fn test_linear_strip() {
        // 1x5 strip sloping east
        let mut dem = Raster::new(1, 5);
        dem.set_transform(GeoTransform::new(0.0, 1.0, 1.0, -1.0));
        for col in 0..5 {
            dem.set(0, col, (5 - col) as f64).unwrap();
        }

        let acc = flow_accumulation(&flow_direction(&dem).unwrap()).unwrap();
        for col in 0..5 {
            assert_eq!(acc.get(0, col).unwrap(), col as f64);
        }
    }

    #[test]
    fn test_convergent_bowl() {
        let mut dem: Raster<f64> = Raster::filled(3, 3, 5.0);
        dem.set(1, 1, 1.0).unwrap();

        let acc = flow_accumulation(&flow_direction(&dem).unwrap()).unwrap();
        assert_eq!(acc.get(1, 1).unwrap(), 8.0);
        assert_eq!(acc.get(0, 0).unwrap(), 0.0);
    }

    #[test]
    fn test_total_is_conserved() {
        // Every cell of a south-sloping plane ends in the bottom row
        let mut dem = Raster::new(4, 3);
        for row in 0..4 {
            for col in 0..3 {
                dem.set(row, col, (4 - row) as f64 * 10.0).unwrap();
            }
        }

        let acc = flow_accumulation(&flow_direction(&dem).unwrap()).unwrap();
        let outlets: f64 = (0..3).map(|c| acc.get(3, c).unwrap() + 1.0).sum();
        assert_eq!(outlets, 12.0);
    }
}

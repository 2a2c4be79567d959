//! Depression carving
//!
//! Hydrological preprocessing that lowers terrain instead of raising it:
//! 1. Every interior pit (no lower valid neighbour) searches, with
//!    Dijkstra, the path to the nearest outlet that is cheapest to cut,
//!    where an outlet is any cell lower than the pit, any border cell, or
//!    any cell touching a void.
//! 2. The path is lowered to a straight grade between pit and outlet.
//! 3. An epsilon priority flood removes whatever could not be cut, so
//!    flats drain and every valid cell ends with a downslope neighbour.
//!
//! Reference:
//! Lindsay, J.B. (2016). Efficient hybrid breaching-filling sink removal
//! methods for flow path enforcement in digital elevation models.
//! *Hydrological Processes*, 30(6), 846–857.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use ndarray::Array2;
use swathflow_core::raster::{Connectivity, Raster};
use swathflow_core::{RasterElement, Result};

use super::{D8_DIST, D8_OFFSETS};

/// Parameters for depression carving
#[derive(Debug, Clone)]
pub struct CarveParams {
    /// Maximum depth a single cell may be lowered (elevation units)
    pub max_depth: f64,
    /// Maximum carve path length (cells)
    pub max_length: usize,
    /// Elevation increment imposed across filled flats
    pub epsilon: f64,
}

impl Default for CarveParams {
    fn default() -> Self {
        Self {
            max_depth: f64::MAX,
            max_length: usize::MAX,
            epsilon: 1e-5,
        }
    }
}

/// Priority queue entry; ordered so `BinaryHeap` pops the lowest key first
#[derive(Debug, Clone)]
struct QueuedCell {
    key: f64,
    row: usize,
    col: usize,
}

impl PartialEq for QueuedCell {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for QueuedCell {}

impl PartialOrd for QueuedCell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedCell {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key.partial_cmp(&self.key).unwrap_or(Ordering::Equal)
    }
}

fn is_edge_cell(z: &Array2<f64>, row: usize, col: usize) -> bool {
    let (rows, cols) = z.dim();
    row == 0
        || col == 0
        || row + 1 == rows
        || col + 1 == cols
        || Connectivity::Eight
            .neighbors(row, col, rows, cols)
            .any(|(r, c)| z[(r, c)].is_nan())
}

/// Carve depressions out of a DEM.
///
/// Missing cells (NaN) stay missing and act as outlets, like the grid
/// border. The input is not modified.
pub fn carve_depressions(dem: &Raster<f64>, params: CarveParams) -> Result<Raster<f64>> {
    let (rows, cols) = dem.shape();
    let nodata = dem.nodata();

    let mut z = dem.data().mapv(|v| if v.is_nodata(nodata) { f64::NAN } else { v });

    let pits: Vec<(usize, usize)> = z
        .indexed_iter()
        .filter(|&((row, col), &elev)| {
            !elev.is_nan()
                && !is_edge_cell(&z, row, col)
                && Connectivity::Eight
                    .neighbors(row, col, rows, cols)
                    .all(|(r, c)| z[(r, c)] >= elev)
        })
        .map(|(idx, _)| idx)
        .collect();

    tracing::debug!("carving {} pits", pits.len());

    let total = rows * cols;
    for &(pit_row, pit_col) in &pits {
        carve_pit(&mut z, pit_row, pit_col, total, &params);
    }

    fill_remaining(&mut z, params.epsilon);

    let mut result = dem.with_same_meta::<f64>(rows, cols);
    result.set_nodata(Some(f64::NAN));
    *result.data_mut() = z;

    Ok(result)
}

fn carve_pit(z: &mut Array2<f64>, pit_row: usize, pit_col: usize, total: usize, params: &CarveParams) {
    let (rows, cols) = z.dim();
    let pit_elev = z[(pit_row, pit_col)];

    let mut cost = vec![f64::MAX; total];
    let mut prev = vec![usize::MAX; total];
    let mut steps = vec![0usize; total];
    let mut visited = vec![false; total];

    let start = pit_row * cols + pit_col;
    cost[start] = 0.0;

    let mut heap = BinaryHeap::new();
    heap.push(QueuedCell { key: 0.0, row: pit_row, col: pit_col });

    let mut outlet: Option<usize> = None;

    while let Some(cell) = heap.pop() {
        let idx = cell.row * cols + cell.col;
        if visited[idx] {
            continue;
        }
        visited[idx] = true;

        if idx != start
            && (z[(cell.row, cell.col)] < pit_elev || is_edge_cell(z, cell.row, cell.col))
        {
            outlet = Some(idx);
            break;
        }

        if steps[idx] >= params.max_length {
            continue;
        }

        for (d, &(dr, dc)) in D8_OFFSETS.iter().enumerate() {
            let nr = cell.row as isize + dr;
            let nc = cell.col as isize + dc;
            if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                continue;
            }
            let (nr, nc) = (nr as usize, nc as usize);
            let n_idx = nr * cols + nc;
            let nz = z[(nr, nc)];
            if visited[n_idx] || nz.is_nan() {
                continue;
            }

            let cut = (nz - pit_elev).max(0.0);
            let new_cost = cell.key + cut * D8_DIST[d];
            if new_cost < cost[n_idx] {
                cost[n_idx] = new_cost;
                prev[n_idx] = idx;
                steps[n_idx] = steps[idx] + 1;
                heap.push(QueuedCell { key: new_cost, row: nr, col: nc });
            }
        }
    }

    let Some(outlet) = outlet else {
        return;
    };

    let mut path = Vec::new();
    let mut trace = outlet;
    while trace != start && trace != usize::MAX {
        path.push(trace);
        trace = prev[trace];
    }
    path.reverse();

    // An outlet that is not lower than the pit (border or void edge) is
    // cut too, so the path falls by at least epsilon per step.
    let n_steps = path.len();
    let outlet_z = z[(outlet / cols, outlet % cols)];
    let outlet_elev = if outlet_z < pit_elev {
        outlet_z
    } else {
        pit_elev - params.epsilon * (n_steps + 1) as f64
    };

    // Straight grade from the pit down to the outlet, never raising a cell
    for (step, &idx) in path.iter().enumerate() {
        let cell = (idx / cols, idx % cols);
        let frac = (step + 1) as f64 / (n_steps + 1) as f64;
        let grade = pit_elev + frac * (outlet_elev - pit_elev);
        let depth = z[cell] - grade;
        if depth > 0.0 && depth <= params.max_depth {
            z[cell] = grade;
        }
    }
}

/// Priority flood from the border and void edges, enforcing `epsilon` rise
fn fill_remaining(z: &mut Array2<f64>, epsilon: f64) {
    let (rows, cols) = z.dim();
    let mut queued = Array2::from_elem((rows, cols), false);
    let mut heap = BinaryHeap::new();

    for row in 0..rows {
        for col in 0..cols {
            let v = z[(row, col)];
            if v.is_nan() {
                queued[(row, col)] = true;
            } else if is_edge_cell(z, row, col) {
                queued[(row, col)] = true;
                heap.push(QueuedCell { key: v, row, col });
            }
        }
    }

    while let Some(cell) = heap.pop() {
        for (nr, nc) in Connectivity::Eight.neighbors(cell.row, cell.col, rows, cols) {
            if queued[(nr, nc)] {
                continue;
            }
            queued[(nr, nc)] = true;

            let raised = z[(nr, nc)].max(cell.key + epsilon);
            z[(nr, nc)] = raised;
            heap.push(QueuedCell { key: raised, row: nr, col: nc });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swathflow_core::GeoTransform;

    fn dem_with_sink() -> Raster<f64> {
        let values = vec![
            9.0, 9.0, 9.0, 9.0, 9.0, 9.0, 9.0,
            9.0, 8.0, 8.0, 8.0, 8.0, 8.0, 9.0,
            9.0, 8.0, 7.0, 7.0, 7.0, 8.0, 9.0,
            9.0, 8.0, 7.0, 3.0, 7.0, 8.0, 9.0,
            9.0, 8.0, 7.0, 7.0, 7.0, 8.0, 9.0,
            9.0, 8.0, 8.0, 8.0, 8.0, 8.0, 9.0,
            9.0, 9.0, 9.0, 9.0, 9.0, 9.0, 9.0,
        ];
        let mut dem = Raster::from_vec(values, 7, 7).unwrap();
        dem.set_transform(GeoTransform::new(0.0, 7.0, 1.0, -1.0));
        dem
    }

    fn has_lower_neighbor(z: &Raster<f64>, row: usize, col: usize) -> bool {
        let (rows, cols) = z.shape();
        let here = z.get(row, col).unwrap();
        Connectivity::Eight
            .neighbors(row, col, rows, cols)
            .any(|(r, c)| z.get(r, c).unwrap() < here)
    }

    #[test]
    fn test_every_interior_cell_drains() {
        let carved = carve_depressions(&dem_with_sink(), CarveParams::default()).unwrap();
        for row in 1..6 {
            for col in 1..6 {
                assert!(
                    has_lower_neighbor(&carved, row, col),
                    "cell ({}, {}) has no downslope neighbour",
                    row, col
                );
            }
        }
    }

    #[test]
    fn test_clean_dem_unchanged() {
        let mut dem = Raster::new(10, 10);
        for row in 0..10 {
            for col in 0..10 {
                dem.set(row, col, (row + col) as f64).unwrap();
            }
        }

        let carved = carve_depressions(&dem, CarveParams::default()).unwrap();
        for row in 0..10 {
            for col in 0..10 {
                assert!((dem.get(row, col).unwrap() - carved.get(row, col).unwrap()).abs() < 1e-10);
            }
        }
    }

    #[test]
    fn test_pit_is_cut_not_filled() {
        let dem = dem_with_sink();
        let carved = carve_depressions(&dem, CarveParams::default()).unwrap();
        // The pit floor keeps its elevation; its wall was lowered instead
        assert!((carved.get(3, 3).unwrap() - 3.0).abs() < 1e-9);
        let changed = (0..7)
            .flat_map(|r| (0..7).map(move |c| (r, c)))
            .filter(|&(r, c)| (dem.get(r, c).unwrap() - carved.get(r, c).unwrap()).abs() > 1e-10)
            .count();
        assert!(changed < 10, "carving touched {} cells", changed);
    }

    #[test]
    fn test_voids_preserved_and_tiny_grids() {
        let mut dem = dem_with_sink();
        dem.set(0, 0, f64::NAN).unwrap();
        let carved = carve_depressions(&dem, CarveParams::default()).unwrap();
        assert!(carved.get(0, 0).unwrap().is_nan());

        let tiny: Raster<f64> = Raster::filled(1, 2, 5.0);
        assert!(carve_depressions(&tiny, CarveParams::default()).is_ok());
    }
}

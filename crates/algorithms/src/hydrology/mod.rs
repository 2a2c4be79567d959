//! Hydrological primitives
//!
//! - Carve: depression removal by least-cost breaching
//! - Flow direction: D8 single flow direction
//! - Flow accumulation: upstream contributing cells
//! - Stream network: threshold mask and vector network with Strahler order

mod carve;
mod flow_accumulation;
mod flow_direction;
mod stream_network;

pub use carve::{carve_depressions, CarveParams};
pub use flow_accumulation::{flow_accumulation, FlowAccumulation};
pub use flow_direction::{flow_direction, FlowDirection};
pub use stream_network::{
    stream_mask, StreamNetwork, StreamNetworkParams, StreamSegment,
};

/// D8 neighbor offsets: (row_offset, col_offset)
/// Indexed to match the direction encoding (1=E, 2=NE, ..., 8=SE)
pub(crate) const D8_OFFSETS: [(isize, isize); 8] = [
    (0, 1),   // 1: E
    (-1, 1),  // 2: NE
    (-1, 0),  // 3: N
    (-1, -1), // 4: NW
    (0, -1),  // 5: W
    (1, -1),  // 6: SW
    (1, 0),   // 7: S
    (1, 1),   // 8: SE
];

/// Distance factors for each D8 direction
pub(crate) const D8_DIST: [f64; 8] = [
    1.0, std::f64::consts::SQRT_2, 1.0, std::f64::consts::SQRT_2,
    1.0, std::f64::consts::SQRT_2, 1.0, std::f64::consts::SQRT_2,
];

/// Cell that `dir` points to from (row, col), if it lies inside the grid
pub(crate) fn d8_target(
    row: usize,
    col: usize,
    dir: u8,
    rows: usize,
    cols: usize,
) -> Option<(usize, usize)> {
    if dir == 0 || dir as usize > D8_OFFSETS.len() {
        return None;
    }
    let (dr, dc) = D8_OFFSETS[(dir - 1) as usize];
    let nr = row as isize + dr;
    let nc = col as isize + dc;
    if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
        return None;
    }
    Some((nr as usize, nc as usize))
}

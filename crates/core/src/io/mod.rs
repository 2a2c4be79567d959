//! Reading and writing elevation grids

mod ascii;
mod geotiff;
mod source;

pub use ascii::{read_ascii_grid, read_ascii_grid_from_str, write_ascii_grid};
pub use geotiff::{read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer};
pub use source::{load_dem, DemSource, GridFormat};

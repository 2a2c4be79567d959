//! DEM conditioning
//!
//! - Labeling: connected components of a boolean grid
//! - Flat regions: large connected areas of zero or singular gradient
//! - Predicate: user expression over elevation marking cells as missing
//! - Conditioner: applies a no-data policy, then crops to valid cells

mod conditioner;
mod flat_regions;
mod labeling;
mod predicate;

pub use conditioner::{
    condition_dem, ConditionParams, ConditionedDem, ConditioningWarning, DemConditioner,
    NoDataPolicy,
};
pub use flat_regions::{detect_flat_regions, FlatRegionDetector, FlatRegionParams};
pub use labeling::{label_components, Components};
pub use predicate::NoDataPredicate;

/// Pixel count equivalent to `area` map units squared, rounded to nearest
pub fn area_to_pixels_round(area: f64, cell_size: f64) -> usize {
    (area / (cell_size * cell_size)).round().max(0.0) as usize
}

/// Pixel count equivalent to `area` map units squared, rounded down
pub fn area_to_pixels_floor(area: f64, cell_size: f64) -> usize {
    (area / (cell_size * cell_size)).floor().max(0.0) as usize
}

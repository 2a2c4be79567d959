//! Terrain derivatives
//!
//! - Gradient8: steepest downward slope per cell, used to find flats

mod gradient;

pub use gradient::{gradient8, Gradient8};

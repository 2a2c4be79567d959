//! Error types for swathflow

use thiserror::Error;

/// Main error type for swathflow operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Unrecognized grid source: {0}")]
    UnsupportedSource(String),

    #[error("Malformed grid file: {0}")]
    Format(String),

    #[error("Grid contains no valid cells")]
    NoValidCells,

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Scatter and heatmap display modes are mutually exclusive")]
    ConflictingDisplayModes,

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for swathflow operations
pub type Result<T> = std::result::Result<T, Error>;

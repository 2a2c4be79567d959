//! Topographic swath profiles
//!
//! - Path: validated centre line and its bend distances
//! - Sampler: elevations across the path at regular stations
//! - Statistics: min/mean/max envelope per station
//! - Heatmap: per-station elevation density on a shared axis
//! - Display: envelope, scatter or heatmap plot content

mod display;
mod heatmap;
mod path;
mod sampler;
mod statistics;

pub use display::{build_display, DisplayMode, SwathDisplay};
pub use heatmap::{heatmap, Heatmap, HeatmapParams};
pub use path::SwathPath;
pub use sampler::{CrossSectionSampler, PerpendicularSampler, SwathSample};
pub use statistics::{envelope_matrix, swath_statistics, Envelope};

use ndarray::Array2;
use swathflow_core::raster::Raster;
use swathflow_core::{Algorithm, Error, Result};

/// Options for swath extraction
#[derive(Debug, Clone)]
pub struct SwathParams {
    /// Station and across-track spacing; the DEM cell size when `None`
    pub spacing: Option<f64>,
    /// Centre-line smoothing distance in map units
    pub smoothing: f64,
    /// Vertical exaggeration of the plot
    pub exaggeration: f64,
    pub mode: DisplayMode,
    /// Build the display product
    pub render: bool,
}

impl Default for SwathParams {
    fn default() -> Self {
        Self {
            spacing: None,
            smoothing: 0.0,
            exaggeration: 10.0,
            mode: DisplayMode::Envelope,
            render: false,
        }
    }
}

/// Everything a swath extraction produces
#[derive(Debug, Clone)]
pub struct SwathResult {
    pub path: SwathPath,
    pub sample: SwathSample,
    pub envelope: Vec<Envelope>,
    pub bends: Vec<f64>,
    /// Present when rendering was requested
    pub display: Option<SwathDisplay>,
}

impl SwathResult {
    /// `stations x 4` matrix of (distance, min, mean, max)
    pub fn matrix(&self) -> Array2<f64> {
        envelope_matrix(&self.envelope)
    }

    /// Centre-line coordinates of every station
    pub fn centerline(&self) -> &[(f64, f64)] {
        &self.sample.centerline
    }
}

/// Input of [`SwathExtraction`]
#[derive(Debug, Clone)]
pub struct SwathRequest {
    pub dem: Raster<f64>,
    pub points: Vec<(f64, f64)>,
    pub width: f64,
}

/// Swath extraction with the default sampler
#[derive(Debug, Clone, Default)]
pub struct SwathExtraction;

impl Algorithm for SwathExtraction {
    type Input = SwathRequest;
    type Output = SwathResult;
    type Params = SwathParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Swath Profile"
    }

    fn description(&self) -> &'static str {
        "Elevation envelope across a path through a DEM"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        extract_swath(&input.dem, input.points, input.width, &params)
    }
}

/// Extract a swath of `width` along `points` using [`PerpendicularSampler`]
pub fn extract_swath(
    dem: &Raster<f64>,
    points: Vec<(f64, f64)>,
    width: f64,
    params: &SwathParams,
) -> Result<SwathResult> {
    extract_swath_with(&PerpendicularSampler, dem, points, width, params)
}

/// Extract a swath with a caller-chosen sampler.
///
/// Every argument is validated before the DEM is touched.
pub fn extract_swath_with<S: CrossSectionSampler + ?Sized>(
    sampler: &S,
    dem: &Raster<f64>,
    points: Vec<(f64, f64)>,
    width: f64,
    params: &SwathParams,
) -> Result<SwathResult> {
    let path = SwathPath::new(points, width, params.spacing, params.smoothing)?;
    if !params.exaggeration.is_finite() || params.exaggeration <= 0.0 {
        return Err(Error::InvalidParameter {
            name: "exaggeration",
            value: params.exaggeration.to_string(),
            reason: "must be positive".into(),
        });
    }

    let spacing = path.spacing().unwrap_or_else(|| dem.cell_size());
    let bends = path.bends();

    let sample = sampler.sample(dem, &path, spacing)?;
    let envelope = swath_statistics(&sample);

    let display = if params.render {
        Some(build_display(params.mode, &sample, &envelope, params.exaggeration)?)
    } else {
        None
    };

    tracing::debug!(
        "swath: length {:.1}, {} stations, {} bends, mode {}",
        path.length(),
        sample.station_count(),
        bends.len(),
        params.mode
    );

    Ok(SwathResult {
        path,
        sample,
        envelope,
        bends,
        display,
    })
}

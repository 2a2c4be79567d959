//! DEM conditioning: no-data policy, then crop to the valid extent

use std::fmt;
use std::str::FromStr;

use swathflow_core::raster::{CellWindow, Raster};
use swathflow_core::{Algorithm, Connectivity, Error, Result};

use super::{detect_flat_regions, FlatRegionParams, NoDataPredicate};

/// How cells are marked missing before cropping
#[derive(Debug, Clone, PartialEq, Default)]
pub enum NoDataPolicy {
    /// Leave the grid as it is
    #[default]
    None,
    /// Mask large flat or singular regions
    Auto,
    /// Mask cells for which the expression holds
    Predicate(String),
}

impl FromStr for NoDataPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        Ok(match trimmed.to_ascii_lowercase().as_str() {
            "" | "none" => NoDataPolicy::None,
            "auto" => NoDataPolicy::Auto,
            _ => NoDataPolicy::Predicate(trimmed.to_string()),
        })
    }
}

/// Parameters for DEM conditioning
#[derive(Debug, Clone)]
pub struct ConditionParams {
    pub policy: NoDataPolicy,
    /// Minimum flat area in map units squared, used by [`NoDataPolicy::Auto`]
    pub min_flat_area: f64,
    /// Adjacency for flat region grouping
    pub connectivity: Connectivity,
    /// Whether the caller resampled (or will resample) the grid. Silences
    /// the non-integer cell size warning.
    pub resampled: bool,
}

impl Default for ConditionParams {
    fn default() -> Self {
        Self {
            policy: NoDataPolicy::None,
            min_flat_area: 1e5,
            connectivity: Connectivity::Eight,
            resampled: false,
        }
    }
}

/// Non-fatal problems met while conditioning
#[derive(Debug, Clone, PartialEq)]
pub enum ConditioningWarning {
    /// The no-data expression could not be parsed or evaluated; no cells
    /// were masked.
    InvalidPredicate { expression: String, reason: String },
    /// Flow routing on this grid may be numerically unstable
    NonIntegerCellSize { cell_size: f64 },
}

impl fmt::Display for ConditioningWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditioningWarning::InvalidPredicate { expression, reason } => write!(
                f,
                "no-data expression '{}' ignored: {}",
                expression, reason
            ),
            ConditioningWarning::NonIntegerCellSize { cell_size } => write!(
                f,
                "cell size {} is not an integer; consider resampling",
                cell_size
            ),
        }
    }
}

/// A conditioned grid with what happened to it
#[derive(Debug, Clone)]
pub struct ConditionedDem {
    pub dem: Raster<f64>,
    /// Cells turned missing by the policy
    pub masked_cells: usize,
    /// Window of the input grid that was kept
    pub window: CellWindow,
    pub warnings: Vec<ConditioningWarning>,
}

/// DEM conditioner
#[derive(Debug, Clone, Default)]
pub struct DemConditioner;

impl Algorithm for DemConditioner {
    type Input = Raster<f64>;
    type Output = ConditionedDem;
    type Params = ConditionParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "DEM Conditioning"
    }

    fn description(&self) -> &'static str {
        "Mask invalid cells by policy and crop to the valid extent"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        condition_dem(input, &params)
    }
}

/// Apply `params.policy` to `dem`, then crop away every border row and
/// column that holds no valid cell.
///
/// An unusable predicate is reported as a warning and leaves the grid
/// unmasked. Fails with [`Error::NoValidCells`] if nothing valid remains.
pub fn condition_dem(mut dem: Raster<f64>, params: &ConditionParams) -> Result<ConditionedDem> {
    let mut warnings = Vec::new();

    let cell_size = dem.cell_size();
    if !params.resampled && cell_size.fract() != 0.0 {
        let warning = ConditioningWarning::NonIntegerCellSize { cell_size };
        tracing::warn!("{}", warning);
        warnings.push(warning);
    }

    let mask = match &params.policy {
        NoDataPolicy::None => None,
        NoDataPolicy::Auto => Some(detect_flat_regions(
            &dem,
            &FlatRegionParams {
                min_flat_area: params.min_flat_area,
                connectivity: params.connectivity,
            },
        )?),
        NoDataPolicy::Predicate(expression) => {
            match NoDataPredicate::parse(expression).and_then(|p| p.mask(&dem)) {
                Ok(mask) => Some(mask),
                Err(e) => {
                    let warning = ConditioningWarning::InvalidPredicate {
                        expression: expression.clone(),
                        reason: e.to_string(),
                    };
                    tracing::warn!("{}", warning);
                    warnings.push(warning);
                    None
                }
            }
        }
    };

    let masked_cells = match mask {
        Some(mask) => dem.apply_mask(&mask)?,
        None => 0,
    };

    let window = dem.valid_window().ok_or(Error::NoValidCells)?;
    let (rows, cols) = dem.shape();
    let dem = if window.rows() == rows && window.cols() == cols {
        dem
    } else {
        dem.crop(window)?
    };

    tracing::debug!(
        "conditioned: {} cells masked, {}x{} -> {}x{}",
        masked_cells,
        rows,
        cols,
        dem.rows(),
        dem.cols()
    );

    Ok(ConditionedDem {
        dem,
        masked_cells,
        window,
        warnings,
    })
}

//! Elevation density per station
//!
//! All stations share one elevation axis of equal-width bins spanning the
//! global envelope padded by one elevation unit on each side. Bins whose
//! centre lies outside a station's own [min, max] are set to NaN so that
//! "outside the local range" draws differently from "no observations".
//! A bin that holds observations is never masked.

use ndarray::Array2;
use swathflow_core::{Error, Result};

use super::{Envelope, SwathSample};

/// Parameters for heatmap binning
#[derive(Debug, Clone)]
pub struct HeatmapParams {
    pub bins: usize,
    /// Padding added below the lowest and above the highest elevation
    pub padding: f64,
}

impl Default for HeatmapParams {
    fn default() -> Self {
        Self {
            bins: 100,
            padding: 1.0,
        }
    }
}

/// Binned observation counts, `bins x stations`
#[derive(Debug, Clone)]
pub struct Heatmap {
    /// Counts; NaN marks bins outside the station's envelope
    pub counts: Array2<f64>,
    /// `bins + 1` increasing bin edges
    pub edges: Vec<f64>,
    pub centers: Vec<f64>,
    /// Along-path distance of each column
    pub distances: Vec<f64>,
}

impl Heatmap {
    /// Sum of the unmasked counts of station `i`
    pub fn station_total(&self, i: usize) -> f64 {
        self.counts.column(i).iter().filter(|c| !c.is_nan()).sum()
    }
}

/// Bin every station's valid observations on the shared elevation axis.
///
/// Fails with [`Error::NoValidCells`] when no station has a valid value.
pub fn heatmap(
    sample: &SwathSample,
    envelope: &[Envelope],
    params: &HeatmapParams,
) -> Result<Heatmap> {
    if params.bins == 0 {
        return Err(Error::InvalidParameter {
            name: "bins",
            value: "0".into(),
            reason: "need at least one bin".into(),
        });
    }
    if envelope.len() != sample.station_count() {
        return Err(Error::Algorithm(format!(
            "{} envelope rows for {} stations",
            envelope.len(),
            sample.station_count()
        )));
    }

    let lo = envelope.iter().map(|e| e.min).filter(|v| !v.is_nan()).fold(f64::INFINITY, f64::min);
    let hi = envelope.iter().map(|e| e.max).filter(|v| !v.is_nan()).fold(f64::NEG_INFINITY, f64::max);
    if !lo.is_finite() || !hi.is_finite() {
        return Err(Error::NoValidCells);
    }

    let bins = params.bins;
    let (lo, hi) = (lo - params.padding, hi + params.padding);
    let width = (hi - lo) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|k| lo + k as f64 * width).collect();
    let centers: Vec<f64> = (0..bins).map(|k| lo + (k as f64 + 0.5) * width).collect();

    let stations = sample.station_count();
    let mut counts = Array2::<f64>::zeros((bins, stations));

    for (i, env) in envelope.iter().enumerate() {
        for z in sample.valid_at(i) {
            let k = if width > 0.0 {
                (((z - lo) / width).floor().max(0.0) as usize).min(bins - 1)
            } else {
                0
            };
            counts[(k, i)] += 1.0;
        }

        for (k, &c) in centers.iter().enumerate() {
            let outside = !env.is_valid() || c < env.min || c > env.max;
            if outside && counts[(k, i)] == 0.0 {
                counts[(k, i)] = f64::NAN;
            }
        }
    }

    Ok(Heatmap {
        counts,
        edges,
        centers,
        distances: sample.distances.clone(),
    })
}

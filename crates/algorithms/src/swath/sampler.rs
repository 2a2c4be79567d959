//! Cross-section sampling along a swath path
//!
//! [`CrossSectionSampler`] is the seam between swath extraction and the
//! way elevations are actually gathered. [`PerpendicularSampler`] walks
//! the centre line at a fixed spacing and samples the DEM along the
//! local normal at each station.

use ndarray::Array2;
use crate::maybe_rayon::*;
use swathflow_core::raster::Raster;
use swathflow_core::{Error, Result};

use super::SwathPath;
use crate::resample::sample_bilinear;

/// Elevations gathered along a swath
#[derive(Debug, Clone)]
pub struct SwathSample {
    /// Along-path distance of each station, increasing
    pub distances: Vec<f64>,
    /// Centre-line coordinates of each station
    pub centerline: Vec<(f64, f64)>,
    /// Signed across-track offset of each observation column (left is
    /// positive)
    pub offsets: Vec<f64>,
    /// `stations x offsets` elevations; NaN where the DEM has no value
    pub observations: Array2<f64>,
}

impl SwathSample {
    pub fn station_count(&self) -> usize {
        self.distances.len()
    }

    /// Valid observations of station `i`
    pub fn valid_at(&self, i: usize) -> impl Iterator<Item = f64> + '_ {
        self.observations.row(i).into_iter().copied().filter(|z| !z.is_nan())
    }
}

/// Gathers per-station elevation profiles across a path
pub trait CrossSectionSampler {
    /// Sample `dem` along `path` with stations every `spacing` map units
    fn sample(&self, dem: &Raster<f64>, path: &SwathPath, spacing: f64) -> Result<SwathSample>;
}

/// Samples bilinearly along normals to a (optionally smoothed) centre line
#[derive(Debug, Clone, Copy, Default)]
pub struct PerpendicularSampler;

/// Stations every `spacing` along the polyline, original vertices included
fn densify(points: &[(f64, f64)], spacing: f64) -> Vec<(f64, f64)> {
    let mut stations = Vec::new();
    for w in points.windows(2) {
        let (a, b) = (w[0], w[1]);
        let len = (b.0 - a.0).hypot(b.1 - a.1);
        if len == 0.0 {
            continue;
        }
        let steps = (len / spacing).ceil().max(1.0) as usize;
        for k in 0..steps {
            let t = k as f64 / steps as f64;
            stations.push((a.0 + t * (b.0 - a.0), a.1 + t * (b.1 - a.1)));
        }
    }
    if let Some(&last) = points.last() {
        stations.push(last);
    }
    stations
}

/// Moving average over `half` stations on each side; endpoints stay put
fn smooth(stations: &[(f64, f64)], half: usize) -> Vec<(f64, f64)> {
    let n = stations.len();
    if half == 0 || n < 3 {
        return stations.to_vec();
    }
    (0..n)
        .map(|i| {
            if i == 0 || i == n - 1 {
                return stations[i];
            }
            let lo = i.saturating_sub(half);
            let hi = i.saturating_add(half).min(n - 1);
            let count = (hi - lo + 1) as f64;
            let (sx, sy) = stations[lo..=hi]
                .iter()
                .fold((0.0, 0.0), |(sx, sy), &(x, y)| (sx + x, sy + y));
            (sx / count, sy / count)
        })
        .collect()
}

fn cumulative_distances(stations: &[(f64, f64)]) -> Vec<f64> {
    let mut acc = 0.0;
    let mut out = Vec::with_capacity(stations.len());
    for (i, p) in stations.iter().enumerate() {
        if i > 0 {
            let q = stations[i - 1];
            acc += (p.0 - q.0).hypot(p.1 - q.1);
        }
        out.push(acc);
    }
    out
}

/// Unit left normals from central-difference tangents
fn normals(stations: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let n = stations.len();
    let mut out: Vec<(f64, f64)> = Vec::with_capacity(n);
    for i in 0..n {
        let a = stations[i.saturating_sub(1)];
        let b = stations[(i + 1).min(n - 1)];
        let (tx, ty) = (b.0 - a.0, b.1 - a.1);
        let len = tx.hypot(ty);
        let normal = if len > 0.0 {
            (-ty / len, tx / len)
        } else {
            out.last().copied().unwrap_or((0.0, 1.0))
        };
        out.push(normal);
    }
    out
}

impl CrossSectionSampler for PerpendicularSampler {
    fn sample(&self, dem: &Raster<f64>, path: &SwathPath, spacing: f64) -> Result<SwathSample> {
        if !spacing.is_finite() || spacing <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "spacing",
                value: spacing.to_string(),
                reason: "must be positive".into(),
            });
        }

        let stations = densify(path.points(), spacing);
        // a window wider than the path averages the whole path
        let half_window = (path.smoothing() / spacing)
            .round()
            .min(stations.len() as f64) as usize;
        let stations = smooth(&stations, half_window);
        let distances = cumulative_distances(&stations);
        let normals = normals(&stations);

        let half = (path.width() / 2.0 / spacing).floor() as i64;
        let offsets: Vec<f64> = (-half..=half).map(|k| k as f64 * spacing).collect();
        let n_across = offsets.len();

        let values: Vec<f64> = (0..stations.len())
            .into_par_iter()
            .flat_map(|i| {
                let (cx, cy) = stations[i];
                let (nx, ny) = normals[i];
                offsets
                    .iter()
                    .map(|&o| sample_bilinear(dem, cx + o * nx, cy + o * ny))
                    .collect::<Vec<f64>>()
            })
            .collect();

        let observations = Array2::from_shape_vec((stations.len(), n_across), values)
            .map_err(|e| Error::Other(e.to_string()))?;

        tracing::debug!(
            "swath: {} stations x {} samples, spacing {}, smoothing window {}",
            stations.len(),
            n_across,
            spacing,
            half_window
        );

        Ok(SwathSample {
            distances,
            centerline: stations,
            offsets,
            observations,
        })
    }
}

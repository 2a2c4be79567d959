//! Per-station elevation envelopes

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::SwathSample;

/// Reduction of one station's observations; fields are NaN when the
/// station has no valid observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub distance: f64,
    pub min: f64,
    pub mean: f64,
    pub max: f64,
}

impl Envelope {
    pub fn is_valid(&self) -> bool {
        !self.mean.is_nan()
    }
}

/// Min, mean and max of every station, ignoring missing observations
pub fn swath_statistics(sample: &SwathSample) -> Vec<Envelope> {
    sample
        .distances
        .iter()
        .enumerate()
        .map(|(i, &distance)| {
            let (mut min, mut max, mut sum, mut count) =
                (f64::INFINITY, f64::NEG_INFINITY, 0.0, 0usize);
            for z in sample.valid_at(i) {
                min = min.min(z);
                max = max.max(z);
                sum += z;
                count += 1;
            }

            if count == 0 {
                Envelope {
                    distance,
                    min: f64::NAN,
                    mean: f64::NAN,
                    max: f64::NAN,
                }
            } else {
                // clamp against rounding in the sum
                let mean = (sum / count as f64).clamp(min, max);
                Envelope { distance, min, mean, max }
            }
        })
        .collect()
}

/// `stations x 4` matrix of (distance, min, mean, max)
pub fn envelope_matrix(envelope: &[Envelope]) -> Array2<f64> {
    Array2::from_shape_fn((envelope.len(), 4), |(i, j)| {
        let e = &envelope[i];
        match j {
            0 => e.distance,
            1 => e.min,
            2 => e.mean,
            _ => e.max,
        }
    })
}

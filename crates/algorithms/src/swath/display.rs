//! What a swath plot draws
//!
//! Three mutually exclusive displays: the min/mean/max envelope (default),
//! a scatter of every observation, or a density heatmap.

use std::fmt;
use std::str::FromStr;

use swathflow_core::{Error, Result};

use super::{heatmap, Envelope, Heatmap, HeatmapParams, SwathSample};

/// Display mode of a swath plot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    #[default]
    Envelope,
    Scatter,
    Heatmap,
}

impl DisplayMode {
    /// Mode from the two opt-in flags; asking for both is an error
    pub fn from_flags(scatter: bool, heatmap: bool) -> Result<Self> {
        match (scatter, heatmap) {
            (true, true) => Err(Error::ConflictingDisplayModes),
            (true, false) => Ok(DisplayMode::Scatter),
            (false, true) => Ok(DisplayMode::Heatmap),
            (false, false) => Ok(DisplayMode::Envelope),
        }
    }
}

impl FromStr for DisplayMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "envelope" => Ok(DisplayMode::Envelope),
            "scatter" => Ok(DisplayMode::Scatter),
            "heatmap" => Ok(DisplayMode::Heatmap),
            other => Err(Error::InvalidParameter {
                name: "mode",
                value: other.to_string(),
                reason: "expected envelope, scatter or heatmap".into(),
            }),
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DisplayMode::Envelope => "envelope",
            DisplayMode::Scatter => "scatter",
            DisplayMode::Heatmap => "heatmap",
        })
    }
}

/// Numeric content of a swath plot
#[derive(Debug, Clone)]
pub enum SwathDisplay {
    Envelope {
        rows: Vec<Envelope>,
        exaggeration: f64,
    },
    /// Every valid observation as (distance, elevation)
    Scatter {
        points: Vec<(f64, f64)>,
        exaggeration: f64,
    },
    Heatmap {
        heatmap: Heatmap,
        exaggeration: f64,
    },
}

impl SwathDisplay {
    pub fn mode(&self) -> DisplayMode {
        match self {
            SwathDisplay::Envelope { .. } => DisplayMode::Envelope,
            SwathDisplay::Scatter { .. } => DisplayMode::Scatter,
            SwathDisplay::Heatmap { .. } => DisplayMode::Heatmap,
        }
    }

    /// Vertical exaggeration the plot should use
    pub fn exaggeration(&self) -> f64 {
        match self {
            SwathDisplay::Envelope { exaggeration, .. }
            | SwathDisplay::Scatter { exaggeration, .. }
            | SwathDisplay::Heatmap { exaggeration, .. } => *exaggeration,
        }
    }
}

/// Build the display product for `mode`
pub fn build_display(
    mode: DisplayMode,
    sample: &SwathSample,
    envelope: &[Envelope],
    exaggeration: f64,
) -> Result<SwathDisplay> {
    Ok(match mode {
        DisplayMode::Envelope => SwathDisplay::Envelope {
            rows: envelope.to_vec(),
            exaggeration,
        },
        DisplayMode::Scatter => SwathDisplay::Scatter {
            points: (0..sample.station_count())
                .flat_map(move |i| sample.valid_at(i).map(move |z| (sample.distances[i], z)))
                .collect(),
            exaggeration,
        },
        DisplayMode::Heatmap => SwathDisplay::Heatmap {
            heatmap: heatmap(sample, envelope, &HeatmapParams::default())?,
            exaggeration,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swath::swath_statistics;
    use ndarray::Array2;

    #[test]
    fn test_flags() {
        assert_eq!(DisplayMode::from_flags(false, false).unwrap(), DisplayMode::Envelope);
        assert_eq!(DisplayMode::from_flags(true, false).unwrap(), DisplayMode::Scatter);
        assert_eq!(DisplayMode::from_flags(false, true).unwrap(), DisplayMode::Heatmap);
        assert!(matches!(
            DisplayMode::from_flags(true, true),
            Err(Error::ConflictingDisplayModes)
        ));
    }

    #[test]
    fn test_parse_round_trip() {
        for mode in [DisplayMode::Envelope, DisplayMode::Scatter, DisplayMode::Heatmap] {
            assert_eq!(mode.to_string().parse::<DisplayMode>().unwrap(), mode);
        }
        assert!("contour".parse::<DisplayMode>().is_err());
    }

    #[test]
    fn test_scatter_skips_missing() {
        let sample = SwathSample {
            distances: vec![0.0, 10.0],
            centerline: vec![(0.0, 0.0), (10.0, 0.0)],
            offsets: vec![-1.0, 1.0],
            observations: Array2::from_shape_vec((2, 2), vec![1.0, f64::NAN, 3.0, 4.0]).unwrap(),
        };
        let env = swath_statistics(&sample);
        let display = build_display(DisplayMode::Scatter, &sample, &env, 5.0).unwrap();

        assert_eq!(display.mode(), DisplayMode::Scatter);
        assert_eq!(display.exaggeration(), 5.0);
        match display {
            SwathDisplay::Scatter { points, .. } => {
                assert_eq!(points, vec![(0.0, 1.0), (10.0, 3.0), (10.0, 4.0)]);
            }
            other => panic!("expected scatter, got {:?}", other.mode()),
        }
    }
}

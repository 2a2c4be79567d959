//! Swath centre lines

use swathflow_core::{Error, Result};

/// A validated swath centre line with its sampling geometry
#[derive(Debug, Clone, PartialEq)]
pub struct SwathPath {
    points: Vec<(f64, f64)>,
    width: f64,
    spacing: Option<f64>,
    smoothing: f64,
}

fn invalid(name: &'static str, value: impl ToString, reason: &str) -> Error {
    Error::InvalidParameter {
        name,
        value: value.to_string(),
        reason: reason.into(),
    }
}

impl SwathPath {
    /// Build a path from map-coordinate vertices.
    ///
    /// Needs at least two points, a positive width, a positive spacing
    /// when one is given, and a non-negative smoothing distance.
    pub fn new(
        points: Vec<(f64, f64)>,
        width: f64,
        spacing: Option<f64>,
        smoothing: f64,
    ) -> Result<Self> {
        if points.len() < 2 {
            return Err(invalid("path", points.len(), "a swath path needs at least 2 points"));
        }
        if points.iter().any(|&(x, y)| !x.is_finite() || !y.is_finite()) {
            return Err(invalid("path", format!("{:?}", points), "coordinates must be finite"));
        }
        if !width.is_finite() || width <= 0.0 {
            return Err(invalid("width", width, "must be positive"));
        }
        if let Some(s) = spacing {
            if !s.is_finite() || s <= 0.0 {
                return Err(invalid("spacing", s, "must be positive"));
            }
        }
        if !smoothing.is_finite() || smoothing < 0.0 {
            return Err(invalid("smoothing", smoothing, "must be non-negative"));
        }

        let path = Self {
            points,
            width,
            spacing,
            smoothing,
        };
        if path.length() == 0.0 {
            return Err(invalid("path", format!("{:?}", path.points), "path has zero length"));
        }
        Ok(path)
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    /// Station spacing, if one was set
    pub fn spacing(&self) -> Option<f64> {
        self.spacing
    }

    pub fn smoothing(&self) -> f64 {
        self.smoothing
    }

    /// Lengths of the straight segments between consecutive vertices
    pub fn segment_lengths(&self) -> impl Iterator<Item = f64> + '_ {
        self.points
            .windows(2)
            .map(|w| (w[1].0 - w[0].0).hypot(w[1].1 - w[0].1))
    }

    /// Total planimetric length
    pub fn length(&self) -> f64 {
        self.segment_lengths().sum()
    }

    /// Along-path distance of every interior vertex, in vertex order.
    ///
    /// A two-point path has no bends and yields `[0.0]`.
    pub fn bends(&self) -> Vec<f64> {
        if self.points.len() == 2 {
            return vec![0.0];
        }
        let n_interior = self.points.len() - 2;
        self.segment_lengths()
            .take(n_interior)
            .scan(0.0, |acc, d| {
                *acc += d;
                Some(*acc)
            })
            .collect()
    }
}

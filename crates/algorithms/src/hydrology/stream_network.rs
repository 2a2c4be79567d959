//! Stream network extraction
//!
//! A stream cell is any cell whose flow accumulation exceeds a pixel
//! threshold. Stream cells are then linked along D8 directions into
//! segments ("links") that run from a channel head or a confluence down
//! to the next confluence or to an outlet. Consecutive segments share the
//! confluence vertex so the polylines connect.

use std::collections::HashMap;
use geo::{Coord, LineString};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use swathflow_core::raster::Raster;
use swathflow_core::vector::{AttributeValue, Feature, FeatureCollection};
use swathflow_core::{Error, Result};

use super::d8_target;

/// Parameters for stream mask extraction
#[derive(Debug, Clone)]
pub struct StreamNetworkParams {
    /// Cells with accumulation strictly greater than this (in cells)
    /// are streams.
    pub threshold: f64,
}

impl Default for StreamNetworkParams {
    fn default() -> Self {
        Self { threshold: 1000.0 }
    }
}

/// Threshold flow accumulation into a stream mask (1 = stream, 0 = not).
///
/// Missing accumulation values are never streams.
pub fn stream_mask(flow_acc: &Raster<f64>, params: StreamNetworkParams) -> Result<Raster<u8>> {
    let (rows, cols) = flow_acc.shape();
    let threshold = params.threshold;

    let mask = flow_acc
        .data()
        .mapv(|acc| u8::from(!acc.is_nan() && acc > threshold));

    let mut output = flow_acc.with_same_meta::<u8>(rows, cols);
    *output.data_mut() = mask;
    Ok(output)
}

/// One link of the drainage network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamSegment {
    pub id: usize,
    /// Grid cells from upstream to downstream
    pub cells: Vec<(usize, usize)>,
    /// Cell-centre map coordinates, same order as `cells`
    pub coords: Vec<(f64, f64)>,
    /// Segment this one flows into, `None` at an outlet
    pub downstream: Option<usize>,
    /// Strahler order
    pub order: u32,
    /// Planimetric length in map units
    pub length: f64,
    /// Contributing area at the segment's last own cell, map units squared
    pub upstream_area: f64,
}

/// Vector drainage network
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamNetwork {
    pub segments: Vec<StreamSegment>,
}

impl StreamNetwork {
    /// Link the cells of `mask` along `flow_dir` into segments.
    ///
    /// `flow_acc` supplies the contributing area of each segment.
    pub fn extract(
        flow_dir: &Raster<u8>,
        mask: &Raster<u8>,
        flow_acc: &Raster<f64>,
    ) -> Result<Self> {
        let shape = flow_dir.shape();
        for other in [mask.shape(), flow_acc.shape()] {
            if other != shape {
                return Err(Error::SizeMismatch {
                    er: shape.0,
                    ec: shape.1,
                    ar: other.0,
                    ac: other.1,
                });
            }
        }
        let (rows, cols) = shape;
        let is_stream = |cell: (usize, usize)| mask.data()[cell] != 0;

        let downstream_of = |cell: (usize, usize)| {
            d8_target(cell.0, cell.1, flow_dir.data()[cell], rows, cols).filter(|&t| is_stream(t))
        };

        let mut inflows = Array2::<u32>::zeros((rows, cols));
        for ((row, col), &m) in mask.data().indexed_iter() {
            if m != 0 {
                if let Some(target) = downstream_of((row, col)) {
                    inflows[target] += 1;
                }
            }
        }

        let starts: Vec<(usize, usize)> = mask
            .data()
            .indexed_iter()
            .filter(|&(cell, &m)| m != 0 && inflows[cell] != 1)
            .map(|(cell, _)| cell)
            .collect();

        let transform = *flow_dir.transform();
        let cell_area = flow_dir.cell_size() * flow_dir.cell_size();
        let start_index: HashMap<(usize, usize), usize> =
            starts.iter().enumerate().map(|(i, &c)| (c, i)).collect();

        let mut segments = Vec::with_capacity(starts.len());
        for (id, &start) in starts.iter().enumerate() {
            let mut cells = vec![start];
            let mut downstream = None;
            let mut current = start;

            while let Some(next) = downstream_of(current) {
                cells.push(next);
                if let Some(&seg) = start_index.get(&next) {
                    downstream = Some(seg);
                    break;
                }
                if cells.len() > rows * cols {
                    return Err(Error::Algorithm("flow directions contain a cycle".into()));
                }
                current = next;
            }

            let coords: Vec<(f64, f64)> = cells
                .iter()
                .map(|&(r, c)| transform.pixel_to_geo(c, r))
                .collect();
            let length = coords
                .windows(2)
                .map(|w| (w[1].0 - w[0].0).hypot(w[1].1 - w[0].1))
                .sum();

            let own_last = if downstream.is_some() && cells.len() >= 2 {
                cells[cells.len() - 2]
            } else {
                cells[cells.len() - 1]
            };
            let upstream_area = (flow_acc.data()[own_last] + 1.0) * cell_area;

            segments.push(StreamSegment {
                id,
                cells,
                coords,
                downstream,
                order: 1,
                length,
                upstream_area,
            });
        }

        assign_strahler(&mut segments);

        tracing::debug!("stream network: {} segments", segments.len());
        Ok(Self { segments })
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Highest Strahler order in the network (0 when empty)
    pub fn max_order(&self) -> u32 {
        self.segments.iter().map(|s| s.order).max().unwrap_or(0)
    }

    /// Segments that leave the network
    pub fn outlets(&self) -> impl Iterator<Item = &StreamSegment> {
        self.segments.iter().filter(|s| s.downstream.is_none())
    }

    /// Total channel length in map units
    pub fn total_length(&self) -> f64 {
        self.segments.iter().map(|s| s.length).sum()
    }

    /// One LineString feature per segment
    pub fn to_features(&self) -> FeatureCollection {
        self.segments
            .iter()
            .map(|seg| {
                let line: LineString<f64> = seg
                    .coords
                    .iter()
                    .map(|&(x, y)| Coord { x, y })
                    .collect();
                let mut feature = Feature::new(line.into());
                feature.id = Some(seg.id.to_string());
                feature.set_property("id", AttributeValue::Int(seg.id as i64));
                feature.set_property(
                    "downstream",
                    seg.downstream
                        .map_or(AttributeValue::Null, |d| AttributeValue::Int(d as i64)),
                );
                feature.set_property("order", AttributeValue::Int(i64::from(seg.order)));
                feature.set_property("length", AttributeValue::Float(seg.length));
                feature.set_property("upstream_area", AttributeValue::Float(seg.upstream_area));
                feature
            })
            .collect()
    }
}

/// Strahler ordering over the segment tree, headwaters first
fn assign_strahler(segments: &mut [StreamSegment]) {
    let n = segments.len();
    let mut pending = vec![0usize; n];
    for seg in segments.iter() {
        if let Some(d) = seg.downstream {
            pending[d] += 1;
        }
    }

    // (highest incoming order, how many inflows carry it)
    let mut incoming = vec![(0u32, 0u32); n];
    let mut ready: Vec<usize> = (0..n).filter(|&i| pending[i] == 0).collect();

    while let Some(i) = ready.pop() {
        let (max_in, count) = incoming[i];
        segments[i].order = match max_in {
            0 => 1,
            m if count >= 2 => m + 1,
            m => m,
        };

        if let Some(d) = segments[i].downstream {
            let order = segments[i].order;
            let entry = &mut incoming[d];
            if order > entry.0 {
                *entry = (order, 1);
            } else if order == entry.0 {
                entry.1 += 1;
            }
            pending[d] -= 1;
            if pending[d] == 0 {
                ready.push(d);
            }
        }
    }
}

//! Stream extraction pipeline
//!
//! load -> (resample) -> condition -> carve -> D8 -> accumulation ->
//! threshold -> vector network -> (persist)

use std::path::PathBuf;

use swathflow_core::io::{load_dem, DemSource};
use swathflow_core::raster::Raster;
use swathflow_core::{Algorithm, Connectivity, Error, Result};

use super::persist::{save_stream_outputs, PersistedPaths};
use crate::conditioning::{
    area_to_pixels_floor, condition_dem, ConditionParams, ConditioningWarning, NoDataPolicy,
};
use crate::hydrology::{
    carve_depressions, flow_accumulation, flow_direction, stream_mask, CarveParams,
    StreamNetwork, StreamNetworkParams,
};
use crate::resample::{resample, ResampleParams};

/// Parameters for stream extraction
#[derive(Debug, Clone)]
pub struct StreamExtractionParams {
    /// Minimum drainage area of a channel, map units squared
    pub threshold_area: f64,
    /// Persistence name; outputs are saved when set
    pub output: Option<PathBuf>,
    /// No-data policy applied before routing
    pub nodata: NoDataPolicy,
    /// Minimum flat area for [`NoDataPolicy::Auto`], map units squared
    pub min_flat_area: f64,
    /// Resample before conditioning
    pub resample: bool,
    /// Target cell size when resampling; ceiling of the native size if unset
    pub target_cellsize: Option<f64>,
    /// Depression carving settings
    pub carve: CarveParams,
}

impl Default for StreamExtractionParams {
    fn default() -> Self {
        Self {
            threshold_area: 1e6,
            output: None,
            nodata: NoDataPolicy::None,
            min_flat_area: 1e5,
            resample: false,
            target_cellsize: None,
            carve: CarveParams::default(),
        }
    }
}

/// Everything the pipeline produces
#[derive(Debug, Clone)]
pub struct StreamOutputs {
    /// Conditioned (and possibly resampled) DEM
    pub dem: Raster<f64>,
    /// D8 codes computed on the carved DEM
    pub flow_direction: Raster<u8>,
    /// Upstream cell counts; NaN where the DEM is missing
    pub accumulation: Raster<f64>,
    /// 1 where accumulation exceeds `min_area_pixels`
    pub stream_mask: Raster<u8>,
    pub streams: StreamNetwork,
    pub min_area_pixels: usize,
    pub warnings: Vec<ConditioningWarning>,
    pub persisted: Option<PersistedPaths>,
}

/// Stream extraction pipeline
#[derive(Debug, Clone, Default)]
pub struct StreamExtraction;

impl Algorithm for StreamExtraction {
    type Input = DemSource;
    type Output = StreamOutputs;
    type Params = StreamExtractionParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Stream Extraction"
    }

    fn description(&self) -> &'static str {
        "Condition a DEM, route flow and extract a drainage network above an area threshold"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        extract_streams(input, &params)
    }
}

/// Run the whole stream extraction on `source`.
///
/// An unrecognized file type fails before any computation. Degraded
/// conditioning (bad no-data expression, non-integer cell size) is
/// reported in [`StreamOutputs::warnings`].
pub fn extract_streams(
    source: impl Into<DemSource>,
    params: &StreamExtractionParams,
) -> Result<StreamOutputs> {
    if !params.threshold_area.is_finite() || params.threshold_area < 0.0 {
        return Err(Error::InvalidParameter {
            name: "threshold_area",
            value: params.threshold_area.to_string(),
            reason: "must be a finite non-negative area".into(),
        });
    }

    let mut dem = load_dem(source.into())?;
    tracing::debug!("loaded DEM {}x{} @ {}", dem.rows(), dem.cols(), dem.cell_size());

    if params.resample {
        dem = resample(
            &dem,
            &ResampleParams {
                cell_size: params.target_cellsize,
            },
        )?;
    } else if params.target_cellsize.is_some() {
        tracing::debug!("target cell size ignored: resampling not requested");
    }

    let conditioned = condition_dem(
        dem,
        &ConditionParams {
            policy: params.nodata.clone(),
            min_flat_area: params.min_flat_area,
            connectivity: Connectivity::Eight,
            resampled: params.resample,
        },
    )?;
    let dem = conditioned.dem;

    let carved = carve_depressions(&dem, params.carve.clone())?;
    let fdir = flow_direction(&carved)?;

    let mut acc = flow_accumulation(&fdir)?;
    acc.set_nodata(Some(f64::NAN));
    for (value, &z) in acc.data_mut().iter_mut().zip(dem.data().iter()) {
        if z.is_nan() {
            *value = f64::NAN;
        }
    }

    let min_area_pixels = area_to_pixels_floor(params.threshold_area, dem.cell_size());
    let mask = stream_mask(
        &acc,
        StreamNetworkParams {
            threshold: min_area_pixels as f64,
        },
    )?;
    let streams = StreamNetwork::extract(&fdir, &mask, &acc)?;

    tracing::debug!(
        "streams: threshold {} pixels, {} segments, max order {}",
        min_area_pixels,
        streams.len(),
        streams.max_order()
    );

    let persisted = match &params.output {
        Some(name) => Some(save_stream_outputs(name, &dem, &fdir, &acc, &streams)?),
        None => None,
    };

    Ok(StreamOutputs {
        dem,
        flow_direction: fdir,
        accumulation: acc,
        stream_mask: mask,
        streams,
        min_area_pixels,
        warnings: conditioned.warnings,
        persisted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use swathflow_core::GeoTransform;

    /// V-shaped valley draining south, cellsize 10, with a NaN frame
    fn valley() -> Raster<f64> {
        let (rows, cols) = (14, 13);
        let mut dem = Raster::filled(rows, cols, f64::NAN);
        dem.set_transform(GeoTransform::new(0.0, 140.0, 10.0, -10.0));
        for row in 1..rows - 1 {
            for col in 1..cols - 1 {
                let across = (col as f64 - 6.0).abs() * 5.0;
                let along = (rows - row) as f64 * 2.0;
                dem.set(row, col, 100.0 + across + along).unwrap();
            }
        }
        dem
    }

    #[test]
    fn test_valley_has_a_trunk_channel() {
        let params = StreamExtractionParams {
            threshold_area: 2000.0,
            ..Default::default()
        };
        let out = extract_streams(valley(), &params).unwrap();

        assert_eq!(out.dem.shape(), (12, 11), "NaN frame is cropped");
        assert_eq!(out.min_area_pixels, 20);
        assert!(!out.streams.is_empty());

        // the channel runs down the valley axis (column 5 after cropping)
        let (rows, _) = out.stream_mask.shape();
        assert_eq!(out.stream_mask.get(rows - 1, 5).unwrap(), 1);
        for (cell, &m) in out.stream_mask.data().indexed_iter() {
            if m == 1 {
                assert!(out.accumulation.data()[cell] > 20.0);
            }
        }
    }

    #[test]
    fn test_accumulation_is_nan_outside_dem() {
        let mut dem = valley();
        dem.set(5, 1, f64::NAN).unwrap();
        let out = extract_streams(dem, &StreamExtractionParams::default()).unwrap();
        assert!(out.accumulation.get(4, 0).unwrap().is_nan());
        assert_eq!(out.flow_direction.get(4, 0).unwrap(), 0);
    }

    #[test]
    fn test_threshold_pixels_use_floor() {
        let params = StreamExtractionParams {
            threshold_area: 2099.0,
            ..Default::default()
        };
        let out = extract_streams(valley(), &params).unwrap();
        assert_eq!(out.min_area_pixels, 20);
    }

    #[test]
    fn test_unknown_source_fails_early() {
        let err = extract_streams(Path::new("dem.mat"), &StreamExtractionParams::default())
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedSource(_)));
    }

    #[test]
    fn test_negative_threshold_is_rejected() {
        let params = StreamExtractionParams {
            threshold_area: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            extract_streams(valley(), &params),
            Err(Error::InvalidParameter { name: "threshold_area", .. })
        ));
    }

    #[test]
    fn test_bad_predicate_still_extracts() {
        let params = StreamExtractionParams {
            threshold_area: 2000.0,
            nodata: NoDataPolicy::Predicate("z >>> 3".into()),
            ..Default::default()
        };
        let out = extract_streams(valley(), &params).unwrap();
        assert_eq!(out.warnings.len(), 1);
        assert!(!out.streams.is_empty());
    }
}

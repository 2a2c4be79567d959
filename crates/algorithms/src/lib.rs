//! # swathflow algorithms
//!
//! Drainage network and topographic swath extraction from DEMs.
//!
//! ## Modules
//!
//! - **terrain**: eight-direction gradient
//! - **hydrology**: depression carving, D8 flow direction, flow
//!   accumulation, stream mask and vector network
//! - **conditioning**: flat region detection, no-data predicates, cropping
//! - **resample**: bilinear resampling
//! - **pipeline**: end-to-end stream extraction and persistence
//! - **swath**: path bends, cross-section sampling, envelopes, heatmaps

pub(crate) mod maybe_rayon;

pub mod conditioning;
pub mod hydrology;
pub mod pipeline;
pub mod resample;
pub mod swath;
pub mod terrain;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::conditioning::{
        condition_dem, detect_flat_regions, ConditionParams, ConditionedDem,
        ConditioningWarning, DemConditioner, FlatRegionDetector, FlatRegionParams, NoDataPolicy,
        NoDataPredicate,
    };
    pub use crate::hydrology::{
        carve_depressions, flow_accumulation, flow_direction, stream_mask, CarveParams,
        FlowAccumulation, FlowDirection, StreamNetwork, StreamNetworkParams, StreamSegment,
    };
    pub use crate::pipeline::{
        extract_streams, StreamExtraction, StreamExtractionParams, StreamOutputs,
    };
    pub use crate::resample::{resample, sample_bilinear, Resample, ResampleParams};
    pub use crate::swath::{
        extract_swath, extract_swath_with, CrossSectionSampler, DisplayMode, Envelope,
        PerpendicularSampler, SwathDisplay, SwathExtraction, SwathParams, SwathPath,
        SwathRequest, SwathResult,
    };
    pub use crate::terrain::{gradient8, Gradient8};
    pub use swathflow_core::prelude::*;
}

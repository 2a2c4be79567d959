//! End-to-end stream extraction and its persistence

mod persist;
mod streams;

pub use persist::{
    features_to_geojson, load_stream_archive, save_stream_outputs, GridRecord, PersistedPaths,
    StreamArchive,
};
pub use streams::{extract_streams, StreamExtraction, StreamExtractionParams, StreamOutputs};

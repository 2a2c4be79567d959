//! Saving stream extraction results
//!
//! Two files are written next to each other:
//!
//! - `{name}.json`: container with keys `dem`, `flow_direction`,
//!   `accumulation` and `streams`
//! - `{name}_streams.geojson`: the stream network as a GeoJSON
//!   FeatureCollection of LineStrings
//!
//! Grids are stored as shape, transform and row-major values; missing
//! cells are written as `null`.

use std::ffi::OsString;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use geojson::feature::Id;
use geojson::JsonObject;
use serde::{Deserialize, Serialize};
use swathflow_core::raster::{GeoTransform, Raster, RasterElement};
use swathflow_core::vector::FeatureCollection;
use swathflow_core::{Error, Result};

use crate::hydrology::StreamNetwork;

/// Serializable form of a grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridRecord {
    pub rows: usize,
    pub cols: usize,
    pub transform: GeoTransform,
    pub data: Vec<Option<f64>>,
}

impl GridRecord {
    pub fn from_raster<T: RasterElement>(raster: &Raster<T>) -> Self {
        let (rows, cols) = raster.shape();
        let data = raster
            .data()
            .iter()
            .map(|&v| {
                if raster.is_nodata(v) {
                    None
                } else {
                    v.to_f64().filter(|x| x.is_finite())
                }
            })
            .collect();
        Self {
            rows,
            cols,
            transform: *raster.transform(),
            data,
        }
    }

    /// Rebuild the grid as f64, missing cells as NaN
    pub fn to_raster(&self) -> Result<Raster<f64>> {
        let values = self.data.iter().map(|v| v.unwrap_or(f64::NAN)).collect();
        let mut raster = Raster::from_vec(values, self.rows, self.cols)?;
        raster.set_transform(self.transform);
        raster.set_nodata(Some(f64::NAN));
        Ok(raster)
    }
}

/// Container record written to `{name}.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamArchive {
    pub dem: GridRecord,
    pub flow_direction: GridRecord,
    pub accumulation: GridRecord,
    pub streams: StreamNetwork,
}

/// Where the files went
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedPaths {
    pub container: PathBuf,
    pub streams: PathBuf,
}

impl PersistedPaths {
    /// File names derived from a persistence name (which may include a
    /// directory)
    pub fn for_name(name: &Path) -> Self {
        let with_suffix = |suffix: &str| {
            let mut s: OsString = name.as_os_str().to_owned();
            s.push(suffix);
            PathBuf::from(s)
        };
        Self {
            container: with_suffix(".json"),
            streams: with_suffix("_streams.geojson"),
        }
    }
}

fn serialization(e: serde_json::Error) -> Error {
    Error::Serialization(e.to_string())
}

/// Write the container and the GeoJSON export for `name`
pub fn save_stream_outputs(
    name: &Path,
    dem: &Raster<f64>,
    flow_direction: &Raster<u8>,
    accumulation: &Raster<f64>,
    streams: &StreamNetwork,
) -> Result<PersistedPaths> {
    let paths = PersistedPaths::for_name(name);

    let archive = StreamArchive {
        dem: GridRecord::from_raster(dem),
        flow_direction: GridRecord::from_raster(flow_direction),
        accumulation: GridRecord::from_raster(accumulation),
        streams: streams.clone(),
    };

    let mut writer = BufWriter::new(File::create(&paths.container)?);
    serde_json::to_writer(&mut writer, &archive).map_err(serialization)?;
    writer.flush()?;

    let mut writer = BufWriter::new(File::create(&paths.streams)?);
    let collection = features_to_geojson(&streams.to_features())?;
    serde_json::to_writer_pretty(&mut writer, &collection).map_err(serialization)?;
    writer.flush()?;

    tracing::debug!(
        "saved {} and {}",
        paths.container.display(),
        paths.streams.display()
    );
    Ok(paths)
}

/// Read back a container written by [`save_stream_outputs`]
pub fn load_stream_archive(path: &Path) -> Result<StreamArchive> {
    let reader = BufReader::new(File::open(path)?);
    serde_json::from_reader(reader).map_err(serialization)
}

/// GeoJSON FeatureCollection for `features`; attributes become properties
pub fn features_to_geojson(features: &FeatureCollection) -> Result<geojson::FeatureCollection> {
    let features = features
        .iter()
        .map(|f| {
            let properties = f
                .properties
                .iter()
                .map(|(key, value)| {
                    serde_json::to_value(value)
                        .map(|v| (key.clone(), v))
                        .map_err(serialization)
                })
                .collect::<Result<JsonObject>>()?;
            Ok(geojson::Feature {
                bbox: None,
                geometry: f
                    .geometry
                    .as_ref()
                    .map(|g| geojson::Geometry::new(geojson::Value::from(g))),
                id: f.id.clone().map(Id::String),
                properties: Some(properties),
                foreign_members: None,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::GeoJson;
    use std::str::FromStr;
    use swathflow_core::vector::{AttributeValue, Feature};

    #[test]
    fn test_paths_for_name() {
        let paths = PersistedPaths::for_name(Path::new("out/basin"));
        assert_eq!(paths.container, PathBuf::from("out/basin.json"));
        assert_eq!(paths.streams, PathBuf::from("out/basin_streams.geojson"));
    }

    #[test]
    fn test_grid_record_keeps_missing_cells() {
        let mut raster = Raster::from_vec(vec![1.0, f64::NAN, 3.0, 4.0], 2, 2).unwrap();
        raster.set_transform(GeoTransform::new(10.0, 20.0, 5.0, -5.0));

        let record = GridRecord::from_raster(&raster);
        assert_eq!(record.data, vec![Some(1.0), None, Some(3.0), Some(4.0)]);

        let text = serde_json::to_string(&record).unwrap();
        assert!(text.contains("null"));

        let back: GridRecord = serde_json::from_str(&text).unwrap();
        let grid = back.to_raster().unwrap();
        assert!(grid.get(0, 1).unwrap().is_nan());
        assert_eq!(grid.get(1, 1).unwrap(), 4.0);
        assert_eq!(*grid.transform(), *raster.transform());
    }

    #[test]
    fn test_geojson_shape() {
        let line: geo::LineString<f64> = vec![(0.0, 0.0), (1.0, 1.0)].into();
        let mut feature = Feature::new(line.into());
        feature.id = Some("7".into());
        feature.set_property("order", AttributeValue::Int(2));
        feature.set_property("downstream", AttributeValue::Null);
        let collection: FeatureCollection = std::iter::once(feature).collect();

        let text = serde_json::to_string(&features_to_geojson(&collection).unwrap()).unwrap();
        let parsed = GeoJson::from_str(&text).unwrap();
        let GeoJson::FeatureCollection(fc) = parsed else {
            panic!("expected a FeatureCollection, got {:?}", parsed);
        };
        assert_eq!(fc.features.len(), 1);

        let f = &fc.features[0];
        assert_eq!(f.id, Some(Id::String("7".into())));
        match &f.geometry.as_ref().unwrap().value {
            geojson::Value::LineString(coords) => {
                assert_eq!(coords, &vec![vec![0.0, 0.0], vec![1.0, 1.0]]);
            }
            other => panic!("expected a LineString, got {:?}", other),
        }
        assert_eq!(f.property("order"), Some(&serde_json::json!(2)));
        assert!(f.property("downstream").unwrap().is_null());
    }

    #[test]
    fn test_geojson_keeps_every_geometry_kind() {
        let polygon = geo::Polygon::new(
            vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 0.0)].into(),
            vec![],
        );
        let points = geo::MultiPoint::from(vec![(1.0, 1.0), (3.0, 4.0)]);
        let collection: FeatureCollection = vec![
            Feature::new(polygon.into()),
            Feature::new(points.into()),
        ]
        .into_iter()
        .collect();

        let fc = features_to_geojson(&collection).unwrap();
        assert!(matches!(
            fc.features[0].geometry.as_ref().unwrap().value,
            geojson::Value::Polygon(_)
        ));
        assert!(matches!(
            fc.features[1].geometry.as_ref().unwrap().value,
            geojson::Value::MultiPoint(_)
        ));
    }
}

//! Resolution of a DEM argument into an in-memory grid

use super::{read_ascii_grid, read_geotiff};
use crate::error::{Error, Result};
use crate::raster::Raster;
use std::path::{Path, PathBuf};

/// On-disk grid formats understood by [`load_dem`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridFormat {
    GeoTiff,
    AsciiGrid,
}

impl GridFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("tif" | "tiff") => Ok(GridFormat::GeoTiff),
            Some("asc" | "txt") => Ok(GridFormat::AsciiGrid),
            _ => Err(Error::UnsupportedSource(path.display().to_string())),
        }
    }
}

/// A DEM handed to a pipeline: either already loaded or a file to load
#[derive(Debug, Clone)]
pub enum DemSource {
    Grid(Raster<f64>),
    Path(PathBuf),
}

impl From<Raster<f64>> for DemSource {
    fn from(raster: Raster<f64>) -> Self {
        DemSource::Grid(raster)
    }
}

impl From<PathBuf> for DemSource {
    fn from(path: PathBuf) -> Self {
        DemSource::Path(path)
    }
}

impl From<&Path> for DemSource {
    fn from(path: &Path) -> Self {
        DemSource::Path(path.to_path_buf())
    }
}

/// Materialize a DEM source.
///
/// Every missing cell of the returned grid holds NaN, whatever marker the
/// file used. An unrecognized file type fails before anything is read.
pub fn load_dem(source: DemSource) -> Result<Raster<f64>> {
    let mut dem = match source {
        DemSource::Grid(raster) => raster,
        DemSource::Path(path) => match GridFormat::from_path(&path)? {
            GridFormat::GeoTiff => read_geotiff::<f64, _>(&path)?,
            GridFormat::AsciiGrid => read_ascii_grid(&path)?,
        },
    };

    if dem.nodata().is_some_and(|nd| !nd.is_nan()) {
        let nodata = dem.nodata();
        dem.data_mut().mapv_inplace(|v| {
            if nodata.is_some_and(|nd| (v - nd).abs() < f64::EPSILON * 100.0) {
                f64::NAN
            } else {
                v
            }
        });
    }
    dem.set_nodata(Some(f64::NAN));

    Ok(dem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrecognized_extension_is_rejected() {
        let err = load_dem(DemSource::Path(PathBuf::from("dem.mat"))).unwrap_err();
        assert!(matches!(err, Error::UnsupportedSource(_)));

        let err = load_dem(DemSource::Path(PathBuf::from("dem"))).unwrap_err();
        assert!(matches!(err, Error::UnsupportedSource(_)));
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        assert_eq!(GridFormat::from_path(Path::new("a.TIF")).unwrap(), GridFormat::GeoTiff);
        assert_eq!(GridFormat::from_path(Path::new("a.asc")).unwrap(), GridFormat::AsciiGrid);
    }

    #[test]
    fn test_marker_values_become_nan() {
        let mut dem = Raster::from_vec(vec![1.0, -9999.0, 3.0, 4.0], 2, 2).unwrap();
        dem.set_nodata(Some(-9999.0));

        let loaded = load_dem(DemSource::Grid(dem)).unwrap();
        assert!(loaded.get(0, 1).unwrap().is_nan());
        assert_eq!(loaded.get(1, 1).unwrap(), 4.0);
        assert_eq!(loaded.valid_count(), 3);
    }
}

//! ESRI ASCII grid reading/writing
//!
//! ```text
//! ncols        4
//! nrows        3
//! xllcorner    500000.0
//! yllcorner    4100000.0
//! cellsize     30.0
//! NODATA_value -9999
//! 12.0 13.5 ...
//! ```

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Read an ESRI ASCII grid file; no-data cells become NaN
pub fn read_ascii_grid<P: AsRef<Path>>(path: P) -> Result<Raster<f64>> {
    let text = fs::read_to_string(path.as_ref())?;
    read_ascii_grid_from_str(&text)
}

#[derive(Default)]
struct Header {
    ncols: Option<usize>,
    nrows: Option<usize>,
    xll: Option<(f64, bool)>,
    yll: Option<(f64, bool)>,
    cellsize: Option<f64>,
    nodata: Option<f64>,
}

fn parse_value<T: std::str::FromStr>(key: &str, value: Option<&str>) -> Result<T> {
    value
        .and_then(|v| v.parse::<T>().ok())
        .ok_or_else(|| Error::Format(format!("bad value for header key '{}'", key)))
}

/// Parse an ESRI ASCII grid held in memory
pub fn read_ascii_grid_from_str(text: &str) -> Result<Raster<f64>> {
    let mut header = Header::default();
    let mut lines = text.lines().peekable();

    while let Some(&line) = lines.peek() {
        let mut parts = line.split_whitespace();
        let Some(key) = parts.next() else {
            lines.next();
            continue;
        };
        if key.parse::<f64>().is_ok() {
            break;
        }
        let value = parts.next();
        match key.to_ascii_lowercase().as_str() {
            "ncols" => header.ncols = Some(parse_value(key, value)?),
            "nrows" => header.nrows = Some(parse_value(key, value)?),
            "xllcorner" => header.xll = Some((parse_value(key, value)?, false)),
            "xllcenter" => header.xll = Some((parse_value(key, value)?, true)),
            "yllcorner" => header.yll = Some((parse_value(key, value)?, false)),
            "yllcenter" => header.yll = Some((parse_value(key, value)?, true)),
            "cellsize" => header.cellsize = Some(parse_value(key, value)?),
            "nodata_value" => header.nodata = Some(parse_value(key, value)?),
            other => return Err(Error::Format(format!("unknown header key '{}'", other))),
        }
        lines.next();
    }

    let missing = |key: &str| Error::Format(format!("missing header key '{}'", key));
    let cols = header.ncols.ok_or_else(|| missing("ncols"))?;
    let rows = header.nrows.ok_or_else(|| missing("nrows"))?;
    let cell_size = header.cellsize.ok_or_else(|| missing("cellsize"))?;
    let (xll, x_center) = header.xll.ok_or_else(|| missing("xllcorner"))?;
    let (yll, y_center) = header.yll.ok_or_else(|| missing("yllcorner"))?;

    if rows == 0 || cols == 0 || cell_size.is_nan() || cell_size <= 0.0 {
        return Err(Error::InvalidDimensions { width: cols, height: rows });
    }

    let xll = if x_center { xll - cell_size / 2.0 } else { xll };
    let yll = if y_center { yll - cell_size / 2.0 } else { yll };

    let mut data = Vec::with_capacity(rows * cols);
    for token in lines.flat_map(str::split_whitespace) {
        let v: f64 = token
            .parse()
            .map_err(|_| Error::Format(format!("invalid cell value '{}'", token)))?;
        let is_nodata = header.nodata.is_some_and(|nd| v == nd);
        data.push(if is_nodata { f64::NAN } else { v });
    }

    if data.len() != rows * cols {
        return Err(Error::Format(format!(
            "expected {} cell values, found {}",
            rows * cols,
            data.len()
        )));
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;
    raster.set_transform(GeoTransform::from_lower_left(xll, yll, cell_size, rows));
    raster.set_nodata(Some(f64::NAN));
    Ok(raster)
}

/// Write a raster as an ESRI ASCII grid; missing cells are written as -9999
pub fn write_ascii_grid<P: AsRef<Path>>(raster: &Raster<f64>, path: P) -> Result<()> {
    const NODATA: f64 = -9999.0;
    let (rows, cols) = raster.shape();
    let (min_x, min_y, _, _) = raster.bounds();

    let mut out = String::new();
    let _ = writeln!(out, "ncols        {}", cols);
    let _ = writeln!(out, "nrows        {}", rows);
    let _ = writeln!(out, "xllcorner    {}", min_x);
    let _ = writeln!(out, "yllcorner    {}", min_y);
    let _ = writeln!(out, "cellsize     {}", raster.cell_size());
    let _ = writeln!(out, "NODATA_value {}", NODATA);

    for row in raster.data().rows() {
        let line: Vec<String> = row
            .iter()
            .map(|&v| if raster.is_nodata(v) { NODATA } else { v })
            .map(|v| v.to_string())
            .collect();
        out.push_str(&line.join(" "));
        out.push('\n');
    }

    fs::write(path.as_ref(), out)?;
    Ok(())
}

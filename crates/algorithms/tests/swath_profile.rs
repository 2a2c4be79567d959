//! End-to-end swath extraction across a synthetic valley.

use approx::assert_relative_eq;
use swathflow_algorithms::swath::{
    extract_swath, DisplayMode, SwathDisplay, SwathParams,
};
use swathflow_core::io::read_ascii_grid;
use swathflow_core::{Error, GeoTransform, Raster};

/// East-west valley: floor at y = 1000, walls rising 0.5 per map unit,
/// gently tilted down to the east. 100x100, cellsize 20, cell centres on
/// multiples of 20.
fn valley() -> Raster<f64> {
    let mut dem = Raster::new(100, 100);
    dem.set_transform(GeoTransform::new(-10.0, 2010.0, 20.0, -20.0));
    for row in 0..100 {
        for col in 0..100 {
            let (x, y) = dem.pixel_to_geo(col, row);
            dem.set(row, col, 200.0 + (y - 1000.0).abs() * 0.5 - x * 0.01).unwrap();
        }
    }
    dem
}

#[test]
fn envelope_along_the_valley() {
    let dem = valley();
    let result = extract_swath(
        &dem,
        vec![(200.0, 1000.0), (1000.0, 1000.0), (1800.0, 1000.0)],
        400.0,
        &SwathParams::default(),
    )
    .unwrap();

    assert_eq!(result.bends, vec![800.0]);
    assert_eq!(result.sample.station_count(), 81, "1600 m at the 20 m cell size");
    assert_eq!(result.centerline().len(), 81);

    let matrix = result.matrix();
    assert_eq!(matrix.dim(), (81, 4));
    for i in 1..81 {
        assert!(matrix[(i, 0)] > matrix[(i - 1, 0)], "distances increase");
    }

    for e in &result.envelope {
        assert!(e.min <= e.mean && e.mean <= e.max);
        // swath spans 200 m either side of the floor
        assert_relative_eq!(e.max - e.min, 100.0, epsilon = 1e-6);
    }

    // the floor drops 0.01 per metre eastwards
    let first = result.envelope.first().unwrap();
    let last = result.envelope.last().unwrap();
    assert_relative_eq!(first.min - last.min, 16.0, epsilon = 1e-6);
}

#[test]
fn profile_across_the_valley_sees_the_floor() {
    let dem = valley();
    let result = extract_swath(
        &dem,
        vec![(1000.0, 200.0), (1000.0, 1800.0)],
        100.0,
        &SwathParams {
            spacing: Some(50.0),
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(result.bends, vec![0.0]);
    assert_eq!(result.sample.station_count(), 33);

    let lowest = result
        .envelope
        .iter()
        .min_by(|a, b| a.mean.total_cmp(&b.mean))
        .unwrap();
    assert_relative_eq!(lowest.distance, 800.0, epsilon = 1e-9);
}

#[test]
fn swath_leaving_the_grid_keeps_every_station() {
    let dem = valley();
    let result = extract_swath(
        &dem,
        vec![(1000.0, 1000.0), (2600.0, 1000.0)],
        200.0,
        &SwathParams::default(),
    )
    .unwrap();

    let outside = result.envelope.iter().filter(|e| !e.is_valid()).count();
    assert!(outside > 0, "stations beyond x = 1990 have no data");
    assert_eq!(result.envelope.len(), result.sample.station_count());
    for e in result.envelope.iter().filter(|e| !e.is_valid()) {
        assert!(e.min.is_nan() && e.mean.is_nan() && e.max.is_nan());
    }
}

#[test]
fn heatmap_display_conserves_observations() {
    let dem = valley();
    let params = SwathParams {
        mode: DisplayMode::from_flags(false, true).unwrap(),
        render: true,
        exaggeration: 4.0,
        ..Default::default()
    };
    let result = extract_swath(
        &dem,
        vec![(200.0, 1000.0), (1800.0, 1000.0)],
        400.0,
        &params,
    )
    .unwrap();

    let Some(SwathDisplay::Heatmap { heatmap, exaggeration }) = &result.display else {
        panic!("heatmap display expected");
    };
    assert_eq!(*exaggeration, 4.0);
    assert_eq!(heatmap.counts.dim(), (100, result.sample.station_count()));
    for i in 0..result.sample.station_count() {
        let valid = result.sample.valid_at(i).count() as f64;
        assert_eq!(heatmap.station_total(i), valid);
    }
}

#[test]
fn conflicting_modes_fail_before_sampling() {
    assert!(matches!(
        DisplayMode::from_flags(true, true),
        Err(Error::ConflictingDisplayModes)
    ));
}

#[test]
fn single_point_path_is_rejected() {
    let err = extract_swath(&valley(), vec![(10.0, 10.0)], 100.0, &SwathParams::default())
        .unwrap_err();
    assert!(matches!(err, Error::InvalidParameter { name: "path", .. }));
}

#[test]
fn swath_from_ascii_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("valley.asc");
    swathflow_core::io::write_ascii_grid(&valley(), &path).unwrap();

    let dem = read_ascii_grid(&path).unwrap();
    let result = extract_swath(
        &dem,
        vec![(200.0, 1000.0), (1800.0, 1000.0)],
        400.0,
        &SwathParams::default(),
    )
    .unwrap();
    assert!(result.envelope.iter().all(|e| e.is_valid()));
}

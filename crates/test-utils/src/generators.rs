//! Test data generators for synthetic DEMs and polygon layers.
//!
//! These generators create predictable, verifiable test data patterns
//! that can be used across the test suite.

use std::path::{Path, PathBuf};

use dem_common::{GridSpec, Raster, DEFAULT_NODATA};
use serde_json::{json, Value};

/// Creates a raster with predictable values.
///
/// Each cell value is `1000 + row * 100 + col`, so a decoded pixel can be
/// traced back to its position by eye. The raster declares
/// [`DEFAULT_NODATA`] but contains no nodata pixels.
///
/// # Example
///
/// ```
/// use test_utils::{create_ramp_raster, fixtures};
///
/// let raster = create_ramp_raster(fixtures::grid::unit(3, 2));
/// assert_eq!(raster.get(0, 0), Some(1000.0));
/// assert_eq!(raster.get(2, 1), Some(1102.0));
/// ```
pub fn create_ramp_raster(grid: GridSpec) -> Raster {
    let mut data = Vec::with_capacity(grid.len());
    for row in 0..grid.height {
        for col in 0..grid.width {
            data.push((1000 + row * 100 + col) as f32);
        }
    }
    Raster {
        grid,
        data,
        nodata: Some(DEFAULT_NODATA),
    }
}

/// Creates a raster filled with a single value.
pub fn create_constant_raster(grid: GridSpec, value: f32) -> Raster {
    Raster {
        grid,
        data: vec![value; grid.len()],
        nodata: Some(DEFAULT_NODATA),
    }
}

/// Creates a raster by sampling `surface(x, y)` at every pixel center.
///
/// A planar surface is reproduced exactly by bilinear resampling, which makes
/// this handy for alignment tests.
pub fn create_surface_raster<F>(grid: GridSpec, surface: F) -> Raster
where
    F: Fn(f64, f64) -> f64,
{
    let mut data = Vec::with_capacity(grid.len());
    for row in 0..grid.height {
        for col in 0..grid.width {
            let (x, y) = grid.pixel_center(col, row);
            data.push(surface(x, y) as f32);
        }
    }
    Raster {
        grid,
        data,
        nodata: Some(DEFAULT_NODATA),
    }
}

/// Builds a raster from literal rows, north row first.
///
/// `DEFAULT_NODATA` (-9999) in a row marks a nodata pixel.
///
/// # Panics
///
/// Panics if the rows do not match the grid dimensions.
pub fn raster_from_rows(grid: GridSpec, rows: &[&[f32]]) -> Raster {
    assert_eq!(rows.len(), grid.height, "row count does not match grid height");
    let data: Vec<f32> = rows
        .iter()
        .inspect(|row| assert_eq!(row.len(), grid.width, "row length does not match grid width"))
        .flat_map(|row| row.iter().copied())
        .collect();
    Raster {
        grid,
        data,
        nodata: Some(DEFAULT_NODATA),
    }
}

/// Creates a constant raster with nodata at the given (col, row) positions.
pub fn create_raster_with_nodata(
    grid: GridSpec,
    value: f32,
    nodata_positions: &[(usize, usize)],
) -> Raster {
    let mut raster = create_constant_raster(grid, value);
    for &(col, row) in nodata_positions {
        if col < grid.width && row < grid.height {
            let idx = grid.flat_index(col, row);
            raster.data[idx] = DEFAULT_NODATA;
        }
    }
    raster
}

/// Closed exterior ring of an axis-aligned rectangle, counter-clockwise.
pub fn rect_ring(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<(f64, f64)> {
    vec![
        (min_x, min_y),
        (max_x, min_y),
        (max_x, max_y),
        (min_x, max_y),
        (min_x, min_y),
    ]
}

/// A GeoJSON Polygon feature with a single property `field = zone_id`.
///
/// `zone_id` is taken as-is, so tests can use strings, numbers, or `null`.
pub fn polygon_feature(field: &str, zone_id: Value, ring: &[(f64, f64)]) -> Value {
    let coordinates: Vec<Vec<f64>> = ring.iter().map(|&(x, y)| vec![x, y]).collect();
    let mut properties = serde_json::Map::new();
    properties.insert(field.to_string(), zone_id);

    json!({
        "type": "Feature",
        "properties": properties,
        "geometry": {
            "type": "Polygon",
            "coordinates": [coordinates],
        }
    })
}

/// Serializes features as a FeatureCollection, optionally tagging a named CRS
/// such as `"EPSG:32719"`.
pub fn feature_collection(features: Vec<Value>, crs: Option<&str>) -> String {
    let mut collection = json!({
        "type": "FeatureCollection",
        "features": features,
    });

    if let Some(name) = crs {
        collection["crs"] = json!({
            "type": "name",
            "properties": { "name": name }
        });
    }

    collection.to_string()
}

/// Writes `contents` to `dir/name` and returns the path.
///
/// # Panics
///
/// Panics on I/O failure; intended for test setup only.
pub fn write_test_file(dir: &Path, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap_or_else(|e| panic!("write {}: {}", path.display(), e));
    path
}

/// A fresh temporary directory for filesystem tests.
pub fn temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().unwrap_or_else(|e| panic!("create temp dir: {}", e))
}

//! Tests for GeoTIFF encoding/decoding of DEM rasters.

use dem_common::{Crs, Raster};
use geotiff_io::{encode_raster, read_grid, read_raster, write_raster, GeoTiffError};
use test_utils::{create_ramp_raster, fixtures};

#[test]
fn test_written_raster_keeps_georeferencing_and_nodata() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dem_1954.tif");

    let mut raster = create_ramp_raster(fixtures::grid::utm_19s(6, 4));
    raster.nodata = Some(-9999.0);
    raster.data[3] = -9999.0;

    write_raster(&path, &raster).unwrap();
    let decoded = read_raster(&path).unwrap();

    assert_eq!(decoded.grid, raster.grid);
    assert_eq!(decoded.grid.crs, Crs::Epsg(32719));
    assert_eq!(decoded.nodata, Some(-9999.0));
    assert_eq!(decoded.data, raster.data);
    assert_eq!(decoded.get(3, 0), None);
}

#[test]
fn test_geographic_crs_survives() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("srtm.tif");
    let raster = create_ramp_raster(fixtures::grid::geographic(5, 5));

    write_raster(&path, &raster).unwrap();

    let grid = read_grid(&path).unwrap();
    assert_eq!(grid.crs, Crs::wgs84());
    assert_eq!(grid.width, 5);
    assert!((grid.pixel_width - raster.grid.pixel_width).abs() < 1e-15);
}

#[test]
fn test_no_nodata_tag_means_no_sentinel() {
    let raster = Raster::new(fixtures::grid::utm_19s(2, 2), vec![1.0, 2.0, 3.0, 4.0], None).unwrap();
    let bytes = encode_raster(&raster).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain.tif");
    std::fs::write(&path, bytes).unwrap();

    let decoded = read_raster(&path).unwrap();
    assert_eq!(decoded.nodata, None);
    assert_eq!(decoded.valid_count(), 4);
}

#[test]
fn test_missing_file_is_io_error() {
    let err = read_raster("/nonexistent/directory/dem.tif").unwrap_err();
    assert!(err.is_io());
    assert!(matches!(err, GeoTiffError::Io { .. }));
}

#[test]
fn test_write_into_missing_directory_fails_without_artifact() {
    let raster = create_ramp_raster(fixtures::grid::utm_19s(2, 2));
    let result = write_raster("/nonexistent/directory/out.tif", &raster);
    assert!(result.is_err());
    assert!(!std::path::Path::new("/nonexistent/directory/out.tif").exists());
}

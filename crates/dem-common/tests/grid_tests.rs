//! Tests for GridSpec lattice arithmetic used by alignment and clipping.

use dem_common::{BoundingBox, Crs, GridSpec, Raster};

// ============================================================================
// Helpers
// ============================================================================

fn snap_grid() -> GridSpec {
    // 1 arc-second-ish geographic grid over the Andes
    GridSpec::new(
        120,
        90,
        -72.0,
        -37.0,
        1.0 / 3600.0,
        1.0 / 3600.0,
        Crs::wgs84(),
    )
}

// ============================================================================
// Extent tests
// ============================================================================

#[test]
fn test_bbox_matches_dimensions() {
    let grid = snap_grid();
    let bbox = grid.bbox();
    assert!((bbox.width() - 120.0 / 3600.0).abs() < 1e-12);
    assert!((bbox.height() - 90.0 / 3600.0).abs() < 1e-12);
    assert_eq!(bbox.max_y, -37.0);
}

#[test]
fn test_every_pixel_center_maps_back_to_itself() {
    let grid = snap_grid();
    for row in [0, 1, 44, 89] {
        for col in [0, 1, 60, 119] {
            let (x, y) = grid.pixel_center(col, row);
            assert_eq!(grid.pixel_at(x, y), Some((col, row)));
        }
    }
}

#[test]
fn test_window_for_full_extent_is_whole_grid() {
    let grid = snap_grid();
    let window = grid.window_for(&grid.bbox()).unwrap();
    assert_eq!(window.col_off, 0);
    assert_eq!(window.row_off, 0);
    assert_eq!(window.width, grid.width);
    assert_eq!(window.height, grid.height);
}

#[test]
fn test_window_for_partially_outside_box_is_clamped() {
    let grid = snap_grid();
    let bbox = grid.bbox();
    let shifted = BoundingBox::new(
        bbox.min_x - 1.0,
        bbox.min_y - 1.0,
        bbox.min_x + 10.5 / 3600.0,
        bbox.min_y + 4.2 / 3600.0,
    );

    let window = grid.window_for(&shifted).unwrap();
    assert_eq!(window.col_off, 0);
    assert_eq!(window.width, 11);
    assert_eq!(window.row_off + window.height, grid.height);
    assert_eq!(window.height, 5);
}

// ============================================================================
// Alignment tests
// ============================================================================

#[test]
fn test_cropped_raster_stays_on_lattice() {
    let grid = snap_grid();
    let raster = Raster::new(grid, vec![1.0; grid.len()], None).unwrap();
    let window = grid
        .window_for(&BoundingBox::new(-71.99, -37.02, -71.975, -37.01))
        .unwrap();

    let cropped = raster.crop(&window).unwrap();
    assert!(grid.same_lattice(&cropped.grid));
    assert!(!grid.is_aligned_with(&cropped.grid));
    assert_eq!(
        grid.lattice_offset(&cropped.grid),
        Some((window.col_off as i64, window.row_off as i64))
    );
}

//! End-to-end tests of the batch pipeline on small synthetic DEMs.
//!
//! Layout: a 4x4 unit grid in EPSG:32719, baseline at 10 m, two zones
//! splitting the grid into a west half "A" and an east half "B".

use std::path::{Path, PathBuf};

use dem_batch::manifest::{ArtifactManifest, MANIFEST_FILE};
use dem_batch::run_log::RUN_LOG_FILE;
use dem_batch::{BatchConfig, BatchPipeline, ErrorKind, Stage};
use geotiff_io::{read_raster, write_raster};
use serde_json::json;
use tempfile::TempDir;
use test_utils::{
    create_constant_raster, create_raster_with_nodata, feature_collection, fixtures,
    polygon_feature, rect_ring, temp_dir, write_test_file,
};

struct Fixture {
    _root: TempDir,
    input_dir: PathBuf,
    config: BatchConfig,
}

fn fixture_with_field(field: &str) -> Fixture {
    let root = temp_dir();
    let input_dir = root.path().join("inputs");
    let aux_dir = root.path().join("aux");
    std::fs::create_dir_all(&input_dir).unwrap();
    std::fs::create_dir_all(&aux_dir).unwrap();

    let grid = fixtures::grid::unit(4, 4);
    let reference_path = aux_dir.join("reference.tif");
    write_raster(&reference_path, &create_constant_raster(grid, 0.0)).unwrap();

    let baseline_path = input_dir.join("baseline.tif");
    write_raster(&baseline_path, &create_constant_raster(grid, 10.0)).unwrap();
    write_raster(input_dir.join("dem_a.tif"), &create_constant_raster(grid, 12.0)).unwrap();
    write_raster(
        input_dir.join("dem_b.tif"),
        &create_raster_with_nodata(grid, 9.0, &[(0, 0)]),
    )
    .unwrap();

    let polygons = feature_collection(
        vec![
            polygon_feature(field, json!("A"), &rect_ring(0.0, 0.0, 2.0, 4.0)),
            polygon_feature(field, json!("B"), &rect_ring(2.0, 0.0, 4.0, 4.0)),
        ],
        Some("EPSG:32719"),
    );
    let polygon_path = write_test_file(&aux_dir, "zones.geojson", polygons);

    let config = BatchConfig {
        input_dir: input_dir.clone(),
        polygon_path,
        zone_field: fixtures::zones::FIELD.to_string(),
        reference_path,
        baseline_path,
        output_dir: root.path().join("out"),
        ..BatchConfig::default()
    };

    Fixture {
        _root: root,
        input_dir,
        config,
    }
}

fn fixture() -> Fixture {
    fixture_with_field(fixtures::zones::FIELD)
}

fn read_text(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|e| panic!("read {}: {}", path.display(), e))
}

#[test]
fn test_end_to_end_run() {
    let fx = fixture();
    let out = fx.config.output_dir.clone();

    let summary = BatchPipeline::new(fx.config).unwrap().run().unwrap();

    assert_eq!(summary.discovered, 3);
    assert_eq!(summary.processed.len(), 2);
    assert!(summary.failed.is_empty());
    assert!(!summary.is_suspicious());

    // baseline is never differenced against itself
    assert_eq!(summary.skipped.len(), 1);
    assert_eq!(summary.skipped[0].stage, Stage::Discover);
    assert!(summary.skipped[0].input.ends_with("baseline.tif"));

    for name in [
        "dem_a_clp.tif",
        "dem_a_diff.tif",
        "dem_a_zonal_stats.csv",
        "dem_b_clp.tif",
        "dem_b_diff.tif",
        "dem_b_zonal_stats.csv",
        "difference_panels.png",
        MANIFEST_FILE,
        RUN_LOG_FILE,
    ] {
        assert!(out.join(name).is_file(), "missing {}", name);
    }
    assert_eq!(summary.figure, Some(out.join("difference_panels.png")));

    let diff = read_raster(out.join("dem_a_diff.tif")).unwrap();
    assert_eq!(diff.valid_count(), 16);
    assert!(diff.valid_values().all(|v| v == 2.0));

    let diff_b = read_raster(out.join("dem_b_diff.tif")).unwrap();
    assert_eq!(diff_b.get(0, 0), None);
    assert_eq!(diff_b.get(1, 0), Some(-1.0));
}

#[test]
fn test_zonal_tables() {
    let fx = fixture();
    let out = fx.config.output_dir.clone();
    BatchPipeline::new(fx.config).unwrap().run().unwrap();

    let a = read_text(&out.join("dem_a_zonal_stats.csv"));
    let lines: Vec<&str> = a.lines().collect();
    assert_eq!(
        lines,
        vec![
            "glacier_id,COUNT,AREA,MIN,MAX,RANGE,MEAN,STD,SUM,MEDIAN",
            "A,8,8,2,2,0,2,0,16,2",
            "B,8,8,2,2,0,2,0,16,2",
        ]
    );

    // nodata pixel in the west half
    let b = read_text(&out.join("dem_b_zonal_stats.csv"));
    assert!(b.contains("\nA,7,7,-1,-1,0,-1,0,-7,-1\n"));
    assert!(b.contains("\nB,8,8,-1,-1,0,-1,0,-8,-1\n"));
}

#[test]
fn test_reruns_are_byte_identical() {
    let fx = fixture();
    let first_out = fx.config.output_dir.clone();
    let second_out = fx.config.output_dir.with_file_name("out_again");

    BatchPipeline::new(fx.config.clone()).unwrap().run().unwrap();
    let second = BatchConfig {
        output_dir: second_out.clone(),
        ..fx.config
    };
    BatchPipeline::new(second).unwrap().run().unwrap();

    for name in ["dem_a_zonal_stats.csv", "dem_b_zonal_stats.csv"] {
        assert_eq!(
            std::fs::read(first_out.join(name)).unwrap(),
            std::fs::read(second_out.join(name)).unwrap(),
            "{} differs between runs",
            name
        );
    }
}

#[test]
fn test_artifacts_in_input_dir_are_not_reprocessed() {
    let fx = fixture();
    let config = BatchConfig {
        output_dir: fx.input_dir.clone(),
        ..fx.config
    };
    let pipeline = BatchPipeline::new(config).unwrap();

    let first = pipeline.run().unwrap();
    assert_eq!(first.processed.len(), 2);

    let second = pipeline.run().unwrap();
    assert_eq!(second.discovered, 3);
    assert_eq!(second.processed.len(), 2);
    assert!(second.failed.is_empty());

    let manifest = ArtifactManifest::load(&fx.input_dir).unwrap();
    assert_eq!(manifest.inputs.len(), 2);
    assert!(manifest.shared.contains("difference_panels.png"));
    assert!(manifest
        .inputs
        .values()
        .any(|names| names.contains("dem_a_diff.tif")));

    // one block per run
    let log = read_text(&fx.input_dir.join(RUN_LOG_FILE));
    assert_eq!(log.matches("==== DEM difference run").count(), 2);
}

#[test]
fn test_missing_zone_field_aborts_before_processing() {
    let fx = fixture_with_field("name");
    let out = fx.config.output_dir.clone();

    let err = BatchPipeline::new(fx.config).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::MissingField);
    assert!(!out.exists());
}

#[test]
fn test_missing_baseline_is_configuration_error() {
    let fx = fixture();
    let config = BatchConfig {
        baseline_path: fx.input_dir.join("nope.tif"),
        ..fx.config
    };

    let err = BatchPipeline::new(config).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn test_failed_item_is_logged_and_skipped() {
    let fx = fixture();
    let out = fx.config.output_dir.clone();

    // geographic DEM cannot be snapped to the UTM grid
    write_raster(
        fx.input_dir.join("dem_geo.tif"),
        &create_constant_raster(fixtures::grid::geographic(4, 4), 5.0),
    )
    .unwrap();
    write_test_file(&fx.input_dir, "dem_junk.tif", b"not a tiff at all");

    let summary = BatchPipeline::new(fx.config).unwrap().run().unwrap();
    assert_eq!(summary.processed.len(), 2);
    assert_eq!(summary.failed.len(), 2);

    let geo = summary
        .failed
        .iter()
        .find(|f| f.input.ends_with("dem_geo.tif"))
        .unwrap();
    assert_eq!(geo.stage, Stage::Clip);
    assert_eq!(geo.kind, Some(ErrorKind::GeometryMismatch));

    let junk = summary
        .failed
        .iter()
        .find(|f| f.input.ends_with("dem_junk.tif"))
        .unwrap();
    assert_eq!(junk.stage, Stage::Clip);

    // failed items leave no artifacts
    assert!(!out.join("dem_geo_clp.tif").exists());
    assert!(!out.join("dem_junk_clp.tif").exists());

    let log = read_text(&out.join(RUN_LOG_FILE));
    assert!(log.contains("dem_geo.tif: GeometryMismatch:"));
    assert!(log.contains("[FAIL]"));
}

#[test]
fn test_name_collision_is_skipped() {
    let fx = fixture();
    let grid = fixtures::grid::unit(4, 4);
    write_raster(fx.input_dir.join("dem_a.tiff"), &create_constant_raster(grid, 99.0)).unwrap();
    let out = fx.config.output_dir.clone();

    let summary = BatchPipeline::new(fx.config).unwrap().run().unwrap();
    assert_eq!(summary.processed.len(), 2);

    let collision = summary
        .skipped
        .iter()
        .find(|s| s.input.ends_with("dem_a.tiff"))
        .unwrap();
    assert!(collision.reason.contains("dem_a.tif"));

    // first input keeps the name
    let diff = read_raster(out.join("dem_a_diff.tif")).unwrap();
    assert_eq!(diff.get(0, 0), Some(2.0));
}

#[test]
fn test_run_without_inputs_is_suspicious() {
    let fx = fixture();
    std::fs::remove_file(fx.input_dir.join("dem_a.tif")).unwrap();
    std::fs::remove_file(fx.input_dir.join("dem_b.tif")).unwrap();
    let out = fx.config.output_dir.clone();

    let summary = BatchPipeline::new(fx.config).unwrap().run().unwrap();
    assert!(summary.is_suspicious());
    assert!(summary.figure.is_none());
    assert!(!out.join("difference_panels.png").exists());

    let log = read_text(&out.join(RUN_LOG_FILE));
    assert!(log.contains("SUSPICIOUS"));
}

#[test]
fn test_individual_plots() {
    let fx = fixture();
    let out = fx.config.output_dir.clone();
    let config = BatchConfig {
        individual_plots: true,
        ..fx.config
    };

    let summary = BatchPipeline::new(config).unwrap().run().unwrap();
    for item in &summary.processed {
        let plot = item.plot.as_ref().unwrap();
        let bytes = std::fs::read(plot).unwrap();
        assert_eq!(&bytes[..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
    }
    assert!(out.join("dem_b_diff.png").is_file());
}

#[test]
fn test_visualization_can_be_disabled() {
    let fx = fixture();
    let out = fx.config.output_dir.clone();
    let config = BatchConfig {
        visualize: false,
        ..fx.config
    };

    let summary = BatchPipeline::new(config).unwrap().run().unwrap();
    assert_eq!(summary.processed.len(), 2);
    assert!(summary.figure.is_none());
    assert!(!out.join("difference_panels.png").exists());
}

#[cfg(unix)]
#[test]
fn test_dangling_link_fails_without_aborting_run() {
    let fx = fixture();
    let out = fx.config.output_dir.clone();
    std::os::unix::fs::symlink("/nonexistent/x.tif", fx.input_dir.join("broken.tif")).unwrap();

    let summary = BatchPipeline::new(fx.config).unwrap().run().unwrap();
    assert_eq!(summary.discovered, 4);
    assert_eq!(summary.processed.len(), 2);
    assert_eq!(summary.failed.len(), 1);

    let broken = &summary.failed[0];
    assert!(broken.input.ends_with("broken.tif"));
    assert_eq!(broken.stage, Stage::Discover);
    assert_eq!(broken.kind, Some(ErrorKind::IoFailure));

    let log = read_text(&out.join(RUN_LOG_FILE));
    assert!(log.contains("broken.tif: IOFailure:"));
    assert!(log.contains("summary: discovered 4, processed 2, skipped 1, failed 1\n"));
}

#[test]
fn test_zone_edge_on_pixel_centers_keeps_every_pixel() {
    let fx = fixture();
    let out = fx.config.output_dir.clone();

    // edge at x = 1.5 runs through the second column of pixel centers
    let polygons = feature_collection(
        vec![
            polygon_feature(fixtures::zones::FIELD, json!("A"), &rect_ring(0.0, 0.0, 1.5, 4.0)),
            polygon_feature(fixtures::zones::FIELD, json!("B"), &rect_ring(1.5, 0.0, 4.0, 4.0)),
        ],
        Some("EPSG:32719"),
    );
    std::fs::write(&fx.config.polygon_path, polygons).unwrap();

    let summary = BatchPipeline::new(fx.config).unwrap().run().unwrap();
    assert_eq!(summary.processed.len(), 2);

    let clipped = read_raster(out.join("dem_a_clp.tif")).unwrap();
    assert_eq!(clipped.valid_count(), 16);

    let table = read_text(&out.join("dem_a_zonal_stats.csv"));
    assert!(table.contains("\nA,8,8,2,2,0,2,0,16,2\n"));
    assert!(table.contains("\nB,8,8,2,2,0,2,0,16,2\n"));
}

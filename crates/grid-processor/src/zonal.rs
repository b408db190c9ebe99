//! Zonal statistics of a raster over a polygon layer.
//!
//! Each valid pixel is attributed to at most one zone: the lowest zone
//! identifier (see [`ZoneId`] ordering) whose geometry covers the pixel
//! center. This settles both shared boundaries and overlapping polygons the
//! same way on every run.

use dem_common::Raster;
use serde::Serialize;
use tracing::debug;

use crate::polygon::{PolygonLayer, ZoneId};
use crate::Result;

/// Summary of the valid pixels in one zone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryStatistics {
    /// Covered ground area in CRS units squared.
    pub area: f64,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub mean: f64,
    /// Population standard deviation.
    pub std: f64,
    pub sum: f64,
    pub median: f64,
}

impl SummaryStatistics {
    /// Statistics of `values`, `None` when empty.
    ///
    /// `values` is reordered in place for the median.
    pub fn from_values(values: &mut [f64], pixel_area: f64) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let n = values.len() as f64;
        let sum: f64 = values.iter().sum();
        let mean = sum / n;
        let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;

        values.sort_by(|a, b| a.total_cmp(b));
        let min = values[0];
        let max = values[values.len() - 1];
        let mid = values.len() / 2;
        let median = if values.len() % 2 == 0 {
            (values[mid - 1] + values[mid]) / 2.0
        } else {
            values[mid]
        };

        Some(Self {
            area: n * pixel_area,
            min,
            max,
            range: max - min,
            mean,
            std: variance.sqrt(),
            sum,
            median,
        })
    }
}

/// One output row: a zone and its statistics.
///
/// `statistics` is `None` when the zone covers no valid pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneStatistics {
    pub zone: ZoneId,
    pub count: usize,
    pub statistics: Option<SummaryStatistics>,
}

/// Statistics for every zone of a layer, ordered by zone identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ZonalTable {
    pub zone_field: String,
    pub rows: Vec<ZoneStatistics>,
}

impl ZonalTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row for a zone identifier.
    pub fn get(&self, zone: &str) -> Option<&ZoneStatistics> {
        self.rows.iter().find(|row| row.zone.as_str() == zone)
    }

    /// Total valid pixels attributed to any zone.
    pub fn total_count(&self) -> usize {
        self.rows.iter().map(|row| row.count).sum()
    }
}

/// Compute statistics of `raster` for each distinct value of `zone_field`.
///
/// Every zone appears in the result, including zones without valid
/// coverage. Fails with `MissingField` when a feature lacks the field.
pub fn aggregate(raster: &Raster, layer: &PolygonLayer, zone_field: &str) -> Result<ZonalTable> {
    let zones = layer.to_crs(raster.grid.crs)?.zones(zone_field)?;
    let grid = raster.grid;

    let mut values: Vec<Vec<f64>> = vec![Vec::new(); zones.len()];

    let extent = zones
        .iter()
        .filter_map(|zone| zone.footprint.bbox())
        .reduce(|a, b| a.union(&b));

    if let Some(window) = extent.and_then(|bbox| grid.window_for(&bbox)) {
        for row in window.row_off..window.row_off + window.height {
            for col in window.col_off..window.col_off + window.width {
                let Some(value) = raster.get(col, row) else {
                    continue;
                };
                let (x, y) = grid.pixel_center(col, row);

                // zones are sorted, so the first hit is the lowest identifier
                if let Some(index) = zones.iter().position(|zone| zone.footprint.covers(x, y)) {
                    values[index].push(value as f64);
                }
            }
        }
    }

    let pixel_area = grid.pixel_area();
    let rows: Vec<ZoneStatistics> = zones
        .into_iter()
        .zip(values)
        .map(|(zone, mut zone_values)| ZoneStatistics {
            zone: zone.id,
            count: zone_values.len(),
            statistics: SummaryStatistics::from_values(&mut zone_values, pixel_area),
        })
        .collect();

    let table = ZonalTable {
        zone_field: zone_field.to_string(),
        rows,
    };

    debug!(
        zones = table.len(),
        pixels = table.total_count(),
        field = zone_field,
        "Aggregated zonal statistics"
    );

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_utils::{
        assert_approx_eq, feature_collection, fixtures, polygon_feature, raster_from_rows,
        rect_ring,
    };

    fn layer(features: Vec<serde_json::Value>) -> PolygonLayer {
        let text = feature_collection(features, Some("EPSG:32719"));
        PolygonLayer::from_geojson_str(&text).unwrap()
    }

    #[test]
    fn test_from_values() {
        let mut values = vec![4.0, 1.0, 3.0, 2.0];
        let stats = SummaryStatistics::from_values(&mut values, 900.0).unwrap();

        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert_eq!(stats.range, 3.0);
        assert_eq!(stats.sum, 10.0);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.area, 3600.0);
        assert_approx_eq!(stats.std, 1.118_033_988_75, 1e-9);

        let mut odd = vec![5.0, -1.0, 2.0];
        assert_eq!(SummaryStatistics::from_values(&mut odd, 1.0).unwrap().median, 2.0);
        assert!(SummaryStatistics::from_values(&mut [], 1.0).is_none());
    }

    #[test]
    fn test_zone_with_only_nodata_is_reported() {
        // Left column nodata, right columns 1..4
        let raster = raster_from_rows(
            fixtures::grid::unit(3, 2),
            &[&[-9999.0, 1.0, 2.0], &[-9999.0, 3.0, 4.0]],
        );
        let layer = layer(vec![
            polygon_feature("zone", json!("A"), &rect_ring(0.0, 0.0, 1.0, 2.0)),
            polygon_feature("zone", json!("B"), &rect_ring(1.2, 0.0, 3.0, 2.0)),
        ]);

        let table = aggregate(&raster, &layer, "zone").unwrap();
        assert_eq!(table.len(), 2);

        let a = table.get("A").unwrap();
        assert_eq!(a.count, 0);
        assert!(a.statistics.is_none());

        let b = table.get("B").unwrap();
        let stats = b.statistics.unwrap();
        assert_eq!(b.count, 4);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
    }

    #[test]
    fn test_zone_outside_raster_is_reported() {
        let raster = raster_from_rows(fixtures::grid::unit(1, 1), &[&[7.0]]);
        let layer = layer(vec![
            polygon_feature("zone", json!(1), &rect_ring(0.0, 0.0, 1.0, 1.0)),
            polygon_feature("zone", json!(2), &rect_ring(50.0, 50.0, 60.0, 60.0)),
        ]);

        let table = aggregate(&raster, &layer, "zone").unwrap();
        assert_eq!(table.rows[0].count, 1);
        assert_eq!(table.rows[1].zone.as_str(), "2");
        assert_eq!(table.rows[1].count, 0);
    }

    #[test]
    fn test_shared_boundary_goes_to_lowest_zone() {
        // Pixel centers at x = 0.5, 1.5; both zones touch x = 1.5
        let raster = raster_from_rows(fixtures::grid::unit(2, 1), &[&[1.0, 2.0]]);
        let layer = layer(vec![
            polygon_feature("zone", json!("b"), &rect_ring(1.5, 0.0, 2.0, 1.0)),
            polygon_feature("zone", json!("a"), &rect_ring(0.0, 0.0, 1.5, 1.0)),
        ]);

        let table = aggregate(&raster, &layer, "zone").unwrap();
        assert_eq!(table.get("a").unwrap().count, 2);
        assert_eq!(table.get("b").unwrap().count, 0);
        assert_eq!(table.total_count(), 2);
    }

    #[test]
    fn test_overlap_goes_to_lowest_numeric_zone() {
        let raster = raster_from_rows(fixtures::grid::unit(2, 2), &[&[1.0, 1.0], &[1.0, 1.0]]);
        let layer = layer(vec![
            polygon_feature("zone", json!("10"), &rect_ring(0.0, 0.0, 2.0, 2.0)),
            polygon_feature("zone", json!("9"), &rect_ring(0.0, 0.0, 1.0, 2.0)),
        ]);

        let table = aggregate(&raster, &layer, "zone").unwrap();
        assert_eq!(table.rows[0].zone.as_str(), "9");
        assert_eq!(table.rows[0].count, 2);
        assert_eq!(table.rows[1].count, 2);
    }

    #[test]
    fn test_missing_field_fails() {
        let raster = raster_from_rows(fixtures::grid::unit(1, 1), &[&[7.0]]);
        let layer = layer(vec![polygon_feature(
            "name",
            json!("A"),
            &rect_ring(0.0, 0.0, 1.0, 1.0),
        )]);

        let err = aggregate(&raster, &layer, "zone").unwrap_err();
        assert!(matches!(err, crate::ProcessingError::MissingField { .. }));
    }
}

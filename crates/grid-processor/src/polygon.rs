//! Polygon layers, zones and clip masks.
//!
//! A layer is read from a GeoJSON FeatureCollection. Polygon and
//! MultiPolygon features are kept; any other geometry type is ignored with a
//! warning. Coverage tests use pixel centers: a center lying inside a polygon
//! or exactly on its boundary counts as covered.

use std::cmp::Ordering;
use std::fmt;
use std::path::Path;

use dem_common::{BoundingBox, Crs};
use geo::coordinate_position::CoordPos;
use geo::{BoundingRect, Coord, CoordinatePosition, LineString, MapCoords, MultiPolygon, Polygon};
use geojson::{GeoJson, Value};
use serde_json::Map;
use tracing::{debug, warn};

use crate::projection::CrsTransform;
use crate::{ProcessingError, Result};

/// Zone identifier with numeric-aware ordering.
///
/// Identifiers that both parse as numbers compare numerically ("2" < "10"),
/// numbers sort before text, and text compares lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ZoneId(String);

impl ZoneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn numeric(&self) -> Option<f64> {
        self.0.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }

    /// Read an identifier from a property value; `None` for null, arrays,
    /// objects and blank strings.
    fn from_property(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(Self(s.clone())),
            serde_json::Value::Number(n) => Some(Self(n.to_string())),
            serde_json::Value::Bool(b) => Some(Self(b.to_string())),
            _ => None,
        }
    }
}

impl Ord for ZoneId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.total_cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for ZoneId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ZoneId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A (multi)polygon with its bounding box cached for quick rejection.
#[derive(Debug, Clone, PartialEq)]
pub struct Footprint {
    geometry: MultiPolygon<f64>,
    bounds: Option<BoundingBox>,
}

impl Footprint {
    pub fn new(geometry: MultiPolygon<f64>) -> Self {
        let bounds = geometry
            .bounding_rect()
            .map(|r| BoundingBox::new(r.min().x, r.min().y, r.max().x, r.max().y));
        Self { geometry, bounds }
    }

    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    /// Bounding box, `None` for an empty footprint.
    pub fn bbox(&self) -> Option<BoundingBox> {
        self.bounds
    }

    pub fn is_empty(&self) -> bool {
        self.geometry.0.is_empty()
    }

    /// True when the point is inside or on the boundary of any part.
    ///
    /// Parts are tested one by one: a multipolygon-wide test counts boundary
    /// hits odd/even, so an edge shared by two parts would read as outside.
    #[inline]
    pub fn covers(&self, x: f64, y: f64) -> bool {
        match &self.bounds {
            Some(b) if b.contains_point(x, y) => {
                let coord = Coord { x, y };
                self.geometry
                    .0
                    .iter()
                    .any(|part| part.coordinate_position(&coord) != CoordPos::Outside)
            }
            _ => false,
        }
    }

    fn transformed(&self, transform: CrsTransform) -> Self {
        if transform.is_identity() {
            return self.clone();
        }
        Self::new(self.geometry.map_coords(|c| {
            let (x, y) = transform.apply(c.x, c.y);
            Coord { x, y }
        }))
    }
}

/// One feature of a polygon layer.
#[derive(Debug, Clone)]
pub struct PolygonFeature {
    pub footprint: Footprint,
    pub properties: Map<String, serde_json::Value>,
}

/// A zone: every feature sharing one identifier, merged.
#[derive(Debug, Clone)]
pub struct Zone {
    pub id: ZoneId,
    pub footprint: Footprint,
}

/// Union of polygons used to clip rasters.
#[derive(Debug, Clone)]
pub struct PolygonMask {
    pub footprint: Footprint,
    pub crs: Crs,
}

impl PolygonMask {
    pub fn new(geometry: MultiPolygon<f64>, crs: Crs) -> Self {
        Self {
            footprint: Footprint::new(geometry),
            crs,
        }
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        self.footprint.bbox()
    }

    #[inline]
    pub fn covers(&self, x: f64, y: f64) -> bool {
        self.footprint.covers(x, y)
    }

    /// The mask expressed in `target`.
    pub fn to_crs(&self, target: Crs) -> Result<PolygonMask> {
        let transform = CrsTransform::between(self.crs, target)?;
        Ok(PolygonMask {
            footprint: self.footprint.transformed(transform),
            crs: if target.is_defined() { target } else { self.crs },
        })
    }
}

/// A set of polygon features in one CRS.
#[derive(Debug, Clone)]
pub struct PolygonLayer {
    pub crs: Crs,
    pub features: Vec<PolygonFeature>,
}

impl PolygonLayer {
    /// Read a GeoJSON polygon layer from disk.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let layer = Self::from_geojson_str(&text)?;

        debug!(
            file = %path.display(),
            features = layer.features.len(),
            crs = %layer.crs,
            "Loaded polygon layer"
        );

        Ok(layer)
    }

    /// Parse a GeoJSON FeatureCollection (or single Feature).
    ///
    /// The CRS comes from the legacy `crs` member when present, EPSG:4326
    /// otherwise.
    pub fn from_geojson_str(text: &str) -> Result<Self> {
        let geojson: GeoJson = text.parse()?;

        let (raw_features, foreign) = match geojson {
            GeoJson::FeatureCollection(fc) => (fc.features, fc.foreign_members),
            GeoJson::Feature(feature) => (vec![feature], None),
            GeoJson::Geometry(_) => {
                return Err(ProcessingError::invalid_geometry(
                    "expected a Feature or FeatureCollection, found a bare geometry",
                ))
            }
        };

        let crs = match foreign.as_ref().and_then(named_crs) {
            Some(name) => {
                Crs::parse(name).map_err(|e| ProcessingError::invalid_geometry(e.to_string()))?
            }
            None => Crs::wgs84(),
        };

        let mut features = Vec::with_capacity(raw_features.len());
        for (index, feature) in raw_features.into_iter().enumerate() {
            let properties = feature.properties.unwrap_or_default();
            let geometry = match feature.geometry {
                Some(geometry) => to_multi_polygon(&geometry.value, index)?,
                None => {
                    warn!(feature = index, "Feature has no geometry");
                    MultiPolygon::new(Vec::new())
                }
            };
            features.push(PolygonFeature {
                footprint: Footprint::new(geometry),
                properties,
            });
        }

        Ok(Self { crs, features })
    }

    /// Replace the declared CRS without transforming coordinates.
    pub fn with_crs(mut self, crs: Crs) -> Self {
        self.crs = crs;
        self
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Extent of all features.
    pub fn bbox(&self) -> Option<BoundingBox> {
        self.features
            .iter()
            .filter_map(|f| f.footprint.bbox())
            .reduce(|a, b| a.union(&b))
    }

    /// The layer expressed in `target`.
    pub fn to_crs(&self, target: Crs) -> Result<PolygonLayer> {
        let transform = CrsTransform::between(self.crs, target)?;
        Ok(PolygonLayer {
            crs: if target.is_defined() { target } else { self.crs },
            features: self
                .features
                .iter()
                .map(|f| PolygonFeature {
                    footprint: f.footprint.transformed(transform),
                    properties: f.properties.clone(),
                })
                .collect(),
        })
    }

    /// Fail with `MissingField` unless every feature carries `field`.
    pub fn require_field(&self, field: &str) -> Result<()> {
        for (index, feature) in self.features.iter().enumerate() {
            if feature.properties.get(field).and_then(ZoneId::from_property).is_none() {
                return Err(ProcessingError::missing_field(field, index));
            }
        }
        Ok(())
    }

    /// Distinct zones of `field`, sorted by identifier.
    ///
    /// Features sharing an identifier are merged into one zone.
    pub fn zones(&self, field: &str) -> Result<Vec<Zone>> {
        let mut grouped: Vec<(ZoneId, Vec<Polygon<f64>>)> = Vec::new();

        for (index, feature) in self.features.iter().enumerate() {
            let id = feature
                .properties
                .get(field)
                .and_then(ZoneId::from_property)
                .ok_or_else(|| ProcessingError::missing_field(field, index))?;

            let polygons = feature.footprint.geometry().0.iter().cloned();
            match grouped.iter_mut().find(|(existing, _)| *existing == id) {
                Some((_, parts)) => {
                    debug!(zone = %id, feature = index, "Merging duplicate zone id");
                    parts.extend(polygons);
                }
                None => grouped.push((id, polygons.collect())),
            }
        }

        grouped.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(grouped
            .into_iter()
            .map(|(id, parts)| Zone {
                id,
                footprint: Footprint::new(MultiPolygon::new(parts)),
            })
            .collect())
    }

    /// Union of every feature, for clipping.
    pub fn mask(&self) -> PolygonMask {
        let parts = self
            .features
            .iter()
            .flat_map(|f| f.footprint.geometry().0.iter().cloned())
            .collect();
        PolygonMask::new(MultiPolygon::new(parts), self.crs)
    }
}

/// `crs.properties.name` of a legacy named-CRS member.
fn named_crs(foreign: &Map<String, serde_json::Value>) -> Option<&str> {
    foreign.get("crs")?.get("properties")?.get("name")?.as_str()
}

fn to_multi_polygon(value: &Value, feature: usize) -> Result<MultiPolygon<f64>> {
    match value {
        Value::Polygon(rings) => Ok(MultiPolygon::new(vec![to_polygon(rings, feature)?])),
        Value::MultiPolygon(polygons) => Ok(MultiPolygon::new(
            polygons
                .iter()
                .map(|rings| to_polygon(rings, feature))
                .collect::<Result<Vec<_>>>()?,
        )),
        _ => {
            warn!(feature, "Ignoring non-polygon geometry");
            Ok(MultiPolygon::new(Vec::new()))
        }
    }
}

fn to_polygon(rings: &[Vec<geojson::Position>], feature: usize) -> Result<Polygon<f64>> {
    let mut rings = rings.iter().map(|ring| to_ring(ring, feature));
    let exterior = rings.next().transpose()?.ok_or_else(|| {
        ProcessingError::invalid_geometry(format!("feature {}: polygon without rings", feature))
    })?;
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn to_ring(positions: &[geojson::Position], feature: usize) -> Result<LineString<f64>> {
    let coords = positions
        .iter()
        .map(|p| match (p.first(), p.get(1)) {
            (Some(&x), Some(&y)) if x.is_finite() && y.is_finite() => Ok(Coord { x, y }),
            _ => Err(ProcessingError::invalid_geometry(format!(
                "feature {}: invalid position {:?}",
                feature, p
            ))),
        })
        .collect::<Result<Vec<_>>>()?;

    if coords.len() < 3 {
        return Err(ProcessingError::invalid_geometry(format!(
            "feature {}: ring with {} positions",
            feature,
            coords.len()
        )));
    }

    // geo closes rings on construction
    Ok(LineString::new(coords))
}

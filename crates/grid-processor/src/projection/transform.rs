//! CRS reconciliation between rasters, masks and the reference grid.
//!
//! Only the geographic WGS84 <-> spherical Web Mercator pair is reprojected.
//! Every other pair of distinct, defined CRS is a geometry mismatch.

use dem_common::crs::{EPSG_WEB_MERCATOR, EPSG_WGS84};
use dem_common::Crs;
use tracing::warn;

use crate::{ProcessingError, Result};

/// WGS84 semi-major axis used by EPSG:3857.
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Latitude limit of the Web Mercator square.
const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// A point transform from one CRS to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrsTransform {
    /// Coordinates are used as-is.
    Identity,
    /// EPSG:4326 (lon, lat) to EPSG:3857 (x, y).
    GeographicToMercator,
    /// EPSG:3857 (x, y) to EPSG:4326 (lon, lat).
    MercatorToGeographic,
}

impl CrsTransform {
    /// Transform taking coordinates in `from` to coordinates in `to`.
    ///
    /// An undefined CRS on either side is assumed to match the other one.
    pub fn between(from: Crs, to: Crs) -> Result<Self> {
        match (from, to) {
            _ if from == to => Ok(Self::Identity),
            (Crs::Undefined, _) | (_, Crs::Undefined) => {
                warn!(from = %from, to = %to, "Undefined CRS, assuming coordinates already match");
                Ok(Self::Identity)
            }
            (Crs::Epsg(EPSG_WGS84), Crs::Epsg(EPSG_WEB_MERCATOR)) => {
                Ok(Self::GeographicToMercator)
            }
            (Crs::Epsg(EPSG_WEB_MERCATOR), Crs::Epsg(EPSG_WGS84)) => {
                Ok(Self::MercatorToGeographic)
            }
            _ => Err(ProcessingError::geometry_mismatch(format!(
                "no reprojection from {} to {}",
                from, to
            ))),
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity)
    }

    /// Apply the transform to a single point.
    #[inline]
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Self::Identity => (x, y),
            Self::GeographicToMercator => lonlat_to_mercator(x, y),
            Self::MercatorToGeographic => mercator_to_lonlat(x, y),
        }
    }
}

/// Convert lon/lat degrees to Web Mercator meters.
#[inline]
fn lonlat_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    let x = lon.to_radians() * EARTH_RADIUS_M;
    let y = lat.to_radians().tan().asinh() * EARTH_RADIUS_M;
    (x, y)
}

/// Convert Web Mercator meters to lon/lat degrees.
#[inline]
fn mercator_to_lonlat(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS_M).to_degrees();
    let lat = (y / EARTH_RADIUS_M).sinh().atan().to_degrees();
    (lon, lat)
}

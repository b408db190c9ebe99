//! Coordinate Reference System identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// WGS84 geographic.
pub const EPSG_WGS84: u32 = 4326;
/// Web Mercator.
pub const EPSG_WEB_MERCATOR: u32 = 3857;

/// A CRS identified by its EPSG code, or left undefined when the source
/// carries no usable georeferencing keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Crs {
    Epsg(u32),
    Undefined,
}

impl Crs {
    pub fn wgs84() -> Self {
        Crs::Epsg(EPSG_WGS84)
    }

    /// Parse a CRS string.
    ///
    /// Accepts formats like:
    /// - "EPSG:4326" / "epsg:32719"
    /// - "CRS:84" (WGS84 with lon/lat axis order)
    /// - "urn:ogc:def:crs:EPSG::32719" (legacy GeoJSON `crs` member)
    /// - "urn:ogc:def:crs:OGC:1.3:CRS84"
    pub fn parse(s: &str) -> Result<Self, CrsParseError> {
        let normalized = s.trim().to_uppercase();

        if normalized == "CRS:84" || normalized.ends_with(":CRS84") {
            return Ok(Crs::wgs84());
        }

        let code = normalized
            .strip_prefix("EPSG:")
            .or_else(|| normalized.strip_prefix("URN:OGC:DEF:CRS:EPSG::"))
            .or_else(|| {
                normalized
                    .strip_prefix("URN:OGC:DEF:CRS:EPSG:")
                    .and_then(|rest| rest.rsplit(':').next())
            })
            .ok_or_else(|| CrsParseError::UnsupportedCrs(s.to_string()))?;

        code.parse::<u32>()
            .map(Crs::Epsg)
            .map_err(|_| CrsParseError::UnsupportedCrs(s.to_string()))
    }

    /// EPSG code, if defined.
    pub fn epsg(&self) -> Option<u32> {
        match self {
            Crs::Epsg(code) => Some(*code),
            Crs::Undefined => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Crs::Epsg(_))
    }

    /// Check if this is a geographic (lat/lon) CRS.
    ///
    /// Only the common geographic datums are recognised; everything else
    /// is treated as projected.
    pub fn is_geographic(&self) -> bool {
        matches!(self, Crs::Epsg(4326 | 4269 | 4258 | 4674 | 4190))
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Crs::Epsg(code) => write!(f, "EPSG:{}", code),
            Crs::Undefined => write!(f, "undefined"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CrsParseError {
    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_crs() {
        assert_eq!(Crs::parse("EPSG:4326").unwrap(), Crs::Epsg(4326));
        assert_eq!(Crs::parse("epsg:32719").unwrap(), Crs::Epsg(32719));
        assert_eq!(Crs::parse("CRS:84").unwrap(), Crs::wgs84());
        assert_eq!(
            Crs::parse("urn:ogc:def:crs:EPSG::32719").unwrap(),
            Crs::Epsg(32719)
        );
        assert_eq!(
            Crs::parse("urn:ogc:def:crs:OGC:1.3:CRS84").unwrap(),
            Crs::wgs84()
        );
        assert!(Crs::parse("EPSG:abc").is_err());
        assert!(Crs::parse("WGS84").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Crs::Epsg(3857).to_string(), "EPSG:3857");
        assert_eq!(Crs::Undefined.to_string(), "undefined");
    }

    #[test]
    fn test_geographic() {
        assert!(Crs::wgs84().is_geographic());
        assert!(!Crs::Epsg(32719).is_geographic());
        assert!(!Crs::Undefined.is_geographic());
    }
}

//! Common test fixtures for DEM differencing tests.
//!
//! This module provides pre-defined grids and zone layouts that represent
//! common scenarios in glacier change detection.

/// Common grid specifications for testing.
pub mod grid {
    use dem_common::{Crs, GridSpec};

    /// 30 m UTM 19S grid over the Southern Patagonian Ice Field.
    pub fn utm_19s(width: usize, height: usize) -> GridSpec {
        GridSpec::new(width, height, 350_000.0, 5_900_000.0, 30.0, 30.0, Crs::Epsg(32719))
    }

    /// 1 arc-second geographic grid (SRTM-like).
    pub fn geographic(width: usize, height: usize) -> GridSpec {
        let arc_second = 1.0 / 3600.0;
        GridSpec::new(width, height, -72.0, -37.0, arc_second, arc_second, Crs::wgs84())
    }

    /// Unit-pixel grid whose lower-left corner is (0, 0).
    ///
    /// Pixel (col, row) covers `[col, col + 1] x [height - row - 1, height - row]`,
    /// which keeps hand-written polygon coordinates readable.
    pub fn unit(width: usize, height: usize) -> GridSpec {
        GridSpec::new(width, height, 0.0, height as f64, 1.0, 1.0, Crs::Epsg(32719))
    }
}

/// Zone identifiers used by the glacier fixtures.
pub mod zones {
    /// Zone attribute field name used throughout the tests.
    pub const FIELD: &str = "glacier_id";

    pub const UPSALA: &str = "G288739E49880S";
    pub const VIEDMA: &str = "G287305E49397S";
    pub const PERITO_MORENO: &str = "G286956E50510S";
}

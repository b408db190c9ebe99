//! Common types shared across the DEM differencing crates.
//!
//! Everything downstream speaks in terms of [`Raster`]: a row-major `f32`
//! grid paired with a [`GridSpec`] (north-up geotransform plus CRS) and an
//! optional nodata sentinel.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod grid;
pub mod raster;

pub use bbox::BoundingBox;
pub use crs::{Crs, CrsParseError};
pub use error::{DemError, DemResult};
pub use grid::{GridSpec, PixelWindow};
pub use raster::{Raster, DEFAULT_NODATA};

//! Coordinate transforms and interpolation used when conforming rasters
//! to a reference grid.

pub mod interpolation;
pub mod transform;

pub use interpolation::{bilinear_interpolate, cubic_interpolate, nearest_interpolate, sample};
pub use transform::CrsTransform;

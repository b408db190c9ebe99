//! GeoTIFF reading and writing for single-band elevation rasters.
//!
//! Supports the subset of GeoTIFF that DEM tooling (GDAL, ArcGIS, ASP)
//! emits for north-up grids:
//! - `ModelTiepoint` + `ModelPixelScale`, or a non-rotated `ModelTransformation`
//! - EPSG codes from the GeoKey directory (projected or geographic)
//! - `PixelIsArea` / `PixelIsPoint` raster types
//! - the `GDAL_NODATA` ASCII tag
//!
//! Output is always `Float32` with the same tags, written atomically.

mod error;
mod geokeys;
mod reader;
mod writer;

pub use error::GeoTiffError;
pub use geokeys::{GeoKeys, RasterType};
pub use reader::{read_grid, read_raster};
pub use writer::{encode_raster, write_raster};

/// Result type for GeoTIFF operations.
pub type Result<T> = std::result::Result<T, GeoTiffError>;

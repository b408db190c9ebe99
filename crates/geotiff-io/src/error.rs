//! Error types for the GeoTIFF codec.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when reading or writing GeoTIFF rasters.
#[derive(Debug, Error)]
pub enum GeoTiffError {
    /// I/O error on a file.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TIFF encoding or decoding error.
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// Invalid GeoTIFF - missing or inconsistent georeferencing tags.
    #[error("Invalid GeoTIFF: {0}")]
    InvalidGeoTiff(String),

    /// Layout this codec does not handle (rotated grids, multi-band, ...).
    #[error("Unsupported GeoTIFF layout: {0}")]
    Unsupported(String),

    /// Raster model rejected the decoded data.
    #[error(transparent)]
    Raster(#[from] dem_common::DemError),
}

impl GeoTiffError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors caused by the filesystem rather than file contents.
    pub fn is_io(&self) -> bool {
        matches!(self, GeoTiffError::Io { .. })
            || matches!(self, GeoTiffError::Tiff(tiff::TiffError::IoError(_)))
    }
}

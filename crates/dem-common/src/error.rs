//! Error types for the shared raster model.

use thiserror::Error;

use crate::crs::CrsParseError;

/// Result type alias using DemError.
pub type DemResult<T> = Result<T, DemError>;

#[derive(Debug, Error)]
pub enum DemError {
    #[error("Invalid raster: {0}")]
    InvalidRaster(String),

    #[error("Invalid CRS: {0}")]
    InvalidCrs(String),

    #[error("Invalid bounding box: {0}")]
    InvalidBbox(String),
}

impl From<CrsParseError> for DemError {
    fn from(err: CrsParseError) -> Self {
        DemError::InvalidCrs(err.to_string())
    }
}

//! Error types for grid processing.

use thiserror::Error;

/// Errors that can occur during raster processing.
#[derive(Error, Debug)]
pub enum ProcessingError {
    /// Inputs to a pixel-wise operation do not share a grid.
    #[error("grid mismatch: {left} vs {right}")]
    GridMismatch { left: String, right: String },

    /// CRS or geometry cannot be reconciled with the target grid.
    #[error("geometry mismatch: {0}")]
    GeometryMismatch(String),

    /// Zone identifier field absent or empty on a feature.
    #[error("zone field '{field}' missing on feature {feature}")]
    MissingField { field: String, feature: usize },

    /// Polygon layer could not be interpreted.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Polygon layer file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raster model rejected the produced data.
    #[error(transparent)]
    Raster(#[from] dem_common::DemError),
}

impl ProcessingError {
    /// Create a GridMismatch error from two grid descriptions.
    pub fn grid_mismatch(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self::GridMismatch {
            left: left.into(),
            right: right.into(),
        }
    }

    /// Create a GeometryMismatch error.
    pub fn geometry_mismatch(msg: impl Into<String>) -> Self {
        Self::GeometryMismatch(msg.into())
    }

    /// Create a MissingField error.
    pub fn missing_field(field: impl Into<String>, feature: usize) -> Self {
        Self::MissingField {
            field: field.into(),
            feature,
        }
    }

    /// Create an InvalidGeometry error.
    pub fn invalid_geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }

    /// Create a ConfigError.
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}

impl From<geojson::Error> for ProcessingError {
    fn from(err: geojson::Error) -> Self {
        Self::InvalidGeometry(err.to_string())
    }
}

/// Result type for grid processing operations.
pub type Result<T> = std::result::Result<T, ProcessingError>;

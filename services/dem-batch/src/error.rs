//! Batch error type and the outcome taxonomy written to the run log.

use std::fmt;
use std::path::PathBuf;

use geotiff_io::GeoTiffError;
use grid_processor::ProcessingError;
use renderer::RenderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BatchError {
    /// Invalid or incomplete configuration.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Processing(#[from] ProcessingError),

    #[error(transparent)]
    GeoTiff(#[from] GeoTiffError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl BatchError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Taxonomy name of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BatchError::Config(_) => ErrorKind::Configuration,
            BatchError::Processing(err) => match err {
                ProcessingError::GridMismatch { .. } => ErrorKind::GridMismatch,
                ProcessingError::GeometryMismatch(_) => ErrorKind::GeometryMismatch,
                ProcessingError::MissingField { .. } => ErrorKind::MissingField,
                ProcessingError::ConfigError(_) => ErrorKind::Configuration,
                ProcessingError::Io(_) => ErrorKind::IoFailure,
                ProcessingError::InvalidGeometry(_) | ProcessingError::Raster(_) => {
                    ErrorKind::InvalidInput
                }
            },
            BatchError::GeoTiff(err) if err.is_io() => ErrorKind::IoFailure,
            BatchError::GeoTiff(_) => ErrorKind::InvalidInput,
            BatchError::Render(RenderError::Encode(_)) => ErrorKind::IoFailure,
            BatchError::Render(_) => ErrorKind::InvalidInput,
            BatchError::Io { .. } | BatchError::Csv(_) => ErrorKind::IoFailure,
            BatchError::Manifest(_) => ErrorKind::InvalidInput,
        }
    }
}

/// Error categories reported per item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    GridMismatch,
    GeometryMismatch,
    MissingField,
    IoFailure,
    InvalidInput,
    Configuration,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::GridMismatch => "GridMismatch",
            ErrorKind::GeometryMismatch => "GeometryMismatch",
            ErrorKind::MissingField => "MissingField",
            ErrorKind::IoFailure => "IOFailure",
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::Configuration => "Configuration",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type Result<T> = std::result::Result<T, BatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err: BatchError = ProcessingError::grid_mismatch("a", "b").into();
        assert_eq!(err.kind(), ErrorKind::GridMismatch);

        let err: BatchError = ProcessingError::missing_field("glacier_id", 3).into();
        assert_eq!(err.kind(), ErrorKind::MissingField);

        let err = BatchError::io("/nope", std::io::Error::other("boom"));
        assert_eq!(err.kind().as_str(), "IOFailure");

        let err: BatchError = GeoTiffError::InvalidGeoTiff("no tags".into()).into();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}

//! Error types for rendering.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    /// Nothing to draw or mismatched buffers.
    #[error("invalid render input: {0}")]
    InvalidInput(String),

    /// PNG compression failed.
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RenderError>;

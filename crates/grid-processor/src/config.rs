//! Configuration for grid alignment.

use std::str::FromStr;

use dem_common::{GridSpec, DEFAULT_NODATA};
use serde::{Deserialize, Serialize};

/// Explicit alignment settings handed to every [`crate::align`] call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentConfig {
    /// Snap grid every raster is conformed to.
    pub reference: GridSpec,

    /// Resampling used when the input lattice differs from the reference.
    pub resampling: ResamplingMethod,

    /// Nodata written when an input declares none.
    pub default_nodata: f32,
}

impl AlignmentConfig {
    /// Config snapping to `reference` with nearest-neighbour resampling.
    pub fn new(reference: GridSpec) -> Self {
        Self {
            reference,
            resampling: ResamplingMethod::default(),
            default_nodata: DEFAULT_NODATA,
        }
    }

    pub fn with_resampling(mut self, resampling: ResamplingMethod) -> Self {
        self.resampling = resampling;
        self
    }

    pub fn with_default_nodata(mut self, nodata: f32) -> Self {
        self.default_nodata = nodata;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.reference.is_empty() {
            return Err("reference grid has no pixels".to_string());
        }

        if !(self.reference.pixel_width > 0.0 && self.reference.pixel_height > 0.0) {
            return Err(format!(
                "reference pixel size must be positive, got {}x{}",
                self.reference.pixel_width, self.reference.pixel_height
            ));
        }

        if self.default_nodata.is_nan() {
            return Err("default_nodata must be a number".to_string());
        }

        Ok(())
    }
}

/// Resampling method for grid alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResamplingMethod {
    /// Nearest neighbor (preserves exact elevations).
    #[default]
    Nearest,
    /// Bilinear interpolation (smooth, slight value changes).
    Bilinear,
    /// Bicubic interpolation (smoothest, more compute).
    Cubic,
}

impl ResamplingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Bilinear => "bilinear",
            Self::Cubic => "cubic",
        }
    }
}

impl FromStr for ResamplingMethod {
    type Err = String;

    /// Parse from string (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nearest" | "near" => Ok(Self::Nearest),
            "bilinear" => Ok(Self::Bilinear),
            "cubic" | "bicubic" => Ok(Self::Cubic),
            other => Err(format!("unknown resampling method '{}'", other)),
        }
    }
}

impl std::fmt::Display for ResamplingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

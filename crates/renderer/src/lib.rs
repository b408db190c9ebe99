//! Image rendering for DEM difference visualization.
//!
//! Implements:
//! - Color ramps (diverging red/blue, sequential) and value scales
//! - Comparison figures on a shared symmetric scale with a labelled color bar
//! - Panel titles and tick labels drawn with an embedded font
//! - PNG encoding (indexed when the palette fits, RGBA otherwise)

pub mod error;
pub mod figure;
pub mod gradient;
pub mod png;
pub mod text;

pub use error::{RenderError, Result};
pub use figure::{render_comparison, render_single, symmetric_scale, FigureOptions, Panel};
pub use gradient::{Color, ColorRamp, ColorScale};
pub use image::RgbaImage;
pub use png::encode_image;

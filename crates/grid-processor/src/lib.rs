//! Raster processing kernels for DEM change detection.
//!
//! This crate conforms DEMs to a shared reference grid, clips them by glacier
//! polygons, differences them against a baseline and aggregates the result
//! per zone:
//!
//! ```text
//! raw DEM ──► align(reference grid) ──► clip(mask, mode)
//!                                            │
//!              baseline (aligned + clipped) ─┤
//!                                            ▼
//!                                  difference(subject, baseline)
//!                                            │
//!                                            ▼
//!                           aggregate(diff, polygon layer, zone field)
//! ```
//!
//! Nodata is carried explicitly: NaN and the declared sentinel are both
//! treated as missing, and every stage writes its own sentinel into the
//! output.
//!
//! # Example
//!
//! ```ignore
//! use grid_processor::{aggregate, align, clip, difference, AlignmentConfig, ClipMode, PolygonLayer};
//!
//! let config = AlignmentConfig::new(snap_grid);
//! let layer = PolygonLayer::from_path("glaciers.geojson")?;
//! let mask = layer.mask();
//!
//! let baseline = clip(&align(&baseline_dem, &config)?, &mask, ClipMode::Inside)?;
//! let subject = clip(&align(&dem_2000, &config)?, &mask, ClipMode::Inside)?;
//! let diff = difference(&subject, &baseline, config.default_nodata)?;
//! let table = aggregate(&diff, &layer, "glacier_id")?;
//! ```

pub mod align;
pub mod clip;
pub mod config;
pub mod difference;
pub mod error;
pub mod polygon;
pub mod projection;
pub mod zonal;

// Re-export commonly used types at crate root
pub use align::{align, align_with_path, AlignmentPath};
pub use clip::{clip, ClipMode};
pub use config::{AlignmentConfig, ResamplingMethod};
pub use difference::difference;
pub use error::{ProcessingError, Result};
pub use polygon::{Footprint, PolygonFeature, PolygonLayer, PolygonMask, Zone, ZoneId};
pub use projection::CrsTransform;
pub use zonal::{aggregate, SummaryStatistics, ZonalTable, ZoneStatistics};

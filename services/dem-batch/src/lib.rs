//! Batch DEM change detection.
//!
//! Aligns every raster of an input directory to a snap grid, clips it by a
//! polygon layer, subtracts a baseline DEM, and writes per-zone statistics
//! plus optional comparison figures. See [`pipeline::BatchPipeline`].

pub mod config;
pub mod discovery;
pub mod error;
pub mod export;
pub mod manifest;
pub mod pipeline;
pub mod run_log;

pub use config::BatchConfig;
pub use error::{BatchError, ErrorKind, Result};
pub use pipeline::{BatchPipeline, ItemIssue, ProcessedItem, RunSummary};
pub use run_log::{Outcome, RunCounts, Stage};

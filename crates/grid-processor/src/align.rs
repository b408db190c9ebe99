//! Conforming rasters to a reference (snap) grid.
//!
//! The output of [`align`] always has exactly the reference grid: same
//! dimensions, transform and CRS. Reference pixels whose centers fall
//! outside the input's coverage are nodata.

use dem_common::{GridSpec, Raster};
use tracing::{debug, warn};

use crate::config::AlignmentConfig;
use crate::projection::{sample, CrsTransform};
use crate::{ProcessingError, Result};

/// How an input was brought onto the reference grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentPath {
    /// Input already had the reference grid.
    Unchanged,
    /// Same lattice, shifted by whole pixels; values copied without resampling.
    Reframed,
    /// Values interpolated at every reference pixel center.
    Resampled,
}

/// Conform `raster` to `config.reference`.
pub fn align(raster: &Raster, config: &AlignmentConfig) -> Result<Raster> {
    align_with_path(raster, config).map(|(aligned, _)| aligned)
}

/// Like [`align`], also reporting which path was taken.
pub fn align_with_path(
    raster: &Raster,
    config: &AlignmentConfig,
) -> Result<(Raster, AlignmentPath)> {
    config.validate().map_err(ProcessingError::config_error)?;

    let reference = config.reference;
    let nodata = raster.nodata_or(config.default_nodata);

    let mut source = raster.grid;
    if !source.crs.is_defined() && reference.crs.is_defined() {
        warn!(
            reference_crs = %reference.crs,
            "Input raster has no CRS, assuming the reference CRS"
        );
        source.crs = reference.crs;
    }

    let (data, path) = if source.is_aligned_with(&reference) {
        (copy_values(raster, nodata), AlignmentPath::Unchanged)
    } else if reference.same_lattice(&source) {
        (reframe(raster, &source, &reference, nodata), AlignmentPath::Reframed)
    } else {
        let transform = CrsTransform::between(reference.crs, source.crs)?;
        (
            resample(raster, &source, &reference, transform, config, nodata),
            AlignmentPath::Resampled,
        )
    };

    let aligned = Raster::new(reference, data, Some(nodata))?;

    debug!(
        source = %raster.grid.describe(),
        reference = %reference.describe(),
        path = ?path,
        resampling = %config.resampling,
        valid = aligned.valid_count(),
        "Aligned raster"
    );

    Ok((aligned, path))
}

/// Values with every invalid pixel rewritten to `nodata`.
fn copy_values(raster: &Raster, nodata: f32) -> Vec<f32> {
    raster
        .data
        .iter()
        .map(|&v| if raster.is_valid(v) { v } else { nodata })
        .collect()
}

/// Copy rows of a raster sharing the reference lattice into reference
/// position.
fn reframe(raster: &Raster, source: &GridSpec, reference: &GridSpec, nodata: f32) -> Vec<f32> {
    let mut out = vec![nodata; reference.len()];

    // source pixel (c, r) is reference pixel (c + dc, r + dr)
    let Some((dc, dr)) = reference.lattice_offset(source) else {
        return out;
    };

    for src_row in 0..source.height {
        let dst_row = src_row as i64 + dr;
        if dst_row < 0 || dst_row >= reference.height as i64 {
            continue;
        }

        let first_col = (-dc).max(0);
        let last_col = (reference.width as i64 - dc).min(source.width as i64);
        for src_col in first_col..last_col.max(first_col) {
            let value = raster.data[source.flat_index(src_col as usize, src_row)];
            if raster.is_valid(value) {
                let dst = reference.flat_index((src_col + dc) as usize, dst_row as usize);
                out[dst] = value;
            }
        }
    }

    out
}

/// Interpolate the source at every reference pixel center.
fn resample(
    raster: &Raster,
    source: &GridSpec,
    reference: &GridSpec,
    transform: CrsTransform,
    config: &AlignmentConfig,
    nodata: f32,
) -> Vec<f32> {
    let masked = raster.to_nan_masked();
    let mut out = vec![nodata; reference.len()];

    for row in 0..reference.height {
        for col in 0..reference.width {
            let (x, y) = reference.pixel_center(col, row);
            let (sx, sy) = transform.apply(x, y);
            let (fx, fy) = source.fractional_pixel(sx, sy);

            let value = sample(
                config.resampling,
                &masked,
                source.width,
                source.height,
                fx,
                fy,
            );
            if !value.is_nan() {
                out[reference.flat_index(col, row)] = value;
            }
        }
    }

    out
}

//! Pixel-wise differencing of grid-aligned rasters.

use dem_common::Raster;
use tracing::{debug, warn};

use crate::{ProcessingError, Result};

/// `subject - baseline` for every pixel valid in both rasters.
///
/// Both rasters must share dimensions, transform and CRS; no implicit
/// alignment happens here. Pixels that are nodata in either input are nodata
/// in the output, whose sentinel is the subject's nodata or
/// `default_nodata`. A valid difference that lands exactly on the sentinel is
/// replaced by the adjacent `f32` so it stays valid.
pub fn difference(subject: &Raster, baseline: &Raster, default_nodata: f32) -> Result<Raster> {
    if !subject.grid.is_aligned_with(&baseline.grid) {
        return Err(ProcessingError::grid_mismatch(
            subject.grid.describe(),
            baseline.grid.describe(),
        ));
    }

    let nodata = subject.nodata_or(default_nodata);
    let mut collisions = 0usize;

    let data: Vec<f32> = subject
        .data
        .iter()
        .zip(&baseline.data)
        .map(|(&s, &b)| {
            if subject.is_valid(s) && baseline.is_valid(b) {
                let d = s - b;
                if d == nodata {
                    collisions += 1;
                    off_sentinel(d)
                } else {
                    d
                }
            } else {
                nodata
            }
        })
        .collect();

    if collisions > 0 {
        warn!(
            collisions,
            nodata, "Valid differences equal the nodata sentinel, moved by one ulp"
        );
    }

    let diff = Raster::new(subject.grid, data, Some(nodata))?;

    debug!(
        grid = %diff.grid.describe(),
        valid = diff.valid_count(),
        "Computed difference"
    );

    Ok(diff)
}

/// Adjacent `f32` on the zero side of `value`; zero maps to the smallest
/// positive subnormal.
fn off_sentinel(value: f32) -> f32 {
    if value == 0.0 {
        f32::from_bits(1)
    } else {
        f32::from_bits(value.to_bits() - 1)
    }
}

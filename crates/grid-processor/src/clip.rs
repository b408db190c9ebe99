//! Clipping rasters by polygon masks.

use std::str::FromStr;

use dem_common::{Raster, DEFAULT_NODATA};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::polygon::PolygonMask;
use crate::Result;

/// Which side of the mask boundary keeps its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipMode {
    /// Keep pixels whose centers are inside the mask (or on its boundary).
    #[default]
    Inside,
    /// Keep pixels whose centers are outside the mask.
    Outside,
}

impl ClipMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inside => "inside",
            Self::Outside => "outside",
        }
    }

    #[inline]
    fn keeps(&self, covered: bool) -> bool {
        match self {
            Self::Inside => covered,
            Self::Outside => !covered,
        }
    }
}

impl FromStr for ClipMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inside" => Ok(Self::Inside),
            "outside" => Ok(Self::Outside),
            other => Err(format!("unknown clip mode '{}'", other)),
        }
    }
}

impl std::fmt::Display for ClipMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clip `raster` to the mask's bounding box and nodata the excluded side.
///
/// The output covers the mask bounding box intersected with the raster
/// extent, snapped outward to whole pixels. A mask that misses the raster
/// yields an all-nodata raster on the input grid.
pub fn clip(raster: &Raster, mask: &PolygonMask, mode: ClipMode) -> Result<Raster> {
    let nodata = raster.nodata_or(DEFAULT_NODATA);
    let mask = mask.to_crs(raster.grid.crs)?;

    let window = mask.bbox().and_then(|bbox| raster.grid.window_for(&bbox));
    let Some(window) = window else {
        info!(
            grid = %raster.grid.describe(),
            "Mask does not intersect raster, result is empty"
        );
        return Ok(Raster::nodata_filled(raster.grid, nodata));
    };

    let mut clipped = raster.crop(&window)?;
    clipped.nodata = Some(nodata);

    let grid = clipped.grid;
    let mut kept = 0usize;
    for row in 0..grid.height {
        for col in 0..grid.width {
            let idx = grid.flat_index(col, row);
            let (x, y) = grid.pixel_center(col, row);
            let value = clipped.data[idx];

            if raster.is_valid(value) && mode.keeps(mask.covers(x, y)) {
                kept += 1;
            } else {
                clipped.data[idx] = nodata;
            }
        }
    }

    debug!(
        mode = %mode,
        window = ?window,
        kept,
        "Clipped raster"
    );

    Ok(clipped)
}

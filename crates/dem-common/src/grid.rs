//! Grid specifications (geotransform + CRS) for north-up rasters.

use crate::{BoundingBox, Crs};
use serde::{Deserialize, Serialize};

/// Fraction of a pixel under which two lattice coordinates are considered equal.
const LATTICE_TOLERANCE: f64 = 1e-6;

/// Specification of a regular, north-up raster grid.
///
/// The origin is the outer upper-left corner of pixel (0, 0). Column indices
/// grow eastwards by `pixel_width`, row indices grow southwards by
/// `pixel_height`; both sizes are stored as positive numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Number of columns
    pub width: usize,
    /// Number of rows
    pub height: usize,
    /// X coordinate of the upper-left corner
    pub origin_x: f64,
    /// Y coordinate of the upper-left corner
    pub origin_y: f64,
    /// Pixel size along X (CRS units)
    pub pixel_width: f64,
    /// Pixel size along Y (CRS units, positive)
    pub pixel_height: f64,
    pub crs: Crs,
}

/// A rectangular block of whole pixels inside a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub col_off: usize,
    pub row_off: usize,
    pub width: usize,
    pub height: usize,
}

impl GridSpec {
    /// Create a new grid specification.
    pub fn new(
        width: usize,
        height: usize,
        origin_x: f64,
        origin_y: f64,
        pixel_width: f64,
        pixel_height: f64,
        crs: Crs,
    ) -> Self {
        Self {
            width,
            height,
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            crs,
        }
    }

    /// Calculate the outer extent of this grid.
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox {
            min_x: self.origin_x,
            min_y: self.origin_y - self.height as f64 * self.pixel_height,
            max_x: self.origin_x + self.width as f64 * self.pixel_width,
            max_y: self.origin_y,
        }
    }

    /// Coordinates of a pixel center.
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y - (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// Continuous pixel coordinates of a point, where integer values are
    /// pixel centers.
    pub fn fractional_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_width - 0.5,
            (self.origin_y - y) / self.pixel_height - 0.5,
        )
    }

    /// The pixel whose area contains the point, if any.
    pub fn pixel_at(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let col = ((x - self.origin_x) / self.pixel_width).floor();
        let row = ((self.origin_y - y) / self.pixel_height).floor();

        if col < 0.0 || row < 0.0 || col >= self.width as f64 || row >= self.height as f64 {
            return None;
        }

        Some((col as usize, row as usize))
    }

    /// Get the 1D array index for a 2D grid position (row-major).
    pub fn flat_index(&self, col: usize, row: usize) -> usize {
        row * self.width + col
    }

    /// Total number of grid points.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// Check if grid is empty.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Ground area of one pixel in CRS units squared.
    pub fn pixel_area(&self) -> f64 {
        (self.pixel_width * self.pixel_height).abs()
    }

    /// True when both grids index the same pixels: identical dimensions,
    /// CRS, pixel size, and origin (within a millionth of a pixel).
    pub fn is_aligned_with(&self, other: &GridSpec) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.crs == other.crs
            && self.same_lattice(other)
            && self.lattice_offset(other) == Some((0, 0))
    }

    /// True when both grids share CRS and pixel size, and their origins are a
    /// whole number of pixels apart.
    pub fn same_lattice(&self, other: &GridSpec) -> bool {
        self.crs == other.crs
            && approx_eq(self.pixel_width, other.pixel_width, self.pixel_width)
            && approx_eq(self.pixel_height, other.pixel_height, self.pixel_height)
            && self.lattice_offset(other).is_some()
    }

    /// Offset of `other`'s origin expressed in whole pixels of `self`:
    /// `other.pixel (c, r)` is `self.pixel (c + dc, r + dr)`.
    pub fn lattice_offset(&self, other: &GridSpec) -> Option<(i64, i64)> {
        let dc = (other.origin_x - self.origin_x) / self.pixel_width;
        let dr = (self.origin_y - other.origin_y) / self.pixel_height;

        let (rc, rr) = (dc.round(), dr.round());
        if (dc - rc).abs() > LATTICE_TOLERANCE || (dr - rr).abs() > LATTICE_TOLERANCE {
            return None;
        }

        Some((rc as i64, rr as i64))
    }

    /// Smallest block of whole pixels covering `bbox` ∩ grid extent.
    ///
    /// Returns `None` when the box does not overlap the grid.
    pub fn window_for(&self, bbox: &BoundingBox) -> Option<PixelWindow> {
        let clipped = self.bbox().intersection(bbox)?;

        let col_start = ((clipped.min_x - self.origin_x) / self.pixel_width + LATTICE_TOLERANCE)
            .floor()
            .max(0.0) as usize;
        let col_end = ((clipped.max_x - self.origin_x) / self.pixel_width - LATTICE_TOLERANCE)
            .ceil()
            .min(self.width as f64) as usize;
        let row_start = ((self.origin_y - clipped.max_y) / self.pixel_height + LATTICE_TOLERANCE)
            .floor()
            .max(0.0) as usize;
        let row_end = ((self.origin_y - clipped.min_y) / self.pixel_height - LATTICE_TOLERANCE)
            .ceil()
            .min(self.height as f64) as usize;

        if col_end <= col_start || row_end <= row_start {
            return None;
        }

        Some(PixelWindow {
            col_off: col_start,
            row_off: row_start,
            width: col_end - col_start,
            height: row_end - row_start,
        })
    }

    /// Grid describing a window of this grid.
    pub fn subgrid(&self, window: &PixelWindow) -> GridSpec {
        GridSpec {
            width: window.width,
            height: window.height,
            origin_x: self.origin_x + window.col_off as f64 * self.pixel_width,
            origin_y: self.origin_y - window.row_off as f64 * self.pixel_height,
            pixel_width: self.pixel_width,
            pixel_height: self.pixel_height,
            crs: self.crs,
        }
    }

    /// Short human readable summary used in logs and error messages.
    pub fn describe(&self) -> String {
        format!(
            "{}x{} @ ({}, {}) px {}x{} {}",
            self.width,
            self.height,
            self.origin_x,
            self.origin_y,
            self.pixel_width,
            self.pixel_height,
            self.crs
        )
    }
}

fn approx_eq(a: f64, b: f64, scale: f64) -> bool {
    (a - b).abs() <= LATTICE_TOLERANCE * scale.abs().max(f64::MIN_POSITIVE)
}

//! In-memory raster: values + grid + nodata sentinel.

use crate::{DemError, DemResult, GridSpec, PixelWindow};

/// Sentinel used when neither the input nor the configuration declares one.
pub const DEFAULT_NODATA: f32 = -9999.0;

/// A single-band raster.
///
/// Values are row-major, north to south, west to east. A pixel is valid when
/// it is not NaN and not equal to the declared nodata value.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    pub grid: GridSpec,
    pub data: Vec<f32>,
    pub nodata: Option<f32>,
}

impl Raster {
    /// Create a raster, checking that the value buffer matches the grid.
    pub fn new(grid: GridSpec, data: Vec<f32>, nodata: Option<f32>) -> DemResult<Self> {
        if data.len() != grid.len() {
            return Err(DemError::InvalidRaster(format!(
                "expected {} values for a {}x{} grid, got {}",
                grid.len(),
                grid.width,
                grid.height,
                data.len()
            )));
        }

        if grid.pixel_width <= 0.0 || grid.pixel_height <= 0.0 {
            return Err(DemError::InvalidRaster(format!(
                "pixel size must be positive, got {}x{}",
                grid.pixel_width, grid.pixel_height
            )));
        }

        Ok(Self { grid, data, nodata })
    }

    /// A raster where every pixel is nodata.
    pub fn nodata_filled(grid: GridSpec, nodata: f32) -> Self {
        Self {
            grid,
            data: vec![nodata; grid.len()],
            nodata: Some(nodata),
        }
    }

    pub fn width(&self) -> usize {
        self.grid.width
    }

    pub fn height(&self) -> usize {
        self.grid.height
    }

    /// Declared sentinel, or `fallback` when the raster declares none.
    pub fn nodata_or(&self, fallback: f32) -> f32 {
        self.nodata.unwrap_or(fallback)
    }

    /// Whether a raw value counts as a measurement under this raster's
    /// nodata rule.
    #[inline]
    pub fn is_valid(&self, value: f32) -> bool {
        if value.is_nan() {
            return false;
        }
        match self.nodata {
            Some(nd) => value != nd,
            None => true,
        }
    }

    /// Valid value at a pixel, `None` for nodata or out-of-range indices.
    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.grid.width || row >= self.grid.height {
            return None;
        }
        let value = self.data[self.grid.flat_index(col, row)];
        self.is_valid(value).then_some(value)
    }

    /// All valid values in row-major order.
    pub fn valid_values(&self) -> impl Iterator<Item = f32> + '_ {
        self.data.iter().copied().filter(|v| self.is_valid(*v))
    }

    pub fn valid_count(&self) -> usize {
        self.valid_values().count()
    }

    /// True when no pixel carries a measurement (including empty grids).
    pub fn is_all_nodata(&self) -> bool {
        self.valid_values().next().is_none()
    }

    /// Min and max over valid pixels.
    pub fn value_range(&self) -> Option<(f32, f32)> {
        self.valid_values().fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    /// Copy of the pixels inside `window`, on the matching subgrid.
    pub fn crop(&self, window: &PixelWindow) -> DemResult<Raster> {
        if window.col_off + window.width > self.grid.width
            || window.row_off + window.height > self.grid.height
        {
            return Err(DemError::InvalidRaster(format!(
                "window {:?} exceeds {}x{} raster",
                window, self.grid.width, self.grid.height
            )));
        }

        let mut data = Vec::with_capacity(window.width * window.height);
        for row in window.row_off..window.row_off + window.height {
            let start = self.grid.flat_index(window.col_off, row);
            data.extend_from_slice(&self.data[start..start + window.width]);
        }

        Ok(Raster {
            grid: self.grid.subgrid(window),
            data,
            nodata: self.nodata,
        })
    }

    /// Values with every nodata pixel replaced by NaN.
    pub fn to_nan_masked(&self) -> Vec<f32> {
        self.data
            .iter()
            .map(|&v| if self.is_valid(v) { v } else { f32::NAN })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Crs;

    fn grid(width: usize, height: usize) -> GridSpec {
        GridSpec::new(width, height, 0.0, 10.0, 1.0, 1.0, Crs::Epsg(32719))
    }

    #[test]
    fn test_new_rejects_wrong_length() {
        assert!(Raster::new(grid(2, 2), vec![1.0; 3], None).is_err());
        assert!(Raster::new(grid(2, 2), vec![1.0; 4], None).is_ok());
    }

    #[test]
    fn test_nodata_and_nan_are_invalid() {
        let raster = Raster::new(grid(2, 2), vec![1.0, -9999.0, f32::NAN, 4.0], Some(-9999.0))
            .unwrap();

        assert_eq!(raster.get(0, 0), Some(1.0));
        assert_eq!(raster.get(1, 0), None);
        assert_eq!(raster.get(0, 1), None);
        assert_eq!(raster.get(5, 5), None);
        assert_eq!(raster.valid_count(), 2);
        assert_eq!(raster.value_range(), Some((1.0, 4.0)));
    }

    #[test]
    fn test_all_nodata() {
        let raster = Raster::nodata_filled(grid(3, 2), DEFAULT_NODATA);
        assert!(raster.is_all_nodata());
        assert_eq!(raster.value_range(), None);
    }

    #[test]
    fn test_crop() {
        let data: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let raster = Raster::new(grid(4, 3), data, None).unwrap();
        let window = PixelWindow {
            col_off: 1,
            row_off: 1,
            width: 2,
            height: 2,
        };

        let cropped = raster.crop(&window).unwrap();
        assert_eq!(cropped.data, vec![5.0, 6.0, 9.0, 10.0]);
        assert_eq!(cropped.grid.origin_x, 1.0);
        assert_eq!(cropped.grid.origin_y, 9.0);

        let too_big = PixelWindow {
            col_off: 3,
            row_off: 0,
            width: 2,
            height: 1,
        };
        assert!(raster.crop(&too_big).is_err());
    }
}

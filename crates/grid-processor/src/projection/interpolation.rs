//! Interpolation methods for grid resampling.
//!
//! All functions take NaN-masked row-major data and continuous pixel
//! coordinates where integer values are pixel centers. A position is covered
//! when it falls inside the outer edge of the grid, i.e. within
//! `[-0.5, width - 0.5) x [-0.5, height - 0.5)`; uncovered positions and
//! samples that depend on nodata return NaN.

use crate::config::ResamplingMethod;

/// Sample `data` at a continuous pixel position with the given method.
#[inline]
pub fn sample(
    method: ResamplingMethod,
    data: &[f32],
    width: usize,
    height: usize,
    x: f64,
    y: f64,
) -> f32 {
    match method {
        ResamplingMethod::Nearest => nearest_interpolate(data, width, height, x, y),
        ResamplingMethod::Bilinear => bilinear_interpolate(data, width, height, x, y),
        ResamplingMethod::Cubic => cubic_interpolate(data, width, height, x, y),
    }
}

#[inline]
fn covers(width: usize, height: usize, x: f64, y: f64) -> bool {
    x >= -0.5 && y >= -0.5 && x < width as f64 - 0.5 && y < height as f64 - 0.5
}

/// Nearest neighbor interpolation.
///
/// Returns the value of the pixel whose area contains the position.
pub fn nearest_interpolate(data: &[f32], width: usize, height: usize, x: f64, y: f64) -> f32 {
    if !covers(width, height, x, y) {
        return f32::NAN;
    }

    let col = ((x + 0.5).floor() as usize).min(width - 1);
    let row = ((y + 0.5).floor() as usize).min(height - 1);

    data[row * width + col]
}

/// Bilinear interpolation.
///
/// Smoothly interpolates between the four nearest pixel centers. Positions
/// in the outer half pixel are clamped to the edge row/column.
pub fn bilinear_interpolate(data: &[f32], width: usize, height: usize, x: f64, y: f64) -> f32 {
    if !covers(width, height, x, y) {
        return f32::NAN;
    }

    let x = x.clamp(0.0, (width - 1) as f64);
    let y = y.clamp(0.0, (height - 1) as f64);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);

    let xf = (x - x0 as f64) as f32;
    let yf = (y - y0 as f64) as f32;

    let corners = [
        (data[y0 * width + x0], (1.0 - xf) * (1.0 - yf)),
        (data[y0 * width + x1], xf * (1.0 - yf)),
        (data[y1 * width + x0], (1.0 - xf) * yf),
        (data[y1 * width + x1], xf * yf),
    ];

    let mut value = 0.0f32;
    for (v, weight) in corners {
        if weight == 0.0 {
            continue;
        }
        // Any contributing nodata corner poisons the sample
        if v.is_nan() {
            return f32::NAN;
        }
        value += v * weight;
    }
    value
}

/// Bicubic interpolation.
///
/// Uses 16 surrounding points for smoother interpolation.
pub fn cubic_interpolate(data: &[f32], width: usize, height: usize, x: f64, y: f64) -> f32 {
    if !covers(width, height, x, y) {
        return f32::NAN;
    }

    let xi = x.floor() as i64;
    let yi = y.floor() as i64;

    let xf = (x - xi as f64) as f32;
    let yf = (y - yi as f64) as f32;

    // Sample 4x4 grid of points
    let mut values = [[0.0f32; 4]; 4];

    for j in 0..4i64 {
        for i in 0..4i64 {
            let px = (xi + i - 1).clamp(0, width as i64 - 1) as usize;
            let py = (yi + j - 1).clamp(0, height as i64 - 1) as usize;
            let v = data[py * width + px];

            // If any value is NaN, fall back to bilinear
            if v.is_nan() {
                return bilinear_interpolate(data, width, height, x, y);
            }
            values[j as usize][i as usize] = v;
        }
    }

    // Cubic interpolation along x for each row
    let mut row_values = [0.0f32; 4];
    for j in 0..4 {
        row_values[j] = cubic_1d(values[j][0], values[j][1], values[j][2], values[j][3], xf);
    }

    // Cubic interpolation along y
    cubic_1d(row_values[0], row_values[1], row_values[2], row_values[3], yf)
}

/// 1D cubic interpolation using Catmull-Rom spline.
fn cubic_1d(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;

    // Catmull-Rom coefficients
    let a = -0.5 * p0 + 1.5 * p1 - 1.5 * p2 + 0.5 * p3;
    let b = p0 - 2.5 * p1 + 2.0 * p2 - 0.5 * p3;
    let c = -0.5 * p0 + 0.5 * p2;
    let d = p1;

    a * t3 + b * t2 + c * t + d
}

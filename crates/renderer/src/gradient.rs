//! Color ramps and value scales for difference maps.

use image::Rgba;

/// Color value in RGBA format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn transparent() -> Self {
        Self { r: 0, g: 0, b: 0, a: 0 }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl From<Color> for Rgba<u8> {
    fn from(color: Color) -> Self {
        Rgba(color.to_array())
    }
}

/// Linear color interpolation
pub fn interpolate_color(color1: Color, color2: Color, t: f32) -> Color {
    let t = t.clamp(0.0, 1.0);
    let t_inv = 1.0 - t;
    let mix = |a: u8, b: u8| ((a as f32 * t_inv) + (b as f32 * t)).round() as u8;

    Color::new(
        mix(color1.r, color2.r),
        mix(color1.g, color2.g),
        mix(color1.b, color2.b),
        mix(color1.a, color2.a),
    )
}

/// Piecewise-linear color ramp over normalized positions `0..=1`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorRamp {
    stops: Vec<(f32, Color)>,
}

impl ColorRamp {
    /// Ramp from evenly spaced colors.
    pub fn evenly_spaced(colors: &[Color]) -> Self {
        let last = colors.len().saturating_sub(1).max(1) as f32;
        Self {
            stops: colors
                .iter()
                .enumerate()
                .map(|(i, &c)| (i as f32 / last, c))
                .collect(),
        }
    }

    /// Diverging blue → white → red ramp (ColorBrewer RdBu, reversed), so
    /// surface lowering is blue and thickening is red.
    pub fn rdbu_r() -> Self {
        Self::evenly_spaced(&[
            Color::rgb(5, 48, 97),
            Color::rgb(33, 102, 172),
            Color::rgb(67, 147, 195),
            Color::rgb(146, 197, 222),
            Color::rgb(209, 229, 240),
            Color::rgb(247, 247, 247),
            Color::rgb(253, 219, 199),
            Color::rgb(244, 165, 130),
            Color::rgb(214, 96, 77),
            Color::rgb(178, 24, 43),
            Color::rgb(103, 0, 31),
        ])
    }

    /// Perceptually uniform sequential ramp (viridis).
    pub fn viridis() -> Self {
        Self::evenly_spaced(&[
            Color::rgb(68, 1, 84),
            Color::rgb(71, 45, 123),
            Color::rgb(59, 82, 139),
            Color::rgb(44, 114, 142),
            Color::rgb(33, 145, 140),
            Color::rgb(40, 174, 128),
            Color::rgb(94, 201, 98),
            Color::rgb(173, 220, 48),
            Color::rgb(253, 231, 37),
        ])
    }

    /// Color at normalized position `t` (clamped to `0..=1`).
    pub fn color_at(&self, t: f32) -> Color {
        let Some(&(_, first)) = self.stops.first() else {
            return Color::transparent();
        };
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };

        let mut previous = (0.0, first);
        for &(position, color) in &self.stops {
            if t <= position {
                let span = position - previous.0;
                if span <= 0.0 {
                    return color;
                }
                return interpolate_color(previous.1, color, (t - previous.0) / span);
            }
            previous = (position, color);
        }
        previous.1
    }
}

/// Value range mapped onto a color ramp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    pub min: f32,
    pub max: f32,
}

impl ColorScale {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// `[-m, m]` with `m` the largest absolute bound among `ranges`.
    ///
    /// Returns `None` when `ranges` is empty.
    pub fn symmetric_from_ranges<I>(ranges: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f32, f32)>,
    {
        ranges
            .into_iter()
            .map(|(lo, hi)| lo.abs().max(hi.abs()))
            .reduce(f32::max)
            .map(|abs_max| Self::new(-abs_max, abs_max))
    }

    pub fn is_symmetric(&self) -> bool {
        self.min == -self.max
    }

    /// Position of `value` on the scale, clamped to `0..=1`.
    ///
    /// A degenerate scale maps everything to the middle.
    #[inline]
    pub fn normalize(&self, value: f32) -> f32 {
        let range = self.max - self.min;
        if !(range > 0.0) {
            return 0.5;
        }
        ((value - self.min) / range).clamp(0.0, 1.0)
    }

    /// Value at normalized position `t`.
    pub fn value_at(&self, t: f32) -> f32 {
        self.min + (self.max - self.min) * t
    }
}

/// Render grid data as a color-mapped RGBA image.
///
/// NaN cells are written fully transparent.
///
/// # Arguments
/// - `data`: 2D grid of values (row-major order)
/// - `width`: Number of columns
/// - `height`: Number of rows
/// - `scale`: Value range mapped onto the ramp
/// - `ramp`: Colors for normalized values
///
/// # Returns
/// RGBA pixel data (4 bytes per pixel)
pub fn render_grid(
    data: &[f32],
    width: usize,
    height: usize,
    scale: &ColorScale,
    ramp: &ColorRamp,
) -> Vec<u8> {
    let mut pixels = vec![0u8; width * height * 4];

    for (idx, &value) in data.iter().take(width * height).enumerate() {
        if value.is_nan() {
            continue;
        }
        let color = ramp.color_at(scale.normalize(value));
        pixels[idx * 4..idx * 4 + 4].copy_from_slice(&color.to_array());
    }

    pixels
}

//! Comparison figures: difference maps side by side on one color scale.
//!
//! Layout of a comparison figure:
//!
//! ```text
//! +-----------------------------------------------------------+
//! |  margin                                                   |
//! |  title 1          title 2          title 3                |
//! |  [panel 1]  gap  [panel 2]  gap  [panel 3]  gap  [cb]- 10  |
//! |                                                  [cb]-  0  |
//! |                                                  [cb]- -10 |
//! +-----------------------------------------------------------+
//! ```
//!
//! Every panel samples the same map extent (the union of all inputs) so
//! features line up across panels. The color bar spans 80% of the panel
//! height, is labelled at both ends and carries a tick and label at zero.

use dem_common::{BoundingBox, Raster};
use image::RgbaImage;
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use rusttype::{Font, Scale};
use tracing::{debug, warn};

use crate::gradient::{render_grid, Color, ColorRamp, ColorScale};
use crate::text::{draw_label, format_tick, load_font, text_width};
use crate::{RenderError, Result};

/// Fraction of the panel height covered by the color bar.
const COLORBAR_SHRINK: f64 = 0.8;

/// Length of the zero tick beyond the color bar, in pixels.
const TICK_LENGTH: usize = 6;

/// Space between a tick and its label.
const LABEL_PAD: usize = 2;

/// Figure geometry in output pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct FigureOptions {
    /// Length of the longer side of each panel.
    pub panel_size: usize,
    pub margin: usize,
    /// Space between panels and before the color bar.
    pub gap: usize,
    pub colorbar_width: usize,
    /// Band above the panels holding their titles; 0 disables titles.
    pub title_height: usize,
    /// Column right of the color bar holding tick labels; 0 disables them.
    pub label_width: usize,
    pub font_size: f32,
    /// Rasters beyond this many are left out of comparison figures.
    pub max_panels: usize,
    pub background: Color,
    pub tick_color: Color,
    pub text_color: Color,
}

impl Default for FigureOptions {
    fn default() -> Self {
        Self {
            panel_size: 400,
            margin: 16,
            gap: 16,
            colorbar_width: 24,
            title_height: 24,
            label_width: 64,
            font_size: 14.0,
            max_panels: 3,
            background: Color::transparent(),
            tick_color: Color::rgb(0, 0, 0),
            text_color: Color::rgb(0, 0, 0),
        }
    }
}

/// A raster with the title drawn above it.
#[derive(Debug, Clone, Copy)]
pub struct Panel<'a> {
    pub title: &'a str,
    pub raster: &'a Raster,
}

impl<'a> Panel<'a> {
    pub fn new(title: &'a str, raster: &'a Raster) -> Self {
        Self { title, raster }
    }
}

impl<'a> From<&'a Raster> for Panel<'a> {
    fn from(raster: &'a Raster) -> Self {
        Self { title: "", raster }
    }
}

/// Shared `[-m, m]` scale over the valid pixels of all rasters.
///
/// `None` when no raster has a valid pixel.
pub fn symmetric_scale(rasters: &[&Raster]) -> Option<ColorScale> {
    ColorScale::symmetric_from_ranges(rasters.iter().filter_map(|r| r.value_range()))
}

/// Render up to `options.max_panels` panels left to right on a shared
/// symmetric diverging scale with one labelled color bar.
pub fn render_comparison(panels: &[Panel<'_>], options: &FigureOptions) -> Result<RgbaImage> {
    if panels.is_empty() {
        return Err(RenderError::InvalidInput("no rasters to render".to_string()));
    }
    if options.max_panels == 0 {
        return Err(RenderError::InvalidInput(
            "max_panels must be at least 1".to_string(),
        ));
    }

    let shown = &panels[..panels.len().min(options.max_panels)];
    if shown.len() < panels.len() {
        warn!(
            total = panels.len(),
            shown = shown.len(),
            "Too many rasters for one figure, extra panels dropped"
        );
    }

    let crs = shown[0].raster.grid.crs;
    if shown.iter().any(|p| p.raster.grid.crs != crs) {
        warn!("Panels use different CRSs, the shared extent mixes coordinates");
    }

    let rasters: Vec<&Raster> = shown.iter().map(|p| p.raster).collect();
    let scale = symmetric_scale(&rasters).unwrap_or_else(|| {
        warn!("No valid pixels in any raster, using a unit scale");
        ColorScale::new(-1.0, 1.0)
    });

    let extent = rasters
        .iter()
        .map(|r| r.grid.bbox())
        .reduce(|a, b| a.union(&b))
        .ok_or_else(|| RenderError::InvalidInput("no rasters to render".to_string()))?;

    let image = compose(shown, &extent, &scale, &ColorRamp::rdbu_r(), options)?;

    debug!(
        panels = shown.len(),
        min = scale.min,
        max = scale.max,
        width = image.width(),
        height = image.height(),
        "Rendered comparison figure"
    );

    Ok(image)
}

/// Render one raster on its own `[min, max]` with a sequential ramp.
pub fn render_single(panel: Panel<'_>, options: &FigureOptions) -> Result<RgbaImage> {
    let raster = panel.raster;
    let scale = match raster.value_range() {
        Some((min, max)) => ColorScale::new(min, max),
        None => {
            warn!(grid = %raster.grid.describe(), "Raster has no valid pixels");
            ColorScale::new(0.0, 1.0)
        }
    };

    compose(
        &[panel],
        &raster.grid.bbox(),
        &scale,
        &ColorRamp::viridis(),
        options,
    )
}

/// Panel dimensions preserving the extent's aspect ratio.
fn panel_dimensions(extent: &BoundingBox, panel_size: usize) -> (usize, usize) {
    let (w, h) = (extent.width(), extent.height());
    if !(w > 0.0 && h > 0.0) {
        return (panel_size, panel_size);
    }
    if w >= h {
        let ph = (panel_size as f64 * h / w).round() as usize;
        (panel_size, ph.max(1))
    } else {
        let pw = (panel_size as f64 * w / h).round() as usize;
        (pw.max(1), panel_size)
    }
}

/// Resample a raster onto a `width x height` view of `extent`.
///
/// Cells outside the raster or on nodata are NaN.
fn sample_panel(raster: &Raster, extent: &BoundingBox, width: usize, height: usize) -> Vec<f32> {
    let dx = extent.width() / width as f64;
    let dy = extent.height() / height as f64;

    let mut values = vec![f32::NAN; width * height];
    for py in 0..height {
        let y = extent.max_y - (py as f64 + 0.5) * dy;
        for px in 0..width {
            let x = extent.min_x + (px as f64 + 0.5) * dx;
            if let Some(value) = raster
                .grid
                .pixel_at(x, y)
                .and_then(|(col, row)| raster.get(col, row))
            {
                values[py * width + px] = value;
            }
        }
    }
    values
}

fn dimension(value: usize) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| RenderError::InvalidInput(format!("figure dimension {} too large", value)))
}

fn compose(
    panels: &[Panel<'_>],
    extent: &BoundingBox,
    scale: &ColorScale,
    ramp: &ColorRamp,
    options: &FigureOptions,
) -> Result<RgbaImage> {
    if options.panel_size == 0 || options.colorbar_width == 0 {
        return Err(RenderError::InvalidInput(
            "panel_size and colorbar_width must be positive".to_string(),
        ));
    }

    let (pw, ph) = panel_dimensions(extent, options.panel_size);
    let n = panels.len();

    let top = options.margin + options.title_height;
    let colorbar_x = options.margin + n * (pw + options.gap);
    let width =
        colorbar_x + options.colorbar_width + TICK_LENGTH + options.label_width + options.margin;
    let height = top + ph + options.margin;

    let mut image =
        RgbaImage::from_pixel(dimension(width)?, dimension(height)?, options.background.into());

    let font = if options.title_height > 0 || options.label_width > 0 {
        load_font()
    } else {
        None
    };

    for (i, panel) in panels.iter().enumerate() {
        let x = options.margin + i * (pw + options.gap);
        let values = sample_panel(panel.raster, extent, pw, ph);
        let pixels = render_grid(&values, pw, ph, scale, ramp);
        let tile = RgbaImage::from_raw(dimension(pw)?, dimension(ph)?, pixels)
            .ok_or_else(|| RenderError::InvalidInput("panel buffer size mismatch".to_string()))?;
        paste(&mut image, &tile, x as u32, top as u32);

        if let Some(font) = font.as_ref().filter(|_| options.title_height > 0) {
            draw_title(&mut image, font, panel.title, x, pw, options);
        }
    }

    let labels = font.as_ref().filter(|_| options.label_width > 0);
    draw_colorbar(&mut image, labels, colorbar_x, top, ph, scale, ramp, options);

    Ok(image)
}

/// Copy `tile` onto `image`; fully transparent tile pixels keep the
/// background.
fn paste(image: &mut RgbaImage, tile: &RgbaImage, x: u32, y: u32) {
    for (tx, ty, pixel) in tile.enumerate_pixels() {
        if pixel[3] > 0 {
            image.put_pixel(x + tx, y + ty, *pixel);
        }
    }
}

/// Title centered over its panel, left-aligned when wider than the panel.
fn draw_title(
    image: &mut RgbaImage,
    font: &Font<'_>,
    title: &str,
    panel_x: usize,
    panel_width: usize,
    options: &FigureOptions,
) {
    let text_w = text_width(font, Scale::uniform(options.font_size), title);
    let slack = panel_width as i32 - text_w;
    let x = panel_x as i32 + slack.max(0) / 2;
    let y = (options.margin as f32 + (options.title_height as f32 - options.font_size) / 2.0)
        .max(0.0) as i32;
    draw_label(
        image,
        font,
        options.font_size,
        options.text_color.into(),
        x,
        y,
        title,
    );
}

/// Vertical color bar centered on the panel row, high values on top.
#[allow(clippy::too_many_arguments)]
fn draw_colorbar(
    image: &mut RgbaImage,
    font: Option<&Font<'_>>,
    x: usize,
    top: usize,
    panel_height: usize,
    scale: &ColorScale,
    ramp: &ColorRamp,
    options: &FigureOptions,
) {
    let bar_height = ((panel_height as f64 * COLORBAR_SHRINK).round() as usize).clamp(1, panel_height);
    let bar_top = top + (panel_height - bar_height) / 2;

    for row in 0..bar_height {
        let t = 1.0 - (row as f32 + 0.5) / bar_height as f32;
        draw_filled_rect_mut(
            image,
            Rect::at(x as i32, (bar_top + row) as i32).of_size(options.colorbar_width as u32, 1),
            ramp.color_at(t).into(),
        );
    }

    let mut ticks = vec![(0, scale.max), (bar_height - 1, scale.min)];

    if scale.min < 0.0 && scale.max > 0.0 {
        let t = scale.normalize(0.0);
        let row = (((1.0 - t) * bar_height as f32) as usize).min(bar_height - 1);
        draw_filled_rect_mut(
            image,
            Rect::at(x as i32, (bar_top + row) as i32)
                .of_size((options.colorbar_width + TICK_LENGTH) as u32, 1),
            options.tick_color.into(),
        );
        ticks.push((row, 0.0));
    }

    let Some(font) = font else {
        return;
    };
    let label_x = (x + options.colorbar_width + TICK_LENGTH + LABEL_PAD) as i32;
    for (row, value) in ticks {
        let y = (bar_top + row) as i32 - (options.font_size / 2.0) as i32;
        draw_label(
            image,
            font,
            options.font_size,
            options.text_color.into(),
            label_x,
            y,
            &format_tick(value),
        );
    }
}

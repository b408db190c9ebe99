//! Text drawing for panel titles and color bar labels.

use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use rusttype::{point, Font, Scale};

/// DejaVu Sans Mono, see `assets/DejaVu-LICENSE`.
const FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSansMono.ttf");

/// Parse the embedded font.
pub fn load_font() -> Option<Font<'static>> {
    let font = Font::try_from_bytes(FONT_DATA);
    if font.is_none() {
        tracing::warn!("Failed to load font, figure text will be omitted");
    }
    font
}

/// Horizontal extent of `text` in pixels.
pub fn text_width(font: &Font<'_>, scale: Scale, text: &str) -> i32 {
    font.layout(text, scale, point(0.0, 0.0))
        .filter_map(|glyph| glyph.pixel_bounding_box())
        .map(|bb| bb.max.x)
        .max()
        .unwrap_or(0)
}

/// Draw `text` with its top-left corner at `(x, y)`.
///
/// Glyphs falling outside the image are clipped.
pub fn draw_label(
    image: &mut RgbaImage,
    font: &Font<'_>,
    font_size: f32,
    color: Rgba<u8>,
    x: i32,
    y: i32,
    text: &str,
) {
    if text.is_empty() || font_size <= 0.0 {
        return;
    }
    draw_text_mut(image, color, x, y, Scale::uniform(font_size), font, text);
}

/// Compact tick label: integers without decimals, fewer decimals for
/// larger magnitudes.
pub fn format_tick(value: f32) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs();
    let text = if magnitude >= 100.0 {
        format!("{:.0}", value)
    } else if magnitude >= 10.0 {
        format!("{:.1}", value)
    } else {
        format!("{:.2}", value)
    };
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

//! Tests for color ramps, scales, and grid coloring.

use renderer::gradient::{render_grid, Color, ColorRamp, ColorScale};

// ============================================================================
// ColorScale tests
// ============================================================================

#[test]
fn test_symmetric_scale_uses_largest_magnitude() {
    let scale = ColorScale::symmetric_from_ranges([(-5.0, 10.0), (-2.0, 8.0)]).unwrap();
    assert_eq!(scale.min, -10.0);
    assert_eq!(scale.max, 10.0);

    // Negative side dominates
    let scale = ColorScale::symmetric_from_ranges([(-42.0, 3.0)]).unwrap();
    assert_eq!((scale.min, scale.max), (-42.0, 42.0));
}

#[test]
fn test_zero_maps_to_center_of_symmetric_scale() {
    let scale = ColorScale::symmetric_from_ranges([(-1.0, 7.5)]).unwrap();
    assert_eq!(scale.normalize(0.0), 0.5);
    assert_eq!(scale.normalize(-7.5), 0.0);
    assert_eq!(scale.normalize(7.5), 1.0);
}

#[test]
fn test_normalize_clamps_out_of_range() {
    let scale = ColorScale::new(0.0, 10.0);
    assert_eq!(scale.normalize(-5.0), 0.0);
    assert_eq!(scale.normalize(25.0), 1.0);
    assert_eq!(scale.normalize(2.5), 0.25);
    assert_eq!(scale.value_at(0.25), 2.5);
}

// ============================================================================
// ColorRamp tests
// ============================================================================

#[test]
fn test_diverging_ramp_red_is_positive() {
    let ramp = ColorRamp::rdbu_r();
    let low = ramp.color_at(0.05);
    let high = ramp.color_at(0.95);

    assert!(low.b > low.r, "low end should be blue: {:?}", low);
    assert!(high.r > high.b, "high end should be red: {:?}", high);
}

#[test]
fn test_ramp_interpolates_between_stops() {
    let ramp = ColorRamp::evenly_spaced(&[Color::rgb(0, 0, 0), Color::rgb(200, 100, 0)]);
    assert_eq!(ramp.color_at(0.5), Color::rgb(100, 50, 0));
    assert_eq!(ramp.color_at(-1.0), Color::rgb(0, 0, 0));
    assert_eq!(ramp.color_at(f32::NAN), Color::rgb(0, 0, 0));
}

#[test]
fn test_viridis_endpoints() {
    let ramp = ColorRamp::viridis();
    assert_eq!(ramp.color_at(0.0), Color::rgb(68, 1, 84));
    assert_eq!(ramp.color_at(1.0), Color::rgb(253, 231, 37));
}

// ============================================================================
// render_grid tests
// ============================================================================

#[test]
fn test_render_grid_nan_is_transparent() {
    let data = [-10.0, 0.0, f32::NAN, 10.0];
    let scale = ColorScale::new(-10.0, 10.0);
    let pixels = render_grid(&data, 2, 2, &scale, &ColorRamp::rdbu_r());

    assert_eq!(pixels.len(), 16);
    assert_eq!(&pixels[0..4], &[5, 48, 97, 255]);
    assert_eq!(&pixels[4..8], &[247, 247, 247, 255]);
    assert_eq!(&pixels[8..12], &[0, 0, 0, 0]);
    assert_eq!(&pixels[12..16], &[103, 0, 31, 255]);
}

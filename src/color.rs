//! HSL color math shared by the raster and vector generators.

use crate::rng::SeedRng;

/// Converts an HSL triple to 8-bit RGB.
///
/// `hue` is in degrees (0-359), `saturation` and `lightness` are
/// percentages (0-100). Out-of-range saturation and lightness are clamped.
///
/// ```
/// use avatar_forge::color::hsl_to_rgb;
///
/// assert_eq!(hsl_to_rgb(0, 100, 50), (255, 0, 0));
/// assert_eq!(hsl_to_rgb(0, 0, 100), (255, 255, 255));
/// ```
pub fn hsl_to_rgb(hue: u16, saturation: u8, lightness: u8) -> (u8, u8, u8) {
    let h = f64::from(hue % 360);
    let s = f64::from(saturation.min(100)) / 100.0;
    let l = f64::from(lightness.min(100)) / 100.0;
    let a = s * l.min(1.0 - l);

    let channel = |n: f64| -> u8 {
        let k = (n + h / 30.0).rem_euclid(12.0);
        let value = l - a * (k - 3.0).min(9.0 - k).min(1.0).max(-1.0);
        (value * 255.0).round().clamp(0.0, 255.0) as u8
    };

    (channel(0.0), channel(8.0), channel(4.0))
}

/// Maps a hue in [-360, 360] onto [0, 359].
///
/// Negative hues are shifted by a full turn first, so -10 and 350 are the
/// same color.
pub fn normalize_hue(hue: i32) -> u16 {
    let shifted = if hue < 0 { hue + 360 } else { hue };
    shifted.rem_euclid(360) as u16
}

/// Formats an RGB triple as a lowercase `#rrggbb` string.
pub fn to_hex((r, g, b): (u8, u8, u8)) -> String {
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

/// Draws a saturated, mid-lightness color from `rng`.
pub fn bright_color(rng: &mut SeedRng) -> (u8, u8, u8) {
    let hue = rng.range_inclusive(0, 359) as u16;
    let saturation = rng.range_inclusive(75, 100) as u8;
    let lightness = rng.range_inclusive(45, 60) as u8;
    hsl_to_rgb(hue, saturation, lightness)
}

/// Draws a pale, high-lightness color from `rng`.
pub fn light_color(rng: &mut SeedRng) -> (u8, u8, u8) {
    let hue = rng.range_inclusive(0, 359) as u16;
    let saturation = rng.range_inclusive(30, 70) as u8;
    let lightness = rng.range_inclusive(85, 95) as u8;
    hsl_to_rgb(hue, saturation, lightness)
}

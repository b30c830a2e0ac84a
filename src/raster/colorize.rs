//! Recoloring of grayscale or tinted part layers.
//!
//! Each visible pixel keeps its lightness and alpha and takes the requested
//! hue and saturation. Most parts are drawn in a single flat color, so before
//! walking the image pixel by pixel the layer is checked for uniformity; a
//! uniform layer is recolored by converting that one color once and writing
//! the result back to every visible pixel.

use image::RgbaImage;
use palette::{Hsl, IntoColor, RgbHue, Srgb};

/// Which path [`colorize`] took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorizePath {
    /// The layer has no visible pixels.
    Empty,
    /// All visible pixels shared one color, converted once.
    SingleColor,
    /// Pixels were converted individually.
    PerPixel,
}

/// Recolors every visible pixel of `image` to `hue` (degrees) and
/// `saturation` (percent), preserving lightness and alpha.
pub fn colorize(image: &mut RgbaImage, hue: u16, saturation: u8) -> ColorizePath {
    match uniform_color(image) {
        Uniformity::Empty => ColorizePath::Empty,
        Uniformity::Single(rgb) => {
            let [r, g, b] = recolor(rgb, hue, saturation);
            for pixel in image.pixels_mut() {
                if pixel[3] != 0 {
                    pixel.0 = [r, g, b, pixel[3]];
                }
            }
            ColorizePath::SingleColor
        }
        Uniformity::Mixed => {
            colorize_per_pixel(image, hue, saturation);
            ColorizePath::PerPixel
        }
    }
}

/// The general path: converts each visible pixel on its own.
pub(crate) fn colorize_per_pixel(image: &mut RgbaImage, hue: u16, saturation: u8) {
    for pixel in image.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        if a == 0 {
            continue;
        }
        let [r, g, b] = recolor([r, g, b], hue, saturation);
        pixel.0 = [r, g, b, a];
    }
}

enum Uniformity {
    Empty,
    Single([u8; 3]),
    Mixed,
}

fn uniform_color(image: &RgbaImage) -> Uniformity {
    let mut visible = image.pixels().filter(|p| p[3] != 0);
    let Some(first) = visible.next() else {
        return Uniformity::Empty;
    };
    let rgb = [first[0], first[1], first[2]];
    if visible.all(|p| [p[0], p[1], p[2]] == rgb) {
        Uniformity::Single(rgb)
    } else {
        Uniformity::Mixed
    }
}

fn recolor([r, g, b]: [u8; 3], hue: u16, saturation: u8) -> [u8; 3] {
    let rgb = Srgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0);
    let mut hsl: Hsl = rgb.into_color();
    hsl.hue = RgbHue::from_degrees(f32::from(hue % 360));
    hsl.saturation = f32::from(saturation.min(100)) / 100.0;
    let out: Srgb = hsl.into_color();

    let to_u8 = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    [to_u8(out.red), to_u8(out.green), to_u8(out.blue)]
}

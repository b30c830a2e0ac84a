//! Vector avatars and SVG rasterization.
//!
//! Vector generators produce SVG markup. When a raster format is requested
//! the markup is rendered with resvg and handed to the stream codec like any
//! raster avatar.

pub mod bitmap;
pub mod fragments;

use crate::error::{AvatarError, AvatarResult};
use image::{Rgba, RgbaImage};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{Options, Tree};

/// Renders SVG markup to an RGBA image of exactly `width` x `height` pixels,
/// stretching the document's viewport to fill it.
pub fn rasterize(svg_data: &str, width: u32, height: u32) -> AvatarResult<RgbaImage> {
    let opts = Options::default();
    let tree = Tree::from_str(svg_data, &opts)
        .map_err(|e| AvatarError::codec(format!("parsing SVG: {e}")))?;

    let svg_size = tree.size();
    let sx = width as f32 / svg_size.width();
    let sy = height as f32 / svg_size.height();

    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| AvatarError::codec(format!("cannot allocate {width}x{height} pixmap")))?;
    resvg::render(&tree, Transform::from_scale(sx, sy), &mut pixmap.as_mut());

    Ok(pixmap_to_rgba_image(&pixmap))
}

/// Converts a tiny_skia Pixmap to an image::RgbaImage.
fn pixmap_to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let width = pixmap.width();
    let height = pixmap.height();
    let mut img = RgbaImage::new(width, height);

    for (i, pixel) in pixmap.pixels().iter().enumerate() {
        let x = i as u32 % width;
        let y = i as u32 / width;
        // tiny_skia stores premultiplied alpha
        let (r, g, b, a) = unpremultiply(pixel.red(), pixel.green(), pixel.blue(), pixel.alpha());
        img.put_pixel(x, y, Rgba([r, g, b, a]));
    }

    img
}

fn unpremultiply(r: u8, g: u8, b: u8, a: u8) -> (u8, u8, u8, u8) {
    if a == 0 {
        (0, 0, 0, 0)
    } else {
        let a_f = a as f32 / 255.0;
        (
            (r as f32 / a_f).round().min(255.0) as u8,
            (g as f32 / a_f).round().min(255.0) as u8,
            (b as f32 / a_f).round().min(255.0) as u8,
            a,
        )
    }
}

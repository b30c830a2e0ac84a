//! Alpha compositing of part layers.

use image::{Rgba, RgbaImage};

/// Composites the top-left `width` x `height` region of `src` onto `dest`
/// at the origin using source-over blending.
///
/// The region is clipped to both images.
pub fn composite_over(dest: &mut RgbaImage, src: &RgbaImage, width: u32, height: u32) {
    let width = width.min(src.width()).min(dest.width());
    let height = height.min(src.height()).min(dest.height());

    for y in 0..height {
        for x in 0..width {
            let src_pixel = *src.get_pixel(x, y);
            if src_pixel[3] == 0 {
                continue;
            }
            let dst_pixel = *dest.get_pixel(x, y);
            dest.put_pixel(x, y, alpha_blend(src_pixel, dst_pixel));
        }
    }
}

/// Copies the top-left region of `src` onto `dest` without blending.
pub fn copy_region(dest: &mut RgbaImage, src: &RgbaImage, width: u32, height: u32) {
    let width = width.min(src.width()).min(dest.width());
    let height = height.min(src.height()).min(dest.height());

    for y in 0..height {
        for x in 0..width {
            dest.put_pixel(x, y, *src.get_pixel(x, y));
        }
    }
}

/// Alpha blends two RGBA pixels (source over destination).
fn alpha_blend(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let sa = src[3] as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;

    let out_a = sa + da * (1.0 - sa);

    if out_a == 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend = |s: u8, d: u8| -> u8 {
        let sf = s as f32 / 255.0;
        let df = d as f32 / 255.0;
        let out = (sf * sa + df * da * (1.0 - sa)) / out_a;
        (out * 255.0).round() as u8
    };

    Rgba([
        blend(src[0], dst[0]),
        blend(src[1], dst[1]),
        blend(src[2], dst[2]),
        (out_a * 255.0).round() as u8,
    ])
}

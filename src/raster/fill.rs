//! Flood fill.

use crate::error::{AvatarError, AvatarResult};
use image::{Rgba, RgbaImage};

/// Replaces the 4-connected region of pixels matching the color at `(x, y)`
/// with `color`.
pub fn flood_fill(image: &mut RgbaImage, x: u32, y: u32, color: Rgba<u8>) -> AvatarResult<()> {
    if x >= image.width() || y >= image.height() {
        return Err(AvatarError::composition(format!(
            "fill origin ({x}, {y}) outside {}x{} canvas",
            image.width(),
            image.height()
        )));
    }

    let target = *image.get_pixel(x, y);
    if target == color {
        return Ok(());
    }

    let (width, height) = image.dimensions();
    let mut stack = vec![(x, y)];
    while let Some((px, py)) = stack.pop() {
        if *image.get_pixel(px, py) != target {
            continue;
        }
        image.put_pixel(px, py, color);

        if px > 0 {
            stack.push((px - 1, py));
        }
        if px + 1 < width {
            stack.push((px + 1, py));
        }
        if py > 0 {
            stack.push((px, py - 1));
        }
        if py + 1 < height {
            stack.push((px, py + 1));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    #[test]
    fn fills_whole_uniform_canvas() {
        let mut img = RgbaImage::from_pixel(8, 8, WHITE);
        flood_fill(&mut img, 3, 3, RED).unwrap();
        assert!(img.pixels().all(|p| *p == RED));
    }

    #[test]
    fn stops_at_boundary() {
        // A vertical black wall at x = 4 splits the canvas.
        let mut img = RgbaImage::from_pixel(9, 5, WHITE);
        for y in 0..5 {
            img.put_pixel(4, y, BLACK);
        }
        flood_fill(&mut img, 0, 0, RED).unwrap();

        assert_eq!(*img.get_pixel(3, 4), RED);
        assert_eq!(*img.get_pixel(4, 2), BLACK);
        assert_eq!(*img.get_pixel(5, 0), WHITE);
    }

    #[test]
    fn does_not_leak_diagonally() {
        let mut img = RgbaImage::from_pixel(2, 2, WHITE);
        img.put_pixel(1, 0, BLACK);
        img.put_pixel(0, 1, BLACK);
        flood_fill(&mut img, 0, 0, RED).unwrap();
        assert_eq!(*img.get_pixel(1, 1), WHITE);
    }

    #[test]
    fn same_color_is_a_no_op() {
        let mut img = RgbaImage::from_pixel(3, 3, RED);
        flood_fill(&mut img, 1, 1, RED).unwrap();
        assert!(img.pixels().all(|p| *p == RED));
    }

    #[test]
    fn origin_outside_canvas_fails() {
        let mut img = RgbaImage::from_pixel(3, 3, WHITE);
        let err = flood_fill(&mut img, 3, 0, RED).unwrap_err();
        assert!(matches!(err, AvatarError::Composition(_)));
    }
}

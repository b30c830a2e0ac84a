//! Pixel geometry used by the compositor and the render output adapter.

/// A rectangle defined in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RectPx {
    /// X offset from the left edge of the image
    pub x: u32,
    /// Y offset from the top edge of the image
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl RectPx {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Creates a rectangle starting at origin (0, 0) with the given dimensions.
    pub fn from_size(size: SizePx) -> Self {
        Self {
            x: 0,
            y: 0,
            width: size.width,
            height: size.height,
        }
    }

    /// Returns the right edge coordinate (x + width).
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Returns the bottom edge coordinate (y + height).
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn size(&self) -> SizePx {
        SizePx::new(self.width, self.height)
    }
}

/// A 2D size in pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizePx {
    pub width: u32,
    pub height: u32,
}

impl SizePx {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A square of `side` pixels.
    pub fn square(side: u32) -> Self {
        Self::new(side, side)
    }

    /// Returns true if width equals height.
    pub fn is_square(&self) -> bool {
        self.width == self.height
    }

    /// Returns true if either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Computes the largest rectangle with the aspect ratio of `target` that fits
/// inside `source`, centered on both axes.
///
/// Cropping to this rectangle and then scaling it to `target` reaches the
/// exact target size without distortion, whether the result is larger or
/// smaller than the source.
pub fn centered_crop(source: SizePx, target: SizePx) -> RectPx {
    if source.is_empty() || target.is_empty() {
        return RectPx::default();
    }

    let (sw, sh) = (u64::from(source.width), u64::from(source.height));
    let (tw, th) = (u64::from(target.width), u64::from(target.height));

    let (cw, ch) = if sw * th > sh * tw {
        // Source is wider than the target ratio: keep full height.
        (((sh * tw) as f64 / th as f64).round() as u64, sh)
    } else {
        (sw, ((sw * th) as f64 / tw as f64).round() as u64)
    };
    let cw = cw.clamp(1, sw) as u32;
    let ch = ch.clamp(1, sh) as u32;

    RectPx::new(
        (source.width - cw) / 2,
        (source.height - ch) / 2,
        cw,
        ch,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_px_new() {
        let rect = RectPx::new(10, 20, 100, 200);
        assert_eq!(rect.right(), 110);
        assert_eq!(rect.bottom(), 220);
        assert_eq!(rect.size(), SizePx::new(100, 200));
    }

    #[test]
    fn size_px_predicates() {
        assert!(SizePx::square(100).is_square());
        assert!(!SizePx::new(100, 200).is_square());
        assert!(SizePx::new(0, 10).is_empty());
    }

    #[test]
    fn crop_square_from_landscape() {
        let rect = centered_crop(SizePx::new(200, 100), SizePx::square(50));
        assert_eq!(rect, RectPx::new(50, 0, 100, 100));
    }

    #[test]
    fn crop_square_from_portrait() {
        let rect = centered_crop(SizePx::new(80, 120), SizePx::square(300));
        assert_eq!(rect, RectPx::new(0, 20, 80, 80));
    }

    #[test]
    fn crop_same_ratio_keeps_everything() {
        let source = SizePx::square(120);
        assert_eq!(centered_crop(source, SizePx::square(512)), RectPx::from_size(source));
    }

    #[test]
    fn crop_wide_target() {
        let rect = centered_crop(SizePx::square(100), SizePx::new(200, 100));
        assert_eq!(rect, RectPx::new(0, 25, 100, 50));
    }

    #[test]
    fn crop_of_empty_is_empty() {
        assert_eq!(
            centered_crop(SizePx::new(0, 10), SizePx::square(5)),
            RectPx::default()
        );
    }
}

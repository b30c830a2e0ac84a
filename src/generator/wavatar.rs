//! Wavatars: a colored face with features, every choice read from the seed.
//!
//! The seed's hex digits are read at fixed offsets, two digits each:
//!
//! ```text
//! offset  1  face (mask and shine)
//! offset  3  background hue
//! offset  5  fade
//! offset  7  face hue
//! offset  9  brow
//! offset 11  eyes
//! offset 13  pupils
//! offset 15  mouth
//! ```

use super::{Generator, OutputFormat, RenderedImage, base_size, encode_raster, require_raster};
use crate::error::AvatarResult;
use crate::parts::{DigitSelector, PartCatalogProvider, select_parts};
use crate::raster::{Canvas, CanvasKind, RgbaCanvas, load_layers};

/// Layering order, back to front.
pub const CATEGORIES: [&str; 7] = ["fade", "mask", "shine", "brow", "eyes", "pupils", "mouth"];

const OFFSETS: [(&str, usize); 7] = [
    ("mask", 1),
    ("shine", 1),
    ("fade", 5),
    ("brow", 9),
    ("eyes", 11),
    ("pupils", 13),
    ("mouth", 15),
];

const BACKGROUND_HUE_OFFSET: usize = 3;
const FACE_HUE_OFFSET: usize = 7;
const DIGITS: usize = 2;

pub struct WavatarGenerator {
    parts: Box<dyn PartCatalogProvider>,
}

impl WavatarGenerator {
    pub fn new(parts: Box<dyn PartCatalogProvider>) -> Self {
        Self { parts }
    }
}

/// Maps a two-digit seed value onto the color wheel.
fn hue_of(value: u64) -> u16 {
    ((value % 240) * 360 / 240) as u16
}

impl Generator for WavatarGenerator {
    fn build(&self, seed: &str, size: u32, format: OutputFormat) -> AvatarResult<RenderedImage> {
        require_raster("wavatar", format)?;

        let mut selector = DigitSelector::new(seed, &OFFSETS, DIGITS);
        let background_hue = hue_of(selector.value(BACKGROUND_HUE_OFFSET, DIGITS)?);
        let face_hue = hue_of(selector.value(FACE_HUE_OFFSET, DIGITS)?);

        let catalog = self.parts.get_parts()?;
        let selection = select_parts(&mut selector, &catalog, &CATEGORIES)?;
        let layers = load_layers(&*self.parts, &selection)?;
        let canvas_size = base_size(&layers)?;
        let (width, height) = (canvas_size.width, canvas_size.height);

        let mut canvas = RgbaCanvas::create(CanvasKind::White, width, height)?;
        canvas.fill(background_hue, 94, 20, 1.min(width - 1), 1.min(height - 1))?;
        for (category, layer) in layers {
            let region = layer.size();
            canvas.apply_image(layer, region.width.min(width), region.height.min(height))?;
            if category == "mask" {
                canvas.fill(face_hue, 94, 66, width / 2, height / 2)?;
            }
        }

        encode_raster(canvas.into_image(), size, format, "wavatar")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AvatarError;
    use crate::generator::test_support::write_png_parts;
    use crate::parts::DirectoryCatalog;
    use crate::store::MemoryStore;
    use std::sync::Arc;
    use std::time::Duration;

    const SEED: &str = "3c9d4e1f7a2b8c0d5e6f1a2b3c4d5e6f7a8b9c0d1e2f3a4b5c6d7e8f9a0b1c2d";

    fn generator(dir: &std::path::Path) -> WavatarGenerator {
        WavatarGenerator::new(Box::new(DirectoryCatalog::new(
            dir,
            "png",
            Duration::from_secs(60),
            Arc::new(MemoryStore::new()),
        )))
    }

    #[test]
    fn hue_covers_the_wheel() {
        assert_eq!(hue_of(0), 0);
        assert_eq!(hue_of(120), 180);
        assert_eq!(hue_of(239), 358);
        assert_eq!(hue_of(240), 0);
    }

    #[test]
    fn builds_deterministically() {
        let dir = tempfile::tempdir().unwrap();
        write_png_parts(dir.path(), &CATEGORIES, 4, 20);
        let generator = generator(dir.path());

        let a = generator.build(SEED, 40, OutputFormat::Jpeg).unwrap();
        let b = generator.build(SEED, 40, OutputFormat::Jpeg).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.mime, "image/jpeg");
    }

    #[test]
    fn short_seed_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_png_parts(dir.path(), &CATEGORIES, 1, 8);
        let err = generator(dir.path())
            .build("3c9d", 8, OutputFormat::Png)
            .unwrap_err();
        assert!(matches!(err, AvatarError::InvalidSeed { .. }));
    }
}

//! Monster avatars: randomly colored body parts on a white canvas.

use super::{Generator, OutputFormat, RenderedImage, base_size, encode_raster, require_raster};
use crate::error::AvatarResult;
use crate::parts::{PartCatalogProvider, SeededSelector, select_parts};
use crate::raster::{Canvas, CanvasKind, RgbaCanvas, load_layers};

/// Layering order, back to front.
pub const CATEGORIES: [&str; 6] = ["legs", "hair", "arms", "body", "eyes", "mouth"];

/// Categories recolored with the monster's hue.
const COLORIZED: [&str; 4] = ["legs", "hair", "arms", "body"];

pub struct MonsterGenerator {
    parts: Box<dyn PartCatalogProvider>,
}

impl MonsterGenerator {
    pub fn new(parts: Box<dyn PartCatalogProvider>) -> Self {
        Self { parts }
    }
}

impl Generator for MonsterGenerator {
    fn build(&self, seed: &str, size: u32, format: OutputFormat) -> AvatarResult<RenderedImage> {
        require_raster("monster", format)?;

        let mut selector = SeededSelector::new(seed);
        let catalog = self.parts.get_parts()?;
        let selection = select_parts(&mut selector, &catalog, &CATEGORIES)?;
        let hue = selector.random_in(0, 359) as u16;
        let saturation = selector.random_in(40, 100) as u8;

        let layers = load_layers(&*self.parts, &selection)?;
        let canvas_size = base_size(&layers)?;
        let mut canvas = RgbaCanvas::create(CanvasKind::White, canvas_size.width, canvas_size.height)?;
        for (category, mut layer) in layers {
            if COLORIZED.contains(&category.as_str()) {
                layer.colorize(hue, saturation);
            }
            let region = layer.size();
            canvas.apply_image(
                layer,
                region.width.min(canvas_size.width),
                region.height.min(canvas_size.height),
            )?;
        }

        encode_raster(canvas.into_image(), size, format, "monster")
    }
}

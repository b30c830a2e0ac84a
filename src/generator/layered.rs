//! Plain layered avatars (birds and cats): parts stacked on a transparent
//! canvas with no recoloring.

use super::{Generator, OutputFormat, RenderedImage, base_size, encode_raster, require_raster};
use crate::error::AvatarResult;
use crate::parts::{PartCatalogProvider, SeededSelector, select_parts};
use crate::raster::{Canvas, CanvasKind, RgbaCanvas, load_layers};

pub const BIRD_CATEGORIES: [&str; 7] = ["tail", "hoop", "body", "wing", "eyes", "bec", "accessorie"];

pub const CAT_CATEGORIES: [&str; 5] = ["body", "fur", "eyes", "mouth", "accessorie"];

pub struct LayeredGenerator {
    name: &'static str,
    categories: &'static [&'static str],
    parts: Box<dyn PartCatalogProvider>,
}

impl LayeredGenerator {
    pub fn new(
        name: &'static str,
        categories: &'static [&'static str],
        parts: Box<dyn PartCatalogProvider>,
    ) -> Self {
        Self {
            name,
            categories,
            parts,
        }
    }

    pub fn bird(parts: Box<dyn PartCatalogProvider>) -> Self {
        Self::new("bird", &BIRD_CATEGORIES, parts)
    }

    pub fn cat(parts: Box<dyn PartCatalogProvider>) -> Self {
        Self::new("cat", &CAT_CATEGORIES, parts)
    }

    pub fn categories(&self) -> &'static [&'static str] {
        self.categories
    }
}

impl Generator for LayeredGenerator {
    fn build(&self, seed: &str, size: u32, format: OutputFormat) -> AvatarResult<RenderedImage> {
        require_raster(self.name, format)?;

        let mut selector = SeededSelector::new(seed);
        let catalog = self.parts.get_parts()?;
        let selection = select_parts(&mut selector, &catalog, self.categories)?;

        let layers = load_layers(&*self.parts, &selection)?;
        let canvas_size = base_size(&layers)?;
        let mut canvas =
            RgbaCanvas::create(CanvasKind::Transparent, canvas_size.width, canvas_size.height)?;
        for (_, layer) in layers {
            let region = layer.size();
            canvas.apply_image(
                layer,
                region.width.min(canvas_size.width),
                region.height.min(canvas_size.height),
            )?;
        }

        encode_raster(canvas.into_image(), size, format, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::test_support::write_png_parts;
    use crate::parts::DirectoryCatalog;
    use crate::store::MemoryStore;
    use std::sync::Arc;
    use std::time::Duration;

    fn catalog(dir: &std::path::Path) -> Box<dyn PartCatalogProvider> {
        Box::new(DirectoryCatalog::new(
            dir,
            "png",
            Duration::from_secs(60),
            Arc::new(MemoryStore::new()),
        ))
    }

    #[test]
    fn cat_keeps_transparency() {
        let dir = tempfile::tempdir().unwrap();
        write_png_parts(dir.path(), &CAT_CATEGORIES, 2, 16);
        let image = LayeredGenerator::cat(catalog(dir.path()))
            .build("whiskers", 16, OutputFormat::Png)
            .unwrap();

        let decoded = image::load_from_memory(&image.bytes).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(0, 0)[3], 0, "corners stay transparent");
    }

    #[test]
    fn different_seeds_can_differ() {
        let dir = tempfile::tempdir().unwrap();
        write_png_parts(dir.path(), &BIRD_CATEGORIES, 5, 16);
        let bird = LayeredGenerator::bird(catalog(dir.path()));

        let outputs: std::collections::HashSet<Vec<u8>> = (0..8)
            .map(|i| bird.build(&format!("seed-{i}"), 16, OutputFormat::Png).unwrap().bytes)
            .collect();
        assert!(outputs.len() > 1);
    }
}

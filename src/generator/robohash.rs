//! Robots assembled from SVG fragments, every choice read from the seed.

use super::{Generator, OutputFormat, RenderedImage, encode_vector};
use crate::color::{hsl_to_rgb, to_hex};
use crate::error::{AvatarError, AvatarResult};
use crate::parts::{DigitSelector, PartCatalogProvider, select_parts};
use crate::vector::fragments::{CATEGORIES, assemble, prepare_fragment};
use std::fs;

const OFFSETS: [(&str, usize); 6] = [
    ("body", 0),
    ("arms", 2),
    ("mouth", 4),
    ("eyes", 6),
    ("antenna", 8),
    ("accessory", 10),
];

const BODY_HUE_OFFSET: usize = 12;
const BACKGROUND_HUE_OFFSET: usize = 14;
const DIGITS: usize = 2;

pub struct RobohashGenerator {
    parts: Box<dyn PartCatalogProvider>,
}

impl RobohashGenerator {
    pub fn new(parts: Box<dyn PartCatalogProvider>) -> Self {
        Self { parts }
    }

    /// The SVG markup for `seed`.
    pub fn svg(&self, seed: &str) -> AvatarResult<String> {
        let mut selector = DigitSelector::new(seed, &OFFSETS, DIGITS);
        let body_hue = hue_of(selector.value(BODY_HUE_OFFSET, DIGITS)?);
        let background_hue = hue_of(selector.value(BACKGROUND_HUE_OFFSET, DIGITS)?);

        let catalog = self.parts.get_parts()?;
        let selection = select_parts(&mut selector, &catalog, &CATEGORIES)?;

        let mut fragments = Vec::with_capacity(selection.len());
        for (category, part) in selection.iter() {
            let path = self.parts.part_path(part);
            let markup = fs::read_to_string(&path)
                .map_err(|e| AvatarError::io(format!("reading fragment {}", path.display()), e))?;
            fragments.push((category, prepare_fragment(&markup)));
        }

        let color = to_hex(hsl_to_rgb(body_hue, 60, 50));
        let background = to_hex(hsl_to_rgb(background_hue, 40, 90));
        assemble(&fragments, &color, &background)
    }
}

fn hue_of(value: u64) -> u16 {
    (value * 360 / 256) as u16
}

impl Generator for RobohashGenerator {
    fn build(&self, seed: &str, size: u32, format: OutputFormat) -> AvatarResult<RenderedImage> {
        encode_vector(self.svg(seed)?, size, format)
    }
}

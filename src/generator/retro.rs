//! Retro identicons: a mirrored 5x5 bitmap traced into an SVG path.

use super::{Generator, OutputFormat, RenderedImage, encode_vector};
use crate::color::{bright_color, light_color, to_hex};
use crate::error::AvatarResult;
use crate::parts::SeededSelector;
use crate::vector::bitmap::{bitmap_from_hash, identity_hash, to_svg, trace_path};

/// Generator for retro identicons. Needs no part files.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetroGenerator;

impl RetroGenerator {
    /// The SVG markup for `seed`.
    pub fn svg(&self, seed: &str) -> AvatarResult<String> {
        let mut selector = SeededSelector::new(seed);
        let color = bright_color(selector.rng());
        let background = light_color(selector.rng());

        let bitmap = bitmap_from_hash(&identity_hash(seed))?;
        Ok(to_svg(&trace_path(&bitmap), &to_hex(color), &to_hex(background)))
    }
}

impl Generator for RetroGenerator {
    fn build(&self, seed: &str, size: u32, format: OutputFormat) -> AvatarResult<RenderedImage> {
        encode_vector(self.svg(seed)?, size, format)
    }
}

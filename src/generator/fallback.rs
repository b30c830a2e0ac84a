//! The built-in default icon: a grey silhouette.

use super::{Generator, OutputFormat, RenderedImage, encode_vector};
use crate::error::AvatarResult;

pub const DEFAULT_ICON_SVG: &str = concat!(
    r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100">"#,
    r##"<rect width="100" height="100" fill="#dddddd"/>"##,
    r##"<circle cx="50" cy="38" r="20" fill="#a8a8a8"/>"##,
    r##"<path d="M14 100c0-22 16-36 36-36s36 14 36 36z" fill="#a8a8a8"/>"##,
    "</svg>"
);

/// Renders [`DEFAULT_ICON_SVG`]. The seed is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultIconGenerator;

impl Generator for DefaultIconGenerator {
    fn build(&self, _seed: &str, size: u32, format: OutputFormat) -> AvatarResult<RenderedImage> {
        encode_vector(DEFAULT_ICON_SVG.to_string(), size, format)
    }
}

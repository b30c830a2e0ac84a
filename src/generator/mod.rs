//! Avatar generators and the façade that runs them.
//!
//! Each avatar style has one concrete generator type that composes the
//! capabilities it needs: a [`PartCatalogProvider`] for its parts, a
//! [`PartSelector`](crate::parts::PartSelector) built fresh per call, and a
//! [`Canvas`](crate::raster::Canvas) or the vector helpers for drawing.
//!
//! Callers normally go through [`AvatarFactory`], which picks the generator
//! for an [`AvatarStyle`] and turns every failure into `None` so the caller
//! can fall back to something else.
//!
//! # Example
//!
//! ```no_run
//! use avatar_forge::generator::{AvatarFactory, AvatarStyle, GeneratorSpec, OutputFormat};
//! use avatar_forge::store::MemoryStore;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let factory = AvatarFactory::new(
//!     "/srv/avatars/parts",
//!     Arc::new(MemoryStore::new()),
//!     Duration::from_secs(7 * 24 * 3600),
//! );
//! let spec = GeneratorSpec::new(AvatarStyle::Monster, 128, OutputFormat::Png);
//! if let Some(image) = factory.build(&spec, "9f1c0b2e4d6a8c0e1f3b5d7f9a2c4e6f") {
//!     std::fs::write("avatar.png", &image.bytes).unwrap();
//! }
//! ```

pub mod fallback;
pub mod layered;
pub mod monster;
pub mod retro;
pub mod robohash;
pub mod wavatar;

pub use fallback::DefaultIconGenerator;
pub use layered::LayeredGenerator;
pub use monster::MonsterGenerator;
pub use retro::RetroGenerator;
pub use robohash::RobohashGenerator;
pub use wavatar::WavatarGenerator;

use crate::error::{AvatarError, AvatarResult};
use crate::geometry::SizePx;
use crate::parts::{DirectoryCatalog, PartCatalogProvider};
use crate::store::TransientStore;
use crate::stream::{StreamArena, render_image};
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

// ============================================================================
// AvatarStyle
// ============================================================================

/// Every avatar algorithm the engine knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AvatarStyle {
    Monster,
    Wavatar,
    Bird,
    Cat,
    Retro,
    Robohash,
}

impl AvatarStyle {
    pub const ALL: [AvatarStyle; 6] = [
        Self::Monster,
        Self::Wavatar,
        Self::Bird,
        Self::Cat,
        Self::Retro,
        Self::Robohash,
    ];

    /// Lowercase name, also used as the part subdirectory and cache type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monster => "monster",
            Self::Wavatar => "wavatar",
            Self::Bird => "bird",
            Self::Cat => "cat",
            Self::Retro => "retro",
            Self::Robohash => "robohash",
        }
    }

    /// Looks a style up by name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|style| style.as_str().eq_ignore_ascii_case(name))
    }

    /// Whether the style draws SVG natively.
    pub fn is_vector(self) -> bool {
        matches!(self, Self::Retro | Self::Robohash)
    }

    /// File extension of the style's part sources, if it uses any.
    pub fn part_extension(self) -> Option<&'static str> {
        match self {
            Self::Monster | Self::Wavatar | Self::Bird | Self::Cat => Some("png"),
            Self::Robohash => Some("svg"),
            Self::Retro => None,
        }
    }
}

impl fmt::Display for AvatarStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AvatarStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown avatar style `{s}`"))
    }
}

// ============================================================================
// OutputFormat
// ============================================================================

/// Encoding of a rendered avatar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Png,
    Jpeg,
    Svg,
}

impl OutputFormat {
    /// Parses a file extension (`png`, `jpg`, `jpeg`, `svg`), ignoring case.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "svg" => Some(Self::Svg),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Svg => "svg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Svg => "image/svg+xml",
        }
    }

    /// The raster codec for this format; `None` for SVG.
    pub fn image_format(self) -> Option<ImageFormat> {
        match self {
            Self::Png => Some(ImageFormat::Png),
            Self::Jpeg => Some(ImageFormat::Jpeg),
            Self::Svg => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| format!("unknown output format `{s}`"))
    }
}

// ============================================================================
// GeneratorSpec / RenderedImage
// ============================================================================

/// What to generate: algorithm, pixel size and encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratorSpec {
    pub style: AvatarStyle,
    pub size: u32,
    pub format: OutputFormat,
}

impl GeneratorSpec {
    pub fn new(style: AvatarStyle, size: u32, format: OutputFormat) -> Self {
        Self {
            style,
            size,
            format,
        }
    }
}

/// The encoded result of one `build()` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub bytes: Vec<u8>,
    pub mime: &'static str,
}

impl RenderedImage {
    pub fn new(bytes: Vec<u8>, format: OutputFormat) -> Self {
        Self {
            bytes,
            mime: format.mime_type(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// ============================================================================
// Generator
// ============================================================================

/// A single avatar algorithm.
///
/// Implementations are pure functions of their inputs: the same seed, size
/// and format always produce the same bytes.
pub trait Generator: Send + Sync {
    fn build(&self, seed: &str, size: u32, format: OutputFormat) -> AvatarResult<RenderedImage>;
}

/// Fails with [`AvatarError::UnsupportedFormat`] for SVG requests.
pub(crate) fn require_raster(style: &str, format: OutputFormat) -> AvatarResult<ImageFormat> {
    format
        .image_format()
        .ok_or_else(|| AvatarError::UnsupportedFormat {
            style: style.to_string(),
            format: format.to_string(),
        })
}

/// Scales a composed canvas to `size` x `size` and encodes it.
pub(crate) fn encode_raster(
    image: RgbaImage,
    size: u32,
    format: OutputFormat,
    style: &str,
) -> AvatarResult<RenderedImage> {
    let image_format = require_raster(style, format)?;
    let arena = StreamArena::new();
    let bytes = render_image(
        &arena,
        &DynamicImage::ImageRgba8(image),
        SizePx::square(size),
        image_format,
    )?;
    Ok(RenderedImage::new(bytes, format))
}

/// Returns SVG markup as-is, or rasterizes and encodes it.
pub(crate) fn encode_vector(svg: String, size: u32, format: OutputFormat) -> AvatarResult<RenderedImage> {
    match format.image_format() {
        None => Ok(RenderedImage::new(svg.into_bytes(), format)),
        Some(image_format) => {
            if size == 0 {
                return Err(AvatarError::codec("cannot rasterize to a zero size"));
            }
            let raster = crate::vector::rasterize(&svg, size, size)?;
            let arena = StreamArena::new();
            let bytes = render_image(
                &arena,
                &DynamicImage::ImageRgba8(raster),
                SizePx::square(size),
                image_format,
            )?;
            Ok(RenderedImage::new(bytes, format))
        }
    }
}

/// Size of the first layer; every layer of a style shares it.
pub(crate) fn base_size(layers: &[(String, crate::raster::PartLayer)]) -> AvatarResult<SizePx> {
    let (_, first) = layers
        .first()
        .ok_or_else(|| AvatarError::composition("no layers were selected"))?;
    let size = first.size();
    if size.is_empty() {
        return Err(AvatarError::composition(format!(
            "layer `{}` has no pixels",
            first.name()
        )));
    }
    Ok(size)
}

// ============================================================================
// AvatarFactory
// ============================================================================

/// Runs generators by style and contains their failures.
///
/// Parts are read from `parts_dir/<style>/`. Catalogs are cached in the
/// shared store for `catalog_ttl`.
pub struct AvatarFactory {
    parts_dir: PathBuf,
    monster: MonsterGenerator,
    wavatar: WavatarGenerator,
    bird: LayeredGenerator,
    cat: LayeredGenerator,
    retro: RetroGenerator,
    robohash: RobohashGenerator,
    default_icon: DefaultIconGenerator,
}

impl AvatarFactory {
    pub fn new(
        parts_dir: impl Into<PathBuf>,
        store: Arc<dyn TransientStore>,
        catalog_ttl: Duration,
    ) -> Self {
        let parts_dir = parts_dir.into();
        let catalog = |style: AvatarStyle| -> Box<dyn PartCatalogProvider> {
            Box::new(DirectoryCatalog::new(
                parts_dir.join(style.as_str()),
                style.part_extension().unwrap_or("png"),
                catalog_ttl,
                Arc::clone(&store),
            ))
        };

        Self {
            monster: MonsterGenerator::new(catalog(AvatarStyle::Monster)),
            wavatar: WavatarGenerator::new(catalog(AvatarStyle::Wavatar)),
            bird: LayeredGenerator::bird(catalog(AvatarStyle::Bird)),
            cat: LayeredGenerator::cat(catalog(AvatarStyle::Cat)),
            retro: RetroGenerator,
            robohash: RobohashGenerator::new(catalog(AvatarStyle::Robohash)),
            default_icon: DefaultIconGenerator,
            parts_dir,
        }
    }

    /// Builds a factory from the configured part directory and catalog TTL.
    pub fn from_config(config: &crate::config::Config, store: Arc<dyn TransientStore>) -> Self {
        Self::new(&config.parts_dir, store, config.catalog_ttl())
    }

    pub fn parts_dir(&self) -> &Path {
        &self.parts_dir
    }

    /// The generator for `style`.
    pub fn generator(&self, style: AvatarStyle) -> &dyn Generator {
        match style {
            AvatarStyle::Monster => &self.monster,
            AvatarStyle::Wavatar => &self.wavatar,
            AvatarStyle::Bird => &self.bird,
            AvatarStyle::Cat => &self.cat,
            AvatarStyle::Retro => &self.retro,
            AvatarStyle::Robohash => &self.robohash,
        }
    }

    /// Runs the generator and propagates its error.
    pub fn try_build(&self, spec: &GeneratorSpec, seed: &str) -> AvatarResult<RenderedImage> {
        self.generator(spec.style).build(seed, spec.size, spec.format)
    }

    /// Runs the generator, returning `None` on any failure.
    pub fn build(&self, spec: &GeneratorSpec, seed: &str) -> Option<RenderedImage> {
        match self.try_build(spec, seed) {
            Ok(image) => {
                debug!(style = %spec.style, size = spec.size, bytes = image.len(), "generated avatar");
                Some(image)
            }
            Err(e) => {
                warn!(
                    style = %spec.style,
                    size = spec.size,
                    format = %spec.format,
                    catalog = e.is_catalog_error(),
                    error = %e,
                    "avatar generation failed"
                );
                None
            }
        }
    }

    /// Renders the built-in default icon.
    pub fn build_default(&self, size: u32, format: OutputFormat) -> Option<RenderedImage> {
        match self.default_icon.build("", size, format) {
            Ok(image) => Some(image),
            Err(e) => {
                warn!(size, format = %format, error = %e, "default icon generation failed");
                None
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn style_names_round_trip() {
        for style in AvatarStyle::ALL {
            assert_eq!(AvatarStyle::from_name(style.as_str()), Some(style));
            assert_eq!(style.to_string().parse::<AvatarStyle>(), Ok(style));
        }
        assert_eq!(AvatarStyle::from_name("MONSTER"), Some(AvatarStyle::Monster));
        assert_eq!(AvatarStyle::from_name("gravatar"), None);
    }

    #[test]
    fn output_format_from_extension() {
        assert_eq!(OutputFormat::from_extension("JPG"), Some(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::from_extension("jpeg"), Some(OutputFormat::Jpeg));
        assert_eq!(OutputFormat::from_extension("gif"), None);
        assert_eq!(OutputFormat::Svg.mime_type(), "image/svg+xml");
        assert_eq!(OutputFormat::Svg.image_format(), None);
    }

    #[test]
    fn raster_styles_reject_svg() {
        let err = require_raster("monster", OutputFormat::Svg).unwrap_err();
        assert!(matches!(err, AvatarError::UnsupportedFormat { .. }));
    }

    #[test]
    fn factory_contains_failures() {
        let dir = tempfile::tempdir().unwrap();
        let factory = AvatarFactory::new(dir.path(), Arc::new(MemoryStore::new()), Duration::from_secs(60));
        let spec = GeneratorSpec::new(AvatarStyle::Monster, 32, OutputFormat::Png);

        assert!(factory.try_build(&spec, "abc").is_err());
        assert_eq!(factory.build(&spec, "abc"), None);
    }

    #[test]
    fn factory_builds_partless_styles() {
        let dir = tempfile::tempdir().unwrap();
        let factory = AvatarFactory::new(dir.path(), Arc::new(MemoryStore::new()), Duration::from_secs(60));

        let spec = GeneratorSpec::new(AvatarStyle::Retro, 40, OutputFormat::Png);
        let image = factory.build(&spec, "someone@example.org").unwrap();
        assert_eq!(image.mime, "image/png");

        let icon = factory.build_default(24, OutputFormat::Jpeg).unwrap();
        assert_eq!(icon.mime, "image/jpeg");
        assert_eq!(&icon.bytes[..2], [0xff, 0xd8]);
    }

    #[test]
    fn vector_output_is_markup() {
        let image = encode_vector("<svg/>".to_string(), 10, OutputFormat::Svg).unwrap();
        assert_eq!(image.bytes, b"<svg/>");
        assert!(encode_vector("<svg".to_string(), 10, OutputFormat::Png).is_err());
    }
}

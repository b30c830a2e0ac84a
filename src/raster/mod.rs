//! Raster compositing of part layers.
//!
//! A raster avatar is built by allocating a [`RgbaCanvas`], copying the
//! selected [`PartLayer`]s onto it in order, and flood filling regions with
//! HSL colors. Layers are consumed when applied, so a layer can never be
//! applied twice or used after it has been composited.

pub mod colorize;
pub mod composite;
pub mod fill;

pub use colorize::{ColorizePath, colorize};

use crate::color::hsl_to_rgb;
use crate::error::{AvatarError, AvatarResult};
use crate::geometry::SizePx;
use crate::parts::{PartCatalogProvider, PartSelection};
use image::{Rgba, RgbaImage};
use std::path::Path;

/// Initial contents of a new canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasKind {
    White,
    Black,
    Transparent,
}

impl CanvasKind {
    fn pixel(self) -> Rgba<u8> {
        match self {
            Self::White => Rgba([255, 255, 255, 255]),
            Self::Black => Rgba([0, 0, 0, 255]),
            Self::Transparent => Rgba([0, 0, 0, 0]),
        }
    }
}

/// Operations a raster generator needs from its drawing surface.
pub trait Canvas {
    fn size(&self) -> SizePx;

    /// Copies the top-left `width` x `height` region of `layer` onto the
    /// canvas at the origin. The layer is disposed afterwards.
    fn apply_image(&mut self, layer: PartLayer, width: u32, height: u32) -> AvatarResult<()>;

    /// Flood fills the region around `(x, y)` with an HSL color.
    fn fill(&mut self, hue: u16, saturation: u8, lightness: u8, x: u32, y: u32) -> AvatarResult<()>;
}

// ============================================================================
// PartLayer
// ============================================================================

/// A decoded part image, ready to be colorized and composited.
#[derive(Debug, Clone, PartialEq)]
pub struct PartLayer {
    name: String,
    image: RgbaImage,
}

impl PartLayer {
    pub fn new(name: impl Into<String>, image: RgbaImage) -> Self {
        Self {
            name: name.into(),
            image,
        }
    }

    /// Decodes the part file at `path`.
    pub fn load(path: &Path) -> AvatarResult<Self> {
        let image = image::open(path)
            .map_err(|e| AvatarError::codec(format!("loading part {}: {e}", path.display())))?
            .to_rgba8();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(name, image))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> SizePx {
        SizePx::new(self.image.width(), self.image.height())
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Recolors the layer, see [`colorize`].
    pub fn colorize(&mut self, hue: u16, saturation: u8) -> ColorizePath {
        colorize(&mut self.image, hue, saturation)
    }
}

/// Loads the selected parts from `provider`, keyed by category.
pub fn load_layers(
    provider: &dyn PartCatalogProvider,
    selection: &PartSelection,
) -> AvatarResult<Vec<(String, PartLayer)>> {
    selection
        .iter()
        .map(|(category, part)| {
            PartLayer::load(&provider.part_path(part)).map(|layer| (category.to_string(), layer))
        })
        .collect()
}

// ============================================================================
// RgbaCanvas
// ============================================================================

/// A true-color canvas with optional alpha blending.
#[derive(Debug, Clone)]
pub struct RgbaCanvas {
    image: RgbaImage,
    blending: bool,
}

impl RgbaCanvas {
    /// Allocates a `width` x `height` canvas filled according to `kind`.
    ///
    /// The background is written with blending disabled so transparent
    /// pixels are stored as-is; blending is enabled for everything that
    /// follows.
    pub fn create(kind: CanvasKind, width: u32, height: u32) -> AvatarResult<Self> {
        if width == 0 || height == 0 {
            return Err(AvatarError::composition(format!(
                "cannot allocate a {width}x{height} canvas"
            )));
        }

        let mut canvas = Self {
            image: RgbaImage::new(width, height),
            blending: false,
        };
        let background = kind.pixel();
        for pixel in canvas.image.pixels_mut() {
            *pixel = background;
        }
        canvas.blending = true;
        Ok(canvas)
    }

    pub fn set_blending(&mut self, enabled: bool) {
        self.blending = enabled;
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

impl Canvas for RgbaCanvas {
    fn size(&self) -> SizePx {
        SizePx::new(self.image.width(), self.image.height())
    }

    fn apply_image(&mut self, layer: PartLayer, width: u32, height: u32) -> AvatarResult<()> {
        if layer.image.width() == 0 || layer.image.height() == 0 {
            return Err(AvatarError::composition(format!(
                "layer `{}` has no pixels",
                layer.name
            )));
        }
        if width == 0 || height == 0 || width > self.image.width() || height > self.image.height() {
            return Err(AvatarError::composition(format!(
                "copy region {width}x{height} for layer `{}` does not fit the {}x{} canvas",
                layer.name,
                self.image.width(),
                self.image.height()
            )));
        }

        if self.blending {
            composite::composite_over(&mut self.image, &layer.image, width, height);
        } else {
            composite::copy_region(&mut self.image, &layer.image, width, height);
        }
        Ok(())
    }

    fn fill(&mut self, hue: u16, saturation: u8, lightness: u8, x: u32, y: u32) -> AvatarResult<()> {
        let (r, g, b) = hsl_to_rgb(hue, saturation, lightness);
        fill::flood_fill(&mut self.image, x, y, Rgba([r, g, b, 255]))
    }
}

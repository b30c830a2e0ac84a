//! Bridge between the stream arena and the `image` codec.

use super::{OpenMode, StreamArena};
use crate::error::{AvatarError, AvatarResult};
use crate::geometry::{SizePx, centered_crop};
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, Rgba, RgbaImage};
use std::io::BufReader;

/// Opens and saves images addressed by arena URLs.
#[derive(Debug, Clone, Copy)]
pub struct ImageCodec<'a> {
    arena: &'a StreamArena,
}

impl<'a> ImageCodec<'a> {
    pub fn new(arena: &'a StreamArena) -> Self {
        Self { arena }
    }

    /// Decodes the image stored at `url`, sniffing its format.
    pub fn open(&self, url: &str) -> AvatarResult<DynamicImage> {
        let stream = self.arena.open(url, OpenMode::Read)?;
        let reader = ImageReader::new(BufReader::new(stream))
            .with_guessed_format()
            .map_err(|e| AvatarError::codec(format!("reading {url}: {e}")))?;
        Ok(reader.decode()?)
    }

    /// Encodes `image` into `url`, replacing its contents.
    ///
    /// JPEG has no alpha channel, so images are flattened onto white first.
    pub fn save(&self, image: &DynamicImage, url: &str, format: ImageFormat) -> AvatarResult<()> {
        let mut stream = self.arena.open(url, OpenMode::Write)?;
        match format {
            ImageFormat::Jpeg => {
                let flat = DynamicImage::ImageRgb8(flatten_on_white(&image.to_rgba8()));
                flat.write_to(&mut stream, format)?;
            }
            _ => image.write_to(&mut stream, format)?,
        }
        Ok(())
    }
}

/// Crops the largest centered region with the target's aspect ratio and
/// scales it to exactly `target`.
///
/// Unlike a plain resize this also enlarges images smaller than the target.
pub fn crop_resize(image: &DynamicImage, target: SizePx) -> AvatarResult<DynamicImage> {
    if target.is_empty() {
        return Err(AvatarError::codec(format!(
            "cannot resize to {}x{}",
            target.width, target.height
        )));
    }
    let source = SizePx::new(image.width(), image.height());
    if source.is_empty() {
        return Err(AvatarError::codec("cannot resize an empty image"));
    }

    let rect = centered_crop(source, target);
    if rect.size() == target {
        return Ok(image.crop_imm(rect.x, rect.y, rect.width, rect.height));
    }
    Ok(image
        .crop_imm(rect.x, rect.y, rect.width, rect.height)
        .resize_exact(target.width, target.height, FilterType::Lanczos3))
}

/// Resizes and re-encodes `image` entirely in memory.
///
/// The image is written to one arena handle, reopened through the codec,
/// cropped and scaled to `target`, encoded into a second handle and read
/// back. Both handles are released before returning, on success and on
/// failure alike.
pub fn render_image(
    arena: &StreamArena,
    image: &DynamicImage,
    target: SizePx,
    format: ImageFormat,
) -> AvatarResult<Vec<u8>> {
    let codec = ImageCodec::new(arena);

    let source = arena.create()?;
    codec.save(image, &source.url_with_name("source.png"), ImageFormat::Png)?;

    let decoded = codec.open(&source.url())?;
    let resized = crop_resize(&decoded, target)?;

    let output = arena.create()?;
    codec.save(&resized, &output.url(), format)?;
    output.read_bytes()
}

fn flatten_on_white(image: &RgbaImage) -> image::RgbImage {
    let mut out = image::RgbImage::new(image.width(), image.height());
    for (x, y, Rgba([r, g, b, a])) in image.enumerate_pixels() {
        let alpha = u16::from(*a);
        let mix = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        out.put_pixel(x, y, image::Rgb([mix(*r), mix(*g), mix(*b)]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(width: u32, height: u32) -> DynamicImage {
        let mut img = RgbaImage::new(width, height);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            let on = (x / 4 + y / 4) % 2 == 0;
            *pixel = if on {
                Rgba([200, 30, 30, 255])
            } else {
                Rgba([30, 30, 200, 255])
            };
        }
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn enlarges_to_exact_size() {
        let out = crop_resize(&checker(40, 40), SizePx::square(128)).unwrap();
        assert_eq!((out.width(), out.height()), (128, 128));
    }

    #[test]
    fn crops_before_scaling() {
        let out = crop_resize(&checker(120, 60), SizePx::square(30)).unwrap();
        assert_eq!((out.width(), out.height()), (30, 30));
    }

    #[test]
    fn rejects_empty_target() {
        assert!(crop_resize(&checker(8, 8), SizePx::new(0, 8)).is_err());
    }

    #[test]
    fn render_round_trips_png() {
        let arena = StreamArena::new();
        let bytes = render_image(&arena, &checker(80, 80), SizePx::square(64), ImageFormat::Png).unwrap();

        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 64));
        assert!(arena.is_empty(), "all handles must be released");
    }

    #[test]
    fn render_jpeg_flattens_alpha() {
        let arena = StreamArena::new();
        let transparent = DynamicImage::ImageRgba8(RgbaImage::new(16, 16));
        let bytes = render_image(&arena, &transparent, SizePx::square(16), ImageFormat::Jpeg).unwrap();

        assert_eq!(&bytes[..2], [0xff, 0xd8]);
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert!(decoded.get_pixel(8, 8)[0] > 240, "transparent becomes white");
        assert!(arena.is_empty());
    }

    #[test]
    fn render_is_deterministic() {
        let a = render_image(&StreamArena::new(), &checker(50, 70), SizePx::square(33), ImageFormat::Png).unwrap();
        let b = render_image(&StreamArena::new(), &checker(50, 70), SizePx::square(33), ImageFormat::Png).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn open_rejects_garbage() {
        let arena = StreamArena::new();
        let handle = arena.create().unwrap();
        handle.write_bytes(b"definitely not an image").unwrap();
        let err = ImageCodec::new(&arena).open(&handle.url()).unwrap_err();
        assert!(matches!(err, AvatarError::Codec(_)));
    }
}

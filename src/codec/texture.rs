//! Texture block codec over the `image` crate.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat, RgbaImage};

use crate::format::{Signature, TextureFormat, PADDING};
use crate::util::{pad_to, Error, Result};

pub const JPEG_QUALITY: u8 = 70;

/// Image codec selected by the signature. Errors when the archive has none.
pub fn format_for(sig: &Signature) -> Result<TextureFormat> {
    sig.texture_format()?
        .ok_or_else(|| Error::invalid("archive has textures but no texture codec flag"))
}

/// Encode one texture block, padded.
pub fn encode(format: TextureFormat, image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buf = encode_image(format, image)?;
    pad_to(&mut buf, PADDING);
    Ok(buf)
}

/// Encode an image as a standalone JPEG or PNG file.
pub fn encode_image(format: TextureFormat, image: &RgbaImage) -> Result<Vec<u8>> {
    let (width, height) = image.dimensions();
    let mut buf = Vec::new();
    match format {
        TextureFormat::Jpeg => {
            let rgb = image::DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY).write_image(
                &rgb,
                width,
                height,
                ExtendedColorType::Rgb8,
            )?;
        }
        TextureFormat::Png => {
            PngEncoder::new(&mut buf).write_image(image, width, height, ExtendedColorType::Rgba8)?;
        }
    }
    Ok(buf)
}

/// Decode one texture block. Trailing padding is ignored by both decoders.
pub fn decode(format: TextureFormat, data: &[u8]) -> Result<RgbaImage> {
    let image_format = match format {
        TextureFormat::Jpeg => ImageFormat::Jpeg,
        TextureFormat::Png => ImageFormat::Png,
    };
    Ok(image::load_from_memory_with_format(data, image_format)?.to_rgba8())
}

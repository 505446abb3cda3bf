use std::io::Cursor;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage, ImageFormat, ImageReader};

/// Decoded RGBA8 pixels ready to be wrapped in a texture.
#[derive(Debug)]
pub struct DecodedPreview {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

fn open_image(path: &Path) -> Result<DynamicImage> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read image: {:?}", path))?;
    let format = image::guess_format(&bytes).ok();

    if format == Some(ImageFormat::Gif) {
        // Grid cells show the first frame only.
        let decoder = GifDecoder::new(Cursor::new(bytes))
            .with_context(|| format!("Failed to decode GIF: {:?}", path))?;
        let frame = decoder
            .into_frames()
            .next()
            .ok_or_else(|| anyhow!("GIF has no frames: {:?}", path))?
            .context("Failed to decode GIF frame")?;
        return Ok(DynamicImage::ImageRgba8(frame.into_buffer()));
    }

    match format {
        Some(fmt) => image::load_from_memory_with_format(&bytes, fmt)
            .with_context(|| format!("Failed to decode image: {:?}", path)),
        None => image::load_from_memory(&bytes)
            .with_context(|| format!("Failed to decode image: {:?}", path)),
    }
}

/// Reads image dimensions from the header without decoding pixels.
pub fn read_dimensions(path: &Path) -> Result<(u32, u32)> {
    ImageReader::open(path)
        .with_context(|| format!("Failed to open image: {:?}", path))?
        .with_guessed_format()
        .context("Failed to guess image format")?
        .into_dimensions()
        .with_context(|| format!("Failed to read dimensions: {:?}", path))
}

/// Decodes an image and downsizes it so its longest side is at most `max_side`.
pub fn decode_preview(path: &Path, max_side: u32) -> Result<DecodedPreview> {
    let img = open_image(path)?;
    let img = if img.width() > max_side || img.height() > max_side {
        img.thumbnail(max_side, max_side)
    } else {
        img
    };
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(anyhow!("Image has no pixels: {:?}", path));
    }
    Ok(DecodedPreview {
        rgba: rgba.into_raw(),
        width,
        height,
    })
}

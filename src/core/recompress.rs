use crate::utils::constants::{
    INITIAL_JPEG_QUALITY, JPEG_QUALITY_STEP, MAX_FILE_SIZE, MAX_IMAGE_DIMENSION, MIN_JPEG_QUALITY,
};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, GenericImageView};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecompressError {
    #[error("Error opening image: {0}")]
    Decode(String),
    #[error("Error compressing image: {0}")]
    Encode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecompressOptions {
    pub max_bytes: usize,
    pub max_dimension: u32,
    pub initial_quality: u8,
    // loop stops here even if still over budget
    pub min_quality: u8,
    pub quality_step: u8,
}

impl Default for RecompressOptions {
    fn default() -> Self {
        Self {
            max_bytes: MAX_FILE_SIZE,
            max_dimension: MAX_IMAGE_DIMENSION,
            initial_quality: INITIAL_JPEG_QUALITY,
            min_quality: MIN_JPEG_QUALITY,
            quality_step: JPEG_QUALITY_STEP,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Recompressed {
    pub bytes: Vec<u8>,
    pub quality: u8,
    pub attempts: u32,
    pub width: u32,
    pub height: u32,
}

// None when the image already fits
pub fn downscaled_dimensions(width: u32, height: u32, max_dimension: u32) -> Option<(u32, u32)> {
    let larger = width.max(height);
    if larger <= max_dimension {
        return None;
    }

    let ratio = max_dimension as f64 / larger as f64;
    let scale = |side: u32| ((side as f64 * ratio).round() as u32).max(1);

    if width >= height {
        Some((max_dimension, scale(height)))
    } else {
        Some((scale(width), max_dimension))
    }
}

// JPEG carries neither alpha nor high bit depth.
fn to_jpeg_color(image: DynamicImage) -> DynamicImage {
    match image.color() {
        ColorType::Rgb8 | ColorType::L8 => image,
        _ => DynamicImage::ImageRgb8(image.to_rgb8()),
    }
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, RecompressError> {
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    image
        .write_with_encoder(encoder)
        .map_err(|e| RecompressError::Encode(e.to_string()))?;
    Ok(buffer)
}

/// Decodes `bytes` and re-encodes them as JPEG, lowering the quality step by
/// step until the output fits `max_bytes` or the quality floor is reached.
/// At the floor the last encoding is returned even if it is still over budget.
pub fn recompress(bytes: &[u8], options: &RecompressOptions) -> Result<Recompressed, RecompressError> {
    let image =
        image::load_from_memory(bytes).map_err(|e| RecompressError::Decode(e.to_string()))?;

    let mut image = to_jpeg_color(image);

    let (width, height) = image.dimensions();
    if let Some((new_width, new_height)) =
        downscaled_dimensions(width, height, options.max_dimension)
    {
        tracing::info!(
            "Downscaling image from {}x{} to {}x{}",
            width,
            height,
            new_width,
            new_height
        );
        image = image.resize_exact(new_width, new_height, FilterType::Lanczos3);
    }

    let mut quality = options.initial_quality;
    let mut attempts = 0;
    loop {
        attempts += 1;
        let encoded = encode_jpeg(&image, quality)?;

        if encoded.len() <= options.max_bytes || quality <= options.min_quality {
            if encoded.len() > options.max_bytes {
                tracing::warn!(
                    "Image still {} bytes at minimum quality {}",
                    encoded.len(),
                    quality
                );
            }
            let (width, height) = image.dimensions();
            return Ok(Recompressed {
                bytes: encoded,
                quality,
                attempts,
                width,
                height,
            });
        }

        quality = quality
            .saturating_sub(options.quality_step.max(1))
            .max(options.min_quality);
    }
}

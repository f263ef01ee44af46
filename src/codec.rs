//! # Image Codec Module
//!
//! Questo modulo isola le primitive di decode/resize/encode dietro il trait
//! `ImageCodec`, così la pipeline si può testare senza immagini reali.
//!
//! ## Responsabilità:
//! - Definisce il trait `ImageCodec` e il tipo `DecodedImage`
//! - Fornisce `NativeCodec`, implementazione basata sul crate `image`
//! - Calcola le dimensioni di resize "thumbnail" (`fit_within`)
//!
//! ## Pipeline colore:
//! - Immagini con trasparenza o palette vengono convertite in RGB opaco
//!   subito dopo il decode (il canale alpha viene scartato, non composto)
//! - Tutti i resize e gli encode lavorano su RGB8
//!
//! ## Resize:
//! - Preserva l'aspect ratio
//! - Shrink-only: un'immagine già contenuta nel box non viene mai ingrandita
//! - Filtro Lanczos3 per il miglior downscaling
//!
//! ## Encode:
//! - **WebP**: lossy via libwebp (feature `webp-encoder`)
//! - **JPEG**: `JpegEncoder` con qualità del profilo

use crate::error::CodecError;
use crate::profile::Encoding;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, RgbImage};
use std::path::Path;
use tracing::debug;

/// Opaque RGB pixels ready for resizing and encoding
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pixels: RgbImage,
}

impl DecodedImage {
    pub fn new(pixels: RgbImage) -> Self {
        Self { pixels }
    }

    /// Flatten any decoded image to opaque RGB
    pub fn from_dynamic(image: DynamicImage) -> Self {
        match image {
            DynamicImage::ImageRgb8(pixels) => Self { pixels },
            other => Self {
                pixels: other.to_rgb8(),
            },
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }
}

/// Decode, resize and encode primitives used by the derivative generator.
///
/// Implementations must be shareable across the worker pool.
pub trait ImageCodec: Send + Sync {
    /// Decode a file and normalise it to opaque RGB
    fn decode(&self, path: &Path) -> Result<DecodedImage, CodecError>;

    /// Shrink so that neither side exceeds the box, keeping aspect ratio.
    /// Never upscales.
    fn resize_to_fit(&self, image: &DecodedImage, max_width: u32, max_height: u32) -> DecodedImage;

    /// Encode to the given lossy format
    fn encode(&self, image: &DecodedImage, encoding: Encoding, quality: u8) -> Result<Vec<u8>, CodecError>;
}

/// Target dimensions for a shrink-only, aspect-preserving fit.
///
/// Returns the original size when it already fits the box.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let ratio = f64::min(
        max_width as f64 / width as f64,
        max_height as f64 / height as f64,
    );

    let new_width = ((width as f64 * ratio).round() as u32).clamp(1, max_width);
    let new_height = ((height as f64 * ratio).round() as u32).clamp(1, max_height);
    (new_width, new_height)
}

/// `ImageCodec` backed by the `image` crate
#[derive(Debug, Clone)]
pub struct NativeCodec {
    filter: FilterType,
}

impl Default for NativeCodec {
    fn default() -> Self {
        Self {
            filter: FilterType::Lanczos3,
        }
    }
}

impl NativeCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ImageCodec for NativeCodec {
    fn decode(&self, path: &Path) -> Result<DecodedImage, CodecError> {
        let image = image::open(path)?;
        let color = image.color();

        if color.has_alpha() {
            debug!("Flattening transparency of {} ({:?}) to RGB", path.display(), color);
        }

        Ok(DecodedImage::from_dynamic(image))
    }

    fn resize_to_fit(&self, image: &DecodedImage, max_width: u32, max_height: u32) -> DecodedImage {
        let (width, height) = image.dimensions();
        let (new_width, new_height) = fit_within(width, height, max_width, max_height);

        if (new_width, new_height) == (width, height) {
            return image.clone();
        }

        let resized = image::imageops::resize(image.pixels(), new_width, new_height, self.filter);
        DecodedImage::new(resized)
    }

    fn encode(&self, image: &DecodedImage, encoding: Encoding, quality: u8) -> Result<Vec<u8>, CodecError> {
        let (width, height) = image.dimensions();
        let mut buffer = Vec::new();

        match encoding {
            Encoding::Jpeg => {
                let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
                encoder.encode(image.pixels().as_raw(), width, height, ColorType::Rgb8)?;
            }
            Encoding::WebP => encode_webp(&mut buffer, image, quality)?,
        }

        Ok(buffer)
    }
}

// libwebp-backed lossy encoder; the pure-Rust one in `image` is lossless only
#[allow(deprecated)]
fn encode_webp(buffer: &mut Vec<u8>, image: &DecodedImage, quality: u8) -> Result<(), CodecError> {
    use image::codecs::webp::{WebPEncoder, WebPQuality};

    let (width, height) = image.dimensions();
    let encoder = WebPEncoder::new_with_quality(buffer, WebPQuality::lossy(quality));
    encoder.encode(image.pixels().as_raw(), width, height, ColorType::Rgb8)?;
    Ok(())
}

//! # Image Codec Module
//!
//! Interfaccia stretta verso la libreria di imaging: il transcoder vede solo
//! `decode(path) -> DecodedImage` e `encode(image, request) -> bytes`.
//!
//! ## Formati di destinazione
//!
//! | Formato | Qualità | Alpha | EXIF | Implementazione |
//! |---------|---------|-------|------|-----------------|
//! | JPEG    | ✅      | ❌    | ✅   | `image::codecs::jpeg` |
//! | PNG     | ❌ (lossless, compressione massima) | ✅ | ❌ | `image::codecs::png` |
//! | WebP    | ✅ / lossless | ✅ | ✅ | `webp` (libwebp) |
//!
//! ## Normalizzazione colore
//!
//! Prima della codifica l'immagine viene portata a un modello che il formato
//! di destinazione accetta: JPEG vuole RGB (o scala di grigi), WebP vuole
//! RGB/RGBA, PNG accetta quasi tutto tranne i buffer float.

use crate::config::Encoding;
use crate::error::TranscodeError;
use crate::metadata;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, DynamicImage, GenericImageView, ImageEncoder};
use std::path::Path;
use tracing::debug;

/// Formats the transcoder can write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    Jpeg,
    Png,
    WebP,
}

impl TargetFormat {
    /// Format written for a (lowercase, dot-less) extension
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Canonical extension for files of this format
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
        }
    }
}

/// A decoded image plus the metadata carried over to the output
pub struct DecodedImage {
    pub image: DynamicImage,
    /// Raw EXIF block, when requested and present
    pub exif: Option<Vec<u8>>,
}

/// Parameters for a single encode call
#[derive(Debug, Clone, Copy)]
pub struct EncodeRequest<'a> {
    pub format: TargetFormat,
    pub encoding: Encoding,
    pub exif: Option<&'a [u8]>,
}

/// Pixel codec capability consumed by the transcoder.
///
/// Implementations must be usable from several worker threads at once.
pub trait ImageCodec: Send + Sync {
    /// Decode `path`; extract EXIF only when `read_exif` is set
    fn decode(&self, path: &Path, read_exif: bool) -> Result<DecodedImage, TranscodeError>;

    /// Encode an image into the bytes of a complete file
    fn encode(&self, image: &DecodedImage, request: &EncodeRequest<'_>) -> Result<Vec<u8>, TranscodeError>;
}

/// Bring an image into a colour model the target format can store.
///
/// Formats that keep alpha are left with their alpha channel.
pub fn normalize_color(image: DynamicImage, format: TargetFormat) -> DynamicImage {
    match format {
        TargetFormat::Jpeg => match image {
            DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) => image,
            DynamicImage::ImageLuma16(_) => DynamicImage::ImageLuma8(image.to_luma8()),
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        },
        TargetFormat::WebP => match image {
            DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => image,
            other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.to_rgba8()),
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        },
        TargetFormat::Png => match image {
            DynamicImage::ImageRgb32F(_) => DynamicImage::ImageRgb16(image.to_rgb16()),
            DynamicImage::ImageRgba32F(_) => DynamicImage::ImageRgba16(image.to_rgba16()),
            other => other,
        },
    }
}

/// Codec backed by the `image` crate, with libwebp for WebP output
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCrateCodec;

impl ImageCrateCodec {
    pub fn new() -> Self {
        Self
    }

    fn encode_jpeg(image: &DynamicImage, encoding: Encoding) -> Result<Vec<u8>, TranscodeError> {
        let quality = encoding.tag();
        let mut buffer = Vec::new();
        {
            let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
            match image {
                DynamicImage::ImageLuma8(gray) => {
                    encoder.encode(gray.as_raw(), gray.width(), gray.height(), ColorType::L8)?
                }
                other => {
                    let rgb = other.to_rgb8();
                    encoder.encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)?
                }
            }
        }
        Ok(buffer)
    }

    fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, TranscodeError> {
        let mut buffer = Vec::new();
        let encoder =
            PngEncoder::new_with_quality(&mut buffer, CompressionType::Best, FilterType::Adaptive);
        let (width, height) = image.dimensions();
        encoder.write_image(image.as_bytes(), width, height, image.color())?;
        Ok(buffer)
    }

    fn encode_webp(image: &DynamicImage, encoding: Encoding) -> Result<Vec<u8>, TranscodeError> {
        let encoder = webp::Encoder::from_image(image)
            .map_err(|e| TranscodeError::Encode(format!("WebP encoder rejected image: {}", e)))?;
        let memory = match encoding {
            Encoding::Lossless => encoder.encode_lossless(),
            Encoding::Lossy(quality) => encoder.encode(quality as f32),
        };
        Ok(memory.to_vec())
    }
}

impl ImageCodec for ImageCrateCodec {
    fn decode(&self, path: &Path, read_exif: bool) -> Result<DecodedImage, TranscodeError> {
        let image = image::io::Reader::open(path)?
            .with_guessed_format()?
            .decode()?;

        let exif = if read_exif {
            let exif = metadata::read_exif(path);
            if exif.is_none() {
                debug!("No EXIF data in {}", path.display());
            }
            exif
        } else {
            None
        };

        Ok(DecodedImage { image, exif })
    }

    fn encode(&self, image: &DecodedImage, request: &EncodeRequest<'_>) -> Result<Vec<u8>, TranscodeError> {
        let pixels = &image.image;
        match request.format {
            TargetFormat::Jpeg => {
                let bytes = Self::encode_jpeg(pixels, request.encoding)?;
                match request.exif {
                    Some(exif) => metadata::embed_exif_jpeg(&bytes, exif),
                    None => Ok(bytes),
                }
            }
            TargetFormat::Png => {
                if request.exif.is_some() {
                    debug!("EXIF is not carried into PNG output");
                }
                Self::encode_png(pixels)
            }
            TargetFormat::WebP => {
                let bytes = Self::encode_webp(pixels, request.encoding)?;
                match request.exif {
                    Some(exif) => {
                        let (width, height) = pixels.dimensions();
                        metadata::embed_exif_webp(&bytes, exif, width, height)
                    }
                    None => Ok(bytes),
                }
            }
        }
    }
}

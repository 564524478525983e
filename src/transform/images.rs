// src/transform/images.rs

//! Raster image steps backed by the `image` crate.
//!
//! Encoding is CPU bound, so both steps hop onto the blocking pool.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageFormat};
use tracing::debug;

use crate::config::{ImageOptions, PngCompression};
use crate::errors::SiteflowError;
use crate::transform::{Asset, StepFuture, TransformStep};

/// Re-encodes JPEG and PNG sources, keeping whichever of the original and the
/// re-encoded bytes is smaller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizeImage {
    jpeg_quality: u8,
    png_compression: PngCompression,
}

impl OptimizeImage {
    pub fn new(options: &ImageOptions) -> Self {
        Self {
            jpeg_quality: options.jpeg_quality,
            png_compression: options.png_compression,
        }
    }

    /// Stable textual form of the options, mixed into cache fingerprints.
    pub fn options_key(&self) -> String {
        format!(
            "jpeg_quality={};png={:?}",
            self.jpeg_quality, self.png_compression
        )
    }

    pub fn optimize(&self, bytes: &[u8]) -> std::result::Result<Vec<u8>, String> {
        let format = image::guess_format(bytes).map_err(|e| e.to_string())?;
        let img = image::load_from_memory_with_format(bytes, format).map_err(|e| e.to_string())?;

        let mut encoded = Vec::new();
        match format {
            ImageFormat::Jpeg => {
                let encoder = JpegEncoder::new_with_quality(&mut encoded, self.jpeg_quality);
                DynamicImage::ImageRgb8(img.to_rgb8())
                    .write_with_encoder(encoder)
                    .map_err(|e| e.to_string())?;
            }
            ImageFormat::Png => {
                let compression = match self.png_compression {
                    PngCompression::Fast => CompressionType::Fast,
                    PngCompression::Default => CompressionType::Default,
                    PngCompression::Best => CompressionType::Best,
                };
                let encoder =
                    PngEncoder::new_with_quality(&mut encoded, compression, FilterType::Adaptive);
                img.write_with_encoder(encoder).map_err(|e| e.to_string())?;
            }
            other => return Err(format!("unsupported image format {other:?}")),
        }

        if encoded.len() < bytes.len() {
            Ok(encoded)
        } else {
            Ok(bytes.to_vec())
        }
    }
}

impl TransformStep for OptimizeImage {
    fn name(&self) -> &str {
        "optimize-image"
    }

    fn apply(&self, asset: Asset) -> StepFuture<'_> {
        let step = *self;
        Box::pin(async move {
            let Asset {
                source,
                relative,
                bytes,
            } = asset;
            let original = bytes.len();
            let optimized = tokio::task::spawn_blocking(move || step.optimize(&bytes))
                .await
                .map_err(|e| SiteflowError::transform(&source, format!("encoder panicked: {e}")))?
                .map_err(|m| SiteflowError::transform(&source, m))?;

            debug!(path = ?source, original, optimized = optimized.len(), "optimized image");
            Ok(Asset {
                source,
                relative,
                bytes: optimized,
            })
        })
    }
}

/// Converts any decodable raster image into lossless WebP.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertWebp;

pub fn to_webp(bytes: &[u8]) -> std::result::Result<Vec<u8>, String> {
    let img = image::load_from_memory(bytes).map_err(|e| e.to_string())?;
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img.to_rgba8())
        .write_with_encoder(WebPEncoder::new_lossless(&mut out))
        .map_err(|e| e.to_string())?;
    Ok(out.into_inner())
}

impl TransformStep for ConvertWebp {
    fn name(&self) -> &str {
        "webp"
    }

    fn apply(&self, asset: Asset) -> StepFuture<'_> {
        Box::pin(async move {
            let Asset {
                source,
                relative,
                bytes,
            } = asset;
            let converted = tokio::task::spawn_blocking(move || to_webp(&bytes))
                .await
                .map_err(|e| SiteflowError::transform(&source, format!("encoder panicked: {e}")))?
                .map_err(|m| SiteflowError::transform(&source, m))?;
            Ok(Asset {
                source,
                relative,
                bytes: converted,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use std::path::PathBuf;

    fn encoded(format: ImageFormat) -> Vec<u8> {
        let img = ImageBuffer::from_fn(32, 32, |x, y| Rgb([(x * 8) as u8, (y * 8) as u8, 128]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img).write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    fn asset(bytes: Vec<u8>) -> Asset {
        Asset {
            source: PathBuf::from("/site/src/assets/images/a.png"),
            relative: PathBuf::from("a.png"),
            bytes,
        }
    }

    #[test]
    fn never_grows_the_file() {
        let step = OptimizeImage::new(&ImageOptions::default());
        for format in [ImageFormat::Png, ImageFormat::Jpeg] {
            let original = encoded(format);
            let out = step.optimize(&original).unwrap();
            assert!(out.len() <= original.len(), "{format:?} grew");
            assert_eq!(image::guess_format(&out).unwrap(), format);
        }
    }

    #[test]
    fn non_images_are_rejected() {
        let step = OptimizeImage::new(&ImageOptions::default());
        assert!(step.optimize(b"definitely not an image").is_err());
    }

    #[tokio::test]
    async fn webp_conversion_produces_webp() {
        let out = ConvertWebp.apply(asset(encoded(ImageFormat::Png))).await.unwrap();
        assert_eq!(image::guess_format(&out.bytes).unwrap(), ImageFormat::WebP);
    }

    #[tokio::test]
    async fn failed_decode_names_the_source() {
        let err = ConvertWebp.apply(asset(b"garbage".to_vec())).await.unwrap_err();
        assert!(matches!(err, SiteflowError::Transform { ref path, .. } if path.ends_with("a.png")));
    }
}

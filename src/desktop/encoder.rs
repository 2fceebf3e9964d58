//! Frame codec
//!
//! This module handles compressing captured window images for transmission
//! and decompressing them on the viewer.

use crate::desktop::types::{Quality, MAX_QUALITY, MIN_QUALITY};
use crate::error::{CodecError, CodecResult};
use crate::window::RawImage;
use std::io::Cursor;

/// Image codec used on the video channel
pub trait FrameCodec: Send + Sync {
    /// Compresses an RGBA image
    ///
    /// # Errors
    ///
    /// Returns error if the image is malformed or encoding fails
    fn encode(&self, image: &RawImage) -> CodecResult<Vec<u8>>;

    /// Decompresses bytes back into an RGBA image
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not a valid image
    fn decode(&self, data: &[u8]) -> CodecResult<RawImage>;
}

/// JPEG codec at a fixed quality
#[derive(Debug, Clone, Copy)]
pub struct JpegCodec {
    quality: Quality,
}

impl JpegCodec {
    /// Creates a JPEG codec, clamping quality to 1-100
    pub fn new(quality: Quality) -> Self {
        Self {
            quality: quality.clamp(MIN_QUALITY, MAX_QUALITY),
        }
    }

    /// Returns the quality setting
    pub fn quality(&self) -> Quality {
        self.quality
    }
}

impl FrameCodec for JpegCodec {
    fn encode(&self, image: &RawImage) -> CodecResult<Vec<u8>> {
        if image.is_empty() || !image.is_valid() {
            return Err(CodecError::InvalidDimensions {
                width: image.width,
                height: image.height,
            });
        }

        // JPEG has no alpha channel
        let rgb: Vec<u8> = image
            .data
            .chunks_exact(4)
            .flat_map(|pixel| [pixel[0], pixel[1], pixel[2]])
            .collect();

        let mut buffer = Cursor::new(Vec::new());
        let mut encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, self.quality);
        encoder
            .encode(&rgb, image.width, image.height, image::ColorType::Rgb8)
            .map_err(|e| CodecError::EncodeFailed(e.to_string()))?;

        Ok(buffer.into_inner())
    }

    fn decode(&self, data: &[u8]) -> CodecResult<RawImage> {
        let decoded =
            image::load_from_memory(data).map_err(|e| CodecError::DecodeFailed(e.to_string()))?;
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(RawImage::new(width, height, rgba.into_raw()))
    }
}

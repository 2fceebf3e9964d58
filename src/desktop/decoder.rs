//! Frame decoding for received video frames
//!
//! This module decodes frames on the viewer and keeps running statistics.

use crate::desktop::encoder::FrameCodec;
use crate::error::CodecResult;
use crate::window::RawImage;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Statistics for frame decoding
#[derive(Debug, Clone, Default)]
pub struct DecoderStats {
    /// Total frames decoded
    pub frames_decoded: u64,
    /// Total frames dropped (failed to decode)
    pub frames_dropped: u64,
    /// Total bytes received
    pub bytes_received: u64,
    /// Total bytes decoded (uncompressed)
    pub bytes_decoded: u64,
    /// Average decode time in milliseconds
    pub avg_decode_time_ms: f64,
}

impl DecoderStats {
    /// Returns the decode success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        let total = self.frames_decoded + self.frames_dropped;
        if total == 0 {
            return 100.0;
        }
        (self.frames_decoded as f64 / total as f64) * 100.0
    }

    /// Returns the average compression ratio
    pub fn compression_ratio(&self) -> f64 {
        if self.bytes_decoded == 0 {
            return 0.0;
        }
        self.bytes_received as f64 / self.bytes_decoded as f64
    }
}

/// Frame decoder for received frames
pub struct FrameDecoder {
    codec: Arc<dyn FrameCodec>,
    last_frame: RwLock<Option<RawImage>>,
    stats: RwLock<DecoderStats>,
    decode_time_total_ms: RwLock<f64>,
}

impl FrameDecoder {
    /// Creates a decoder over a codec
    pub fn new(codec: Arc<dyn FrameCodec>) -> Self {
        Self {
            codec,
            last_frame: RwLock::new(None),
            stats: RwLock::new(DecoderStats::default()),
            decode_time_total_ms: RwLock::new(0.0),
        }
    }

    /// Decodes one frame payload
    ///
    /// A failure is counted as a dropped frame and returned to the caller,
    /// which skips the frame.
    ///
    /// # Errors
    ///
    /// Returns the codec error for an undecodable payload
    pub fn decode(&self, data: &[u8]) -> CodecResult<RawImage> {
        let start = Instant::now();
        let result = self.codec.decode(data);
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        self.update_stats(data.len(), &result, elapsed_ms);

        if let Ok(image) = &result {
            *self.last_frame.write() = Some(image.clone());
            debug!(
                "Decoded frame ({}x{}, {} bytes) in {:.2}ms",
                image.width,
                image.height,
                data.len(),
                elapsed_ms
            );
        }

        result
    }

    fn update_stats(&self, received: usize, result: &CodecResult<RawImage>, elapsed_ms: f64) {
        let mut stats = self.stats.write();
        match result {
            Ok(image) => {
                stats.frames_decoded += 1;
                stats.bytes_received += received as u64;
                stats.bytes_decoded += image.size_bytes() as u64;

                let mut total = self.decode_time_total_ms.write();
                *total += elapsed_ms;
                stats.avg_decode_time_ms = *total / stats.frames_decoded as f64;
            }
            Err(_) => stats.frames_dropped += 1,
        }
    }

    /// Returns the current statistics
    pub fn stats(&self) -> DecoderStats {
        self.stats.read().clone()
    }

    /// Returns the last decoded frame
    pub fn last_frame(&self) -> Option<RawImage> {
        self.last_frame.read().clone()
    }

    /// Resets statistics
    pub fn reset_stats(&self) {
        *self.stats.write() = DecoderStats::default();
        *self.decode_time_total_ms.write() = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desktop::encoder::JpegCodec;

    fn solid_frame(codec: &JpegCodec) -> Vec<u8> {
        let image = RawImage::new(16, 16, [40u8, 80, 120, 255].repeat(16 * 16));
        codec.encode(&image).unwrap()
    }

    #[test]
    fn test_decode_updates_stats() {
        let codec = JpegCodec::new(80);
        let decoder = FrameDecoder::new(Arc::new(codec));
        let encoded = solid_frame(&codec);

        let frame = decoder.decode(&encoded).unwrap();
        assert_eq!((frame.width, frame.height), (16, 16));

        let stats = decoder.stats();
        assert_eq!(stats.frames_decoded, 1);
        assert_eq!(stats.frames_dropped, 0);
        assert_eq!(stats.bytes_received, encoded.len() as u64);
        assert_eq!(stats.bytes_decoded, 16 * 16 * 4);
        assert!(decoder.last_frame().is_some());
    }

    #[test]
    fn test_failed_decode_is_dropped() {
        let decoder = FrameDecoder::new(Arc::new(JpegCodec::new(80)));

        assert!(decoder.decode(b"not an image").is_err());
        let stats = decoder.stats();
        assert_eq!(stats.frames_dropped, 1);
        assert_eq!(stats.success_rate(), 0.0);
        assert!(decoder.last_frame().is_none());

        decoder.reset_stats();
        assert_eq!(decoder.stats().frames_dropped, 0);
        assert_eq!(decoder.stats().success_rate(), 100.0);
    }
}

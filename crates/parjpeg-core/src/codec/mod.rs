//! Codec abstraction.
//!
//! The orchestration layer never touches DCT, entropy coding or Huffman
//! tables itself. It drives a [`JpegCodec`], which hands out one
//! [`Compressor`] context per unit of parallel work. Contexts are not shared
//! between threads: each tile, each streaming encoder and each one-shot
//! encode acquires its own and drops it when done.
//!
//! # Compression entry points
//!
//! - [`Compressor::compress`]: one contiguous (optionally strided) buffer
//! - [`Compressor::compress_scanlines`]: rows pulled one at a time as packed
//!   RGB from a [`ScanlineSource`], for inputs that should never be gathered
//!   into a single buffer

mod backend;

pub use backend::{DefaultCodec, EncoderContext};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::decode::{DecodedImage, JpegHeader};
use crate::pixel::PixelBuffer;

/// Lowest accepted JPEG quality.
pub const MIN_QUALITY: u8 = 1;
/// Highest accepted JPEG quality.
pub const MAX_QUALITY: u8 = 100;

/// Clamp any integer quality into `[1, 100]`.
///
/// Out-of-range values are clamped silently, never rejected.
pub fn clamp_quality(quality: i32) -> u8 {
    quality.clamp(MIN_QUALITY as i32, MAX_QUALITY as i32) as u8
}

/// Speed/fidelity tradeoff passed to the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CodecPreset {
    /// Approximate transforms, single pass (default for encoding)
    #[default]
    Fast,
    /// Accurate transforms and extra passes (default for decoding)
    Accurate,
}

/// Chroma subsampling of the encoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SamplingMode {
    /// No chroma subsampling
    S444,
    /// Half horizontal chroma resolution
    S422,
    /// Half horizontal and vertical chroma resolution
    #[default]
    S420,
    /// Half vertical chroma resolution
    S440,
    /// Quarter horizontal chroma resolution
    S411,
    /// Luminance only
    Gray,
}

/// Per-call compression settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressParams {
    /// Quality in `[1, 100]`
    pub quality: u8,
    pub sampling: SamplingMode,
    pub preset: CodecPreset,
}

impl CompressParams {
    /// Build parameters, clamping `quality` into range.
    pub fn new(quality: i32, sampling: SamplingMode, preset: CodecPreset) -> Self {
        Self {
            quality: clamp_quality(quality),
            sampling,
            preset,
        }
    }
}

impl Default for CompressParams {
    fn default() -> Self {
        Self::new(90, SamplingMode::default(), CodecPreset::Fast)
    }
}

/// Errors reported by a codec backend.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A compression or decompression context could not be created
    #[error("Codec context initialization failed: {0}")]
    Init(String),

    /// The image is larger than the JPEG format allows
    #[error("Image dimensions {width}x{height} exceed the JPEG limit of 65535")]
    DimensionsTooLarge { width: u32, height: u32 },

    /// The backend failed while compressing
    #[error("Compression failed: {0}")]
    Compress(String),

    /// The backend reported success but produced no bytes
    #[error("Codec produced no output")]
    EmptyOutput,

    /// The backend failed while decoding
    #[error("Decompression failed: {0}")]
    Decompress(String),

    /// Output could not be copied into a caller-owned buffer
    #[error("Out of memory copying {0} bytes of codec output")]
    OutOfMemory(usize),
}

/// Pull-based scanline input for [`Compressor::compress_scanlines`].
///
/// Rows are requested in non-decreasing order; the last row may be requested
/// more than once while the codec pads the final block row.
pub trait ScanlineSource {
    /// Packed RGB bytes (`width * 3`) of row `y`.
    fn rgb_row(&mut self, y: u32) -> &[u8];
}

/// A single-owner compression context.
pub trait Compressor: Send {
    /// Compress one contiguous buffer.
    fn compress(
        &mut self,
        image: &PixelBuffer<'_>,
        params: &CompressParams,
    ) -> Result<Vec<u8>, CodecError>;

    /// Compress an image delivered row by row as packed RGB.
    fn compress_scanlines(
        &mut self,
        width: u32,
        height: u32,
        params: &CompressParams,
        source: &mut dyn ScanlineSource,
    ) -> Result<Vec<u8>, CodecError>;
}

/// An external JPEG codec.
pub trait JpegCodec: Send + Sync {
    type Compressor: Compressor;

    /// Acquire a fresh compression context.
    fn compressor(&self) -> Result<Self::Compressor, CodecError>;

    /// Read dimensions and channel count without decoding pixels.
    fn read_header(&self, jpeg: &[u8]) -> Result<JpegHeader, CodecError>;

    /// Decode to packed RGB (3 channels) or grayscale (1 channel).
    fn decompress(&self, jpeg: &[u8], preset: CodecPreset) -> Result<DecodedImage, CodecError>;
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: clamping always lands in range and is identity inside it.
        #[test]
        fn prop_clamp_quality(quality in any::<i32>()) {
            let clamped = clamp_quality(quality);
            prop_assert!((MIN_QUALITY..=MAX_QUALITY).contains(&clamped));
            if (1..=100).contains(&quality) {
                prop_assert_eq!(clamped as i32, quality);
            }
        }
    }
}

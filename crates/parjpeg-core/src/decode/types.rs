//! Core types for JPEG decoding.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::{CodecError, CodecPreset};

/// Error types for decoding operations.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The input is empty.
    #[error("Invalid or empty JPEG input")]
    InvalidFormat,

    /// The JPEG stream could not be parsed or decoded.
    #[error("Corrupted or incomplete JPEG: {0}")]
    CorruptedFile(String),

    /// Caller-supplied output buffer is too small.
    #[error("Output buffer too small: need {required} bytes, got {actual}")]
    BufferTooSmall { required: usize, actual: usize },

    /// Out of memory while decoding or copying.
    #[error("Out of memory allocating {0} bytes during decoding")]
    OutOfMemory(usize),

    /// Any other codec failure.
    #[error("JPEG codec failure: {0}")]
    Codec(CodecError),
}

impl From<CodecError> for DecodeError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Decompress(message) => DecodeError::CorruptedFile(message),
            CodecError::OutOfMemory(len) => DecodeError::OutOfMemory(len),
            other => DecodeError::Codec(other),
        }
    }
}

/// Byte order of three-channel decoded pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChannelOrder {
    /// R, G, B
    Rgb,
    /// B, G, R
    #[default]
    Bgr,
}

/// Options for a decode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeOptions {
    /// Channel order of color output. Grayscale output is unaffected.
    pub order: ChannelOrder,
    /// Speed/fidelity preset handed to the codec.
    pub preset: CodecPreset,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            order: ChannelOrder::Bgr,
            preset: CodecPreset::Accurate,
        }
    }
}

impl DecodeOptions {
    /// Accurate decode in RGB order.
    pub fn rgb() -> Self {
        Self {
            order: ChannelOrder::Rgb,
            ..Self::default()
        }
    }

    /// Fast-preset decode in BGR order.
    pub fn fast() -> Self {
        Self {
            preset: CodecPreset::Fast,
            ..Self::default()
        }
    }
}

/// Dimensions and channel count read from a JPEG header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JpegHeader {
    pub width: u32,
    pub height: u32,
    /// 1 for grayscale, 3 for everything else.
    pub channels: u8,
}

impl JpegHeader {
    /// Bytes needed to hold the decoded pixels.
    pub fn decoded_len(&self) -> usize {
        self.width as usize * self.height as usize * self.channels as usize
    }
}

/// A decoded image.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Bytes per pixel: 1 (grayscale) or 3 (color).
    pub channels: u8,
    /// Pixel data in row-major order.
    /// Length should be width * height * channels.
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    /// Create a new DecodedImage with the given dimensions and pixel data.
    pub fn new(width: u32, height: u32, channels: u8, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(
            pixels.len(),
            width as usize * height as usize * channels as usize,
            "Pixel buffer size mismatch"
        );
        Self {
            width,
            height,
            channels,
            pixels,
        }
    }

    /// Header describing this image.
    pub fn header(&self) -> JpegHeader {
        JpegHeader {
            width: self.width,
            height: self.height,
            channels: self.channels,
        }
    }

    /// Get the total number of pixels.
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Get the size of the pixel buffer in bytes.
    pub fn byte_size(&self) -> usize {
        self.pixels.len()
    }

    /// Check if this is an empty/invalid image.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.pixels.is_empty()
    }

    /// Reorder color channels in place. Codecs always produce RGB.
    pub(crate) fn apply_order(&mut self, order: ChannelOrder) {
        if self.channels == 3 && order == ChannelOrder::Bgr {
            for px in self.pixels.chunks_exact_mut(3) {
                px.swap(0, 2);
            }
        }
    }
}

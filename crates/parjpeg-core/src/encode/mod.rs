//! Encoding pipeline.
//!
//! This module provides functionality for:
//! - Encoding a whole frame in one call ([`encode_image`], [`encode_packed`])
//! - Encoding a frame as independent tiles ([`encode_tiles`])
//! - Encoding row batches across many calls ([`StreamingEncoder`])
//!
//! # Architecture
//!
//! Every entry point funnels into the same pieces: the pixel converter, the
//! worker pool, the [`StrategySelector`] and a per-call codec context. Large
//! frames are never gathered into one buffer; they are fed to the codec in
//! batches of scanlines instead.
//!
//! # Examples
//!
//! ```ignore
//! use parjpeg_core::config::EncoderConfig;
//! use parjpeg_core::encode::encode_image;
//! use parjpeg_core::pixel::{PixelBuffer, PixelFormat};
//!
//! let pixels = vec![128u8; 100 * 100 * 3];
//! let buffer = PixelBuffer::packed(&pixels, 100, 100, PixelFormat::Bgr).unwrap();
//! let jpeg = encode_image(&buffer, 90, &EncoderConfig::default()).unwrap();
//! println!("Encoded {} bytes", jpeg.len());
//! ```

mod oneshot;
mod output;
mod scanline;
mod strategy;
mod streaming;
mod tiles;

pub use oneshot::{encode_image, encode_image_with, encode_packed, encode_packed_with};
pub use output::OutputBuffer;
pub use strategy::{total_bytes, Strategy, StrategySelector};
pub use streaming::StreamingEncoder;
pub use tiles::{encode_tiles, encode_tiles_with, EncodedTile, TileSet};

//! parjpeg Core - parallel and streaming JPEG encoding
//!
//! This crate turns in-memory pixel buffers into JPEG byte streams and back.
//! The entropy coding itself belongs to a [`codec::JpegCodec`] backend; this
//! crate owns everything around it: pixel layout conversion, row and tile
//! partitioning across worker threads, choosing between whole-frame and
//! scanline compression, and the incremental streaming encoder.

pub mod codec;
pub mod config;
pub mod decode;
pub mod encode;
pub mod error;
pub mod parallel;
pub mod pixel;

pub use codec::{clamp_quality, CodecPreset, DefaultCodec, JpegCodec, SamplingMode};
pub use config::EncoderConfig;
pub use decode::{decode_jpeg, decode_jpeg_into, read_header, DecodeError, DecodeOptions, DecodedImage, JpegHeader};
pub use encode::{encode_image, encode_packed, encode_tiles, OutputBuffer, StreamingEncoder, TileSet};
pub use error::{EncodeError, ErrorKind};
pub use parallel::{Tile, TileGrid, WorkerPool};
pub use pixel::{PackedPixels, PixelBuffer, PixelFormat, SourceImage};

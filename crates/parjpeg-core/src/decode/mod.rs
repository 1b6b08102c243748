//! JPEG decoding.
//!
//! This module provides functionality for:
//! - Reading image dimensions and channel count from a JPEG header
//! - Decoding to packed RGB or BGR (3 channels) or grayscale (1 channel)
//! - Decoding straight into a caller-supplied buffer
//!
//! Grayscale JPEGs decode to one channel; everything else decodes to three.
//!
//! # Examples
//!
//! ```ignore
//! use parjpeg_core::decode::{decode_jpeg, DecodeOptions};
//!
//! let jpeg_bytes = std::fs::read("photo.jpg").unwrap();
//! let image = decode_jpeg(&jpeg_bytes, &DecodeOptions::rgb()).unwrap();
//! println!("Decoded {}x{} image", image.width, image.height);
//! ```

mod jpeg;
mod types;

pub use jpeg::{
    decode_jpeg, decode_jpeg_into, decode_jpeg_into_with, decode_jpeg_with, read_header,
    read_header_with,
};
pub use types::{ChannelOrder, DecodeError, DecodeOptions, DecodedImage, JpegHeader};

//! JPEG decoding into owned or caller-supplied buffers.

use std::time::Instant;

use tracing::debug;

use super::{DecodeError, DecodeOptions, DecodedImage, JpegHeader};
use crate::codec::{DefaultCodec, JpegCodec};

/// Read width, height and channel count without decoding pixels.
///
/// # Errors
///
/// Returns `DecodeError::InvalidFormat` for empty input and
/// `DecodeError::CorruptedFile` if the header cannot be parsed.
pub fn read_header(bytes: &[u8]) -> Result<JpegHeader, DecodeError> {
    read_header_with(&DefaultCodec, bytes)
}

/// [`read_header`] using an explicit codec.
pub fn read_header_with<C: JpegCodec>(codec: &C, bytes: &[u8]) -> Result<JpegHeader, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::InvalidFormat);
    }
    Ok(codec.read_header(bytes)?)
}

/// Decode a JPEG into a newly allocated buffer.
///
/// # Arguments
///
/// * `bytes` - Complete JPEG file bytes
/// * `options` - Channel order and codec preset
///
/// # Returns
///
/// A `DecodedImage` with 1 channel for grayscale input and 3 channels, in
/// `options.order`, for everything else.
///
/// # Errors
///
/// Returns `DecodeError::InvalidFormat` for empty input and
/// `DecodeError::CorruptedFile` if the stream cannot be decoded.
pub fn decode_jpeg(bytes: &[u8], options: &DecodeOptions) -> Result<DecodedImage, DecodeError> {
    decode_jpeg_with(&DefaultCodec, bytes, options)
}

/// [`decode_jpeg`] using an explicit codec.
pub fn decode_jpeg_with<C: JpegCodec>(
    codec: &C,
    bytes: &[u8],
    options: &DecodeOptions,
) -> Result<DecodedImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::InvalidFormat);
    }

    let start = Instant::now();
    let mut image = codec.decompress(bytes, options.preset)?;
    image.apply_order(options.order);

    debug!(
        width = image.width,
        height = image.height,
        channels = image.channels,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "decoded jpeg"
    );
    Ok(image)
}

/// Decode a JPEG into a caller-supplied buffer.
///
/// The header is checked first, so an undersized buffer is rejected before
/// any pixels are decoded. Bytes past the decoded length are left untouched.
///
/// # Errors
///
/// Returns `DecodeError::BufferTooSmall` if `dst` cannot hold
/// `width * height * channels` bytes, plus every error of [`decode_jpeg`].
pub fn decode_jpeg_into(
    bytes: &[u8],
    options: &DecodeOptions,
    dst: &mut [u8],
) -> Result<JpegHeader, DecodeError> {
    decode_jpeg_into_with(&DefaultCodec, bytes, options, dst)
}

/// [`decode_jpeg_into`] using an explicit codec.
pub fn decode_jpeg_into_with<C: JpegCodec>(
    codec: &C,
    bytes: &[u8],
    options: &DecodeOptions,
    dst: &mut [u8],
) -> Result<JpegHeader, DecodeError> {
    let header = read_header_with(codec, bytes)?;
    let required = header.decoded_len();
    if dst.len() < required {
        return Err(DecodeError::BufferTooSmall {
            required,
            actual: dst.len(),
        });
    }

    let image = decode_jpeg_with(codec, bytes, options)?;
    let decoded = image.pixels.len().min(dst.len());
    dst[..decoded].copy_from_slice(&image.pixels[..decoded]);
    Ok(image.header())
}

//! One-shot and tiled encoding entry points.
//!
//! # Functions
//!
//! - [`parjpeg_encode_image`] - Interleaved bytes, packed rows
//! - [`parjpeg_encode_image_ex`] - Interleaved bytes with stride and threads
//! - [`parjpeg_encode_packed`] - `0xAARRGGBB` words
//! - [`parjpeg_encode_tiles`] / [`parjpeg_encode_tiles_bytes`] - One JPEG per tile
//! - [`parjpeg_free_jpeg`] / [`parjpeg_free_tiles`] - Release results

use std::os::raw::c_int;
use std::slice;

use parjpeg_core::config::EncoderConfig;
use parjpeg_core::encode::{self, OutputBuffer};
use parjpeg_core::error::EncodeError;
use parjpeg_core::pixel::{PackedPixels, PixelBuffer, PixelFormat, SourceImage};
use tracing::warn;

use crate::types::{JpegData, TileArray};
use crate::{dimensions, guard, thread_override};

fn config_for(threads: c_int) -> EncoderConfig {
    EncoderConfig {
        threads: thread_override(threads),
        ..EncoderConfig::default()
    }
}

fn into_jpeg(entry: &str, result: Result<OutputBuffer, EncodeError>) -> JpegData {
    match result {
        Ok(buffer) => JpegData::from(buffer),
        Err(err) => {
            warn!(entry, error = %err, kind = ?err.kind(), "encode failed");
            JpegData::empty()
        }
    }
}

/// Bytes spanned by `height` rows `stride` apart, or `None` on overflow.
fn span(stride: usize, row_len: usize, height: u32) -> Option<usize> {
    (height as usize - 1).checked_mul(stride)?.checked_add(row_len)
}

/// Encode interleaved pixels with packed rows.
///
/// `pixel_format` is 0 = RGB, 1 = BGR, 2 = BGRA, 3 = RGBA. Quality is clamped
/// into `[1, 100]`.
///
/// # Safety
///
/// `pixels` must point to `width * height * bpp` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn parjpeg_encode_image(
    pixels: *const u8,
    width: c_int,
    height: c_int,
    quality: c_int,
    pixel_format: c_int,
) -> JpegData {
    parjpeg_encode_image_ex(pixels, width, height, 0, quality, pixel_format, 0)
}

/// Encode interleaved pixels with an explicit row stride and thread count.
///
/// `stride` 0 means packed rows; `threads` 0 or negative means detect.
///
/// # Safety
///
/// `pixels` must point to `(height - 1) * stride + width * bpp` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn parjpeg_encode_image_ex(
    pixels: *const u8,
    width: c_int,
    height: c_int,
    stride: c_int,
    quality: c_int,
    pixel_format: c_int,
    threads: c_int,
) -> JpegData {
    guard("parjpeg_encode_image_ex", JpegData::empty(), || {
        let (Some((width, height)), Ok(stride)) = (dimensions(width, height), usize::try_from(stride)) else {
            return JpegData::empty();
        };
        if pixels.is_null() {
            return JpegData::empty();
        }
        let format = match PixelFormat::from_id(pixel_format) {
            Ok(format) => format,
            Err(err) => return into_jpeg("parjpeg_encode_image_ex", Err(err)),
        };

        let row_bytes = width as usize * format.bytes_per_pixel();
        let Some(len) = span(if stride == 0 { row_bytes } else { stride }, row_bytes, height) else {
            return JpegData::empty();
        };

        let data = slice::from_raw_parts(pixels, len);
        let result = PixelBuffer::new(data, width, height, format, stride)
            .and_then(|buffer| encode::encode_image(&buffer, quality, &config_for(threads)));
        into_jpeg("parjpeg_encode_image_ex", result)
    })
}

/// Encode packed `0xAARRGGBB` words, `width` words per row.
///
/// # Safety
///
/// `pixels` must point to `width * height` readable words.
#[no_mangle]
pub unsafe extern "C" fn parjpeg_encode_packed(
    pixels: *const u32,
    width: c_int,
    height: c_int,
    quality: c_int,
    threads: c_int,
) -> JpegData {
    guard("parjpeg_encode_packed", JpegData::empty(), || {
        let Some((width, height)) = dimensions(width, height) else {
            return JpegData::empty();
        };
        if pixels.is_null() {
            return JpegData::empty();
        }

        let words = slice::from_raw_parts(pixels, width as usize * height as usize);
        let result = PackedPixels::new(words, width, height, 0)
            .and_then(|packed| encode::encode_packed(&packed, quality, &config_for(threads)));
        into_jpeg("parjpeg_encode_packed", result)
    })
}

fn into_tiles(entry: &str, image: Result<SourceImage<'_>, EncodeError>, quality: c_int, tile_size: c_int) -> TileArray {
    let Ok(tile_size) = u32::try_from(tile_size) else {
        warn!(entry, tile_size, "negative tile size");
        return TileArray::empty();
    };

    match image.and_then(|image| encode::encode_tiles(&image, quality, tile_size, &EncoderConfig::default())) {
        Ok(set) => TileArray::from(set),
        Err(err) => {
            warn!(entry, error = %err, kind = ?err.kind(), "tile encode failed");
            TileArray::empty()
        }
    }
}

/// Encode packed words as independent `tile_size` square tiles.
///
/// Tiles that fail to encode have null `data` and zero `size`; the others are
/// unaffected. A whole-call failure returns an array with null `tiles`.
///
/// # Safety
///
/// `pixels` must point to `width * height` readable words.
#[no_mangle]
pub unsafe extern "C" fn parjpeg_encode_tiles(
    pixels: *const u32,
    width: c_int,
    height: c_int,
    quality: c_int,
    tile_size: c_int,
) -> TileArray {
    guard("parjpeg_encode_tiles", TileArray::empty(), || {
        let Some((width, height)) = dimensions(width, height) else {
            return TileArray::empty();
        };
        if pixels.is_null() {
            return TileArray::empty();
        }

        let words = slice::from_raw_parts(pixels, width as usize * height as usize);
        let image = PackedPixels::new(words, width, height, 0).map(SourceImage::from);
        into_tiles("parjpeg_encode_tiles", image, quality, tile_size)
    })
}

/// Encode interleaved pixels as independent tiles.
///
/// # Safety
///
/// `pixels` must point to `width * height * bpp` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn parjpeg_encode_tiles_bytes(
    pixels: *const u8,
    width: c_int,
    height: c_int,
    quality: c_int,
    tile_size: c_int,
    pixel_format: c_int,
) -> TileArray {
    guard("parjpeg_encode_tiles_bytes", TileArray::empty(), || {
        let Some((width, height)) = dimensions(width, height) else {
            return TileArray::empty();
        };
        if pixels.is_null() {
            return TileArray::empty();
        }
        let format = match PixelFormat::from_id(pixel_format) {
            Ok(format) => format,
            Err(err) => return into_tiles("parjpeg_encode_tiles_bytes", Err(err), quality, tile_size),
        };

        let len = width as usize * height as usize * format.bytes_per_pixel();
        let data = slice::from_raw_parts(pixels, len);
        let image = PixelBuffer::packed(data, width, height, format).map(SourceImage::from);
        into_tiles("parjpeg_encode_tiles_bytes", image, quality, tile_size)
    })
}

/// Release a [`JpegData`] and null it. Null or already released input is a no-op.
///
/// # Safety
///
/// `jpeg` must be null or point to a `JpegData` returned by this library.
#[no_mangle]
pub unsafe extern "C" fn parjpeg_free_jpeg(jpeg: *mut JpegData) {
    if let Some(jpeg) = jpeg.as_mut() {
        guard("parjpeg_free_jpeg", (), || jpeg.release());
    }
}

/// Release every tile of a [`TileArray`] and the array itself, then null it.
///
/// # Safety
///
/// `tiles` must be null or point to a `TileArray` returned by this library.
#[no_mangle]
pub unsafe extern "C" fn parjpeg_free_tiles(tiles: *mut TileArray) {
    if let Some(tiles) = tiles.as_mut() {
        guard("parjpeg_free_tiles", (), || tiles.release());
    }
}

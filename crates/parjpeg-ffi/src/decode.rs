//! Header reading and decoding entry points.
//!
//! `order` selects the byte order of color output: 0 = RGB, 1 = BGR.
//! Grayscale JPEGs always decode to one channel.

use std::os::raw::c_int;
use std::slice;

use parjpeg_core::decode::{self, ChannelOrder, DecodeError, DecodeOptions};
use tracing::warn;

use crate::guard;
use crate::types::{JpegInfo, RawImage};

/// Status for a buffer that is too small for the decoded image.
const BUFFER_TOO_SMALL: c_int = -2;

fn channel_order(order: c_int) -> Option<ChannelOrder> {
    match order {
        0 => Some(ChannelOrder::Rgb),
        1 => Some(ChannelOrder::Bgr),
        _ => None,
    }
}

unsafe fn input<'a>(data: *const u8, size: usize) -> Option<&'a [u8]> {
    if data.is_null() || size == 0 {
        None
    } else {
        Some(slice::from_raw_parts(data, size))
    }
}

fn log_failure(entry: &str, err: &DecodeError) {
    warn!(entry, error = %err, "decode failed");
}

/// Read width, height and channels into `info` without decoding pixels.
///
/// Returns 0 on success and -1 on failure, leaving `info` untouched.
///
/// # Safety
///
/// `data` must point to `size` readable bytes and `info` must be writable.
#[no_mangle]
pub unsafe extern "C" fn parjpeg_read_header(data: *const u8, size: usize, info: *mut JpegInfo) -> c_int {
    guard("parjpeg_read_header", -1, || {
        let (Some(bytes), Some(info)) = (input(data, size), info.as_mut()) else {
            return -1;
        };
        match decode::read_header(bytes) {
            Ok(header) => {
                *info = JpegInfo::from(header);
                0
            }
            Err(err) => {
                log_failure("parjpeg_read_header", &err);
                -1
            }
        }
    })
}

unsafe fn decode_with(entry: &str, data: *const u8, size: usize, order: c_int, options: DecodeOptions) -> RawImage {
    let (Some(bytes), Some(order)) = (input(data, size), channel_order(order)) else {
        return RawImage::empty();
    };
    match decode::decode_jpeg(bytes, &DecodeOptions { order, ..options }) {
        Ok(image) => RawImage::from(image),
        Err(err) => {
            log_failure(entry, &err);
            RawImage::empty()
        }
    }
}

/// Decode a JPEG with the accurate preset.
///
/// Returns an empty [`RawImage`] on failure. Release with
/// [`parjpeg_free_image`].
///
/// # Safety
///
/// `data` must point to `size` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn parjpeg_decode(data: *const u8, size: usize, order: c_int) -> RawImage {
    guard("parjpeg_decode", RawImage::empty(), || {
        decode_with("parjpeg_decode", data, size, order, DecodeOptions::default())
    })
}

/// Decode a JPEG with the fast preset.
///
/// # Safety
///
/// `data` must point to `size` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn parjpeg_decode_fast(data: *const u8, size: usize, order: c_int) -> RawImage {
    guard("parjpeg_decode_fast", RawImage::empty(), || {
        decode_with("parjpeg_decode_fast", data, size, order, DecodeOptions::fast())
    })
}

/// Decode into a caller-supplied buffer.
///
/// Returns 0 on success, -2 if `dst_size` is smaller than
/// `width * height * channels`, and -1 on any other failure. `info` may be
/// null; when it is not, it receives the header on success and on -2.
///
/// # Safety
///
/// `data` must point to `size` readable bytes and `dst` to `dst_size`
/// writable bytes.
#[no_mangle]
pub unsafe extern "C" fn parjpeg_decode_into(
    data: *const u8,
    size: usize,
    order: c_int,
    dst: *mut u8,
    dst_size: usize,
    info: *mut JpegInfo,
) -> c_int {
    guard("parjpeg_decode_into", -1, || {
        let (Some(bytes), Some(order)) = (input(data, size), channel_order(order)) else {
            return -1;
        };
        if dst.is_null() {
            return -1;
        }

        let dst = slice::from_raw_parts_mut(dst, dst_size);
        let options = DecodeOptions {
            order,
            ..DecodeOptions::default()
        };
        match decode::decode_jpeg_into(bytes, &options, dst) {
            Ok(header) => {
                if let Some(info) = info.as_mut() {
                    *info = JpegInfo::from(header);
                }
                0
            }
            Err(err @ DecodeError::BufferTooSmall { .. }) => {
                log_failure("parjpeg_decode_into", &err);
                if let (Some(info), Ok(header)) = (info.as_mut(), decode::read_header(bytes)) {
                    *info = JpegInfo::from(header);
                }
                BUFFER_TOO_SMALL
            }
            Err(err) => {
                log_failure("parjpeg_decode_into", &err);
                -1
            }
        }
    })
}

/// Release pixels returned by [`parjpeg_decode`] and reset `image`.
///
/// Null and already-released images are ignored.
///
/// # Safety
///
/// `image` must be null or point to a [`RawImage`] from this library.
#[no_mangle]
pub unsafe extern "C" fn parjpeg_free_image(image: *mut RawImage) {
    if let Some(image) = image.as_mut() {
        guard("parjpeg_free_image", (), || image.release());
    }
}

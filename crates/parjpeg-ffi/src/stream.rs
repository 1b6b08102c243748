//! Streaming encoder handles.
//!
//! A handle wraps one [`StreamingEncoder`]. Callers create it, write rows in
//! order across any number of calls, finalize once, and destroy it. Destroy
//! is valid at any point and is the only way to cancel.

use std::os::raw::c_int;
use std::ptr;
use std::slice;

use parjpeg_core::config::EncoderConfig;
use parjpeg_core::encode::StreamingEncoder;
use parjpeg_core::error::EncodeError;
use parjpeg_core::pixel::PixelFormat;
use tracing::warn;

use crate::types::JpegData;
use crate::{dimensions, guard, thread_override};

/// Opaque streaming encoder handle.
#[repr(C)]
pub struct ParjpegStreamEncoder {
    _private: [u8; 0],
}

unsafe fn encoder_mut<'a>(handle: *mut ParjpegStreamEncoder) -> Option<&'a mut StreamingEncoder> {
    handle.cast::<StreamingEncoder>().as_mut()
}

/// Create a streaming encoder with the detected thread count.
///
/// Returns null on invalid dimensions or format.
#[no_mangle]
pub extern "C" fn parjpeg_stream_create(
    width: c_int,
    height: c_int,
    quality: c_int,
    pixel_format: c_int,
) -> *mut ParjpegStreamEncoder {
    parjpeg_stream_create_ex(width, height, quality, pixel_format, 0)
}

/// Create a streaming encoder with an explicit thread count (0 = detect).
#[no_mangle]
pub extern "C" fn parjpeg_stream_create_ex(
    width: c_int,
    height: c_int,
    quality: c_int,
    pixel_format: c_int,
    threads: c_int,
) -> *mut ParjpegStreamEncoder {
    guard("parjpeg_stream_create_ex", ptr::null_mut(), || {
        let result = dimensions(width, height)
            .ok_or(EncodeError::InvalidDimensions {
                width: width.max(0) as u32,
                height: height.max(0) as u32,
            })
            .and_then(|(width, height)| {
                let format = PixelFormat::from_id(pixel_format)?;
                let config = EncoderConfig {
                    threads: thread_override(threads),
                    ..EncoderConfig::default()
                };
                StreamingEncoder::new(width, height, quality, format, config)
            });

        match result {
            Ok(encoder) => Box::into_raw(Box::new(encoder)).cast::<ParjpegStreamEncoder>(),
            Err(err) => {
                warn!(error = %err, "stream create failed");
                ptr::null_mut()
            }
        }
    })
}

fn rows_result(entry: &str, result: Result<u32, EncodeError>) -> c_int {
    match result {
        Ok(total) => c_int::try_from(total).unwrap_or(c_int::MAX),
        Err(err) => {
            warn!(entry, error = %err, kind = ?err.kind(), "row write rejected");
            -1
        }
    }
}

/// Append `row_count` rows of interleaved pixels in the encoder's format.
///
/// Returns the total rows written so far, or -1 if the write was rejected
/// (overflow, finalized encoder, bad arguments). A rejected write stores
/// nothing.
///
/// # Safety
///
/// `handle` must come from [`parjpeg_stream_create`] and not be destroyed.
/// `rows` must point to `row_count * width * bpp` readable bytes.
#[no_mangle]
pub unsafe extern "C" fn parjpeg_stream_write_rows(
    handle: *mut ParjpegStreamEncoder,
    rows: *const u8,
    row_count: c_int,
) -> c_int {
    guard("parjpeg_stream_write_rows", -1, || {
        let (Some(encoder), Ok(count)) = (encoder_mut(handle), u32::try_from(row_count)) else {
            return -1;
        };
        if count == 0 {
            return rows_result("parjpeg_stream_write_rows", Ok(encoder.rows_written()));
        }
        if rows.is_null() {
            return -1;
        }
        if count > encoder.height() - encoder.rows_written() {
            // rejected before the caller's memory is touched
            return rows_result("parjpeg_stream_write_rows", encoder.write_rows(&[], count));
        }

        let len = count as usize * encoder.width() as usize * encoder.format().bytes_per_pixel();
        let data = slice::from_raw_parts(rows, len);
        rows_result("parjpeg_stream_write_rows", encoder.write_rows(data, count))
    })
}

/// Append `row_count` rows of packed `0xAARRGGBB` words.
///
/// Same return convention as [`parjpeg_stream_write_rows`].
///
/// # Safety
///
/// `handle` must be live. `rows` must point to `row_count * width` words.
#[no_mangle]
pub unsafe extern "C" fn parjpeg_stream_write_rows_packed(
    handle: *mut ParjpegStreamEncoder,
    rows: *const u32,
    row_count: c_int,
) -> c_int {
    guard("parjpeg_stream_write_rows_packed", -1, || {
        let (Some(encoder), Ok(count)) = (encoder_mut(handle), u32::try_from(row_count)) else {
            return -1;
        };
        if count == 0 {
            return rows_result("parjpeg_stream_write_rows_packed", Ok(encoder.rows_written()));
        }
        if rows.is_null() {
            return -1;
        }
        if count > encoder.height() - encoder.rows_written() {
            return rows_result("parjpeg_stream_write_rows_packed", encoder.write_packed_rows(&[], count));
        }

        let words = slice::from_raw_parts(rows, count as usize * encoder.width() as usize);
        rows_result("parjpeg_stream_write_rows_packed", encoder.write_packed_rows(words, count))
    })
}

/// Rows written so far, or -1 for a null handle.
///
/// # Safety
///
/// `handle` must be null or live.
#[no_mangle]
pub unsafe extern "C" fn parjpeg_stream_rows_written(handle: *mut ParjpegStreamEncoder) -> c_int {
    guard("parjpeg_stream_rows_written", -1, || match encoder_mut(handle) {
        Some(encoder) => c_int::try_from(encoder.rows_written()).unwrap_or(c_int::MAX),
        None => -1,
    })
}

/// Compress every written row into one JPEG.
///
/// Returns an empty [`JpegData`] if rows are missing (the handle stays usable)
/// or compression fails (the rows are gone). The handle must still be
/// destroyed afterwards.
///
/// # Safety
///
/// `handle` must be live.
#[no_mangle]
pub unsafe extern "C" fn parjpeg_stream_finalize(handle: *mut ParjpegStreamEncoder) -> JpegData {
    guard("parjpeg_stream_finalize", JpegData::empty(), || {
        let Some(encoder) = encoder_mut(handle) else {
            return JpegData::empty();
        };
        match encoder.finalize() {
            Ok(buffer) => JpegData::from(buffer),
            Err(err) => {
                warn!(error = %err, kind = ?err.kind(), "stream finalize failed");
                JpegData::empty()
            }
        }
    })
}

/// Free the encoder and every row it holds. Null is a no-op.
///
/// # Safety
///
/// `handle` must be null or live; it is dangling afterwards.
#[no_mangle]
pub unsafe extern "C" fn parjpeg_stream_destroy(handle: *mut ParjpegStreamEncoder) {
    if !handle.is_null() {
        guard("parjpeg_stream_destroy", (), || {
            drop(Box::from_raw(handle.cast::<StreamingEncoder>()));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::parjpeg_free_jpeg;
    use parjpeg_core::decode::{decode_jpeg, DecodeOptions};

    #[test]
    fn test_full_lifecycle() {
        let (width, height) = (20, 12);
        let rows = vec![128u8; width * height * 3];
        let handle = parjpeg_stream_create(width as c_int, height as c_int, 90, 1);
        assert!(!handle.is_null());

        unsafe {
            assert_eq!(parjpeg_stream_write_rows(handle, rows.as_ptr(), 5), 5);
            assert_eq!(parjpeg_stream_write_rows(handle, rows.as_ptr(), 7), 12);

            let mut jpeg = parjpeg_stream_finalize(handle);
            assert!(!jpeg.is_empty());

            let data = slice::from_raw_parts(jpeg.data, jpeg.size);
            let image = decode_jpeg(data, &DecodeOptions::default()).unwrap();
            assert_eq!((image.width, image.height), (20, 12));

            parjpeg_free_jpeg(&mut jpeg);
            parjpeg_stream_destroy(handle);
        }
    }

    #[test]
    fn test_overflow_rejected_count_unchanged() {
        let rows = vec![0u8; 4 * 10 * 3];
        let handle = parjpeg_stream_create(4, 5, 90, 0);

        unsafe {
            assert_eq!(parjpeg_stream_write_rows(handle, rows.as_ptr(), 3), 3);
            assert_eq!(parjpeg_stream_write_rows(handle, rows.as_ptr(), 3), -1);
            assert_eq!(parjpeg_stream_rows_written(handle), 3);
            assert_eq!(parjpeg_stream_write_rows(handle, rows.as_ptr(), -1), -1);
            assert_eq!(parjpeg_stream_write_rows(handle, std::ptr::null(), 0), 3);
            parjpeg_stream_destroy(handle);
        }
    }

    #[test]
    fn test_short_write_finalize_empty_then_complete() {
        let rows = vec![50u8; 8 * 8 * 3];
        let handle = parjpeg_stream_create(8, 8, 90, 1);

        unsafe {
            parjpeg_stream_write_rows(handle, rows.as_ptr(), 4);
            assert!(parjpeg_stream_finalize(handle).is_empty());

            assert_eq!(parjpeg_stream_write_rows(handle, rows.as_ptr(), 4), 8);
            let mut jpeg = parjpeg_stream_finalize(handle);
            assert!(!jpeg.is_empty());
            assert!(parjpeg_stream_finalize(handle).is_empty());

            parjpeg_free_jpeg(&mut jpeg);
            parjpeg_stream_destroy(handle);
        }
    }

    #[test]
    fn test_packed_rows() {
        let words = vec![0x0000_FF00u32; 16 * 16];
        let handle = parjpeg_stream_create_ex(16, 16, 95, 1, 2);

        unsafe {
            assert_eq!(parjpeg_stream_write_rows_packed(handle, words.as_ptr(), 16), 16);
            let mut jpeg = parjpeg_stream_finalize(handle);

            let data = slice::from_raw_parts(jpeg.data, jpeg.size);
            let image = decode_jpeg(data, &DecodeOptions::rgb()).unwrap();
            assert!(image.pixels[1] > 240 && image.pixels[0] < 15 && image.pixels[2] < 15);

            parjpeg_free_jpeg(&mut jpeg);
            parjpeg_stream_destroy(handle);
        }
    }

    #[test]
    fn test_destroy_without_finalize_and_null_handles() {
        let rows = vec![0u8; 6 * 3 * 3];
        let handle = parjpeg_stream_create(6, 6, 90, 1);

        unsafe {
            parjpeg_stream_write_rows(handle, rows.as_ptr(), 3);
            parjpeg_stream_destroy(handle);

            parjpeg_stream_destroy(std::ptr::null_mut());
            assert_eq!(parjpeg_stream_write_rows(std::ptr::null_mut(), rows.as_ptr(), 1), -1);
            assert!(parjpeg_stream_finalize(std::ptr::null_mut()).is_empty());
        }
    }

    #[test]
    fn test_create_rejects_bad_arguments() {
        assert!(parjpeg_stream_create(0, 10, 90, 1).is_null());
        assert!(parjpeg_stream_create(10, -1, 90, 1).is_null());
        assert!(parjpeg_stream_create(10, 10, 90, 9).is_null());
    }
}

//! parjpeg FFI - C ABI bindings for parjpeg
//!
//! This crate exposes the parjpeg-core encoders and decoder to managed
//! runtimes through plain `extern "C"` functions.
//!
//! # Module Structure
//!
//! - `types` - `#[repr(C)]` result structs and their release logic
//! - `encode` - One-shot and tiled encoding
//! - `stream` - Streaming encoder handles
//! - `decode` - Header reading and decoding
//!
//! # Conventions
//!
//! - Failures return a sentinel: a null/zero struct, a null handle, or `-1`.
//!   Details go to the `tracing` log (see [`parjpeg_init_logging`]).
//! - No panic crosses the boundary; a panic is reported like any failure.
//! - Input pointers are borrowed for the duration of the call only.
//! - Every returned buffer must be passed to its release function exactly
//!   once; the release functions null the caller's struct, so repeating a
//!   release is harmless.

use std::ffi::c_char;
use std::os::raw::c_int;
use std::panic::{self, AssertUnwindSafe};

use tracing::error;
use tracing_subscriber::EnvFilter;

mod decode;
mod encode;
mod stream;
mod types;

pub use decode::{parjpeg_decode, parjpeg_decode_fast, parjpeg_decode_into, parjpeg_free_image, parjpeg_read_header};
pub use encode::{
    parjpeg_encode_image, parjpeg_encode_image_ex, parjpeg_encode_packed, parjpeg_encode_tiles,
    parjpeg_encode_tiles_bytes, parjpeg_free_jpeg, parjpeg_free_tiles,
};
pub use stream::{
    parjpeg_stream_create, parjpeg_stream_create_ex, parjpeg_stream_destroy, parjpeg_stream_finalize,
    parjpeg_stream_rows_written, parjpeg_stream_write_rows, parjpeg_stream_write_rows_packed,
    ParjpegStreamEncoder,
};
pub use types::{JpegData, JpegInfo, RawImage, TileArray, TileJpeg};

/// Run `f`, turning a panic into `fallback`.
pub(crate) fn guard<T>(name: &str, fallback: T, f: impl FnOnce() -> T) -> T {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error!(entry = name, "panic caught at the FFI boundary");
            fallback
        }
    }
}

/// Install a `tracing` subscriber writing to stderr.
///
/// The filter comes from `RUST_LOG` and defaults to `warn`. Returns 1 if a
/// subscriber was installed and 0 if one was already present.
#[no_mangle]
pub extern "C" fn parjpeg_init_logging() -> c_int {
    guard("parjpeg_init_logging", 0, || {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        match tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init() {
            Ok(()) => 1,
            Err(_) => 0,
        }
    })
}

/// Library version as a static NUL-terminated string.
#[no_mangle]
pub extern "C" fn parjpeg_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr().cast()
}

/// `Some(n)` for a positive value, `None` for zero or negative ("detect").
pub(crate) fn thread_override(threads: c_int) -> Option<usize> {
    usize::try_from(threads).ok().filter(|&n| n > 0)
}

/// Positive width and height, or `None`.
pub(crate) fn dimensions(width: c_int, height: c_int) -> Option<(u32, u32)> {
    match (u32::try_from(width), u32::try_from(height)) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => Some((w, h)),
        _ => None,
    }
}

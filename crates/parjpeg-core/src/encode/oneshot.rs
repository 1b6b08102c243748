//! Whole-frame encoding.
//!
//! A frame is handed to the codec using the [`Strategy`] picked by
//! [`StrategySelector`]. If the codec fails on a direct or contiguous buffer,
//! the frame is retried through the scanline entry point one row at a time on
//! the calling thread, using a single row of scratch.

use std::time::Instant;

use tracing::{debug, info, warn};

use super::scanline::BatchedScanlines;
use super::strategy::{total_bytes, Strategy, StrategySelector};
use super::OutputBuffer;
use crate::codec::{CodecError, CompressParams, Compressor, DefaultCodec, JpegCodec};
use crate::config::EncoderConfig;
use crate::error::EncodeError;
use crate::parallel::WorkerPool;
use crate::pixel::convert::convert_image;
use crate::pixel::{PackedPixels, PixelBuffer, PixelFormat, SourceImage};

/// Encode an interleaved buffer to JPEG.
///
/// # Arguments
///
/// * `buffer` - Validated pixels in any [`PixelFormat`], optionally strided
/// * `quality` - JPEG quality; clamped into `[1, 100]`
/// * `config` - Threading, sampling and preset
///
/// # Errors
///
/// Returns `EncodeError::Codec` if both the primary and the fallback path
/// fail.
pub fn encode_image(
    buffer: &PixelBuffer<'_>,
    quality: i32,
    config: &EncoderConfig,
) -> Result<OutputBuffer, EncodeError> {
    encode_image_with(&DefaultCodec, buffer, quality, config)
}

/// [`encode_image`] using an explicit codec.
pub fn encode_image_with<C: JpegCodec>(
    codec: &C,
    buffer: &PixelBuffer<'_>,
    quality: i32,
    config: &EncoderConfig,
) -> Result<OutputBuffer, EncodeError> {
    encode_frame(codec, &SourceImage::from(*buffer), quality, config)
}

/// Encode packed `0xAARRGGBB` words to JPEG.
///
/// On little-endian hosts the words are compressed in place as BGRX when
/// `config.zero_copy` is set. Otherwise they are converted to BGR across
/// `config.threads` workers first, or streamed through the scanline path if
/// the frame is at or above the batch threshold.
///
/// # Errors
///
/// Same as [`encode_image`].
pub fn encode_packed(
    packed: &PackedPixels<'_>,
    quality: i32,
    config: &EncoderConfig,
) -> Result<OutputBuffer, EncodeError> {
    encode_packed_with(&DefaultCodec, packed, quality, config)
}

/// [`encode_packed`] using an explicit codec.
pub fn encode_packed_with<C: JpegCodec>(
    codec: &C,
    packed: &PackedPixels<'_>,
    quality: i32,
    config: &EncoderConfig,
) -> Result<OutputBuffer, EncodeError> {
    if config.zero_copy {
        if let Some(view) = packed.as_bgra_bytes() {
            return encode_frame(codec, &SourceImage::from(view), quality, config);
        }
    }
    encode_frame(codec, &SourceImage::from(*packed), quality, config)
}

fn encode_frame<C: JpegCodec>(
    codec: &C,
    image: &SourceImage<'_>,
    quality: i32,
    config: &EncoderConfig,
) -> Result<OutputBuffer, EncodeError> {
    let start = Instant::now();
    let params = config.params(quality);
    let pool = config.pool();
    let (width, height) = (image.width(), image.height());

    let direct = matches!(image, SourceImage::Interleaved(_));
    let strategy = StrategySelector::from_config(config).select(total_bytes(width, height, 3), direct);
    debug!(width, height, ?strategy, threads = pool.threads(), "encoding frame");

    let mut compressor = codec.compressor()?;
    let result = match strategy {
        Strategy::Direct => match image {
            SourceImage::Interleaved(buffer) => compressor.compress(buffer, &params).map_err(EncodeError::from),
            SourceImage::Packed(_) => compress_contiguous(&mut compressor, &pool, image, &params),
        },
        Strategy::Contiguous => compress_contiguous(&mut compressor, &pool, image, &params),
        Strategy::Scanline => compress_batched(&mut compressor, pool, config.batch_rows(), image, &params),
    };

    let bytes = match result {
        Ok(bytes) => bytes,
        Err(err) if strategy != Strategy::Scanline && is_retryable(&err) => {
            warn!(error = %err, ?strategy, "frame encode failed, retrying row by row");
            compress_batched(&mut compressor, WorkerPool::single(), 1, image, &params)?
        }
        Err(err) => return Err(err),
    };

    info!(
        width,
        height,
        ?strategy,
        bytes = bytes.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "encoded frame"
    );
    Ok(OutputBuffer::new(bytes))
}

/// Errors that a row-at-a-time retry can plausibly get past.
fn is_retryable(err: &EncodeError) -> bool {
    match err {
        EncodeError::Codec(CodecError::DimensionsTooLarge { .. }) => false,
        EncodeError::Codec(_) | EncodeError::ResourceExhausted(_) => true,
        _ => false,
    }
}

fn compress_contiguous<P: Compressor>(
    compressor: &mut P,
    pool: &WorkerPool,
    image: &SourceImage<'_>,
    params: &CompressParams,
) -> Result<Vec<u8>, EncodeError> {
    let converted = convert_image(pool, image, PixelFormat::Bgr)?;
    let view = PixelBuffer::packed(&converted, image.width(), image.height(), PixelFormat::Bgr)?;
    Ok(compressor.compress(&view, params)?)
}

fn compress_batched<P: Compressor>(
    compressor: &mut P,
    pool: WorkerPool,
    batch_rows: u32,
    image: &SourceImage<'_>,
    params: &CompressParams,
) -> Result<Vec<u8>, EncodeError> {
    let mut feeder = BatchedScanlines::new(image, pool, batch_rows)?;
    Ok(compressor.compress_scanlines(image.width(), image.height(), params, &mut feeder)?)
}

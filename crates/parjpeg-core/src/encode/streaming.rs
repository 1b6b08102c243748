//! Incremental row-by-row encoding.
//!
//! A [`StreamingEncoder`] accepts rows across any number of calls, stores
//! each row on its own, and compresses everything into one JPEG when
//! finalized.
//!
//! # Lifecycle
//!
//! create → append-only row writes → finalize → drop
//!
//! - Writes that would pass the declared height are rejected and change
//!   nothing.
//! - Finalizing early is rejected and changes nothing; the caller may keep
//!   writing.
//! - A successful or failed finalize consumes the stored rows. The encoder
//!   cannot be reused afterwards.
//! - Dropping the encoder at any point frees everything it holds.
//!
//! # Finalize strategies
//!
//! Below the batch threshold the rows are copied in parallel into one
//! contiguous buffer and compressed in a single call. At or above it, or if
//! the contiguous call fails, rows are fed to the scanline entry point in
//! batches and no whole-frame buffer is allocated.

use std::time::Instant;

use tracing::{debug, info, warn};

use super::scanline::{BatchedScanlines, StoredRows};
use super::strategy::{total_bytes, Strategy, StrategySelector};
use super::OutputBuffer;
use crate::codec::{CompressParams, Compressor, DefaultCodec, JpegCodec};
use crate::config::EncoderConfig;
use crate::error::{try_alloc, EncodeError};
use crate::parallel::WorkerPool;
use crate::pixel::convert::convert_packed_rows;
use crate::pixel::{PixelBuffer, PixelFormat};

/// Stateful encoder fed one batch of rows at a time.
pub struct StreamingEncoder<C: JpegCodec = DefaultCodec> {
    codec: C,
    compressor: Option<C::Compressor>,
    width: u32,
    height: u32,
    params: CompressParams,
    format: PixelFormat,
    rows: Vec<Vec<u8>>,
    config: EncoderConfig,
    pool: WorkerPool,
    finalized: bool,
}

impl StreamingEncoder<DefaultCodec> {
    /// Create an encoder for a `width x height` image.
    ///
    /// # Arguments
    ///
    /// * `quality` - JPEG quality; clamped into `[1, 100]`
    /// * `format` - Layout of rows passed to [`StreamingEncoder::write_rows`],
    ///   and the layout packed rows are stored in
    ///
    /// # Errors
    ///
    /// Returns `InvalidDimensions` if a dimension is zero and
    /// `ResourceExhausted` if the row table cannot be allocated.
    pub fn new(
        width: u32,
        height: u32,
        quality: i32,
        format: PixelFormat,
        config: EncoderConfig,
    ) -> Result<Self, EncodeError> {
        Self::with_codec(DefaultCodec, width, height, quality, format, config)
    }
}

impl<C: JpegCodec> StreamingEncoder<C> {
    /// [`StreamingEncoder::new`] using an explicit codec.
    pub fn with_codec(
        codec: C,
        width: u32,
        height: u32,
        quality: i32,
        format: PixelFormat,
        config: EncoderConfig,
    ) -> Result<Self, EncodeError> {
        if width == 0 || height == 0 {
            return Err(EncodeError::InvalidDimensions { width, height });
        }

        let mut rows = Vec::new();
        rows.try_reserve_exact(height as usize).map_err(|_| {
            EncodeError::ResourceExhausted(height as usize * std::mem::size_of::<Vec<u8>>())
        })?;

        let compressor = codec.compressor()?;
        let params = config.params(quality);
        let pool = config.pool();

        debug!(width, height, quality = params.quality, ?format, "created streaming encoder");
        Ok(Self {
            codec,
            compressor: Some(compressor),
            width,
            height,
            params,
            format,
            rows,
            config,
            pool,
            finalized: false,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Clamped quality in use.
    pub fn quality(&self) -> u8 {
        self.params.quality
    }

    /// Rows accepted so far. Stays at `height` once finalized.
    pub fn rows_written(&self) -> u32 {
        if self.finalized {
            self.height
        } else {
            self.rows.len() as u32
        }
    }

    pub fn is_complete(&self) -> bool {
        self.rows_written() == self.height
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    fn row_bytes(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    fn check_write(&self, count: u32) -> Result<(), EncodeError> {
        if self.finalized {
            return Err(EncodeError::Finalized);
        }
        let written = self.rows_written();
        if count > self.height - written {
            return Err(EncodeError::RowOverflow {
                requested: count,
                written,
                height: self.height,
            });
        }
        Ok(())
    }

    /// Append `count` rows of interleaved pixels in the encoder's format.
    ///
    /// `data` holds the rows back to back without padding. Rows are copied;
    /// `data` can be reused as soon as this returns.
    ///
    /// # Returns
    ///
    /// Total rows written so far.
    ///
    /// # Errors
    ///
    /// Returns `RowOverflow` if the rows do not fit, `InvalidPixelData` if
    /// `data` is too short, and `Finalized` after finalize. On error no rows
    /// are stored.
    pub fn write_rows(&mut self, data: &[u8], count: u32) -> Result<u32, EncodeError> {
        self.check_write(count)?;

        let row_bytes = self.row_bytes();
        let expected = count as usize * row_bytes;
        if data.len() < expected {
            return Err(EncodeError::InvalidPixelData {
                expected,
                actual: data.len(),
            });
        }

        let mut batch = Vec::with_capacity(count as usize);
        for src in data[..expected].chunks_exact(row_bytes) {
            let mut row = try_alloc(row_bytes)?;
            row.copy_from_slice(src);
            batch.push(row);
        }
        self.rows.append(&mut batch);

        Ok(self.rows_written())
    }

    /// Append `count` rows of packed `0xAARRGGBB` words.
    ///
    /// Rows are converted into the encoder's format in parallel as they are
    /// stored.
    ///
    /// # Errors
    ///
    /// Same as [`StreamingEncoder::write_rows`].
    pub fn write_packed_rows(&mut self, words: &[u32], count: u32) -> Result<u32, EncodeError> {
        self.check_write(count)?;

        let expected = count as usize * self.width as usize;
        if words.len() < expected {
            return Err(EncodeError::InvalidPixelData {
                expected: expected * 4,
                actual: words.len() * 4,
            });
        }

        let mut batch = convert_packed_rows(&self.pool, &words[..expected], self.width, count, self.format)?;
        self.rows.append(&mut batch);

        Ok(self.rows_written())
    }

    /// Compress every stored row into one JPEG.
    ///
    /// # Errors
    ///
    /// Returns `IncompleteImage` (state unchanged) if rows are missing and
    /// `Finalized` on a second call. Any other error means the rows were
    /// consumed and the encoder is spent.
    pub fn finalize(&mut self) -> Result<OutputBuffer, EncodeError> {
        if self.finalized {
            return Err(EncodeError::Finalized);
        }
        if !self.is_complete() {
            return Err(EncodeError::IncompleteImage {
                written: self.rows_written(),
                height: self.height,
            });
        }

        self.finalized = true;
        let rows = std::mem::take(&mut self.rows);
        let mut compressor = match self.compressor.take() {
            Some(compressor) => compressor,
            None => self.codec.compressor()?,
        };

        let start = Instant::now();
        let total = total_bytes(self.width, self.height, self.format.bytes_per_pixel());
        let strategy = StrategySelector::from_config(&self.config).select(total, false);

        let contiguous = match strategy {
            Strategy::Contiguous => match self.compress_contiguous(&mut compressor, &rows) {
                Ok(bytes) => Some(bytes),
                Err(err) => {
                    warn!(error = %err, "contiguous finalize failed, retrying with scanlines");
                    None
                }
            },
            _ => None,
        };

        let (bytes, used) = match contiguous {
            Some(bytes) => (bytes, Strategy::Contiguous),
            None => (self.compress_scanlines(&mut compressor, &rows)?, Strategy::Scanline),
        };

        info!(
            width = self.width,
            height = self.height,
            strategy = ?used,
            total_bytes = total,
            bytes = bytes.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "finalized streaming encoder"
        );
        Ok(OutputBuffer::new(bytes))
    }

    fn compress_contiguous(
        &self,
        compressor: &mut C::Compressor,
        rows: &[Vec<u8>],
    ) -> Result<Vec<u8>, EncodeError> {
        let row_bytes = self.row_bytes();
        let len = usize::try_from(total_bytes(self.width, self.height, self.format.bytes_per_pixel()))
            .map_err(|_| EncodeError::ResourceExhausted(usize::MAX))?;
        let mut frame = try_alloc(len)?;

        self.pool.for_each_range_mut(&mut frame, row_bytes, |range, chunk| {
            for (dst, src) in chunk.chunks_exact_mut(row_bytes).zip(&rows[range]) {
                dst.copy_from_slice(src);
            }
        });

        let view = PixelBuffer::packed(&frame, self.width, self.height, self.format)?;
        Ok(compressor.compress(&view, &self.params)?)
    }

    fn compress_scanlines(
        &self,
        compressor: &mut C::Compressor,
        rows: &[Vec<u8>],
    ) -> Result<Vec<u8>, EncodeError> {
        let stored = StoredRows {
            rows,
            width: self.width,
            format: self.format,
        };
        let mut feeder = BatchedScanlines::new(&stored, self.pool, self.config.batch_rows())?;
        Ok(compressor.compress_scanlines(self.width, self.height, &self.params, &mut feeder)?)
    }
}

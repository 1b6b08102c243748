//! Batched scanline feeding.
//!
//! The scanline path never holds a whole-frame buffer. Rows are converted to
//! packed RGB a batch at a time into one scratch buffer allocated up front;
//! peak extra memory is `batch_rows * width * 3` bytes. Rows that are already
//! packed RGB are handed to the codec directly and need no scratch at all.

use tracing::trace;

use crate::codec::ScanlineSource;
use crate::error::{try_alloc, EncodeError};
use crate::parallel::WorkerPool;
use crate::pixel::convert::{convert_interleaved_row, convert_span};
use crate::pixel::{PixelFormat, SourceImage};

/// Random-access row input for [`BatchedScanlines`].
pub(crate) trait RowReader: Sync {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Row `y` as packed RGB, when the input already has that layout.
    fn borrow_rgb(&self, y: u32) -> Option<&[u8]>;

    /// Convert row `y` into `width * 3` bytes of packed RGB.
    fn read_rgb(&self, y: u32, dst: &mut [u8]);
}

impl RowReader for SourceImage<'_> {
    fn width(&self) -> u32 {
        SourceImage::width(self)
    }

    fn height(&self) -> u32 {
        SourceImage::height(self)
    }

    fn borrow_rgb(&self, y: u32) -> Option<&[u8]> {
        match self {
            SourceImage::Interleaved(buffer) if buffer.format() == PixelFormat::Rgb => {
                Some(buffer.row(y))
            }
            _ => None,
        }
    }

    fn read_rgb(&self, y: u32, dst: &mut [u8]) {
        convert_span(self, y, 0, SourceImage::width(self), dst, PixelFormat::Rgb);
    }
}

/// Rows held by a streaming encoder, one allocation per row.
pub(crate) struct StoredRows<'a> {
    pub rows: &'a [Vec<u8>],
    pub width: u32,
    pub format: PixelFormat,
}

impl RowReader for StoredRows<'_> {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.rows.len() as u32
    }

    fn borrow_rgb(&self, y: u32) -> Option<&[u8]> {
        (self.format == PixelFormat::Rgb).then(|| self.rows[y as usize].as_slice())
    }

    fn read_rgb(&self, y: u32, dst: &mut [u8]) {
        convert_interleaved_row(&self.rows[y as usize], self.format, dst, PixelFormat::Rgb);
    }
}

/// A [`ScanlineSource`] that converts rows in parallel batches.
pub(crate) struct BatchedScanlines<'a, R: RowReader> {
    reader: &'a R,
    pool: WorkerPool,
    batch_rows: u32,
    direct: bool,
    scratch: Vec<u8>,
    batch_start: u32,
    batch_len: u32,
}

impl<'a, R: RowReader> BatchedScanlines<'a, R> {
    /// Prepare a feeder, allocating the batch scratch buffer now.
    ///
    /// # Errors
    ///
    /// Returns `ResourceExhausted` if the scratch buffer cannot be allocated.
    pub fn new(reader: &'a R, pool: WorkerPool, batch_rows: u32) -> Result<Self, EncodeError> {
        let batch_rows = batch_rows.clamp(1, reader.height().max(1));
        let direct = reader.height() > 0 && reader.borrow_rgb(0).is_some();

        let scratch = if direct {
            Vec::new()
        } else {
            try_alloc(batch_rows as usize * reader.width() as usize * 3)?
        };

        Ok(Self {
            reader,
            pool,
            batch_rows,
            direct,
            scratch,
            batch_start: 0,
            batch_len: 0,
        })
    }

    fn row_bytes(&self) -> usize {
        self.reader.width() as usize * 3
    }

    fn load_batch(&mut self, y: u32) {
        let start = y - y % self.batch_rows;
        let len = self.batch_rows.min(self.reader.height() - start);
        let row_bytes = self.row_bytes();
        let reader = self.reader;

        trace!(start, rows = len, "converting scanline batch");
        self.pool.for_each_range_mut(
            &mut self.scratch[..len as usize * row_bytes],
            row_bytes,
            |rows, chunk| {
                for (i, out) in chunk.chunks_exact_mut(row_bytes).enumerate() {
                    reader.read_rgb(start + (rows.start + i) as u32, out);
                }
            },
        );

        self.batch_start = start;
        self.batch_len = len;
    }
}

impl<R: RowReader> ScanlineSource for BatchedScanlines<'_, R> {
    fn rgb_row(&mut self, y: u32) -> &[u8] {
        let reader = self.reader;
        if self.direct {
            if let Some(row) = reader.borrow_rgb(y) {
                return row;
            }
        }

        if y < self.batch_start || y >= self.batch_start + self.batch_len {
            self.load_batch(y);
        }

        let row_bytes = self.row_bytes();
        let offset = (y - self.batch_start) as usize * row_bytes;
        &self.scratch[offset..offset + row_bytes]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::{PackedPixels, PixelBuffer};

    #[test]
    fn test_packed_rows_batched_to_rgb() {
        let words: Vec<u32> = (0..5 * 7).map(|i| i * 0x0001_0203).collect();
        let image = SourceImage::from(PackedPixels::new(&words, 5, 7, 0).unwrap());
        let mut feeder = BatchedScanlines::new(&image, WorkerPool::new(Some(2)), 3).unwrap();

        assert_eq!(feeder.scratch.len(), 3 * 5 * 3);
        for y in 0..7u32 {
            let row = feeder.rgb_row(y).to_vec();
            for x in 0..5u32 {
                let w = words[(y * 5 + x) as usize];
                let px = &row[x as usize * 3..x as usize * 3 + 3];
                assert_eq!(px, &[(w >> 16) as u8, (w >> 8) as u8, w as u8]);
            }
        }
        // last batch holds only the remaining row
        assert_eq!((feeder.batch_start, feeder.batch_len), (6, 1));
    }

    #[test]
    fn test_rgb_rows_are_borrowed() {
        let data: Vec<u8> = (0..4 * 2 * 3).collect();
        let image = SourceImage::from(PixelBuffer::packed(&data, 4, 2, PixelFormat::Rgb).unwrap());
        let mut feeder = BatchedScanlines::new(&image, WorkerPool::single(), 5000).unwrap();

        assert!(feeder.scratch.is_empty());
        assert_eq!(feeder.rgb_row(1), &data[12..24]);
    }

    #[test]
    fn test_stored_bgr_rows_revisit_earlier_batch() {
        let rows = vec![vec![1u8, 2, 3], vec![4, 5, 6], vec![7, 8, 9]];
        let stored = StoredRows {
            rows: &rows,
            width: 1,
            format: PixelFormat::Bgr,
        };
        let mut feeder = BatchedScanlines::new(&stored, WorkerPool::single(), 2).unwrap();

        assert_eq!(feeder.rgb_row(2), &[9, 8, 7]);
        assert_eq!(feeder.rgb_row(0), &[3, 2, 1]);
        assert_eq!(feeder.rgb_row(1), &[6, 5, 4]);
    }

    #[test]
    fn test_batch_rows_clamped_to_height() {
        let rows = vec![vec![0u8; 6]; 2];
        let stored = StoredRows {
            rows: &rows,
            width: 2,
            format: PixelFormat::Bgr,
        };
        let feeder = BatchedScanlines::new(&stored, WorkerPool::single(), 0).unwrap();
        assert_eq!(feeder.batch_rows, 1);

        let feeder = BatchedScanlines::new(&stored, WorkerPool::single(), 5000).unwrap();
        assert_eq!(feeder.scratch.len(), 2 * 6);
    }
}

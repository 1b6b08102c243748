//! Pixel buffer views and layout conversion.
//!
//! Callers hand in pixels in one of two shapes:
//! - [`PixelBuffer`]: interleaved bytes in one of the [`PixelFormat`] layouts
//! - [`PackedPixels`]: 32-bit words holding `0xAARRGGBB`
//!
//! Both are borrowed views. Nothing here copies the caller's pixels unless a
//! conversion is requested explicitly (see [`convert`]).

pub mod convert;

use serde::{Deserialize, Serialize};

use crate::error::EncodeError;

/// Interleaved byte layouts understood by the codec.
///
/// The numeric ids are the ones used at the foreign-function boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum PixelFormat {
    /// R, G, B (3 bytes per pixel)
    Rgb = 0,
    /// B, G, R (3 bytes per pixel)
    #[default]
    Bgr = 1,
    /// B, G, R, A or X (4 bytes per pixel)
    Bgra = 2,
    /// R, G, B, A or X (4 bytes per pixel)
    Rgba = 3,
}

impl PixelFormat {
    /// Parse a boundary format id (0=RGB, 1=BGR, 2=BGRA, 3=RGBA).
    pub fn from_id(id: i32) -> Result<Self, EncodeError> {
        match id {
            0 => Ok(PixelFormat::Rgb),
            1 => Ok(PixelFormat::Bgr),
            2 => Ok(PixelFormat::Bgra),
            3 => Ok(PixelFormat::Rgba),
            other => Err(EncodeError::UnsupportedFormat(other)),
        }
    }

    /// Boundary id of this format.
    pub fn id(self) -> i32 {
        self as i32
    }

    /// Bytes per pixel: 3 for RGB/BGR, 4 for layouts carrying alpha or padding.
    #[inline]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb | PixelFormat::Bgr => 3,
            PixelFormat::Bgra | PixelFormat::Rgba => 4,
        }
    }

    /// Byte offsets of the red, green and blue channels within one pixel.
    #[inline]
    pub fn rgb_offsets(self) -> (usize, usize, usize) {
        match self {
            PixelFormat::Rgb | PixelFormat::Rgba => (0, 1, 2),
            PixelFormat::Bgr | PixelFormat::Bgra => (2, 1, 0),
        }
    }

    /// Whether the layout has a fourth (alpha or padding) byte.
    #[inline]
    pub fn has_alpha(self) -> bool {
        self.bytes_per_pixel() == 4
    }
}

/// Borrowed interleaved pixel data with a validated geometry.
#[derive(Debug, Clone, Copy)]
pub struct PixelBuffer<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
    format: PixelFormat,
    stride: usize,
}

impl<'a> PixelBuffer<'a> {
    /// Create a view over interleaved pixel data.
    ///
    /// # Arguments
    ///
    /// * `data` - Pixel bytes, row-major
    /// * `width` - Image width in pixels
    /// * `height` - Image height in pixels
    /// * `format` - Channel layout of `data`
    /// * `stride` - Bytes per row; 0 means rows are packed without padding
    ///
    /// # Errors
    ///
    /// Returns an error if a dimension is zero, the stride is shorter than a
    /// row, or `data` does not cover the last row.
    pub fn new(
        data: &'a [u8],
        width: u32,
        height: u32,
        format: PixelFormat,
        stride: usize,
    ) -> Result<Self, EncodeError> {
        if width == 0 || height == 0 {
            return Err(EncodeError::InvalidDimensions { width, height });
        }

        let row_bytes = width as usize * format.bytes_per_pixel();
        let stride = if stride == 0 { row_bytes } else { stride };
        if stride < row_bytes {
            return Err(EncodeError::InvalidStride { stride, row_bytes });
        }

        let expected = required_len(stride, row_bytes, height);
        if data.len() < expected {
            return Err(EncodeError::InvalidPixelData {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            data,
            width,
            height,
            format,
            stride,
        })
    }

    /// Create a packed (stride = row bytes) view.
    pub fn packed(
        data: &'a [u8],
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<Self, EncodeError> {
        Self::new(data, width, height, format, 0)
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

    /// Bytes between the starts of consecutive rows.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Bytes of pixel data in one row (excluding padding).
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// Pixel bytes of row `y`, without padding.
    ///
    /// Panics if `y >= height`.
    #[inline]
    pub fn row(&self, y: u32) -> &'a [u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.row_bytes()]
    }

    /// Underlying byte slice including any row padding.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }
}

/// Borrowed packed 32-bit pixels (`0xAARRGGBB` per word).
#[derive(Debug, Clone, Copy)]
pub struct PackedPixels<'a> {
    words: &'a [u32],
    width: u32,
    height: u32,
    stride: usize,
}

impl<'a> PackedPixels<'a> {
    /// Create a view over packed words.
    ///
    /// `stride` is in words; 0 means rows are exactly `width` words long.
    pub fn new(words: &'a [u32], width: u32, height: u32, stride: usize) -> Result<Self, EncodeError> {
        if width == 0 || height == 0 {
            return Err(EncodeError::InvalidDimensions { width, height });
        }

        let row_words = width as usize;
        let stride = if stride == 0 { row_words } else { stride };
        if stride < row_words {
            return Err(EncodeError::InvalidStride {
                stride: stride * 4,
                row_bytes: row_words * 4,
            });
        }

        let expected = required_len(stride, row_words, height);
        if words.len() < expected {
            return Err(EncodeError::InvalidPixelData {
                expected: expected * 4,
                actual: words.len() * 4,
            });
        }

        Ok(Self {
            words,
            width,
            height,
            stride,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Stride in words.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Words of row `y`.
    #[inline]
    pub fn row(&self, y: u32) -> &'a [u32] {
        let start = y as usize * self.stride;
        &self.words[start..start + self.width as usize]
    }

    /// Reinterpret the words as BGRX bytes without copying.
    ///
    /// `0x00RRGGBB` is stored as `[BB, GG, RR, 00]` on little-endian hosts,
    /// which is exactly the BGRA layout. Returns `None` on big-endian hosts.
    pub fn as_bgra_bytes(&self) -> Option<PixelBuffer<'a>> {
        if !cfg!(target_endian = "little") {
            return None;
        }

        // SAFETY: u8 has alignment 1 and every byte of a u32 is initialized, so
        // viewing the word slice as `len * 4` bytes is sound for the same lifetime.
        let bytes = unsafe {
            std::slice::from_raw_parts(self.words.as_ptr().cast::<u8>(), self.words.len() * 4)
        };

        Some(PixelBuffer {
            data: bytes,
            width: self.width,
            height: self.height,
            format: PixelFormat::Bgra,
            stride: self.stride * 4,
        })
    }
}

/// Any pixel source the encoder accepts.
#[derive(Debug, Clone, Copy)]
pub enum SourceImage<'a> {
    Interleaved(PixelBuffer<'a>),
    Packed(PackedPixels<'a>),
}

impl<'a> SourceImage<'a> {
    pub fn width(&self) -> u32 {
        match self {
            SourceImage::Interleaved(buffer) => buffer.width(),
            SourceImage::Packed(packed) => packed.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            SourceImage::Interleaved(buffer) => buffer.height(),
            SourceImage::Packed(packed) => packed.height(),
        }
    }
}

impl<'a> From<PixelBuffer<'a>> for SourceImage<'a> {
    fn from(buffer: PixelBuffer<'a>) -> Self {
        SourceImage::Interleaved(buffer)
    }
}

impl<'a> From<PackedPixels<'a>> for SourceImage<'a> {
    fn from(packed: PackedPixels<'a>) -> Self {
        SourceImage::Packed(packed)
    }
}

/// Minimum slice length for `height` rows of `row_len` units spaced `stride` apart.
fn required_len(stride: usize, row_len: usize, height: u32) -> usize {
    (height as usize - 1)
        .saturating_mul(stride)
        .saturating_add(row_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ids_roundtrip() {
        for id in 0..4 {
            let format = PixelFormat::from_id(id).unwrap();
            assert_eq!(format.id(), id);
        }
        assert!(matches!(
            PixelFormat::from_id(4),
            Err(EncodeError::UnsupportedFormat(4))
        ));
        assert!(matches!(
            PixelFormat::from_id(-1),
            Err(EncodeError::UnsupportedFormat(-1))
        ));
    }

    #[test]
    fn test_bytes_per_pixel() {
        assert_eq!(PixelFormat::Rgb.bytes_per_pixel(), 3);
        assert_eq!(PixelFormat::Bgr.bytes_per_pixel(), 3);
        assert_eq!(PixelFormat::Bgra.bytes_per_pixel(), 4);
        assert_eq!(PixelFormat::Rgba.bytes_per_pixel(), 4);
    }

    #[test]
    fn test_pixel_buffer_packed_stride() {
        let data = vec![0u8; 4 * 2 * 3];
        let buffer = PixelBuffer::packed(&data, 4, 2, PixelFormat::Rgb).unwrap();
        assert_eq!(buffer.stride(), 12);
        assert_eq!(buffer.row(1).len(), 12);
    }

    #[test]
    fn test_pixel_buffer_padded_rows() {
        // 2x2 RGB with 2 bytes of padding per row; the last row needs no padding
        let data: Vec<u8> = (0..14).collect();
        let buffer = PixelBuffer::new(&data, 2, 2, PixelFormat::Rgb, 8).unwrap();
        assert_eq!(buffer.row(0), &[0, 1, 2, 3, 4, 5]);
        assert_eq!(buffer.row(1), &[8, 9, 10, 11, 12, 13]);
    }

    #[test]
    fn test_pixel_buffer_rejects_short_data() {
        let data = vec![0u8; 10];
        let result = PixelBuffer::packed(&data, 2, 2, PixelFormat::Rgb);
        assert!(matches!(
            result,
            Err(EncodeError::InvalidPixelData {
                expected: 12,
                actual: 10
            })
        ));
    }

    #[test]
    fn test_pixel_buffer_rejects_short_stride() {
        let data = vec![0u8; 64];
        let result = PixelBuffer::new(&data, 4, 2, PixelFormat::Bgra, 8);
        assert!(matches!(result, Err(EncodeError::InvalidStride { .. })));
    }

    #[test]
    fn test_pixel_buffer_rejects_zero_dimensions() {
        let data = vec![0u8; 12];
        assert!(matches!(
            PixelBuffer::packed(&data, 0, 2, PixelFormat::Rgb),
            Err(EncodeError::InvalidDimensions { .. })
        ));
        assert!(matches!(
            PackedPixels::new(&[0u32; 4], 2, 0, 0),
            Err(EncodeError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_packed_rows_with_stride() {
        let words: Vec<u32> = (0..10).collect();
        let packed = PackedPixels::new(&words, 3, 2, 5).unwrap();
        assert_eq!(packed.row(0), &[0, 1, 2]);
        assert_eq!(packed.row(1), &[5, 6, 7]);
    }

    #[test]
    #[cfg(target_endian = "little")]
    fn test_packed_zero_copy_view_is_bgrx() {
        let words = [0x00FF_8040u32, 0x0011_2233];
        let packed = PackedPixels::new(&words, 2, 1, 0).unwrap();
        let view = packed.as_bgra_bytes().unwrap();

        assert_eq!(view.format(), PixelFormat::Bgra);
        assert_eq!(view.stride(), 8);
        assert_eq!(view.row(0), &[0x40, 0x80, 0xFF, 0x00, 0x33, 0x22, 0x11, 0x00]);
    }
}

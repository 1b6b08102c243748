//! Pixel layout conversion.
//!
//! Converts packed `0xAARRGGBB` words or interleaved bytes into the exact
//! byte layout the codec is handed. Conversion of a region is split into
//! contiguous row ranges, one per worker; destination ranges never overlap,
//! so workers need no synchronization.
//!
//! # Packed word mapping
//!
//! For a word `w`, blue is bits `[0:8)`, green `[8:16)`, red `[16:24)` and
//! alpha `[24:32)`. A BGR target therefore receives `[w, w >> 8, w >> 16]`
//! and an RGB target `[w >> 16, w >> 8, w]`. Swapping these silently swaps
//! the red and blue channels of the output.

use super::{PixelFormat, SourceImage};
use crate::error::{try_alloc, EncodeError};
use crate::parallel::{Tile, WorkerPool};

/// Write one packed word into `dst` using the `target` layout.
///
/// `dst` must hold at least `target.bytes_per_pixel()` bytes.
#[inline]
pub fn write_packed_pixel(word: u32, dst: &mut [u8], target: PixelFormat) {
    let b = word as u8;
    let g = (word >> 8) as u8;
    let r = (word >> 16) as u8;
    let a = (word >> 24) as u8;

    match target {
        PixelFormat::Bgr => {
            dst[0] = b;
            dst[1] = g;
            dst[2] = r;
        }
        PixelFormat::Rgb => {
            dst[0] = r;
            dst[1] = g;
            dst[2] = b;
        }
        PixelFormat::Bgra => {
            dst[0] = b;
            dst[1] = g;
            dst[2] = r;
            dst[3] = a;
        }
        PixelFormat::Rgba => {
            dst[0] = r;
            dst[1] = g;
            dst[2] = b;
            dst[3] = a;
        }
    }
}

/// Convert a row of packed words into `dst`.
pub fn convert_packed_row(words: &[u32], dst: &mut [u8], target: PixelFormat) {
    let bpp = target.bytes_per_pixel();
    for (&word, out) in words.iter().zip(dst.chunks_exact_mut(bpp)) {
        write_packed_pixel(word, out, target);
    }
}

/// Convert a row of interleaved pixels from `source` layout into `dst`.
///
/// Alpha is carried over when both layouts have it, and set to 255 when only
/// the target has it.
pub fn convert_interleaved_row(src: &[u8], source: PixelFormat, dst: &mut [u8], target: PixelFormat) {
    if source == target {
        dst[..src.len()].copy_from_slice(src);
        return;
    }

    let (sr, sg, sb) = source.rgb_offsets();
    let (tr, tg, tb) = target.rgb_offsets();
    let src_bpp = source.bytes_per_pixel();
    let dst_bpp = target.bytes_per_pixel();

    for (px, out) in src.chunks_exact(src_bpp).zip(dst.chunks_exact_mut(dst_bpp)) {
        out[tr] = px[sr];
        out[tg] = px[sg];
        out[tb] = px[sb];
        if target.has_alpha() {
            out[3] = if source.has_alpha() { px[3] } else { 0xFF };
        }
    }
}

/// Convert `width` pixels of row `y`, starting at column `x`, into `dst`.
pub fn convert_span(
    image: &SourceImage<'_>,
    y: u32,
    x: u32,
    width: u32,
    dst: &mut [u8],
    target: PixelFormat,
) {
    let start = x as usize;
    let end = start + width as usize;

    match image {
        SourceImage::Packed(packed) => {
            convert_packed_row(&packed.row(y)[start..end], dst, target);
        }
        SourceImage::Interleaved(buffer) => {
            let bpp = buffer.format().bytes_per_pixel();
            let src = &buffer.row(y)[start * bpp..end * bpp];
            convert_interleaved_row(src, buffer.format(), dst, target);
        }
    }
}

/// Convert a rectangular region into a packed `target` buffer, in parallel.
///
/// `dst` receives `region.height` rows of `region.width * bpp` bytes each.
pub fn convert_region_into(
    pool: &WorkerPool,
    image: &SourceImage<'_>,
    region: &Tile,
    target: PixelFormat,
    dst: &mut [u8],
) {
    let row_bytes = region.width as usize * target.bytes_per_pixel();

    pool.for_each_range_mut(dst, row_bytes, |rows, chunk| {
        for (i, out) in chunk.chunks_exact_mut(row_bytes).enumerate() {
            let y = region.y + (rows.start + i) as u32;
            convert_span(image, y, region.x, region.width, out, target);
        }
    });
}

/// Convert a whole image into a freshly allocated packed `target` buffer.
///
/// # Errors
///
/// Returns `ResourceExhausted` if the destination cannot be allocated.
pub fn convert_image(
    pool: &WorkerPool,
    image: &SourceImage<'_>,
    target: PixelFormat,
) -> Result<Vec<u8>, EncodeError> {
    let region = Tile {
        column: 0,
        row: 0,
        x: 0,
        y: 0,
        width: image.width(),
        height: image.height(),
    };
    let len = image.width() as usize * image.height() as usize * target.bytes_per_pixel();
    let mut dst = try_alloc(len)?;
    convert_region_into(pool, image, &region, target, &mut dst);
    Ok(dst)
}

/// Convert packed word rows into separately allocated rows, in parallel.
///
/// Used by the streaming encoder, which stores each row on its own.
pub fn convert_packed_rows(
    pool: &WorkerPool,
    words: &[u32],
    width: u32,
    row_count: u32,
    target: PixelFormat,
) -> Result<Vec<Vec<u8>>, EncodeError> {
    let row_bytes = width as usize * target.bytes_per_pixel();
    let mut rows = Vec::new();
    rows.try_reserve_exact(row_count as usize)
        .map_err(|_| EncodeError::ResourceExhausted(row_count as usize * row_bytes))?;
    for _ in 0..row_count {
        rows.push(try_alloc(row_bytes)?);
    }

    let width = width as usize;
    pool.for_each_range_mut(&mut rows, 1, |range, chunk| {
        for (i, row) in chunk.iter_mut().enumerate() {
            let start = (range.start + i) * width;
            convert_packed_row(&words[start..start + width], row, target);
        }
    });

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::{PackedPixels, PixelBuffer};

    #[test]
    fn test_packed_to_bgr_byte_order() {
        let mut out = [0u8; 3];
        write_packed_pixel(0x00AA_BBCC, &mut out, PixelFormat::Bgr);
        assert_eq!(out, [0xCC, 0xBB, 0xAA]);
    }

    #[test]
    fn test_packed_to_rgb_byte_order() {
        let mut out = [0u8; 3];
        write_packed_pixel(0x00AA_BBCC, &mut out, PixelFormat::Rgb);
        assert_eq!(out, [0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn test_packed_to_four_byte_layouts_keep_alpha() {
        let mut out = [0u8; 4];
        write_packed_pixel(0x80AA_BBCC, &mut out, PixelFormat::Bgra);
        assert_eq!(out, [0xCC, 0xBB, 0xAA, 0x80]);

        write_packed_pixel(0x80AA_BBCC, &mut out, PixelFormat::Rgba);
        assert_eq!(out, [0xAA, 0xBB, 0xCC, 0x80]);
    }

    #[test]
    fn test_interleaved_swap() {
        let src = [1u8, 2, 3, 4, 5, 6];
        let mut out = [0u8; 6];
        convert_interleaved_row(&src, PixelFormat::Rgb, &mut out, PixelFormat::Bgr);
        assert_eq!(out, [3, 2, 1, 6, 5, 4]);
    }

    #[test]
    fn test_interleaved_drop_and_add_alpha() {
        let src = [10u8, 20, 30, 40];
        let mut out = [0u8; 3];
        convert_interleaved_row(&src, PixelFormat::Bgra, &mut out, PixelFormat::Rgb);
        assert_eq!(out, [30, 20, 10]);

        let src = [10u8, 20, 30];
        let mut out = [0u8; 4];
        convert_interleaved_row(&src, PixelFormat::Rgb, &mut out, PixelFormat::Bgra);
        assert_eq!(out, [30, 20, 10, 0xFF]);
    }

    #[test]
    fn test_convert_region_from_packed() {
        // 4x3 image where each word encodes its own coordinates
        let words: Vec<u32> = (0..12u32).map(|i| (i % 4) << 16 | (i / 4) << 8).collect();
        let packed = PackedPixels::new(&words, 4, 3, 0).unwrap();
        let image = SourceImage::from(packed);

        let region = Tile {
            column: 1,
            row: 1,
            x: 2,
            y: 1,
            width: 2,
            height: 2,
        };
        let mut out = vec![0u8; 2 * 2 * 3];
        convert_region_into(&WorkerPool::new(Some(2)), &image, &region, PixelFormat::Rgb, &mut out);

        // (r = x, g = y, b = 0)
        assert_eq!(out, vec![2, 1, 0, 3, 1, 0, 2, 2, 0, 3, 2, 0]);
    }

    #[test]
    fn test_convert_image_parallel_matches_inline() {
        let width = 37u32;
        let height = 23;
        let words: Vec<u32> = (0..width * height).map(|i: u32| i.wrapping_mul(2_654_435_761)).collect();
        let image = SourceImage::from(PackedPixels::new(&words, width, height, 0).unwrap());

        let inline = convert_image(&WorkerPool::single(), &image, PixelFormat::Bgr).unwrap();
        let parallel = convert_image(&WorkerPool::new(Some(5)), &image, PixelFormat::Bgr).unwrap();

        assert_eq!(inline, parallel);
        assert_eq!(inline.len(), (width * height * 3) as usize);
    }

    #[test]
    fn test_convert_image_from_strided_interleaved() {
        // 2x2 BGRA with 4 bytes of row padding
        let data = [
            1u8, 2, 3, 255, 4, 5, 6, 255, 0, 0, 0, 0, //
            7, 8, 9, 255, 10, 11, 12, 255,
        ];
        let buffer = PixelBuffer::new(&data, 2, 2, PixelFormat::Bgra, 12).unwrap();
        let out = convert_image(&WorkerPool::single(), &SourceImage::from(buffer), PixelFormat::Rgb).unwrap();
        assert_eq!(out, vec![3, 2, 1, 6, 5, 4, 9, 8, 7, 12, 11, 10]);
    }

    #[test]
    fn test_convert_packed_rows_separate_buffers() {
        let words = [0x0001_0203u32, 0x0004_0506, 0x0007_0809, 0x000A_0B0C];
        let rows = convert_packed_rows(&WorkerPool::new(Some(2)), &words, 2, 2, PixelFormat::Bgr).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec![3, 2, 1, 6, 5, 4]);
        assert_eq!(rows[1], vec![9, 8, 7, 12, 11, 10]);
    }
}

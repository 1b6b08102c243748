//! Pure-Rust codec backend.
//!
//! Compression uses `jpeg-encoder`, which pulls pixel rows through its
//! `ImageBuffer` trait. Both the contiguous and the scanline entry points
//! feed it through the same RGB to YCbCr conversion, so the two paths produce
//! byte-identical streams for the same pixels and parameters.
//!
//! Decompression uses the `image` crate's JPEG decoder. It has a single
//! accuracy level, so the requested [`CodecPreset`] does not change its output.

use std::cell::RefCell;
use std::io::Cursor;

use image::codecs::jpeg::JpegDecoder;
use image::{ColorType, DynamicImage, ImageDecoder};
use jpeg_encoder::{rgb_to_ycbcr, Encoder, ImageBuffer, JpegColorType, SamplingFactor};

use super::{CodecError, CodecPreset, CompressParams, Compressor, JpegCodec, SamplingMode, ScanlineSource};
use crate::decode::{DecodedImage, JpegHeader};
use crate::pixel::PixelBuffer;

/// Largest width or height a baseline JPEG frame can describe.
pub const MAX_DIMENSION: u32 = u16::MAX as u32;

/// The built-in codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCodec;

impl JpegCodec for DefaultCodec {
    type Compressor = EncoderContext;

    fn compressor(&self) -> Result<EncoderContext, CodecError> {
        Ok(EncoderContext::new())
    }

    fn read_header(&self, jpeg: &[u8]) -> Result<JpegHeader, CodecError> {
        let decoder = open_decoder(jpeg)?;
        let (width, height) = decoder.dimensions();

        Ok(JpegHeader {
            width,
            height,
            channels: channels_for(decoder.color_type()),
        })
    }

    fn decompress(&self, jpeg: &[u8], _preset: CodecPreset) -> Result<DecodedImage, CodecError> {
        let decoder = open_decoder(jpeg)?;
        let image = DynamicImage::from_decoder(decoder)
            .map_err(|e| CodecError::Decompress(e.to_string()))?;

        let (width, height) = (image.width(), image.height());
        let decoded = match image {
            DynamicImage::ImageLuma8(gray) => DecodedImage::new(width, height, 1, gray.into_raw()),
            other => DecodedImage::new(width, height, 3, other.into_rgb8().into_raw()),
        };
        Ok(decoded)
    }
}

fn open_decoder(jpeg: &[u8]) -> Result<JpegDecoder<Cursor<&[u8]>>, CodecError> {
    if jpeg.is_empty() {
        return Err(CodecError::Decompress("empty input".to_string()));
    }
    JpegDecoder::new(Cursor::new(jpeg)).map_err(|e| CodecError::Decompress(e.to_string()))
}

fn channels_for(color: ColorType) -> u8 {
    match color {
        ColorType::L8 | ColorType::L16 => 1,
        _ => 3,
    }
}

/// One compression context.
///
/// Holds a scratch output buffer that is reused across calls. Results are
/// copied out into an exactly sized allocation, so the scratch capacity never
/// leaks to callers.
#[derive(Debug, Default)]
pub struct EncoderContext {
    scratch: Vec<u8>,
}

impl EncoderContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn encode<I: ImageBuffer>(
        &mut self,
        image: I,
        params: &CompressParams,
    ) -> Result<Vec<u8>, CodecError> {
        self.scratch.clear();

        let mut encoder = Encoder::new(&mut self.scratch, params.quality);
        encoder.set_sampling_factor(sampling_factor(params.sampling));
        encoder.set_optimized_huffman_tables(params.preset == CodecPreset::Accurate);
        encoder
            .encode_image(image)
            .map_err(|e| CodecError::Compress(e.to_string()))?;

        copy_out(&self.scratch)
    }
}

impl Compressor for EncoderContext {
    fn compress(
        &mut self,
        image: &PixelBuffer<'_>,
        params: &CompressParams,
    ) -> Result<Vec<u8>, CodecError> {
        let (width, height) = checked_dimensions(image.width(), image.height())?;
        self.encode(
            InterleavedImage {
                buffer: image,
                width,
                height,
                gray: params.sampling == SamplingMode::Gray,
            },
            params,
        )
    }

    fn compress_scanlines(
        &mut self,
        width: u32,
        height: u32,
        params: &CompressParams,
        source: &mut dyn ScanlineSource,
    ) -> Result<Vec<u8>, CodecError> {
        let (width, height) = checked_dimensions(width, height)?;
        self.encode(
            ScanlineImage {
                source: RefCell::new(source),
                width,
                height,
                gray: params.sampling == SamplingMode::Gray,
            },
            params,
        )
    }
}

fn checked_dimensions(width: u32, height: u32) -> Result<(u16, u16), CodecError> {
    match (u16::try_from(width), u16::try_from(height)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(CodecError::DimensionsTooLarge { width, height }),
    }
}

fn sampling_factor(mode: SamplingMode) -> SamplingFactor {
    match mode {
        SamplingMode::S444 | SamplingMode::Gray => SamplingFactor::F_1_1,
        SamplingMode::S422 => SamplingFactor::F_2_1,
        SamplingMode::S420 => SamplingFactor::F_2_2,
        SamplingMode::S440 => SamplingFactor::F_1_2,
        SamplingMode::S411 => SamplingFactor::F_4_1,
    }
}

fn copy_out(encoded: &[u8]) -> Result<Vec<u8>, CodecError> {
    if encoded.is_empty() {
        return Err(CodecError::EmptyOutput);
    }

    let mut out = Vec::new();
    out.try_reserve_exact(encoded.len())
        .map_err(|_| CodecError::OutOfMemory(encoded.len()))?;
    out.extend_from_slice(encoded);
    Ok(out)
}

#[inline]
fn push_pixel(buffers: &mut [Vec<u8>; 4], r: u8, g: u8, b: u8, gray: bool) {
    let (y, cb, cr) = rgb_to_ycbcr(r, g, b);
    buffers[0].push(y);
    if !gray {
        buffers[1].push(cb);
        buffers[2].push(cr);
    }
}

fn color_type(gray: bool) -> JpegColorType {
    if gray {
        JpegColorType::Luma
    } else {
        JpegColorType::Ycbcr
    }
}

/// A validated interleaved buffer in any [`crate::pixel::PixelFormat`].
struct InterleavedImage<'b, 'a> {
    buffer: &'b PixelBuffer<'a>,
    width: u16,
    height: u16,
    gray: bool,
}

impl ImageBuffer for InterleavedImage<'_, '_> {
    fn get_jpeg_color_type(&self) -> JpegColorType {
        color_type(self.gray)
    }

    fn width(&self) -> u16 {
        self.width
    }

    fn height(&self) -> u16 {
        self.height
    }

    fn fill_buffers(&self, y: u16, buffers: &mut [Vec<u8>; 4]) {
        let format = self.buffer.format();
        let (ro, go, bo) = format.rgb_offsets();

        for px in self.buffer.row(y as u32).chunks_exact(format.bytes_per_pixel()) {
            push_pixel(buffers, px[ro], px[go], px[bo], self.gray);
        }
    }
}

/// Rows pulled lazily from a [`ScanlineSource`].
struct ScanlineImage<'s> {
    source: RefCell<&'s mut dyn ScanlineSource>,
    width: u16,
    height: u16,
    gray: bool,
}

impl ImageBuffer for ScanlineImage<'_> {
    fn get_jpeg_color_type(&self) -> JpegColorType {
        color_type(self.gray)
    }

    fn width(&self) -> u16 {
        self.width
    }

    fn height(&self) -> u16 {
        self.height
    }

    fn fill_buffers(&self, y: u16, buffers: &mut [Vec<u8>; 4]) {
        let mut source = self.source.borrow_mut();
        let row = source.rgb_row(y as u32);

        for px in row.chunks_exact(3).take(self.width as usize) {
            push_pixel(buffers, px[0], px[1], px[2], self.gray);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::PixelFormat;

    fn gradient_rgb(width: u32, height: u32) -> Vec<u8> {
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                pixels.push((x * 255 / width.max(1)) as u8);
                pixels.push((y * 255 / height.max(1)) as u8);
                pixels.push(((x + y) % 256) as u8);
            }
        }
        pixels
    }

    struct VecRows {
        rows: Vec<Vec<u8>>,
        requested: Vec<u32>,
    }

    impl ScanlineSource for VecRows {
        fn rgb_row(&mut self, y: u32) -> &[u8] {
            self.requested.push(y);
            &self.rows[y as usize]
        }
    }

    #[test]
    fn test_matches_encoder_builtin_rgb() {
        let (width, height) = (29u32, 19u32);
        let pixels = gradient_rgb(width, height);
        let params = CompressParams::new(82, SamplingMode::S420, CodecPreset::Fast);

        let ours = EncoderContext::new()
            .compress(&PixelBuffer::packed(&pixels, width, height, PixelFormat::Rgb).unwrap(), &params)
            .unwrap();

        let mut builtin = Vec::new();
        let mut encoder = Encoder::new(&mut builtin, params.quality);
        encoder.set_sampling_factor(SamplingFactor::F_2_2);
        encoder
            .encode(&pixels, width as u16, height as u16, jpeg_encoder::ColorType::Rgb)
            .unwrap();

        assert_eq!(ours, builtin);
    }

    #[test]
    fn test_compress_produces_jfif_markers() {
        let pixels = gradient_rgb(40, 30);
        let buffer = PixelBuffer::packed(&pixels, 40, 30, PixelFormat::Rgb).unwrap();

        let jpeg = EncoderContext::new()
            .compress(&buffer, &CompressParams::default())
            .unwrap();

        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(&jpeg[jpeg.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_layouts_encode_identically() {
        let rgb = gradient_rgb(17, 9);
        let bgr: Vec<u8> = rgb.chunks_exact(3).flat_map(|p| [p[2], p[1], p[0]]).collect();
        let rgba: Vec<u8> = rgb.chunks_exact(3).flat_map(|p| [p[0], p[1], p[2], 0]).collect();

        let params = CompressParams::default();
        let mut ctx = EncoderContext::new();

        let from_rgb = ctx
            .compress(&PixelBuffer::packed(&rgb, 17, 9, PixelFormat::Rgb).unwrap(), &params)
            .unwrap();
        let from_bgr = ctx
            .compress(&PixelBuffer::packed(&bgr, 17, 9, PixelFormat::Bgr).unwrap(), &params)
            .unwrap();
        let from_rgba = ctx
            .compress(&PixelBuffer::packed(&rgba, 17, 9, PixelFormat::Rgba).unwrap(), &params)
            .unwrap();

        assert_eq!(from_rgb, from_bgr);
        assert_eq!(from_rgb, from_rgba);
    }

    #[test]
    fn test_scanlines_match_contiguous() {
        let (width, height) = (33, 21);
        let pixels = gradient_rgb(width, height);
        let params = CompressParams::new(75, SamplingMode::S420, CodecPreset::Fast);

        let contiguous = EncoderContext::new()
            .compress(&PixelBuffer::packed(&pixels, width, height, PixelFormat::Rgb).unwrap(), &params)
            .unwrap();

        let mut rows = VecRows {
            rows: pixels.chunks_exact(width as usize * 3).map(<[u8]>::to_vec).collect(),
            requested: Vec::new(),
        };
        let scanned = EncoderContext::new()
            .compress_scanlines(width, height, &params, &mut rows)
            .unwrap();

        assert_eq!(contiguous, scanned);
        assert!(rows.requested.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(rows.requested.last(), Some(&(height - 1)));
    }

    #[test]
    fn test_accurate_preset_still_decodes() {
        let pixels = gradient_rgb(24, 24);
        let buffer = PixelBuffer::packed(&pixels, 24, 24, PixelFormat::Rgb).unwrap();
        let params = CompressParams::new(90, SamplingMode::S444, CodecPreset::Accurate);

        let jpeg = EncoderContext::new().compress(&buffer, &params).unwrap();
        let decoded = DefaultCodec.decompress(&jpeg, CodecPreset::Accurate).unwrap();

        assert_eq!((decoded.width, decoded.height, decoded.channels), (24, 24, 3));
    }

    #[test]
    fn test_gray_sampling_decodes_to_one_channel() {
        let pixels = gradient_rgb(16, 8);
        let buffer = PixelBuffer::packed(&pixels, 16, 8, PixelFormat::Rgb).unwrap();
        let params = CompressParams::new(80, SamplingMode::Gray, CodecPreset::Fast);

        let jpeg = EncoderContext::new().compress(&buffer, &params).unwrap();

        let header = DefaultCodec.read_header(&jpeg).unwrap();
        assert_eq!((header.width, header.height, header.channels), (16, 8, 1));

        let decoded = DefaultCodec.decompress(&jpeg, CodecPreset::Fast).unwrap();
        assert_eq!(decoded.channels, 1);
        assert_eq!(decoded.pixels.len(), 16 * 8);
    }

    #[test]
    fn test_dimensions_above_format_limit() {
        let mut rows = VecRows {
            rows: Vec::new(),
            requested: Vec::new(),
        };
        let result = EncoderContext::new().compress_scanlines(
            MAX_DIMENSION + 1,
            1,
            &CompressParams::default(),
            &mut rows,
        );
        assert!(matches!(result, Err(CodecError::DimensionsTooLarge { .. })));
        assert!(rows.requested.is_empty());
    }

    #[test]
    fn test_decompress_rejects_garbage() {
        assert!(matches!(
            DefaultCodec.decompress(&[], CodecPreset::Accurate),
            Err(CodecError::Decompress(_))
        ));
        assert!(matches!(
            DefaultCodec.read_header(&[0x00, 0x01, 0x02, 0x03]),
            Err(CodecError::Decompress(_))
        ));
    }
}

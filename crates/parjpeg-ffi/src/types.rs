//! `#[repr(C)]` result types shared with foreign callers.
//!
//! Every buffer handed out here is owned by the caller until it is passed
//! back to the matching release function, which also nulls the caller's
//! struct so a second release is a no-op.

use std::ptr;

use parjpeg_core::decode::{DecodedImage, JpegHeader};
use parjpeg_core::encode::{EncodedTile, OutputBuffer, TileSet};

/// JPEG bytes. `data` is null and `size` is 0 on failure.
#[repr(C)]
#[derive(Debug)]
pub struct JpegData {
    pub data: *mut u8,
    pub size: usize,
}

impl JpegData {
    pub fn empty() -> Self {
        Self {
            data: ptr::null_mut(),
            size: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_null()
    }

    /// Free the bytes and reset to empty.
    ///
    /// # Safety
    ///
    /// `self` must be empty or hold a buffer produced by this crate that has
    /// not been released yet.
    pub(crate) unsafe fn release(&mut self) {
        drop(OutputBuffer::from_raw_parts(self.data, self.size));
        *self = Self::empty();
    }
}

impl From<OutputBuffer> for JpegData {
    fn from(buffer: OutputBuffer) -> Self {
        let (data, size) = buffer.into_raw_parts();
        Self { data, size }
    }
}

/// One tile of a tiled encode.
#[repr(C)]
#[derive(Debug)]
pub struct TileJpeg {
    pub data: *mut u8,
    pub size: usize,
    /// Grid column
    pub tile_x: u32,
    /// Grid row
    pub tile_y: u32,
    /// Left edge in pixels
    pub origin_x: u32,
    /// Top edge in pixels
    pub origin_y: u32,
    pub width: u32,
    pub height: u32,
}

impl From<EncodedTile> for TileJpeg {
    fn from(encoded: EncodedTile) -> Self {
        let tile = encoded.tile;
        let (data, size) = encoded.buffer.into_raw_parts();
        Self {
            data,
            size,
            tile_x: tile.column,
            tile_y: tile.row,
            origin_x: tile.x,
            origin_y: tile.y,
            width: tile.width,
            height: tile.height,
        }
    }
}

/// All tiles of a tiled encode, row-major. Failed tiles have null `data`.
#[repr(C)]
#[derive(Debug)]
pub struct TileArray {
    pub tiles: *mut TileJpeg,
    pub count: usize,
    pub tiles_x: u32,
    pub tiles_y: u32,
}

impl TileArray {
    pub fn empty() -> Self {
        Self {
            tiles: ptr::null_mut(),
            count: 0,
            tiles_x: 0,
            tiles_y: 0,
        }
    }

    /// Free every tile and the array, then reset to empty.
    ///
    /// # Safety
    ///
    /// `self` must be empty or come from this crate unreleased.
    pub(crate) unsafe fn release(&mut self) {
        if !self.tiles.is_null() {
            let tiles = Box::from_raw(ptr::slice_from_raw_parts_mut(self.tiles, self.count));
            for tile in tiles.iter() {
                drop(OutputBuffer::from_raw_parts(tile.data, tile.size));
            }
        }
        *self = Self::empty();
    }
}

impl From<TileSet> for TileArray {
    fn from(set: TileSet) -> Self {
        let (tiles_x, tiles_y) = (set.grid().tiles_x(), set.grid().tiles_y());
        let tiles: Box<[TileJpeg]> = set.into_tiles().into_iter().map(TileJpeg::from).collect();
        let count = tiles.len();

        Self {
            tiles: Box::into_raw(tiles).cast::<TileJpeg>(),
            count,
            tiles_x,
            tiles_y,
        }
    }
}

/// Decoded pixels. `data` is null on failure.
#[repr(C)]
#[derive(Debug)]
pub struct RawImage {
    pub data: *mut u8,
    pub size: usize,
    pub width: u32,
    pub height: u32,
    pub channels: u32,
}

impl RawImage {
    pub fn empty() -> Self {
        Self {
            data: ptr::null_mut(),
            size: 0,
            width: 0,
            height: 0,
            channels: 0,
        }
    }

    /// # Safety
    ///
    /// `self` must be empty or come from this crate unreleased.
    pub(crate) unsafe fn release(&mut self) {
        drop(OutputBuffer::from_raw_parts(self.data, self.size));
        *self = Self::empty();
    }
}

impl From<DecodedImage> for RawImage {
    fn from(image: DecodedImage) -> Self {
        let (width, height, channels) = (image.width, image.height, image.channels as u32);
        let (data, size) = OutputBuffer::new(image.pixels).into_raw_parts();
        Self {
            data,
            size,
            width,
            height,
            channels,
        }
    }
}

/// Header fields of a JPEG.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JpegInfo {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
}

impl From<JpegHeader> for JpegInfo {
    fn from(header: JpegHeader) -> Self {
        Self {
            width: header.width,
            height: header.height,
            channels: header.channels as u32,
        }
    }
}

//! Independent per-tile encoding.
//!
//! The image is partitioned by [`TileGrid`] and every tile becomes its own
//! complete JPEG. Workers claim tiles from a shared counter; each claimed
//! tile is converted into a tile-local buffer and compressed with a codec
//! context owned by that tile alone. Tiles are never stitched back together.
//!
//! A tile that fails to encode is left empty. Its siblings are unaffected.

use std::time::Instant;

use tracing::{info, warn};

use super::OutputBuffer;
use crate::codec::{CompressParams, Compressor, DefaultCodec, JpegCodec};
use crate::config::EncoderConfig;
use crate::error::{try_alloc, EncodeError};
use crate::parallel::{Tile, TileGrid, WorkerPool};
use crate::pixel::convert::convert_region_into;
use crate::pixel::{PixelBuffer, PixelFormat, SourceImage};

/// One tile and its JPEG bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedTile {
    pub tile: Tile,
    /// Empty if this tile failed to encode
    pub buffer: OutputBuffer,
}

impl EncodedTile {
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// Every tile of a grid, in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSet {
    grid: TileGrid,
    tiles: Vec<EncodedTile>,
}

impl TileSet {
    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn tiles(&self) -> &[EncodedTile] {
        &self.tiles
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Tile at grid position `(column, row)`.
    pub fn get(&self, column: u32, row: u32) -> Option<&EncodedTile> {
        if column >= self.grid.tiles_x() || row >= self.grid.tiles_y() {
            return None;
        }
        self.tiles
            .get(row as usize * self.grid.tiles_x() as usize + column as usize)
    }

    /// Number of tiles left empty by a failure.
    pub fn failed_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_empty()).count()
    }

    /// Free the bytes of every tile. Safe to call more than once.
    pub fn release(&mut self) {
        for tile in &mut self.tiles {
            tile.buffer.release();
        }
    }

    pub fn into_tiles(self) -> Vec<EncodedTile> {
        self.tiles
    }
}

/// Encode every tile of `image` as its own JPEG.
///
/// # Arguments
///
/// * `image` - Packed words or interleaved pixels
/// * `quality` - JPEG quality; clamped into `[1, 100]`
/// * `tile_size` - Edge length of interior tiles in pixels
/// * `config` - Threading, sampling, preset and the tile conversion layout
///
/// # Errors
///
/// Only invalid geometry is an error. Per-tile failures yield empty tiles.
pub fn encode_tiles(
    image: &SourceImage<'_>,
    quality: i32,
    tile_size: u32,
    config: &EncoderConfig,
) -> Result<TileSet, EncodeError> {
    encode_tiles_with(&DefaultCodec, image, quality, tile_size, config)
}

/// [`encode_tiles`] using an explicit codec.
pub fn encode_tiles_with<C: JpegCodec>(
    codec: &C,
    image: &SourceImage<'_>,
    quality: i32,
    tile_size: u32,
    config: &EncoderConfig,
) -> Result<TileSet, EncodeError> {
    let start = Instant::now();
    let grid = TileGrid::partition(image.width(), image.height(), tile_size)?;
    let params = config.params(quality);
    let layout = config.tile_layout;
    let pool = config.pool();

    let tiles = pool.run_indexed(grid.len(), |index| {
        let tile = grid.tile(index);
        let buffer = match encode_tile(codec, image, &tile, layout, &params) {
            Ok(buffer) => buffer,
            Err(err) => {
                warn!(column = tile.column, row = tile.row, error = %err, "tile encode failed");
                OutputBuffer::empty()
            }
        };
        EncodedTile { tile, buffer }
    });

    let set = TileSet { grid, tiles };
    info!(
        tiles = set.len(),
        failed = set.failed_count(),
        threads = pool.threads(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "encoded tiles"
    );
    Ok(set)
}

fn encode_tile<C: JpegCodec>(
    codec: &C,
    image: &SourceImage<'_>,
    tile: &Tile,
    layout: PixelFormat,
    params: &CompressParams,
) -> Result<OutputBuffer, EncodeError> {
    let mut compressor = codec.compressor()?;

    let mut local = try_alloc(tile.area() as usize * layout.bytes_per_pixel())?;
    convert_region_into(&WorkerPool::single(), image, tile, layout, &mut local);

    let view = PixelBuffer::packed(&local, tile.width, tile.height, layout)?;
    Ok(OutputBuffer::new(compressor.compress(&view, params)?))
}

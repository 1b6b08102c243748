//! Deterministic tile grid partitioning.
//!
//! Tiles are laid out row-major. Interior tiles are `tile_size` square; tiles
//! on the right and bottom edges are clamped to the image bounds.

use serde::{Deserialize, Serialize};

use crate::error::EncodeError;

/// One rectangular tile of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    /// Column index in the grid
    pub column: u32,
    /// Row index in the grid
    pub row: u32,
    /// Left edge in pixels
    pub x: u32,
    /// Top edge in pixels
    pub y: u32,
    /// Width in pixels (smaller than the tile size only on the right edge)
    pub width: u32,
    /// Height in pixels (smaller than the tile size only on the bottom edge)
    pub height: u32,
}

impl Tile {
    /// Pixel area of this tile.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// A grid of `tiles_x * tiles_y` tiles covering an image exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileGrid {
    width: u32,
    height: u32,
    tile_size: u32,
    tiles_x: u32,
    tiles_y: u32,
}

impl TileGrid {
    /// Partition a `width x height` image into tiles of `tile_size`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDimensions` for a zero dimension and `InvalidTileSize`
    /// for a zero tile size.
    pub fn partition(width: u32, height: u32, tile_size: u32) -> Result<Self, EncodeError> {
        if width == 0 || height == 0 {
            return Err(EncodeError::InvalidDimensions { width, height });
        }
        if tile_size == 0 {
            return Err(EncodeError::InvalidTileSize(tile_size));
        }

        Ok(Self {
            width,
            height,
            tile_size,
            tiles_x: width.div_ceil(tile_size),
            tiles_y: height.div_ceil(tile_size),
        })
    }

    pub fn tiles_x(&self) -> u32 {
        self.tiles_x
    }

    pub fn tiles_y(&self) -> u32 {
        self.tiles_y
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Total number of tiles.
    pub fn len(&self) -> usize {
        self.tiles_x as usize * self.tiles_y as usize
    }

    /// Always false for a constructed grid; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tile at row-major `index`.
    ///
    /// Panics if `index >= len()`.
    pub fn tile(&self, index: usize) -> Tile {
        assert!(index < self.len(), "tile index {index} out of range");

        let column = (index % self.tiles_x as usize) as u32;
        let row = (index / self.tiles_x as usize) as u32;
        let x = column * self.tile_size;
        let y = row * self.tile_size;

        Tile {
            column,
            row,
            x,
            y,
            width: self.tile_size.min(self.width - x),
            height: self.tile_size.min(self.height - y),
        }
    }

    /// Iterate over all tiles in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = Tile> + '_ {
        (0..self.len()).map(move |index| self.tile(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_exact_fit() {
        let grid = TileGrid::partition(512, 256, 256).unwrap();
        assert_eq!((grid.tiles_x(), grid.tiles_y()), (2, 1));
        assert!(grid.iter().all(|t| t.width == 256 && t.height == 256));
    }

    #[test]
    fn test_partition_edge_tiles_clamped() {
        let grid = TileGrid::partition(100, 70, 64).unwrap();
        assert_eq!(grid.len(), 4);

        let last = grid.tile(3);
        assert_eq!((last.column, last.row), (1, 1));
        assert_eq!((last.x, last.y), (64, 64));
        assert_eq!((last.width, last.height), (36, 6));
    }

    #[test]
    fn test_partition_tile_larger_than_image() {
        let grid = TileGrid::partition(10, 5, 4096).unwrap();
        assert_eq!(grid.len(), 1);
        assert_eq!(
            grid.tile(0),
            Tile {
                column: 0,
                row: 0,
                x: 0,
                y: 0,
                width: 10,
                height: 5
            }
        );
    }

    #[test]
    fn test_partition_rejects_zero() {
        assert!(matches!(
            TileGrid::partition(0, 10, 4),
            Err(EncodeError::InvalidDimensions { .. })
        ));
        assert!(matches!(
            TileGrid::partition(10, 10, 0),
            Err(EncodeError::InvalidTileSize(0))
        ));
    }

    #[test]
    #[should_panic]
    fn test_tile_index_out_of_range() {
        let grid = TileGrid::partition(10, 10, 5).unwrap();
        grid.tile(4);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: tile count is ceil(W/S) * ceil(H/S).
        #[test]
        fn prop_tile_count(width in 1u32..2000, height in 1u32..2000, size in 1u32..600) {
            let grid = TileGrid::partition(width, height, size).unwrap();
            let expected = width.div_ceil(size) as usize * height.div_ceil(size) as usize;
            prop_assert_eq!(grid.len(), expected);
        }

        /// Property: tiles cover every pixel exactly once.
        #[test]
        fn prop_tiles_partition_image(width in 1u32..120, height in 1u32..120, size in 1u32..50) {
            let grid = TileGrid::partition(width, height, size).unwrap();
            let mut coverage = vec![0u8; (width * height) as usize];

            for tile in grid.iter() {
                prop_assert!(tile.width >= 1 && tile.width <= size);
                prop_assert!(tile.height >= 1 && tile.height <= size);
                prop_assert!(tile.x + tile.width <= width);
                prop_assert!(tile.y + tile.height <= height);

                for y in tile.y..tile.y + tile.height {
                    for x in tile.x..tile.x + tile.width {
                        coverage[(y * width + x) as usize] += 1;
                    }
                }
            }

            prop_assert!(coverage.iter().all(|&c| c == 1), "every pixel covered exactly once");
            let area: u64 = grid.iter().map(|t| t.area()).sum();
            prop_assert_eq!(area, width as u64 * height as u64);
        }
    }
}

//! Tile windows and deterministic tile iteration

use crate::grid::GridDescriptor;
use std::fmt;

/// Default tile edge when the storage has no natural block layout
pub const DEFAULT_TILE_SIZE: usize = 512;

/// A rectangular pixel window within a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// Row offset in the grid
    pub row_off: usize,
    /// Column offset in the grid
    pub col_off: usize,
    /// Number of rows in this tile
    pub rows: usize,
    /// Number of columns in this tile
    pub cols: usize,
}

impl Tile {
    pub fn new(row_off: usize, col_off: usize, rows: usize, cols: usize) -> Self {
        Self {
            row_off,
            col_off,
            rows,
            cols,
        }
    }

    /// Shape as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// GDAL window offset as (x, y)
    pub fn gdal_offset(&self) -> (isize, isize) {
        (self.col_off as isize, self.row_off as isize)
    }

    /// GDAL window size as (x, y)
    pub fn gdal_size(&self) -> (usize, usize) {
        (self.cols, self.rows)
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}+{}, {}+{}]",
            self.row_off, self.rows, self.col_off, self.cols
        )
    }
}

/// Row-major partition of a grid into non-overlapping tiles.
///
/// Covers the grid exactly once in a stable order; edge tiles are clipped
/// to the grid extent.
#[derive(Debug, Clone)]
pub struct TileGrid {
    grid_rows: usize,
    grid_cols: usize,
    tile_rows: usize,
    tile_cols: usize,
    current_row: usize,
    current_col: usize,
}

impl TileGrid {
    /// Partition a (rows x cols) grid into tiles of at most
    /// (tile_rows x tile_cols)
    pub fn new(grid_rows: usize, grid_cols: usize, tile_rows: usize, tile_cols: usize) -> Self {
        Self {
            grid_rows,
            grid_cols,
            tile_rows: tile_rows.max(1),
            tile_cols: tile_cols.max(1),
            current_row: 0,
            current_col: 0,
        }
    }

    /// Fixed-size partition of a descriptor's grid
    pub fn for_descriptor(desc: &GridDescriptor) -> Self {
        Self::new(desc.height, desc.width, DEFAULT_TILE_SIZE, DEFAULT_TILE_SIZE)
    }

    /// Number of tiles the iteration will yield
    pub fn tile_count(&self) -> usize {
        let across = self.grid_cols.div_ceil(self.tile_cols);
        let down = self.grid_rows.div_ceil(self.tile_rows);
        across * down
    }
}

impl Iterator for TileGrid {
    type Item = Tile;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_row >= self.grid_rows {
            return None;
        }

        let rows = self.tile_rows.min(self.grid_rows - self.current_row);
        let cols = self.tile_cols.min(self.grid_cols - self.current_col);
        let tile = Tile::new(self.current_row, self.current_col, rows, cols);

        self.current_col += self.tile_cols;
        if self.current_col >= self.grid_cols {
            self.current_col = 0;
            self.current_row += self.tile_rows;
        }

        Some(tile)
    }
}

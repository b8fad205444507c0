//! In-memory raster stand-ins for exercising alignment and sweeps
//! without touching the filesystem.

use crate::error::{Error, Result};
use crate::grid::GridDescriptor;
use crate::io::{ReadWindow, WriteWindow};
use crate::tile::Tile;
use ndarray::{s, Array2};

pub struct MemRaster {
    data: Array2<i32>,
    descriptor: GridDescriptor,
}

impl MemRaster {
    pub fn new(data: Array2<i32>, descriptor: GridDescriptor) -> Self {
        assert_eq!(data.dim(), descriptor.shape());
        Self { data, descriptor }
    }
}

impl ReadWindow for MemRaster {
    fn descriptor(&self) -> &GridDescriptor {
        &self.descriptor
    }

    fn read_window(&self, tile: &Tile) -> Result<Array2<i32>> {
        let (rows, cols) = self.descriptor.shape();
        if tile.row_off + tile.rows > rows || tile.col_off + tile.cols > cols {
            return Err(Error::WindowOutOfBounds {
                tile: tile.to_string(),
                rows,
                cols,
            });
        }
        Ok(self
            .data
            .slice(s![
                tile.row_off..tile.row_off + tile.rows,
                tile.col_off..tile.col_off + tile.cols
            ])
            .to_owned())
    }
}

pub struct MemSink<T> {
    data: Array2<T>,
    descriptor: GridDescriptor,
}

impl<T: Copy + Default> MemSink<T> {
    pub fn new(descriptor: GridDescriptor) -> Self {
        Self {
            data: Array2::default(descriptor.shape()),
            descriptor,
        }
    }

    pub fn data(&self) -> &Array2<T> {
        &self.data
    }
}

impl<T: Copy + Default> WriteWindow<T> for MemSink<T> {
    fn write_window(&mut self, tile: &Tile, data: &Array2<T>) -> Result<()> {
        let (rows, cols) = self.descriptor.shape();
        if tile.row_off + tile.rows > rows || tile.col_off + tile.cols > cols {
            return Err(Error::WindowOutOfBounds {
                tile: tile.to_string(),
                rows,
                cols,
            });
        }
        if data.dim() != tile.shape() {
            return Err(Error::WindowShapeMismatch {
                er: tile.rows,
                ec: tile.cols,
                ar: data.dim().0,
                ac: data.dim().1,
            });
        }
        self.data
            .slice_mut(s![
                tile.row_off..tile.row_off + tile.rows,
                tile.col_off..tile.col_off + tile.cols
            ])
            .assign(data);
        Ok(())
    }
}

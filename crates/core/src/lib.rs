//! # Firefuel Core
//!
//! Grid metadata, raster I/O and tiled streaming for the firefuel
//! fuel-model update pipeline.
//!
//! This crate provides:
//! - `GridDescriptor`: immutable spatial metadata for a raster grid
//! - `GeoTransform`: affine transformation for georeferencing
//! - `Crs`: coordinate reference system handling
//! - `RasterSource` / `RasterSink`: windowed GDAL-backed raster access
//! - `AlignedView`: on-the-fly nearest-neighbor alignment onto a target grid
//! - `TileGrid` + `sweep`: memory-bounded tile iteration over full grids

pub mod align;
pub mod crs;
pub mod error;
pub mod geotransform;
pub mod grid;
pub mod io;
pub mod sweep;
pub mod tile;

#[cfg(test)]
pub(crate) mod testing;

pub use align::AlignedView;
pub use crs::Crs;
pub use error::{Error, Result};
pub use geotransform::GeoTransform;
pub use grid::GridDescriptor;
pub use io::{GeoTiffOptions, RasterSink, RasterSource, ReadWindow, WriteWindow};
pub use sweep::{sweep, SweepMode};
pub use tile::{Tile, TileGrid};

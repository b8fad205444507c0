//! Windowed raster I/O over GDAL datasets

use crate::crs::Crs;
use crate::error::{Error, Result};
use crate::geotransform::GeoTransform;
use crate::grid::GridDescriptor;
use crate::tile::{Tile, TileGrid, DEFAULT_TILE_SIZE};
use gdal::cpl::CslStringList;
use gdal::raster::{Buffer, GdalType};
use gdal::{Dataset, DriverManager};
use ndarray::Array2;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read access to windows of a grid.
///
/// Implemented by [`RasterSource`] for plain reads and by
/// [`crate::AlignedView`] for resampled reads. Pixel values are surfaced as
/// `i32`: every raster in this pipeline is a small integer categorical code.
pub trait ReadWindow {
    /// The grid the returned windows are expressed on
    fn descriptor(&self) -> &GridDescriptor;

    /// Read one window as a (rows x cols) array
    fn read_window(&self, tile: &Tile) -> Result<Array2<i32>>;
}

/// Write access to windows of a grid
pub trait WriteWindow<T> {
    /// Write one window; the buffer shape must match the tile shape
    fn write_window(&mut self, tile: &Tile, data: &Array2<T>) -> Result<()>;
}

/// Options for creating GeoTIFF outputs
#[derive(Debug, Clone)]
pub struct GeoTiffOptions {
    /// Compression type: "LZW", "DEFLATE", "ZSTD", "NONE"
    pub compression: String,
    /// Tile size for tiled TIFFs (0 for strips)
    pub tile_size: usize,
    /// BigTIFF for files > 4GB
    pub bigtiff: bool,
}

impl Default for GeoTiffOptions {
    fn default() -> Self {
        Self {
            compression: "LZW".to_string(),
            tile_size: 256,
            bigtiff: false,
        }
    }
}

/// An open, readable single-band raster
pub struct RasterSource {
    dataset: Dataset,
    descriptor: GridDescriptor,
    path: PathBuf,
}

impl RasterSource {
    /// Open a raster file read-only and extract its grid descriptor
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let dataset = Dataset::open(path.as_ref())?;
        let band = dataset.rasterband(1)?;

        let (width, height) = dataset.raster_size();
        let dtype = band.band_type();
        let nodata = band.no_data_value();

        let transform = match dataset.geo_transform() {
            Ok(gt) => GeoTransform::from_gdal(gt),
            Err(_) => GeoTransform::default(),
        };

        let crs = match dataset.spatial_ref() {
            Ok(srs) => {
                if let Ok(code) = srs.auth_code() {
                    Some(Crs::from_epsg(code as u32))
                } else {
                    srs.to_wkt().ok().map(Crs::from_wkt)
                }
            }
            Err(_) => None,
        };

        let descriptor = GridDescriptor::new(crs, transform, width, height, dtype, nodata)?;

        debug!(
            path = %path.as_ref().display(),
            width, height, ?dtype, nodata, "opened raster"
        );

        Ok(Self {
            dataset,
            descriptor,
            path: path.as_ref().to_path_buf(),
        })
    }

    /// Path the source was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Tile partition matching the file's natural block layout.
    ///
    /// Striped files expose full-width blocks a handful of rows tall;
    /// those are grouped into larger windows so the sweep does not issue
    /// thousands of tiny reads.
    pub fn natural_tiles(&self) -> Result<TileGrid> {
        let band = self.dataset.rasterband(1)?;
        let (block_x, block_y) = band.block_size();
        let (height, width) = self.descriptor.shape();

        let (tile_rows, tile_cols) = if block_x >= width {
            let strips = (DEFAULT_TILE_SIZE / block_y.max(1)).max(1);
            (strips * block_y.max(1), width)
        } else {
            (block_y.max(1), block_x)
        };

        Ok(TileGrid::new(height, width, tile_rows, tile_cols))
    }
}

impl ReadWindow for RasterSource {
    fn descriptor(&self) -> &GridDescriptor {
        &self.descriptor
    }

    fn read_window(&self, tile: &Tile) -> Result<Array2<i32>> {
        check_window(tile, &self.descriptor)?;

        let band = self.dataset.rasterband(1)?;
        let buffer = band.read_as::<i32>(tile.gdal_offset(), tile.gdal_size(), tile.gdal_size(), None)?;

        Ok(Array2::from_shape_vec(tile.shape(), buffer.data().to_vec())?)
    }
}

/// An open, writable single-band raster.
///
/// Data is written to a `<name>.part` staging file and renamed into place by
/// [`RasterSink::finish`]; an interrupted sweep leaves only the staging
/// file behind, never a partial output that looks final.
pub struct RasterSink<T> {
    dataset: Dataset,
    descriptor: GridDescriptor,
    final_path: PathBuf,
    part_path: PathBuf,
    _pixel: PhantomData<T>,
}

impl<T: GdalType + Copy> RasterSink<T> {
    /// Create a GeoTIFF output on the given grid
    pub fn create<P: AsRef<Path>>(
        path: P,
        descriptor: &GridDescriptor,
        options: &GeoTiffOptions,
    ) -> Result<Self> {
        let final_path = path.as_ref().to_path_buf();
        let mut part_name = final_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        part_name.push(".part");
        let part_path = final_path.with_file_name(part_name);

        let driver = DriverManager::get_driver_by_name("GTiff")?;

        let mut create_options = CslStringList::new();
        create_options.add_string(&format!("COMPRESS={}", options.compression))?;
        if options.tile_size > 0 {
            create_options.add_string("TILED=YES")?;
            create_options.add_string(&format!("BLOCKXSIZE={}", options.tile_size))?;
            create_options.add_string(&format!("BLOCKYSIZE={}", options.tile_size))?;
        }
        if options.bigtiff {
            create_options.add_string("BIGTIFF=YES")?;
        }

        let mut dataset = driver.create_with_band_type_with_options::<T, _>(
            &part_path,
            descriptor.width,
            descriptor.height,
            1,
            &create_options,
        )?;

        dataset.set_geo_transform(&descriptor.transform.to_gdal())?;
        if let Some(crs) = &descriptor.crs {
            dataset.set_spatial_ref(&crs.to_spatial_ref()?)?;
        }

        let mut band = dataset.rasterband(1)?;
        if let Some(nodata) = descriptor.nodata {
            band.set_no_data_value(Some(nodata))?;
        }

        Ok(Self {
            dataset,
            descriptor: descriptor.clone(),
            final_path,
            part_path,
            _pixel: PhantomData,
        })
    }

    /// The grid being written
    pub fn descriptor(&self) -> &GridDescriptor {
        &self.descriptor
    }

    /// Flush, close and move the staging file to its final path
    pub fn finish(mut self) -> Result<PathBuf> {
        self.dataset.flush_cache()?;
        drop(self.dataset);
        std::fs::rename(&self.part_path, &self.final_path)?;
        debug!(path = %self.final_path.display(), "finished raster output");
        Ok(self.final_path)
    }
}

impl<T: GdalType + Copy> WriteWindow<T> for RasterSink<T> {
    fn write_window(&mut self, tile: &Tile, data: &Array2<T>) -> Result<()> {
        check_window(tile, &self.descriptor)?;

        let (rows, cols) = data.dim();
        if (rows, cols) != tile.shape() {
            return Err(Error::WindowShapeMismatch {
                er: tile.rows,
                ec: tile.cols,
                ar: rows,
                ac: cols,
            });
        }

        let values: Vec<T> = data.iter().copied().collect();
        let mut buffer = Buffer::new(tile.gdal_size(), values);

        let mut band = self.dataset.rasterband(1)?;
        band.write(tile.gdal_offset(), tile.gdal_size(), &mut buffer)?;
        Ok(())
    }
}

fn check_window(tile: &Tile, descriptor: &GridDescriptor) -> Result<()> {
    let (rows, cols) = descriptor.shape();
    if tile.row_off + tile.rows > rows || tile.col_off + tile.cols > cols {
        return Err(Error::WindowOutOfBounds {
            tile: tile.to_string(),
            rows,
            cols,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gdal::raster::GdalDataType;
    use ndarray::s;

    fn descriptor(rows: usize, cols: usize) -> GridDescriptor {
        GridDescriptor::new(
            None,
            GeoTransform::new(400_000.0, 4_200_000.0, 30.0, -30.0),
            cols,
            rows,
            GdalDataType::Int32,
            Some(0.0),
        )
        .unwrap()
    }

    #[test]
    fn test_write_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.tif");
        let desc = descriptor(64, 48);

        let data = Array2::from_shape_fn((64, 48), |(r, c)| (r * 48 + c) as i32);
        let mut sink = RasterSink::<i32>::create(&path, &desc, &GeoTiffOptions::default()).unwrap();
        for tile in TileGrid::new(64, 48, 32, 48) {
            let window = data
                .slice(s![
                    tile.row_off..tile.row_off + tile.rows,
                    tile.col_off..tile.col_off + tile.cols
                ])
                .to_owned();
            sink.write_window(&tile, &window).unwrap();
        }
        let written = sink.finish().unwrap();
        assert_eq!(written, path);

        let source = RasterSource::open(&path).unwrap();
        assert_eq!(source.descriptor().shape(), (64, 48));
        assert_eq!(source.descriptor().nodata, Some(0.0));
        assert!(source
            .descriptor()
            .transform
            .approx_eq(&desc.transform, 1e-9));
        assert_eq!(source.read_window(&Tile::new(0, 0, 64, 48)).unwrap(), data);
    }

    #[test]
    fn test_staging_file_until_finish() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staged.tif");
        let part = dir.path().join("staged.tif.part");
        let desc = descriptor(16, 16);

        let mut sink = RasterSink::<i32>::create(&path, &desc, &GeoTiffOptions::default()).unwrap();
        sink.write_window(&Tile::new(0, 0, 16, 16), &Array2::from_elem((16, 16), 7))
            .unwrap();

        // Only the staging file exists while the sweep is in flight
        assert!(part.exists());
        assert!(!path.exists());

        sink.finish().unwrap();
        assert!(path.exists());
        assert!(!part.exists());
    }

    #[test]
    fn test_out_of_bounds_window_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bounds.tif");
        let mut sink =
            RasterSink::<i32>::create(&path, &descriptor(16, 16), &GeoTiffOptions::default())
                .unwrap();

        let result = sink.write_window(&Tile::new(8, 8, 16, 16), &Array2::from_elem((16, 16), 1));
        assert!(matches!(result, Err(Error::WindowOutOfBounds { .. })));
    }
}

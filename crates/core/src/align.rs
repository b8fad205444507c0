//! On-the-fly alignment of a raster onto a target grid

use crate::crs::Crs;
use crate::error::{Error, Result};
use crate::grid::GridDescriptor;
use crate::io::ReadWindow;
use crate::tile::{Tile, DEFAULT_TILE_SIZE};
use gdal::spatial_ref::CoordTransform;
use ndarray::Array2;
use tracing::debug;

/// Cap on source cells pulled per read while resampling. A fine source
/// under a coarse target can need a bounding box far larger than the
/// target tile; reads are split into row bands so per-tile memory stays
/// bounded by the tile plus this many cells.
const MAX_SUB_READ_CELLS: usize = DEFAULT_TILE_SIZE * DEFAULT_TILE_SIZE;

/// A read-only view of a source raster re-expressed on a target grid.
///
/// When source and target already share a grid the view is a pass-through
/// and reads are bit-identical to reading the source directly. Otherwise
/// every requested window is resampled on demand with nearest-neighbor
/// sampling; resampling never interpolates because pixel values are
/// categorical class codes. Pixels whose world-coordinate footprint falls
/// outside the source extent are filled with the source's nodata value.
pub struct AlignedView<S> {
    source: S,
    descriptor: GridDescriptor,
    resample: bool,
    /// (target, source) CRS pair when sampling must cross reference systems
    crs_pair: Option<(Crs, Crs)>,
}

impl<S: ReadWindow> AlignedView<S> {
    /// Align `source` onto `target`.
    ///
    /// Fails with [`Error::Alignment`] if the grids differ but only one
    /// side declares a spatial reference.
    pub fn new(target: &GridDescriptor, source: S) -> Result<Self> {
        let src_desc = source.descriptor();
        let descriptor = target.derive(src_desc.dtype, src_desc.nodata)?;

        if src_desc.same_grid(target) {
            return Ok(Self {
                source,
                descriptor,
                resample: false,
                crs_pair: None,
            });
        }

        let crs_pair = match (&target.crs, &src_desc.crs) {
            (Some(t), Some(s)) => {
                if t.is_equivalent(s) {
                    None
                } else {
                    Some((t.clone(), s.clone()))
                }
            }
            (None, None) => None,
            _ => {
                return Err(Error::Alignment(
                    "grids differ but only one declares a spatial reference".to_string(),
                ))
            }
        };

        debug!(
            cross_crs = crs_pair.is_some(),
            "aligning source onto target grid via nearest-neighbor resampling"
        );

        Ok(Self {
            source,
            descriptor,
            resample: true,
            crs_pair,
        })
    }

    /// Whether reads go through resampling
    pub fn is_resampled(&self) -> bool {
        self.resample
    }

    /// Nodata fill value for out-of-source pixels
    fn fill_value(&self) -> i32 {
        self.descriptor.nodata_or_zero() as i32
    }

    fn resample_window(&self, tile: &Tile) -> Result<Array2<i32>> {
        let mut out = Array2::from_elem(tile.shape(), self.fill_value());

        let src_desc = self.source.descriptor();
        let (src_rows, src_cols) = src_desc.shape();

        // Target pixel centers in target world coordinates, row-major
        let count = tile.rows * tile.cols;
        let mut xs = Vec::with_capacity(count);
        let mut ys = Vec::with_capacity(count);
        for r in 0..tile.rows {
            for c in 0..tile.cols {
                let (x, y) = self
                    .descriptor
                    .transform
                    .pixel_to_geo(tile.col_off + c, tile.row_off + r);
                xs.push(x);
                ys.push(y);
            }
        }

        // The transform is rebuilt per window from the stored CRS pair so
        // the view stays Send for parallel sweeps.
        if let Some((target_crs, source_crs)) = &self.crs_pair {
            let ct = CoordTransform::new(
                &target_crs.to_spatial_ref()?,
                &source_crs.to_spatial_ref()?,
            )?;
            let mut zs = vec![0.0; count];
            ct.transform_coords(&mut xs, &mut ys, &mut zs)
                .map_err(|e| Error::Alignment(e.to_string()))?;
        }

        // Nearest source cell per target pixel, tracking the bounding
        // window actually needed
        let mut samples: Vec<Option<(usize, usize)>> = Vec::with_capacity(count);
        let mut min_r = usize::MAX;
        let mut max_r = 0usize;
        let mut min_c = usize::MAX;
        let mut max_c = 0usize;

        for i in 0..count {
            let (fc, fr) = src_desc.transform.geo_to_pixel(xs[i], ys[i]);
            let (sc, sr) = (fc.floor(), fr.floor());
            if sr >= 0.0 && sc >= 0.0 && (sr as usize) < src_rows && (sc as usize) < src_cols {
                let (sr, sc) = (sr as usize, sc as usize);
                min_r = min_r.min(sr);
                max_r = max_r.max(sr);
                min_c = min_c.min(sc);
                max_c = max_c.max(sc);
                samples.push(Some((sr, sc)));
            } else {
                samples.push(None);
            }
        }

        if min_r == usize::MAX {
            // Window footprint is entirely outside the source
            return Ok(out);
        }

        let sub_cols = max_c - min_c + 1;
        let band_rows = (MAX_SUB_READ_CELLS / sub_cols).max(1);

        let mut band_start = min_r;
        while band_start <= max_r {
            let rows = band_rows.min(max_r - band_start + 1);
            let band = Tile::new(band_start, min_c, rows, sub_cols);
            let data = self.source.read_window(&band)?;

            for (i, sample) in samples.iter().enumerate() {
                if let Some((sr, sc)) = sample {
                    if (band_start..band_start + rows).contains(sr) {
                        out[[i / tile.cols, i % tile.cols]] = data[[sr - band_start, sc - min_c]];
                    }
                }
            }
            band_start += rows;
        }

        Ok(out)
    }
}

impl<S: ReadWindow> ReadWindow for AlignedView<S> {
    fn descriptor(&self) -> &GridDescriptor {
        &self.descriptor
    }

    fn read_window(&self, tile: &Tile) -> Result<Array2<i32>> {
        if self.resample {
            self.resample_window(tile)
        } else {
            self.source.read_window(tile)
        }
    }
}

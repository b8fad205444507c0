//! Multi-raster DIST merge by impact ranking

use firefuel_core::{
    sweep, AlignedView, Error, GeoTiffOptions, RasterSink, RasterSource, ReadWindow, Result,
    SweepMode,
};
use gdal::raster::GdalDataType;
use ndarray::Array2;
use std::path::{Path, PathBuf};
use tracing::info;

/// Rank given to values that are not valid DIST codes (including nodata),
/// so they are never chosen over a real disturbance
pub const SENTINEL_RANK: u8 = 99;

/// Impact rank of a DIST code; smaller is more impactful.
///
/// Severity dominates, recency breaks ties within a severity: the nine
/// valid codes rank 1..9, everything else gets [`SENTINEL_RANK`].
pub fn impact_rank(code: i32) -> u8 {
    match code {
        // High severity
        131 => 1,
        132 => 2,
        133 => 3,
        // Moderate severity
        121 => 4,
        122 => 5,
        123 => 6,
        // Low severity
        111 => 7,
        112 => 8,
        113 => 9,
        _ => SENTINEL_RANK,
    }
}

/// Merge a stack of per-pixel DIST buffers into one.
///
/// Per pixel the code with the minimum impact rank wins; ties go to the
/// first buffer in which the minimum occurs, so callers control the
/// tie-break by input order. Pixels that are nodata in every buffer stay
/// nodata, guarding against the sentinel rank masquerading as a real
/// disturbance.
///
/// Panics if `stack` is empty; the sweep wrapper rejects that case before
/// any per-tile work starts.
pub fn combine_stack(stack: &[Array2<i32>], nodata: i32) -> Array2<u16> {
    let shape = stack[0].dim();

    Array2::from_shape_fn(shape, |idx| {
        let mut best_value = stack[0][idx];
        let mut best_rank = impact_rank(best_value);
        let mut all_nodata = best_value == nodata;

        for buffer in &stack[1..] {
            let value = buffer[idx];
            if value != nodata {
                all_nodata = false;
            }
            let rank = impact_rank(value);
            if rank < best_rank {
                best_rank = rank;
                best_value = value;
            }
        }

        if all_nodata {
            nodata as u16
        } else {
            debug_assert!(
                u16::try_from(best_value).is_ok(),
                "DIST code {best_value} does not fit u16"
            );
            best_value as u16
        }
    })
}

/// Combine DIST rasters into a single composite.
///
/// The first raster defines the output grid and nodata; later rasters are
/// aligned onto it when their grids differ. Inputs are consulted in the
/// order given, which fixes the tie-break among equally-ranked codes.
pub fn combine_dist<P: AsRef<Path>, Q: AsRef<Path>>(
    dist_paths: &[P],
    output_path: Q,
    mode: SweepMode,
) -> Result<PathBuf> {
    let Some((first_path, rest)) = dist_paths.split_first() else {
        return Err(Error::EmptyCombine);
    };

    info!(count = dist_paths.len(), "combining DIST rasters");

    let first = RasterSource::open(first_path.as_ref())?;
    let target = first.descriptor().clone();
    let nodata = target.nodata_or_zero() as i32;
    let tiles = first.natural_tiles()?;

    let mut views = vec![AlignedView::new(&target, first)?];
    for path in rest {
        let source = RasterSource::open(path.as_ref())?;
        views.push(AlignedView::new(&target, source)?);
    }

    let out_desc = target.derive(GdalDataType::UInt16, Some(nodata as f64))?;
    let mut sink = RasterSink::<u16>::create(
        output_path.as_ref(),
        &out_desc,
        &GeoTiffOptions::default(),
    )?;

    sweep(
        views,
        &mut sink,
        tiles,
        |_, buffers| combine_stack(buffers, nodata),
        mode,
    )?;

    let path = sink.finish()?;
    info!(path = %path.display(), "wrote combined DIST raster");
    Ok(path)
}

//! Rule-driven FM40 reclassification

use crate::ruleset::RuleTable;
use firefuel_core::{
    sweep, AlignedView, GeoTiffOptions, RasterSink, RasterSource, ReadWindow, Result, SweepMode,
};
use gdal::raster::GdalDataType;
use ndarray::{Array2, Zip};
use std::path::{Path, PathBuf};
use tracing::info;

/// FM40 codes at or below this value are non-burnable classes, never
/// reclassified by fire disturbance
const NONBURNABLE_MAX: i32 = 100;

/// Reclassify one pixel.
///
/// Decision order: propagate joint nodata; leave pixels with no
/// disturbance evidence unchanged; leave non-burnable classes unchanged;
/// otherwise apply the rule for (DIST code, FM40 code), falling back to
/// "no change" when the rule is absent or explicitly marked so. Never
/// fails: unknown codes pass through unchanged.
pub fn reclassify(
    dist: i32,
    fm40: i32,
    rules: &RuleTable,
    dist_nodata: i32,
    fm40_nodata: i32,
) -> i32 {
    if dist == dist_nodata && fm40 == fm40_nodata {
        return fm40_nodata;
    }
    if dist == dist_nodata || fm40 <= NONBURNABLE_MAX {
        return fm40;
    }
    match rules.lookup(dist, fm40) {
        Some(Some(new_code)) => new_code,
        _ => fm40,
    }
}

/// Reclassify one tile of FM40 values against its DIST window
pub fn reclassify_tile(
    fm40: &Array2<i32>,
    dist: &Array2<i32>,
    rules: &RuleTable,
    dist_nodata: i32,
    fm40_nodata: i32,
) -> Array2<i16> {
    Zip::from(fm40)
        .and(dist)
        .map_collect(|&f, &d| {
            let code = reclassify(d, f, rules, dist_nodata, fm40_nodata);
            debug_assert!(
                i16::try_from(code).is_ok(),
                "FM40 code {code} does not fit i16"
            );
            code as i16
        })
}

/// Update an FM40 raster from a combined DIST raster and a rule table.
///
/// The FM40 grid is the reference: the DIST raster is aligned onto it
/// when their grids differ. Output is i16 with the FM40 raster's nodata
/// (0 when it declares none).
pub fn update_fm40<P: AsRef<Path>>(
    fm40_path: P,
    dist_path: P,
    rules: &RuleTable,
    output_path: P,
    mode: SweepMode,
) -> Result<PathBuf> {
    let fm40 = RasterSource::open(fm40_path.as_ref())?;
    let dist = RasterSource::open(dist_path.as_ref())?;

    let target = fm40.descriptor().clone();
    let fm40_nodata = target.nodata_or_zero() as i32;
    let dist_nodata = dist.descriptor().nodata_or_zero() as i32;
    let tiles = fm40.natural_tiles()?;

    let fm40_view = AlignedView::new(&target, fm40)?;
    let dist_view = AlignedView::new(&target, dist)?;
    if dist_view.is_resampled() {
        info!("DIST raster does not share the FM40 grid; aligning on the fly");
    }

    let out_desc = target.derive(GdalDataType::Int16, Some(fm40_nodata as f64))?;
    let mut sink = RasterSink::<i16>::create(
        output_path.as_ref(),
        &out_desc,
        &GeoTiffOptions::default(),
    )?;

    sweep(
        vec![fm40_view, dist_view],
        &mut sink,
        tiles,
        |_, buffers| reclassify_tile(&buffers[0], &buffers[1], rules, dist_nodata, fm40_nodata),
        mode,
    )?;

    let path = sink.finish()?;
    info!(path = %path.display(), "wrote updated FM40 raster");
    Ok(path)
}

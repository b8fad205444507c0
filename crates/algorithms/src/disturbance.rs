//! Burn severity → disturbance (DIST) code conversion
//!
//! A DIST code is a 3-digit integer `100 + 10*severity + time_code`:
//! disturbance type 1 (wildfire), severity 1–3, recency bucket 1–3.

use firefuel_core::{
    sweep, AlignedView, Error, GeoTiffOptions, GridDescriptor, RasterSink, RasterSource, Result,
    SweepMode, TileGrid,
};
use gdal::raster::GdalDataType;
use ndarray::Array2;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Nodata marker for DIST rasters
pub const DIST_NODATA: u16 = 0;

/// MTBS burn-severity class → DIST severity code.
///
/// Increased greenness (5) and unburned-to-low (1) both land on severity 1;
/// high severity (4) maps to 3, moderate (3) to 2, low (2) to 1.
const SEVERITY_MAP: [(i32, u16); 5] = [(5, 1), (4, 3), (3, 2), (2, 1), (1, 1)];

fn severity_code(bs: i32) -> Option<u16> {
    SEVERITY_MAP
        .iter()
        .find(|(class, _)| *class == bs)
        .map(|(_, sev)| *sev)
}

/// Recency bucket for a fire relative to the effective year.
///
/// Returns `None` when the fire is more than 10 years old: too stale to
/// matter for the update, which then produces an all-nodata raster rather
/// than failing. A fire that postdates the effective year is an error.
pub fn time_code(fire_year: i32, effective_year: i32) -> Result<Option<u16>> {
    let years_since_fire = effective_year - fire_year;
    if years_since_fire < 0 {
        return Err(Error::InvalidFireYear {
            fire_year,
            effective_year,
        });
    }

    Ok(match years_since_fire {
        0 => Some(1),
        1..=5 => Some(2),
        6..=10 => Some(3),
        _ => None,
    })
}

/// Compose a DIST code from a severity code and a time code
pub fn dist_code(severity: u16, time_code: u16) -> u16 {
    100 + 10 * severity + time_code
}

/// Encode one tile of burn-severity values.
///
/// Pure per-pixel lookup: unmapped values (including the source nodata)
/// become [`DIST_NODATA`], never an error. With no time code the whole
/// tile is nodata.
pub fn encode_tile(bs: &Array2<i32>, time_code: Option<u16>) -> Array2<u16> {
    let Some(tc) = time_code else {
        return Array2::from_elem(bs.dim(), DIST_NODATA);
    };

    bs.mapv(|v| match severity_code(v) {
        Some(sev) => dist_code(sev, tc),
        None => DIST_NODATA,
    })
}

/// Convert a burn-severity raster to a DIST raster on the target grid.
///
/// The severity raster is aligned onto `align_to` (the FM40 grid) with
/// nearest-neighbor resampling, swept tile by tile, and written as a u16
/// GeoTIFF with nodata 0.
pub fn convert_bs_to_dist<P: AsRef<Path>>(
    bs_path: P,
    fire_year: i32,
    effective_year: i32,
    output_path: P,
    align_to: &GridDescriptor,
    mode: SweepMode,
) -> Result<PathBuf> {
    let tc = time_code(fire_year, effective_year)?;
    if tc.is_none() {
        warn!(
            fire_year,
            effective_year,
            "fire is more than 10 years before the effective year; output will be all nodata"
        );
    }

    let source = RasterSource::open(bs_path.as_ref())?;
    let view = AlignedView::new(align_to, source)?;

    let out_desc = align_to.derive(GdalDataType::UInt16, Some(DIST_NODATA as f64))?;
    let tiles = TileGrid::for_descriptor(&out_desc);
    let mut sink = RasterSink::<u16>::create(
        output_path.as_ref(),
        &out_desc,
        &GeoTiffOptions::default(),
    )?;

    sweep(
        vec![view],
        &mut sink,
        tiles,
        |_, buffers| encode_tile(&buffers[0], tc),
        mode,
    )?;

    let path = sink.finish()?;
    info!(path = %path.display(), fire_year, "wrote DIST raster");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_code_buckets() {
        assert_eq!(time_code(2018, 2018).unwrap(), Some(1));
        assert_eq!(time_code(2013, 2018).unwrap(), Some(2));
        assert_eq!(time_code(2012, 2018).unwrap(), Some(3));
        assert_eq!(time_code(2008, 2018).unwrap(), Some(3));
        assert_eq!(time_code(2007, 2018).unwrap(), None);
    }

    #[test]
    fn test_fire_after_effective_year_fails() {
        let result = time_code(2019, 2018);
        assert!(matches!(
            result,
            Err(Error::InvalidFireYear {
                fire_year: 2019,
                effective_year: 2018
            })
        ));
    }

    #[test]
    fn test_encode_known_classes() {
        let bs = ndarray::array![[5, 4], [3, 2], [1, 0]];
        let out = encode_tile(&bs, Some(1));
        // severity: 5→1, 4→3, 3→2, 2→1, 1→1; 0 is unmapped
        assert_eq!(out, ndarray::array![[111, 131], [121, 111], [111, 0]]);
    }

    #[test]
    fn test_encode_output_is_total() {
        const VALID: [u16; 9] = [111, 112, 113, 121, 122, 123, 131, 132, 133];
        for tc in 1..=3u16 {
            for bs in -2..300 {
                let out = encode_tile(&ndarray::array![[bs]], Some(tc));
                let v = out[[0, 0]];
                assert!(
                    v == DIST_NODATA || VALID.contains(&v),
                    "bs={bs} tc={tc} produced {v}"
                );
            }
        }
    }

    #[test]
    fn test_stale_fire_is_all_nodata() {
        let bs = ndarray::array![[5, 4, 3], [2, 1, 9]];
        let out = encode_tile(&bs, None);
        assert!(out.iter().all(|&v| v == DIST_NODATA));
    }
}

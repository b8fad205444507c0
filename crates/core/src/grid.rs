//! Immutable grid metadata

use crate::crs::Crs;
use crate::error::{Error, Result};
use crate::geotransform::GeoTransform;
use gdal::raster::GdalDataType;

/// Tolerance for comparing geotransform coefficients of two grids
const TRANSFORM_EPS: f64 = 1e-9;

/// Immutable spatial metadata describing a raster grid.
///
/// A descriptor is owned by whichever raster produced it and is never
/// mutated; output grids are derived with [`GridDescriptor::derive`].
#[derive(Debug, Clone)]
pub struct GridDescriptor {
    /// Coordinate reference system, if the raster declares one
    pub crs: Option<Crs>,
    /// Affine pixel-to-world transform
    pub transform: GeoTransform,
    /// Grid width in pixels
    pub width: usize,
    /// Grid height in pixels
    pub height: usize,
    /// Pixel datatype
    pub dtype: GdalDataType,
    /// Nodata marker, if declared
    pub nodata: Option<f64>,
}

impl GridDescriptor {
    /// Create a descriptor, validating its invariants
    pub fn new(
        crs: Option<Crs>,
        transform: GeoTransform,
        width: usize,
        height: usize,
        dtype: GdalDataType,
        nodata: Option<f64>,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidDimensions { width, height });
        }
        if let Some(nd) = nodata {
            if !nodata_fits(nd, dtype) {
                return Err(Error::NodataOutOfRange {
                    nodata: nd,
                    dtype: format!("{dtype:?}"),
                });
            }
        }
        Ok(Self {
            crs,
            transform,
            width,
            height,
            dtype,
            nodata,
        })
    }

    /// Derive an output descriptor on the same grid with a different
    /// datatype and nodata marker
    pub fn derive(&self, dtype: GdalDataType, nodata: Option<f64>) -> Result<Self> {
        Self::new(
            self.crs.clone(),
            self.transform,
            self.width,
            self.height,
            dtype,
            nodata,
        )
    }

    /// Shape as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        (self.height, self.width)
    }

    /// Nodata marker, defaulting to 0 when none is declared
    pub fn nodata_or_zero(&self) -> f64 {
        self.nodata.unwrap_or(0.0)
    }

    /// Whether two descriptors address the same pixel grid.
    ///
    /// Datatype and nodata are irrelevant; only CRS, transform and shape
    /// decide whether pixel-wise operations can skip resampling.
    pub fn same_grid(&self, other: &GridDescriptor) -> bool {
        let crs_match = match (&self.crs, &other.crs) {
            (Some(a), Some(b)) => a.is_equivalent(b),
            (None, None) => true,
            _ => false,
        };

        crs_match
            && self.width == other.width
            && self.height == other.height
            && self.transform.approx_eq(&other.transform, TRANSFORM_EPS)
    }
}

fn nodata_fits(nodata: f64, dtype: GdalDataType) -> bool {
    let (min, max) = match dtype {
        GdalDataType::UInt8 => (u8::MIN as f64, u8::MAX as f64),
        #[cfg(any(all(major_ge_3, minor_ge_7), major_ge_4))]
        GdalDataType::Int8 => (i8::MIN as f64, i8::MAX as f64),
        GdalDataType::UInt16 => (u16::MIN as f64, u16::MAX as f64),
        GdalDataType::Int16 => (i16::MIN as f64, i16::MAX as f64),
        GdalDataType::UInt32 => (u32::MIN as f64, u32::MAX as f64),
        GdalDataType::Int32 => (i32::MIN as f64, i32::MAX as f64),
        // Wider or floating types hold any marker we would use
        _ => return true,
    };
    nodata.fract() == 0.0 && nodata >= min && nodata <= max
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(width: usize, height: usize) -> GridDescriptor {
        GridDescriptor::new(
            Some(Crs::from_epsg(5070)),
            GeoTransform::new(0.0, 3000.0, 30.0, -30.0),
            width,
            height,
            GdalDataType::UInt16,
            Some(0.0),
        )
        .unwrap()
    }

    #[test]
    fn test_zero_extent_rejected() {
        let result = GridDescriptor::new(
            None,
            GeoTransform::default(),
            0,
            100,
            GdalDataType::UInt16,
            None,
        );
        assert!(matches!(
            result,
            Err(Error::InvalidDimensions { width: 0, .. })
        ));
    }

    #[test]
    fn test_nodata_must_fit_dtype() {
        let result = GridDescriptor::new(
            None,
            GeoTransform::default(),
            10,
            10,
            GdalDataType::UInt16,
            Some(-1.0),
        );
        assert!(matches!(result, Err(Error::NodataOutOfRange { .. })));
    }

    #[test]
    fn test_derive_keeps_grid() {
        let base = descriptor(100, 80);
        let out = base.derive(GdalDataType::Int16, Some(-32768.0)).unwrap();
        assert!(base.same_grid(&out));
        assert_eq!(out.dtype as u32, GdalDataType::Int16 as u32);
        assert_eq!(out.nodata, Some(-32768.0));
    }

    #[test]
    fn test_same_grid_detects_shift() {
        let a = descriptor(100, 80);
        let mut b = descriptor(100, 80);
        assert!(a.same_grid(&b));

        b.transform.origin_x += 30.0;
        assert!(!a.same_grid(&b));
    }

    #[test]
    fn test_same_grid_detects_crs_change() {
        let a = descriptor(100, 80);
        let mut b = descriptor(100, 80);
        b.crs = Some(Crs::from_epsg(4326));
        assert!(!a.same_grid(&b));
    }
}

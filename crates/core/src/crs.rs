//! Coordinate Reference System handling

use crate::error::{Error, Result};
use gdal::spatial_ref::SpatialRef;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coordinate reference system, held as WKT and/or an EPSG code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crs {
    /// WKT representation (primary)
    wkt: Option<String>,
    /// EPSG code if known
    epsg: Option<u32>,
}

impl Crs {
    /// Create a CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self {
            wkt: None,
            epsg: Some(code),
        }
    }

    /// Create a CRS from a WKT string
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self {
            wkt: Some(wkt.into()),
            epsg: None,
        }
    }

    /// Get the EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// Get the WKT representation
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Check if two CRS refer to the same reference system.
    ///
    /// EPSG codes are compared when both sides have one; otherwise WKT is
    /// compared textually, which can report false negatives for equivalent
    /// but differently-written definitions.
    pub fn is_equivalent(&self, other: &Crs) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }

        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return a == b;
        }

        false
    }

    /// Build a GDAL `SpatialRef` for coordinate transformation.
    ///
    /// Axis order is forced to traditional x/y so transformed coordinates
    /// line up with geotransform math for geographic CRS too.
    pub fn to_spatial_ref(&self) -> Result<SpatialRef> {
        let mut srs = if let Some(code) = self.epsg {
            SpatialRef::from_epsg(code)?
        } else if let Some(wkt) = &self.wkt {
            SpatialRef::from_wkt(wkt)?
        } else {
            return Err(Error::Alignment(
                "CRS carries neither an EPSG code nor WKT".to_string(),
            ));
        };
        srs.set_axis_mapping_strategy(gdal::spatial_ref::AxisMappingStrategy::TraditionalGisOrder);
        Ok(srs)
    }

    /// Short string identifier for logs
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(wkt) = &self.wkt {
            return format!("WKT:{}", &wkt[..wkt.len().min(50)]);
        }
        "Unknown".to_string()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crs_epsg() {
        let crs = Crs::from_epsg(5070);
        assert_eq!(crs.epsg(), Some(5070));
        assert_eq!(crs.identifier(), "EPSG:5070");
    }

    #[test]
    fn test_crs_equivalence() {
        let a = Crs::from_epsg(4326);
        let b = Crs::from_epsg(4326);
        let c = Crs::from_epsg(5070);
        assert!(a.is_equivalent(&b));
        assert!(!a.is_equivalent(&c));
    }

    #[test]
    fn test_wkt_equivalence_is_textual() {
        let a = Crs::from_wkt("PROJCS[\"x\"]");
        let b = Crs::from_wkt("PROJCS[\"x\"]");
        assert!(a.is_equivalent(&b));
    }
}

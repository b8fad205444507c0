//! Pixel-to-world affine mapping

use serde::{Deserialize, Serialize};

/// The six affine coefficients that place a pixel grid in world space:
///
/// ```text
/// x = origin_x + col * pixel_width + row * row_rotation
/// y = origin_y + col * col_rotation + row * pixel_height
/// ```
///
/// Alignment leans on both directions of this mapping: `pixel_to_geo` to
/// express a target pixel in world coordinates, `geo_to_pixel` to land it
/// on a source cell. North-up grids carry zero rotation terms and a
/// negative `pixel_height`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    /// World X of the grid's upper-left corner
    pub origin_x: f64,
    /// World Y of the grid's upper-left corner
    pub origin_y: f64,
    /// Cell size along X
    pub pixel_width: f64,
    /// Cell size along Y, negative for north-up grids
    pub pixel_height: f64,
    /// X skew per row, zero for axis-aligned grids
    pub row_rotation: f64,
    /// Y skew per column, zero for axis-aligned grids
    pub col_rotation: f64,
}

impl GeoTransform {
    /// Axis-aligned transform with no skew
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
            row_rotation: 0.0,
            col_rotation: 0.0,
        }
    }

    /// Build from GDAL's coefficient order:
    /// `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`
    pub fn from_gdal(coeffs: [f64; 6]) -> Self {
        Self {
            origin_x: coeffs[0],
            pixel_width: coeffs[1],
            row_rotation: coeffs[2],
            origin_y: coeffs[3],
            col_rotation: coeffs[4],
            pixel_height: coeffs[5],
        }
    }

    /// The coefficients back in GDAL's order
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.row_rotation,
            self.origin_y,
            self.col_rotation,
            self.pixel_height,
        ]
    }

    /// World coordinates of the center of pixel (col, row)
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        let col_f = col as f64 + 0.5;
        let row_f = row as f64 + 0.5;

        let x = self.origin_x + col_f * self.pixel_width + row_f * self.row_rotation;
        let y = self.origin_y + col_f * self.col_rotation + row_f * self.pixel_height;

        (x, y)
    }

    /// Convert world coordinates to fractional pixel coordinates.
    ///
    /// A value of (5.5, 10.5) is the center of pixel (5, 10); `.floor()`
    /// gives the containing cell, which is the nearest-neighbor sample.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        let det = self.pixel_width * self.pixel_height - self.row_rotation * self.col_rotation;

        if det.abs() < 1e-10 {
            // Non-invertible; callers treat NaN as out of bounds
            return (f64::NAN, f64::NAN);
        }

        let dx = x - self.origin_x;
        let dy = y - self.origin_y;

        let col = (self.pixel_height * dx - self.row_rotation * dy) / det;
        let row = (-self.col_rotation * dx + self.pixel_width * dy) / det;

        (col, row)
    }

    /// Cell edge length, assuming square pixels
    pub fn cell_size(&self) -> f64 {
        self.pixel_width.abs()
    }

    /// Whether two transforms describe the same pixel grid
    pub fn approx_eq(&self, other: &GeoTransform, eps: f64) -> bool {
        let a = self.to_gdal();
        let b = other.to_gdal();
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() <= eps)
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, -1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pixel_to_geo_roundtrip() {
        let gt = GeoTransform::new(100.0, 200.0, 30.0, -30.0);

        let (x, y) = gt.pixel_to_geo(5, 10);
        let (col, row) = gt.geo_to_pixel(x, y);

        assert_relative_eq!(col, 5.5, epsilon = 1e-10);
        assert_relative_eq!(row, 10.5, epsilon = 1e-10);
    }

    #[test]
    fn test_nearest_sample_is_containing_cell() {
        let gt = GeoTransform::new(0.0, 100.0, 10.0, -10.0);

        // Anywhere strictly inside pixel (3, 7) floors back to it
        let (col, row) = gt.geo_to_pixel(73.2, 61.9);
        assert_eq!(col.floor() as i64, 7);
        assert_eq!(row.floor() as i64, 3);
    }

    #[test]
    fn test_approx_eq() {
        let a = GeoTransform::new(0.0, 0.0, 30.0, -30.0);
        let mut b = a;
        assert!(a.approx_eq(&b, 1e-9));

        b.origin_x += 15.0;
        assert!(!a.approx_eq(&b, 1e-9));
    }
}

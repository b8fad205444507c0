//! Error types for firefuel

use thiserror::Error;

/// Main error type for firefuel operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(String),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Nodata value {nodata} is not representable as {dtype}")]
    NodataOutOfRange { nodata: f64, dtype: String },

    #[error("Window {tile} does not fit a {rows}x{cols} grid")]
    WindowOutOfBounds {
        tile: String,
        rows: usize,
        cols: usize,
    },

    #[error("Buffer shape ({ar}, {ac}) does not match window shape ({er}, {ec})")]
    WindowShapeMismatch {
        er: usize,
        ec: usize,
        ar: usize,
        ac: usize,
    },

    #[error("Alignment error: {0}")]
    Alignment(String),

    #[error("Fire year {fire_year} cannot be after the effective year {effective_year}")]
    InvalidFireYear {
        fire_year: i32,
        effective_year: i32,
    },

    #[error("Ruleset error: {0}")]
    Ruleset(String),

    #[error("No 4-digit year found in filename '{0}'")]
    YearNotInFilename(String),

    #[error("No disturbance rasters given to combine")]
    EmptyCombine,
}

impl From<gdal::errors::GdalError> for Error {
    fn from(e: gdal::errors::GdalError) -> Self {
        Error::Gdal(e.to_string())
    }
}

/// Result type alias for firefuel operations
pub type Result<T> = std::result::Result<T, Error>;

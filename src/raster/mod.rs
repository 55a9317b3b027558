// Raster Tile Module
// JPEG-LS style decoding of elevation/raster sub-tiles

mod bitstream;
mod catalog;
mod jls;
mod matrix;

pub use bitstream::BitStream;
pub use catalog::*;
pub use jls::JlsDecoder;
pub use matrix::SampleMatrix;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raster decode errors; each is fatal for one image only
#[derive(Error, Debug)]
pub enum RasterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bit stream truncated: {requested} bits requested, {remaining} left")]
    TruncatedStream { requested: u32, remaining: u64 },

    #[error("Invalid decoder parameters: {0}")]
    InvalidParameters(String),

    #[error("Corrupt image data: {0}")]
    CorruptData(String),

    #[error("Decode task failed: {0}")]
    Task(String),

    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
}

/// Regular mode sample predictor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Predictor {
    /// Median edge detector: picks min/max of left and above at an edge
    #[default]
    MedianEdge,
    /// Left + above - above-left, clamped to the sample range
    Planar,
}

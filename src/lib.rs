// VortexNav - Chart Decoding Engine
// S-57 ENC cells, ISO 8211 containers and JPEG-LS raster tiles

pub mod config;
pub mod enc;
pub mod geometry;
pub mod iso8211;
pub mod raster;
pub mod spatial;

pub use config::{ConfigError, EngineConfig};
pub use enc::{ChartSource, EncDataset, EncError, LoadReport};
pub use geometry::{GeoPoint, GeoRect};
pub use raster::{JlsDecoder, RasterError, SampleMatrix, TileCatalog};
pub use spatial::SpatialIndex;

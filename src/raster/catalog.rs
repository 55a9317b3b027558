// Raster Tile Catalog
// Spatially indexed tiles, concurrent decoding and JSON tile manifests

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use super::jls::JlsDecoder;
use super::matrix::SampleMatrix;
use super::{Predictor, RasterError};
use crate::geometry::GeoRect;
use crate::spatial::SpatialIndex;

/// Where a tile's compressed bytes live
#[derive(Debug, Clone)]
pub enum TileSource {
    Memory(Arc<[u8]>),
    File {
        path: PathBuf,
        offset: u64,
        length: u64,
    },
}

impl TileSource {
    /// The compressed bytes
    pub fn read(&self) -> Result<Vec<u8>, RasterError> {
        match self {
            Self::Memory(bytes) => Ok(bytes.to_vec()),
            Self::File {
                path,
                offset,
                length,
            } => {
                let mut file = File::open(path)?;
                file.seek(SeekFrom::Start(*offset))?;
                let mut data = Vec::new();
                file.take(*length).read_to_end(&mut data)?;
                if (data.len() as u64) < *length {
                    log::debug!(
                        "[Raster] {}: short tile read, {} of {} bytes",
                        path.display(),
                        data.len(),
                        length
                    );
                }
                Ok(data)
            }
        }
    }
}

/// One compressed raster tile
#[derive(Debug, Clone)]
pub struct RasterTile {
    pub name: String,
    pub bounds: GeoRect,
    pub width: usize,
    pub height: usize,
    pub maxval: u16,
    pub near: u16,
    pub predictor: Predictor,
    pub source: TileSource,
}

impl RasterTile {
    pub fn decode(&self) -> Result<SampleMatrix, RasterError> {
        let data = self.source.read()?;
        let image = JlsDecoder::new(self.maxval, self.near)?
            .with_predictor(self.predictor)
            .decode(&data, self.width, self.height)?;
        log::debug!(
            "[Raster] Decoded {} ({}x{}, {} bytes)",
            self.name,
            self.width,
            self.height,
            data.len()
        );
        Ok(image)
    }
}

/// Tiles indexed by their geographic bounds
#[derive(Default)]
pub struct TileCatalog {
    index: SpatialIndex<Arc<RasterTile>>,
}

impl TileCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tiles(tiles: impl IntoIterator<Item = RasterTile>) -> Self {
        Self {
            index: SpatialIndex::bulk_build(
                tiles.into_iter().map(|t| (t.bounds, Arc::new(t))),
            ),
        }
    }

    pub fn insert(&mut self, tile: RasterTile) {
        self.index.insert(tile.bounds, Arc::new(tile));
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Tiles intersecting `rect`, in no particular order
    pub fn tiles(&self, rect: &GeoRect) -> Vec<Arc<RasterTile>> {
        self.index.query(rect).cloned().collect()
    }

    pub fn decode(tile: &RasterTile) -> Result<SampleMatrix, RasterError> {
        tile.decode()
    }

    /// Decode tiles on blocking worker tasks, at most one per CPU at a time.
    /// Results are in input order; a failed tile doesn't affect the others.
    pub async fn decode_all(tiles: &[Arc<RasterTile>]) -> Vec<Result<SampleMatrix, RasterError>> {
        let semaphore = Arc::new(Semaphore::new(num_cpus::get().max(1)));

        let tasks = tiles.iter().map(|tile| {
            let tile = Arc::clone(tile);
            let semaphore = Arc::clone(&semaphore);
            async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| RasterError::Task(e.to_string()))?;
                let name = tile.name.clone();
                let result = tokio::task::spawn_blocking(move || tile.decode())
                    .await
                    .map_err(|e| RasterError::Task(e.to_string()))?;
                if let Err(e) = &result {
                    log::warn!("[Raster] Failed to decode {}: {}", name, e);
                }
                result
            }
        });

        futures::future::join_all(tasks).await
    }
}

/// Tile entry of a manifest
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TileEntry {
    pub name: String,
    /// [min_lon, min_lat, max_lon, max_lat]
    pub bounds: [f64; 4],
    pub width: usize,
    pub height: usize,
    pub maxval: u16,
    #[serde(default)]
    pub near: u16,
    #[serde(default)]
    pub predictor: Option<Predictor>,
    pub offset: u64,
    pub length: u64,
}

/// JSON description of tiles stored in one data file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TileManifest {
    /// Data file, relative to the manifest
    pub file: PathBuf,
    #[serde(default)]
    pub tiles: Vec<TileEntry>,
}

impl TileManifest {
    pub fn from_json(json: &str) -> Result<Self, RasterError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a manifest; its data file path is resolved against the
    /// manifest's directory
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RasterError> {
        let path = path.as_ref();
        let mut manifest = Self::from_json(&std::fs::read_to_string(path)?)?;
        if manifest.file.is_relative() {
            if let Some(dir) = path.parent() {
                manifest.file = dir.join(&manifest.file);
            }
        }
        log::info!(
            "[Raster] Manifest {}: {} tiles in {}",
            path.display(),
            manifest.tiles.len(),
            manifest.file.display()
        );
        Ok(manifest)
    }

    /// Tiles of the manifest; entries without a predictor use `default_predictor`
    pub fn tiles(&self, default_predictor: Predictor) -> Vec<RasterTile> {
        self.tiles
            .iter()
            .map(|entry| {
                let [min_lon, min_lat, max_lon, max_lat] = entry.bounds;
                RasterTile {
                    name: entry.name.clone(),
                    bounds: GeoRect::new(min_lon, min_lat, max_lon, max_lat),
                    width: entry.width,
                    height: entry.height,
                    maxval: entry.maxval,
                    near: entry.near,
                    predictor: entry.predictor.unwrap_or(default_predictor),
                    source: TileSource::File {
                        path: self.file.clone(),
                        offset: entry.offset,
                        length: entry.length,
                    },
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLAT_100: [u8; 6] = [0x00, 0x00, 0x01, 0xC6, 0x95, 0xFE];
    const ALL_ZERO: [u8; 2] = [0xFF, 0x80];

    fn memory_tile(name: &str, bounds: GeoRect, data: &[u8]) -> RasterTile {
        RasterTile {
            name: name.to_string(),
            bounds,
            width: 4,
            height: 4,
            maxval: 255,
            near: 0,
            predictor: Predictor::MedianEdge,
            source: TileSource::Memory(data.into()),
        }
    }

    #[test]
    fn test_catalog_query() {
        let catalog = TileCatalog::from_tiles(vec![
            memory_tile("a", GeoRect::new(0.0, 0.0, 1.0, 1.0), &FLAT_100),
            memory_tile("b", GeoRect::new(1.0, 0.0, 2.0, 1.0), &ALL_ZERO),
        ]);
        assert_eq!(catalog.len(), 2);

        let hits = catalog.tiles(&GeoRect::new(1.5, 0.5, 1.6, 0.6));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "b");
        assert_eq!(catalog.tiles(&GeoRect::new(-1.0, -1.0, 3.0, 2.0)).len(), 2);
        assert!(catalog.tiles(&GeoRect::new(5.0, 5.0, 6.0, 6.0)).is_empty());

        let image = TileCatalog::decode(&hits[0]).unwrap();
        assert_eq!(image.range(), Some((0, 0)));
    }

    #[test]
    fn test_file_tile_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiles.bin");
        let mut data = ALL_ZERO.to_vec();
        data.extend(FLAT_100);
        std::fs::write(&path, &data).unwrap();

        let tile = RasterTile {
            source: TileSource::File {
                path: path.clone(),
                offset: 2,
                length: 6,
            },
            ..memory_tile("flat", GeoRect::new(0.0, 0.0, 1.0, 1.0), &[])
        };
        assert!(tile.decode().unwrap().as_slice().iter().all(|&s| s == 100));

        let missing = RasterTile {
            source: TileSource::File {
                path: dir.path().join("missing.bin"),
                offset: 0,
                length: 6,
            },
            ..tile
        };
        assert!(matches!(missing.decode(), Err(RasterError::Io(_))));
    }

    #[test]
    fn test_manifest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tiles.bin"), FLAT_100).unwrap();
        let manifest_path = dir.path().join("tiles.json");
        std::fs::write(
            &manifest_path,
            r#"{
                "file": "tiles.bin",
                "tiles": [
                    { "name": "t0", "bounds": [170.0, -40.0, 171.0, -39.0],
                      "width": 4, "height": 4, "maxval": 255,
                      "offset": 0, "length": 6 },
                    { "name": "t1", "bounds": [171.0, -40.0, 172.0, -39.0],
                      "width": 4, "height": 4, "maxval": 255, "near": 1,
                      "predictor": "planar", "offset": 0, "length": 6 }
                ]
            }"#,
        )
        .unwrap();

        let manifest = TileManifest::from_file(&manifest_path).unwrap();
        assert_eq!(manifest.file, dir.path().join("tiles.bin"));

        let tiles = manifest.tiles(Predictor::MedianEdge);
        assert_eq!(tiles.len(), 2);
        assert_eq!(tiles[0].near, 0);
        assert_eq!(tiles[0].predictor, Predictor::MedianEdge);
        assert_eq!(tiles[1].predictor, Predictor::Planar);
        assert_eq!(tiles[1].bounds, GeoRect::new(171.0, -40.0, 172.0, -39.0));
        assert!(tiles[0].decode().unwrap().as_slice().iter().all(|&s| s == 100));

        assert!(matches!(
            TileManifest::from_json("{\"tiles\": []}"),
            Err(RasterError::Manifest(_))
        ));
    }

    #[tokio::test]
    async fn test_decode_all_isolates_failures() {
        let bounds = GeoRect::new(0.0, 0.0, 1.0, 1.0);
        let tiles: Vec<Arc<RasterTile>> = vec![
            Arc::new(memory_tile("flat", bounds, &FLAT_100)),
            Arc::new(memory_tile("truncated", bounds, &[0x00])),
            Arc::new(memory_tile("zero", bounds, &ALL_ZERO)),
        ];

        let results = TileCatalog::decode_all(&tiles).await;
        assert_eq!(results.len(), 3);
        assert!(results[0].as_ref().unwrap().as_slice().iter().all(|&s| s == 100));
        assert!(matches!(results[1], Err(RasterError::TruncatedStream { .. })));
        assert!(results[2].as_ref().unwrap().as_slice().iter().all(|&s| s == 0));
    }

    #[tokio::test]
    async fn test_decode_all_many_tiles() {
        let tiles: Vec<Arc<RasterTile>> = (0..32)
            .map(|i| {
                let bounds = GeoRect::new(i as f64, 0.0, i as f64 + 1.0, 1.0);
                Arc::new(memory_tile(&format!("t{}", i), bounds, &FLAT_100))
            })
            .collect();

        let results = TileCatalog::decode_all(&tiles).await;
        assert!(results.iter().all(|r| r.as_ref().map_or(false, |m| m.get(3, 3) == Some(100))));
    }
}

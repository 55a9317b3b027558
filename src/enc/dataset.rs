// ENC Dataset
// Validate pass on open, full geometry load on demand, viewport queries

use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use chrono::NaiveDate;

use super::builder::{
    coordinate_field, raw_coordinates, scale_coordinate, ChartContents, DroppedFeature,
    FeatureBuilder,
};
use super::objects::{Line, Point, Polygon};
use super::priority::DrawPriorities;
use super::EncError;
use crate::geometry::GeoRect;
use crate::iso8211::Iso8211Reader;
use crate::spatial::SpatialIndex;

/// Where the cell bytes come from
#[derive(Debug, Clone)]
pub enum ChartSource {
    File(PathBuf),
    Memory(Arc<[u8]>),
}

impl ChartSource {
    fn reader(&self) -> Result<Iso8211Reader<Box<dyn Read + Send>>, EncError> {
        let source: Box<dyn Read + Send> = match self {
            Self::File(path) => Box::new(BufReader::new(File::open(path)?)),
            Self::Memory(bytes) => Box::new(Cursor::new(Arc::clone(bytes))),
        };
        Ok(Iso8211Reader::new(source))
    }
}

impl From<PathBuf> for ChartSource {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

impl From<&Path> for ChartSource {
    fn from(path: &Path) -> Self {
        Self::File(path.to_path_buf())
    }
}

impl From<Vec<u8>> for ChartSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Memory(bytes.into())
    }
}

/// Cell metadata from the DSID and DSPM records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetInfo {
    pub name: String,
    pub edition: String,
    pub update: String,
    pub issue_date: Option<NaiveDate>,
    pub intended_usage: Option<u8>,
    pub comf: u32,
}

/// Outcome of a full load
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub points: usize,
    pub lines: usize,
    pub polygons: usize,
    pub dropped: Vec<DroppedFeature>,
    pub skipped_records: usize,
}

#[derive(Default)]
struct GeometryIndex {
    points: SpatialIndex<Arc<Point>>,
    lines: SpatialIndex<Arc<Line>>,
    areas: SpatialIndex<Arc<Polygon>>,
    loaded: bool,
}

/// An opened S-57 cell. Metadata and bounds are known after `open`;
/// geometry is available after `load`.
pub struct EncDataset {
    source: ChartSource,
    info: DatasetInfo,
    bounds: GeoRect,
    priorities: Arc<DrawPriorities>,
    geometry: RwLock<GeometryIndex>,
}

impl EncDataset {
    /// Open a cell with the built-in draw priorities
    pub fn open(source: impl Into<ChartSource>) -> Result<Self, EncError> {
        Self::open_with_priorities(source, DrawPriorities::builtin())
    }

    pub fn open_with_priorities(
        source: impl Into<ChartSource>,
        priorities: Arc<DrawPriorities>,
    ) -> Result<Self, EncError> {
        let source = source.into();
        let mut reader = source.reader()?;
        let (info, bounds) = validate(&mut reader)?;

        log::info!(
            "[ENC] Opened {} (edition {}, update {}), bounds {:?}",
            info.name,
            info.edition,
            info.update,
            bounds.to_array()
        );

        Ok(Self {
            source,
            info,
            bounds,
            priorities,
            geometry: RwLock::new(GeometryIndex::default()),
        })
    }

    pub fn info(&self) -> &DatasetInfo {
        &self.info
    }

    /// Extent of all vector records, known since `open`
    pub fn bounds(&self) -> GeoRect {
        self.bounds
    }

    /// Suggested zoom range for the cell extent
    pub fn zooms(&self) -> RangeInclusive<u8> {
        zoom_range(&self.bounds)
    }

    /// Read the whole cell and replace the geometry indices. Queries keep
    /// seeing the previous geometry until the new indices are swapped in.
    pub fn load(&self) -> Result<LoadReport, EncError> {
        let mut reader = self.source.reader()?;
        let contents = ChartContents::read(&mut reader)?;
        let output = FeatureBuilder::new(&contents, &self.priorities).build();

        let report = LoadReport {
            points: output.points.len(),
            lines: output.lines.len(),
            polygons: output.polygons.len(),
            dropped: output.dropped,
            skipped_records: contents.skipped_records,
        };

        let index = GeometryIndex {
            points: SpatialIndex::bulk_build(
                output.points.into_iter().map(|p| (p.bounds(), Arc::new(p))),
            ),
            lines: SpatialIndex::bulk_build(
                output.lines.into_iter().map(|l| (l.bounds(), Arc::new(l))),
            ),
            areas: SpatialIndex::bulk_build(
                output.polygons.into_iter().map(|a| (a.bounds(), Arc::new(a))),
            ),
            loaded: true,
        };

        *self.geometry.write().map_err(|_| EncError::LockPoisoned)? = index;

        log::info!(
            "[ENC] {}: loaded {} points, {} lines, {} polygons ({} features dropped)",
            self.info.name,
            report.points,
            report.lines,
            report.polygons,
            report.dropped.len()
        );
        Ok(report)
    }

    /// Run `load` on a blocking worker task
    pub async fn load_in_background(self: &Arc<Self>) -> Result<LoadReport, EncError> {
        let dataset = Arc::clone(self);
        tokio::task::spawn_blocking(move || dataset.load())
            .await
            .map_err(|e| EncError::Task(e.to_string()))?
    }

    /// Drop all geometry; metadata and bounds stay
    pub fn clear(&self) -> Result<(), EncError> {
        *self.geometry.write().map_err(|_| EncError::LockPoisoned)? = GeometryIndex::default();
        log::debug!("[ENC] {}: geometry cleared", self.info.name);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.geometry.read().map(|g| g.loaded).unwrap_or(false)
    }

    pub fn points(&self, rect: &GeoRect) -> Result<Vec<Arc<Point>>, EncError> {
        let geometry = self.geometry.read().map_err(|_| EncError::LockPoisoned)?;
        Ok(geometry.points.query(rect).cloned().collect())
    }

    pub fn lines(&self, rect: &GeoRect) -> Result<Vec<Arc<Line>>, EncError> {
        let geometry = self.geometry.read().map_err(|_| EncError::LockPoisoned)?;
        Ok(geometry.lines.query(rect).cloned().collect())
    }

    pub fn polygons(&self, rect: &GeoRect) -> Result<Vec<Arc<Polygon>>, EncError> {
        let geometry = self.geometry.read().map_err(|_| EncError::LockPoisoned)?;
        Ok(geometry.areas.query(rect).cloned().collect())
    }
}

/// Cheap first pass: metadata and the extent of all vector coordinates
fn validate<R: Read>(reader: &mut Iso8211Reader<R>) -> Result<(DatasetInfo, GeoRect), EncError> {
    let mut info = DatasetInfo {
        comf: 1,
        ..Default::default()
    };
    let mut raw = GeoRect::empty();

    reader.read_ddr()?;
    while let Some(record) = reader.read_record()? {
        let field = match record.get(1) {
            Some(field) => field,
            None => continue,
        };

        match field.tag() {
            "VRID" => {
                if let Some(coords) = coordinate_field(&record) {
                    for c in raw_coordinates(coords).map_err(EncError::InvalidRecord)? {
                        raw.min_lon = raw.min_lon.min(c.x as f64);
                        raw.max_lon = raw.max_lon.max(c.x as f64);
                        raw.min_lat = raw.min_lat.min(c.y as f64);
                        raw.max_lat = raw.max_lat.max(c.y as f64);
                    }
                }
            }
            "DSID" => {
                let text = |label: &str| {
                    field
                        .subfield(label)
                        .map(|v| v.to_text().trim().to_string())
                        .unwrap_or_default()
                };
                info.name = field
                    .subfield("DSNM")
                    .map(|v| v.to_text().trim().to_string())
                    .ok_or_else(|| EncError::InvalidRecord("DSID without DSNM".to_string()))?;
                info.edition = text("EDTN");
                info.update = text("UPDN");
                info.issue_date = NaiveDate::parse_from_str(&text("ISDT"), "%Y%m%d").ok();
                info.intended_usage = field
                    .subfield("INTU")
                    .and_then(|v| v.as_u32())
                    .and_then(|v| u8::try_from(v).ok());
            }
            "DSPM" => {
                info.comf = field
                    .subfield("COMF")
                    .and_then(|v| v.as_u32())
                    .filter(|&comf| comf > 0)
                    .ok_or_else(|| EncError::InvalidRecord("DSPM without COMF".to_string()))?;
            }
            _ => {}
        }
    }

    let bounds = if raw.is_empty() {
        raw
    } else {
        let scale = |v: f64| scale_coordinate(v as i32, info.comf);
        GeoRect::new(
            scale(raw.min_lon),
            scale(raw.min_lat),
            scale(raw.max_lon),
            scale(raw.max_lat),
        )
    };
    if !bounds.is_valid() {
        return Err(EncError::InvalidBounds(bounds));
    }

    Ok((info, bounds))
}

/// Zoom range by the smaller side of the extent, in degrees
pub fn zoom_range(bounds: &GeoRect) -> RangeInclusive<u8> {
    const BREAKPOINTS: [(f64, u8, u8); 15] = [
        (180.0, 0, 10),
        (90.0, 1, 11),
        (45.0, 2, 12),
        (22.5, 3, 13),
        (11.25, 4, 14),
        (5.625, 5, 15),
        (2.813, 6, 16),
        (1.406, 7, 17),
        (0.703, 8, 18),
        (0.352, 9, 19),
        (0.176, 10, 20),
        (0.088, 11, 20),
        (0.044, 12, 20),
        (0.022, 13, 20),
        (0.011, 14, 20),
    ];

    let size = bounds.width().min(bounds.height());
    BREAKPOINTS
        .iter()
        .find(|(limit, _, _)| size > *limit)
        .map(|&(_, min, max)| min..=max)
        .unwrap_or(15..=20)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enc::catalogue::attribute_codes::*;
    use crate::enc::catalogue::object_codes::*;
    use crate::enc::{PointerError, RecordKey, RCNM_VC, RCNM_VE, RCNM_VI};
    use crate::geometry::GeoPoint;
    use crate::iso8211::testing::{le_u16, name, text, ChartFixture, Pointer, S57_DEFINITIONS};
    use proptest::prelude::*;

    const COMF: u32 = 10_000_000;

    /// Square land area with a landmark in the middle and a sounding
    fn harbour() -> ChartFixture {
        let mut fixture = ChartFixture::new();
        fixture
            .dsid("NZ40001", "3", "2", "20240115")
            .dspm(COMF, 10)
            .node(RCNM_VC, 1, 1_740_000_000, -370_000_000)
            .node(RCNM_VC, 2, 1_750_000_000, -370_000_000)
            .node(RCNM_VC, 3, 1_750_000_000, -360_000_000)
            .edge(10, 1, 2, &[(1_745_000_000, -371_000_000)])
            .edge(11, 2, 3, &[])
            .edge(12, 3, 1, &[])
            .node(RCNM_VI, 20, 1_748_000_000, -368_000_000)
            .soundings(21, &[(1_746_000_000, -369_000_000, 152)])
            .feature(1, 3, LNDARE, &[], &[Pointer::edge(10), Pointer::edge(11), Pointer::edge(12)])
            .feature(2, 2, COALNE, &[], &[Pointer::edge(11)])
            .feature(3, 1, LNDMRK, &[(CATLMK, "17"), (OBJNAM, "Signal Hill")], &[Pointer::node(20)])
            .feature(4, 1, SOUNDG, &[], &[Pointer::node(21)]);
        fixture
    }

    fn open(fixture: &ChartFixture) -> EncDataset {
        EncDataset::open(fixture.build()).unwrap()
    }

    #[test]
    fn test_open_reads_metadata() {
        let dataset = open(&harbour());
        let info = dataset.info();
        assert_eq!(info.name, "NZ40001");
        assert_eq!(info.edition, "3");
        assert_eq!(info.update, "2");
        assert_eq!(info.issue_date, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(info.intended_usage, Some(5));
        assert_eq!(info.comf, COMF);
        assert!(!dataset.is_loaded());
        assert!(dataset.points(&GeoRect::world()).unwrap().is_empty());
    }

    #[test]
    fn test_validate_bounds_match_loaded_objects() {
        let dataset = open(&harbour());
        assert_eq!(dataset.bounds(), GeoRect::new(174.0, -37.1, 175.0, -36.0));

        dataset.load().unwrap();
        let world = GeoRect::world();
        let mut union = GeoRect::empty();
        for p in dataset.points(&world).unwrap() {
            union = union.union(&p.bounds());
        }
        for l in dataset.lines(&world).unwrap() {
            union = union.union(&l.bounds());
        }
        for a in dataset.polygons(&world).unwrap() {
            union = union.union(&a.bounds());
        }
        assert_eq!(union, dataset.bounds());
    }

    #[test]
    fn test_landmark_scenario() {
        let mut fixture = ChartFixture::new();
        fixture
            .dsid("TEST", "1", "0", "")
            .dspm(COMF, 10)
            .node(RCNM_VI, 1, 1_000_000, 2_000_000)
            .node(RCNM_VI, 2, 0, 0)
            .feature(1, 1, LNDMRK, &[], &[Pointer::node(1)]);

        let dataset = open(&fixture);
        let report = dataset.load().unwrap();
        assert_eq!(report.points, 1);
        assert!(report.dropped.is_empty());

        let points = dataset.points(&GeoRect::world()).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].position, GeoPoint::new(0.1, 0.2));
        assert_eq!(points[0].object_type.class(), 74);
        assert_eq!(dataset.info().issue_date, None);
    }

    #[test]
    fn test_viewport_queries() {
        let dataset = open(&harbour());
        let report = dataset.load().unwrap();
        assert_eq!((report.points, report.lines, report.polygons), (2, 1, 1));

        let east = GeoRect::new(174.75, -37.5, 176.0, -36.5);
        let points = dataset.points(&east).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].label, "Signal Hill");
        assert_eq!(dataset.lines(&east).unwrap().len(), 1);
        assert_eq!(dataset.polygons(&east).unwrap().len(), 1);

        let elsewhere = GeoRect::new(0.0, 0.0, 1.0, 1.0);
        assert!(dataset.points(&elsewhere).unwrap().is_empty());
        assert!(dataset.polygons(&elsewhere).unwrap().is_empty());
    }

    #[test]
    fn test_missing_edge_drops_only_that_feature() {
        let mut fixture = harbour();
        fixture.feature(5, 2, DEPCNT, &[(VALDCO, "5")], &[Pointer::edge(11), Pointer::edge(77)]);

        let dataset = open(&fixture);
        let report = dataset.load().unwrap();
        assert_eq!((report.points, report.lines, report.polygons), (2, 1, 1));
        assert_eq!(report.dropped.len(), 1);
        assert_eq!(report.dropped[0].rcid, 5);
        assert_eq!(
            report.dropped[0].reason,
            PointerError::Unresolved(RecordKey::new(RCNM_VE, 77))
        );
        assert!(dataset
            .lines(&GeoRect::world())
            .unwrap()
            .iter()
            .all(|l| l.object_type.class() == COALNE));
    }

    #[test]
    fn test_reload_and_clear() {
        let dataset = open(&harbour());
        dataset.load().unwrap();
        let first = dataset.points(&GeoRect::world()).unwrap();

        dataset.load().unwrap();
        let second = dataset.points(&GeoRect::world()).unwrap();
        assert_eq!(first.len(), second.len());
        assert!(first.iter().all(|a| second.iter().all(|b| !Arc::ptr_eq(a, b))));

        dataset.clear().unwrap();
        assert!(!dataset.is_loaded());
        assert!(dataset.points(&GeoRect::world()).unwrap().is_empty());
        // Handles taken before clear stay usable
        assert_eq!(first.len(), 2);
        assert_eq!(dataset.bounds(), GeoRect::new(174.0, -37.1, 175.0, -36.0));
    }

    #[test]
    fn test_open_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("NZ40001.000");
        std::fs::write(&path, harbour().build()).unwrap();

        let dataset = EncDataset::open(path.as_path()).unwrap();
        assert_eq!(dataset.info().name, "NZ40001");
        assert_eq!(dataset.load().unwrap().polygons, 1);

        assert!(matches!(
            EncDataset::open(dir.path().join("missing.000")),
            Err(EncError::Io(_))
        ));
    }

    #[test]
    fn test_invalid_bounds() {
        let mut fixture = ChartFixture::new();
        fixture.dspm(COMF, 10).node(RCNM_VI, 1, 1_000_000, 2_000_000);
        assert!(matches!(
            EncDataset::open(fixture.build()),
            Err(EncError::InvalidBounds(_))
        ));

        let mut fixture = ChartFixture::new();
        fixture.dspm(COMF, 10);
        assert!(matches!(
            EncDataset::open(fixture.build()),
            Err(EncError::InvalidBounds(_))
        ));

        let mut fixture = ChartFixture::new();
        fixture
            .dspm(1, 10)
            .node(RCNM_VI, 1, 0, 0)
            .node(RCNM_VI, 2, 200, 10);
        assert!(matches!(
            EncDataset::open(fixture.build()),
            Err(EncError::InvalidBounds(_))
        ));
    }

    #[test]
    fn test_missing_metadata_is_invalid_record() {
        let mut fixture = ChartFixture::new();
        fixture.dspm(0, 10).node(RCNM_VI, 1, 0, 0).node(RCNM_VI, 2, 10, 10);
        assert!(matches!(
            EncDataset::open(fixture.build()),
            Err(EncError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_non_integer_coordinate_is_invalid_record() {
        let definitions: Vec<_> = S57_DEFINITIONS
            .iter()
            .map(|&d| match d.0 {
                "SG2D" => ("SG2D", "2-D coordinate field", "*YCOO!XCOO", "(2A)"),
                _ => d,
            })
            .collect();

        let mut vrid = name(RCNM_VI, 1);
        vrid.extend(le_u16(1));
        vrid.push(1);
        let mut sg2d = text("12");
        sg2d.extend(text("north"));

        let mut fixture = ChartFixture::new();
        fixture.dspm(10, 10).raw(vec![("VRID", vrid), ("SG2D", sg2d)]);
        assert!(matches!(
            EncDataset::open(fixture.build_with(&definitions)),
            Err(EncError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_corrupt_container() {
        let mut bytes = harbour().build();
        bytes.truncate(bytes.len() - 20);
        assert!(matches!(EncDataset::open(bytes), Err(EncError::Format(_))));
    }

    #[test]
    fn test_zoom_ranges() {
        assert_eq!(zoom_range(&GeoRect::world()), 1..=11);
        assert_eq!(zoom_range(&GeoRect::new(0.0, 0.0, 360.0, 200.0)), 0..=10);
        assert_eq!(zoom_range(&GeoRect::new(174.0, -37.1, 175.0, -36.0)), 8..=18);
        assert_eq!(zoom_range(&GeoRect::new(0.0, 0.0, 0.1, 0.05)), 12..=20);
        assert_eq!(zoom_range(&GeoRect::new(0.0, 0.0, 0.01, 0.01)), 15..=20);
    }

    #[tokio::test]
    async fn test_load_in_background() {
        let dataset = Arc::new(open(&harbour()));
        let report = dataset.load_in_background().await.unwrap();
        assert_eq!(report.polygons, 1);
        assert!(dataset.is_loaded());
        assert_eq!(dataset.polygons(&GeoRect::world()).unwrap()[0].rings.len(), 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_scaled_coordinates_round_trip(
            x in -1_800_000_000i32..1_800_000_000,
            y in -900_000_000i32..900_000_000,
        ) {
            let mut fixture = ChartFixture::new();
            fixture
                .dspm(COMF, 10)
                .node(RCNM_VI, 1, x, y)
                .node(RCNM_VI, 2, x.saturating_add(1), y.saturating_add(1))
                .feature(1, 1, LNDMRK, &[], &[Pointer::node(1)]);

            let dataset = EncDataset::open(fixture.build()).unwrap();
            dataset.load().unwrap();
            let points = dataset.points(&GeoRect::world()).unwrap();
            prop_assert_eq!(points.len(), 1);

            let p = points[0].position;
            let back_x = (p.lon * COMF as f64).round() as i64;
            let back_y = (p.lat * COMF as f64).round() as i64;
            prop_assert!((back_x - x as i64).abs() <= 1);
            prop_assert!((back_y - y as i64).abs() <= 1);
        }
    }
}

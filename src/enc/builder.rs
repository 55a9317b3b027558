// ENC Feature Builder
// Resolves feature -> vector record pointer chains into geometry objects

use std::collections::HashMap;
use std::fmt;
use std::io::Read;

use thiserror::Error;

use super::attributes::{
    area_properties, depth_label, extract_attributes, line_properties, point_properties,
};
use super::catalogue::object_codes::SOUNDG;
use super::objects::{identity_key, Line, Point, Polygon};
use super::priority::DrawPriorities;
use super::{EncError, ObjectType, Primitive, RCNM_VC, RCNM_VE, RCNM_VF, RCNM_VI};
use crate::geometry::GeoPoint;
use crate::iso8211::{Field, Iso8211Reader, Record};

/// Orientation value marking a reversed edge
const ORNT_REVERSE: u32 = 2;
/// Usage value marking an interior boundary
const USAG_INTERIOR: u32 = 2;

/// Typed foreign key of a vector record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordKey {
    pub rcnm: u8,
    pub rcid: u32,
}

impl RecordKey {
    pub fn new(rcnm: u8, rcid: u32) -> Self {
        Self { rcnm, rcid }
    }

    /// Decode a 5 byte NAME subfield: class byte + little-endian id
    pub fn from_name(name: &[u8]) -> Result<Self, PointerError> {
        match name {
            &[rcnm, a, b, c, d] => Ok(Self::new(rcnm, u32::from_le_bytes([a, b, c, d]))),
            _ => Err(PointerError::MalformedName(name.len())),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rcnm {
            RCNM_VI => write!(f, "VI {}", self.rcid),
            RCNM_VC => write!(f, "VC {}", self.rcid),
            RCNM_VE => write!(f, "VE {}", self.rcid),
            RCNM_VF => write!(f, "VF {}", self.rcid),
            other => write!(f, "RCNM {} {}", other, self.rcid),
        }
    }
}

/// Why a feature could not be turned into geometry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PointerError {
    #[error("feature has no spatial pointers")]
    NoPointers,

    #[error("malformed record name ({0} bytes)")]
    MalformedName(usize),

    #[error("{found} is not {expected}")]
    UnexpectedClass {
        found: RecordKey,
        expected: &'static str,
    },

    #[error("{0} not found")]
    Unresolved(RecordKey),

    #[error("edge {edge} has {count} node pointers, expected 2")]
    BadEdge { edge: RecordKey, count: usize },

    #[error("{0} has no coordinates")]
    MissingCoordinates(RecordKey),
}

/// Stored integer coordinate; divide by COMF before use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawCoord {
    pub x: i32,
    pub y: i32,
}

/// Sounding sample; depth is divided by SOMF
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSounding {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// Node, edge or face record
#[derive(Debug, Clone)]
pub struct VectorRecord {
    pub key: RecordKey,
    /// SG2D rows, or SG3D rows without depth
    pub coords: Vec<RawCoord>,
    /// SG3D rows
    pub soundings: Vec<RawSounding>,
    /// VRPT NAME subfields, undecoded
    pub node_names: Vec<Vec<u8>>,
}

/// Vector record arena with key lookup
#[derive(Debug, Default)]
pub struct VectorStore {
    records: Vec<VectorRecord>,
    index: HashMap<RecordKey, usize>,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record; a later record with the same key replaces the earlier one
    pub fn insert(&mut self, record: VectorRecord) {
        match self.index.get(&record.key) {
            Some(&slot) => self.records[slot] = record,
            None => {
                self.index.insert(record.key, self.records.len());
                self.records.push(record);
            }
        }
    }

    pub fn get(&self, key: RecordKey) -> Option<&VectorRecord> {
        self.index.get(&key).map(|&slot| &self.records[slot])
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records of one class
    pub fn count(&self, rcnm: u8) -> usize {
        self.records.iter().filter(|r| r.key.rcnm == rcnm).count()
    }
}

/// FSPT pointer of a feature
#[derive(Debug, Clone)]
pub struct FeaturePointer {
    pub name: Vec<u8>,
    pub ornt: u32,
    pub usag: u32,
}

/// Feature record: primitive, class, attributes and spatial pointers
#[derive(Debug, Clone)]
pub struct FeatureRecord {
    pub rcid: u32,
    pub prim: u32,
    pub objl: u16,
    pub attributes: Vec<(u16, String)>,
    pub pointers: Vec<FeaturePointer>,
}

impl FeatureRecord {
    /// `None` when the FRID row is too short to carry PRIM and OBJL
    pub fn from_record(record: &Record) -> Option<Self> {
        let frid = record.get(1)?;
        let row = frid.row(0)?;
        if row.len() < 5 {
            return None;
        }

        Some(Self {
            rcid: row[1].as_u32().unwrap_or(u32::MAX),
            prim: row[2].as_u32().unwrap_or(0),
            objl: row[4].as_u32().and_then(|v| u16::try_from(v).ok()).unwrap_or(0),
            attributes: read_attributes(record.field("ATTF")),
            pointers: read_pointers(record.field("FSPT")),
        })
    }
}

/// ATTF pairs; ignored unless rows are (ATTL, ATVL)
fn read_attributes(attf: Option<&Field>) -> Vec<(u16, String)> {
    let attf = match attf {
        Some(f) if f.row_width() == 2 => f,
        _ => return Vec::new(),
    };

    attf.rows()
        .iter()
        .filter_map(|row| {
            let attl = u16::try_from(row[0].as_u32()?).ok()?;
            Some((attl, row[1].to_text().into_owned()))
        })
        .collect()
}

/// FSPT pointers; empty unless rows are (NAME, ORNT, USAG, MASK)
fn read_pointers(fspt: Option<&Field>) -> Vec<FeaturePointer> {
    let fspt = match fspt {
        Some(f) if f.row_width() == 4 => f,
        _ => return Vec::new(),
    };

    fspt.rows()
        .iter()
        .filter(|row| row.len() == 4)
        .map(|row| FeaturePointer {
            name: row[0].as_bytes().map(<[u8]>::to_vec).unwrap_or_default(),
            ornt: row[1].as_u32().unwrap_or(0),
            usag: row[2].as_u32().unwrap_or(0),
        })
        .collect()
}

/// Stored integer -> coordinate (COMF) or depth (SOMF)
pub fn scale_coordinate(raw: i32, factor: u32) -> f64 {
    raw as f64 / factor as f64
}

/// Coordinate field of a vector record: SG2D, else SG3D
pub(crate) fn coordinate_field(record: &Record) -> Option<&Field> {
    record.field("SG2D").or_else(|| record.field("SG3D"))
}

/// Integer (x, y) pairs of a coordinate field; rows store YCOO before XCOO
pub(crate) fn raw_coordinates(field: &Field) -> Result<Vec<RawCoord>, String> {
    field
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let y = row.first().and_then(|v| v.as_i32());
            let x = row.get(1).and_then(|v| v.as_i32());
            match (x, y) {
                (Some(x), Some(y)) => Ok(RawCoord { x, y }),
                _ => Err(format!("{} row {}: coordinate is not an integer", field.tag(), i)),
            }
        })
        .collect()
}

fn raw_soundings(field: &Field) -> Result<Vec<RawSounding>, String> {
    field
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let value = |n: usize| row.get(n).and_then(|v| v.as_i32());
            match (value(1), value(0), value(2)) {
                (Some(x), Some(y), Some(z)) => Ok(RawSounding { x, y, z }),
                _ => Err(format!("SG3D row {}: sounding is not an integer triple", i)),
            }
        })
        .collect()
}

impl VectorRecord {
    pub fn from_record(record: &Record) -> Result<Self, String> {
        let vrid = record.get(1).ok_or("record has no VRID field")?;
        let row = vrid.row(0).filter(|r| r.len() >= 2).ok_or("VRID row too short")?;
        let rcnm = row[0]
            .as_u32()
            .and_then(|v| u8::try_from(v).ok())
            .ok_or("bad RCNM")?;
        let rcid = row[1].as_u32().ok_or("bad RCID")?;
        if ![RCNM_VI, RCNM_VC, RCNM_VE, RCNM_VF].contains(&rcnm) {
            return Err(format!("unknown vector record class {}", rcnm));
        }

        let coords = match coordinate_field(record) {
            Some(field) => raw_coordinates(field)?,
            None => Vec::new(),
        };
        let soundings = match record.field("SG3D") {
            Some(field) => raw_soundings(field)?,
            None => Vec::new(),
        };
        let node_names = record
            .field("VRPT")
            .map(|vrpt| {
                vrpt.rows()
                    .iter()
                    .map(|row| {
                        row.first()
                            .and_then(|v| v.as_bytes())
                            .map(<[u8]>::to_vec)
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            key: RecordKey::new(rcnm, rcid),
            coords,
            soundings,
            node_names,
        })
    }
}

/// Everything the full pass needs from one read of the container
#[derive(Debug)]
pub struct ChartContents {
    pub vectors: VectorStore,
    pub features: Vec<FeatureRecord>,
    pub comf: u32,
    pub somf: u32,
    /// Records that were warned about and skipped
    pub skipped_records: usize,
}

impl ChartContents {
    /// Read all records, partitioning vector records by key and collecting
    /// feature records in file order
    pub fn read<R: Read>(reader: &mut Iso8211Reader<R>) -> Result<Self, EncError> {
        let mut contents = Self {
            vectors: VectorStore::new(),
            features: Vec::new(),
            comf: 1,
            somf: 1,
            skipped_records: 0,
        };

        reader.read_ddr()?;
        while let Some(record) = reader.read_record()? {
            let tag = match record.get(1) {
                Some(field) => field.tag().to_string(),
                None => continue,
            };

            match tag.as_str() {
                "VRID" => match VectorRecord::from_record(&record) {
                    Ok(vector) => contents.vectors.insert(vector),
                    Err(e) => contents.skip(&e),
                },
                "FRID" => match FeatureRecord::from_record(&record) {
                    Some(feature) => contents.features.push(feature),
                    None => log::debug!("[ENC] Skipping feature record with short FRID"),
                },
                "DSPM" => {
                    let dspm = &record.fields()[1];
                    let comf = dspm.subfield("COMF").and_then(|v| v.as_u32());
                    let somf = dspm.subfield("SOMF").and_then(|v| v.as_u32());
                    match (comf, somf) {
                        (Some(comf), Some(somf)) if comf > 0 && somf > 0 => {
                            contents.comf = comf;
                            contents.somf = somf;
                        }
                        _ => contents.skip("DSPM without usable COMF/SOMF"),
                    }
                }
                _ => {}
            }
        }

        log::debug!(
            "[ENC] Read {} vector records ({} VI, {} VC, {} VE, {} VF), {} feature records",
            contents.vectors.len(),
            contents.vectors.count(RCNM_VI),
            contents.vectors.count(RCNM_VC),
            contents.vectors.count(RCNM_VE),
            contents.vectors.count(RCNM_VF),
            contents.features.len()
        );
        Ok(contents)
    }

    fn skip(&mut self, reason: &str) {
        log::warn!("[ENC] Invalid S-57 record: {}", reason);
        self.skipped_records += 1;
    }

    fn scale(&self, x: i32, y: i32) -> GeoPoint {
        GeoPoint::new(scale_coordinate(x, self.comf), scale_coordinate(y, self.comf))
    }
}

/// A feature left out of the indices
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedFeature {
    pub rcid: u32,
    pub primitive: Primitive,
    pub objl: u16,
    pub reason: PointerError,
}

/// Geometry produced by one full pass
#[derive(Debug, Default)]
pub struct BuildOutput {
    pub points: Vec<Point>,
    pub lines: Vec<Line>,
    pub polygons: Vec<Polygon>,
    pub dropped: Vec<DroppedFeature>,
}

/// Turns feature records into points, lines and polygons
pub struct FeatureBuilder<'a> {
    contents: &'a ChartContents,
    priorities: &'a DrawPriorities,
}

impl<'a> FeatureBuilder<'a> {
    pub fn new(contents: &'a ChartContents, priorities: &'a DrawPriorities) -> Self {
        Self {
            contents,
            priorities,
        }
    }

    /// Build every feature in file order. Features whose pointers cannot be
    /// resolved are dropped with one warning each.
    pub fn build(&self) -> BuildOutput {
        let mut out = BuildOutput::default();

        for feature in &self.contents.features {
            let primitive = match Primitive::from_code(feature.prim) {
                Some(p) => p,
                None => {
                    log::debug!("[ENC] {}: unknown primitive {}", feature.rcid, feature.prim);
                    continue;
                }
            };

            let result = match primitive {
                Primitive::Point if feature.objl == SOUNDG => self
                    .soundings(feature)
                    .map(|mut points| out.points.append(&mut points)),
                Primitive::Point => self.point(feature).map(|p| out.points.push(p)),
                Primitive::Line => self.line(feature).map(|l| out.lines.push(l)),
                Primitive::Area => self.polygon(feature).map(|a| out.polygons.push(a)),
            };

            if let Err(reason) = result {
                log::warn!(
                    "[ENC] {}: invalid {} feature: {}",
                    feature.rcid,
                    primitive,
                    reason
                );
                out.dropped.push(DroppedFeature {
                    rcid: feature.rcid,
                    primitive,
                    objl: feature.objl,
                    reason,
                });
            }
        }

        out
    }

    fn lookup(&self, key: RecordKey) -> Result<&'a VectorRecord, PointerError> {
        self.contents
            .vectors
            .get(key)
            .ok_or(PointerError::Unresolved(key))
    }

    fn first_position(&self, record: &VectorRecord) -> Result<GeoPoint, PointerError> {
        record
            .coords
            .first()
            .map(|c| self.contents.scale(c.x, c.y))
            .ok_or(PointerError::MissingCoordinates(record.key))
    }

    /// The isolated or connected node of a point feature
    fn node(&self, feature: &FeatureRecord) -> Result<&'a VectorRecord, PointerError> {
        let pointer = feature.pointers.first().ok_or(PointerError::NoPointers)?;
        let key = RecordKey::from_name(&pointer.name)?;
        if key.rcnm != RCNM_VI && key.rcnm != RCNM_VC {
            return Err(PointerError::UnexpectedClass {
                found: key,
                expected: "a node",
            });
        }
        self.lookup(key)
    }

    fn point(&self, feature: &FeatureRecord) -> Result<Point, PointerError> {
        let node = self.node(feature)?;
        let position = self.first_position(node)?;

        let attributes = extract_attributes(Primitive::Point, feature.objl, &feature.attributes);
        let object_type = ObjectType::new(feature.objl, attributes.subtype as u16);
        let properties = point_properties(feature.objl, attributes);

        Ok(Point {
            id: identity_key(self.priorities.priority(object_type), position),
            object_type: properties.object_type,
            position,
            label: properties.label,
            param: properties.param,
        })
    }

    /// One point per SG3D sample of the sounding node
    fn soundings(&self, feature: &FeatureRecord) -> Result<Vec<Point>, PointerError> {
        let node = self.node(feature)?;
        if node.soundings.is_empty() {
            return Err(PointerError::MissingCoordinates(node.key));
        }

        let object_type = ObjectType::class_only(SOUNDG);
        let priority = self.priorities.priority(object_type);

        Ok(node
            .soundings
            .iter()
            .map(|s| {
                let position = self.contents.scale(s.x, s.y);
                Point {
                    id: identity_key(priority, position),
                    object_type,
                    position,
                    label: depth_label(scale_coordinate(s.z, self.contents.somf)),
                    param: None,
                }
            })
            .collect())
    }

    /// Vertices of one edge: start node, interior vertices, end node;
    /// reversed when the pointer orientation says so
    fn edge_path(&self, pointer: &FeaturePointer) -> Result<Vec<GeoPoint>, PointerError> {
        let key = RecordKey::from_name(&pointer.name)?;
        if key.rcnm != RCNM_VE {
            return Err(PointerError::UnexpectedClass {
                found: key,
                expected: "an edge",
            });
        }
        let edge = self.lookup(key)?;
        if edge.node_names.len() != 2 {
            return Err(PointerError::BadEdge {
                edge: key,
                count: edge.node_names.len(),
            });
        }

        let mut ends = [GeoPoint::default(); 2];
        for (end, name) in ends.iter_mut().zip(&edge.node_names) {
            let node_key = RecordKey::from_name(name)?;
            if node_key.rcnm != RCNM_VC {
                return Err(PointerError::UnexpectedClass {
                    found: node_key,
                    expected: "a connected node",
                });
            }
            *end = self.first_position(self.lookup(node_key)?)?;
        }

        let vertices = edge.coords.iter().map(|c| self.contents.scale(c.x, c.y));
        let mut path = Vec::with_capacity(edge.coords.len() + 2);
        if pointer.ornt == ORNT_REVERSE {
            path.push(ends[1]);
            path.extend(vertices.rev());
            path.push(ends[0]);
        } else {
            path.push(ends[0]);
            path.extend(vertices);
            path.push(ends[1]);
        }
        Ok(path)
    }

    fn line(&self, feature: &FeatureRecord) -> Result<Line, PointerError> {
        if feature.pointers.is_empty() {
            return Err(PointerError::NoPointers);
        }

        let mut path = Vec::new();
        for pointer in &feature.pointers {
            path.extend(self.edge_path(pointer)?);
        }

        let attributes = extract_attributes(Primitive::Line, feature.objl, &feature.attributes);
        let object_type = ObjectType::new(feature.objl, attributes.subtype as u16);
        let properties = line_properties(feature.objl, attributes);

        Ok(Line {
            id: identity_key(self.priorities.priority(object_type), path[0]),
            object_type: properties.object_type,
            path,
            label: properties.label,
        })
    }

    fn polygon(&self, feature: &FeatureRecord) -> Result<Polygon, PointerError> {
        if feature.pointers.is_empty() {
            return Err(PointerError::NoPointers);
        }

        let rings = self.rings(&feature.pointers)?;

        let attributes = extract_attributes(Primitive::Area, feature.objl, &feature.attributes);
        let object_type = ObjectType::new(feature.objl, attributes.subtype as u16);
        let properties = area_properties(feature.objl, attributes);

        Ok(Polygon {
            id: identity_key(self.priorities.priority(object_type), rings[0][0]),
            object_type: properties.object_type,
            rings,
            param: properties.param,
        })
    }

    /// Walk area edges into rings. A ring ends when it closes on itself, or
    /// when the first interior boundary pointer is reached.
    fn rings(&self, pointers: &[FeaturePointer]) -> Result<Vec<Vec<GeoPoint>>, PointerError> {
        let mut rings = Vec::new();
        let mut ring: Vec<GeoPoint> = Vec::new();
        let mut interior = false;

        for pointer in pointers {
            if pointer.usag == USAG_INTERIOR && !interior {
                interior = true;
                if !ring.is_empty() {
                    rings.push(std::mem::take(&mut ring));
                }
            }

            ring.extend(self.edge_path(pointer)?);

            if ring.len() > 1 && ring.first() == ring.last() {
                rings.push(std::mem::take(&mut ring));
            }
        }

        if !ring.is_empty() {
            rings.push(ring);
        }
        Ok(rings)
    }
}

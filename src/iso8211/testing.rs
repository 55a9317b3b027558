// ISO 8211 test writer
// Builds containers byte by byte for reader and ENC tests

use super::{FIELD_TERMINATOR, LEADER_SIZE, UNIT_TERMINATOR};

const SIZE_OF_LENGTH: usize = 5;
const SIZE_OF_POSITION: usize = 5;
const SIZE_OF_TAG: usize = 4;

pub fn le_u16(v: u16) -> Vec<u8> {
    v.to_le_bytes().to_vec()
}

pub fn le_u32(v: u32) -> Vec<u8> {
    v.to_le_bytes().to_vec()
}

/// Variable length text subfield (unit terminated)
pub fn text(s: &str) -> Vec<u8> {
    let mut bytes = s.as_bytes().to_vec();
    bytes.push(UNIT_TERMINATOR);
    bytes
}

/// Fixed width text subfield, space padded
pub fn fixed_text(s: &str, width: usize) -> Vec<u8> {
    let mut bytes = s.as_bytes().to_vec();
    bytes.resize(width, b' ');
    bytes
}

/// Assemble leader + directory + field area
fn build_record(ddr: bool, fields: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let entry_size = SIZE_OF_TAG + SIZE_OF_LENGTH + SIZE_OF_POSITION;
    let base_address = LEADER_SIZE + fields.len() * entry_size + 1;

    let mut directory = Vec::new();
    let mut area = Vec::new();
    for (tag, data) in fields {
        let mut data = data.clone();
        data.push(FIELD_TERMINATOR);
        directory.extend(tag.as_bytes());
        directory.extend(format!("{:05}", data.len()).as_bytes());
        directory.extend(format!("{:05}", area.len()).as_bytes());
        area.extend(data);
    }
    directory.push(FIELD_TERMINATOR);

    let record_length = base_address + area.len();
    let leader = if ddr {
        format!("{:05}3LE1 09{:05} ! 5504", record_length, base_address)
    } else {
        format!("{:05} D     {:05}   5504", record_length, base_address)
    };
    assert_eq!(leader.len(), LEADER_SIZE);

    let mut record = leader.into_bytes();
    record.extend(directory);
    record.extend(area);
    record
}

/// Data descriptive record from (tag, name, array descriptor, format controls)
pub fn ddr_record(definitions: &[(&str, &str, &str, &str)]) -> Vec<u8> {
    let mut fields = vec![("0000", b"0000;&   S-57 test".to_vec())];
    for (tag, name, descriptor, formats) in definitions {
        let controls: &[u8] = if descriptor.is_empty() {
            b"0000;&   "
        } else if descriptor.starts_with('*') {
            b"2600;&   "
        } else {
            b"1600;&   "
        };
        let mut data = controls.to_vec();
        data.extend(name.as_bytes());
        if !descriptor.is_empty() || !formats.is_empty() {
            data.push(UNIT_TERMINATOR);
            data.extend(descriptor.as_bytes());
            data.push(UNIT_TERMINATOR);
            data.extend(formats.as_bytes());
        }
        fields.push((*tag, data));
    }
    build_record(true, &fields)
}

/// Data record; field data is given without the field terminator
pub fn data_record(fields: &[(&str, Vec<u8>)]) -> Vec<u8> {
    build_record(false, fields)
}

/// Field definitions of the S-57 subset the ENC loader reads
pub const S57_DEFINITIONS: &[(&str, &str, &str, &str)] = &[
    ("0001", "ISO 8211 Record Identifier", "", ""),
    (
        "DSID",
        "Data set identification field",
        "RCNM!RCID!EXPP!INTU!DSNM!EDTN!UPDN!UADT!ISDT!STED!PRSP!PSDN!PRED!PROF!AGEN!COMT",
        "(b11,b14,2b11,3A,2A(8),R(4),b11,2A,b11,b12,A)",
    ),
    (
        "DSPM",
        "Data set parameter field",
        "RCNM!RCID!HDAT!VDAT!SDAT!CSCL!DUNI!HUNI!PUNI!COUN!COMF!SOMF!COMT",
        "(b11,b14,3b11,b14,4b11,2b14,A)",
    ),
    ("VRID", "Vector record identifier field", "RCNM!RCID!RVER!RUIN", "(b11,b14,b12,b11)"),
    (
        "VRPT",
        "Vector record pointer field",
        "*NAME!ORNT!USAG!TOPI!MASK",
        "(B(40),4b11)",
    ),
    ("SG2D", "2-D coordinate field", "*YCOO!XCOO", "(2b24)"),
    ("SG3D", "3-D coordinate (sounding array) field", "*YCOO!XCOO!VE3D", "(3b24)"),
    (
        "FRID",
        "Feature record identifier field",
        "RCNM!RCID!PRIM!GRUP!OBJL!RVER!RUIN",
        "(b11,b14,2b11,2b12,b11)",
    ),
    ("FOID", "Feature object identifier field", "AGEN!FIDN!FIDS", "(b12,b14,b12)"),
    ("ATTF", "Feature record attribute field", "*ATTL!ATVL", "(b12,A)"),
    (
        "FSPT",
        "Feature record to spatial record pointer field",
        "*NAME!ORNT!USAG!MASK",
        "(B(40),3b11)",
    ),
];

/// NAME subfield: record class byte + little-endian record id
pub fn name(rcnm: u8, rcid: u32) -> Vec<u8> {
    let mut bytes = vec![rcnm];
    bytes.extend(le_u32(rcid));
    bytes
}

/// FSPT pointer (record class, record id, orientation, usage)
#[derive(Debug, Clone, Copy)]
pub struct Pointer {
    pub rcnm: u8,
    pub rcid: u32,
    pub ornt: u8,
    pub usag: u8,
}

impl Pointer {
    pub fn node(rcid: u32) -> Self {
        Self { rcnm: 110, rcid, ornt: 255, usag: 255 }
    }

    pub fn connected(rcid: u32) -> Self {
        Self { rcnm: 120, rcid, ornt: 255, usag: 255 }
    }

    pub fn edge(rcid: u32) -> Self {
        Self { rcnm: 130, rcid, ornt: 1, usag: 1 }
    }

    pub fn reversed(mut self) -> Self {
        self.ornt = 2;
        self
    }

    pub fn interior(mut self) -> Self {
        self.usag = 2;
        self
    }
}

/// S-57 cell builder for tests
pub struct ChartFixture {
    records: Vec<Vec<(&'static str, Vec<u8>)>>,
    next_id: u16,
}

impl Default for ChartFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartFixture {
    pub fn new() -> Self {
        Self { records: Vec::new(), next_id: 1 }
    }

    fn push(&mut self, mut fields: Vec<(&'static str, Vec<u8>)>) -> &mut Self {
        fields.insert(0, ("0001", le_u16(self.next_id)));
        self.next_id += 1;
        self.records.push(fields);
        self
    }

    /// DSID with name, edition, update number and issue date (YYYYMMDD)
    pub fn dsid(&mut self, dsnm: &str, edition: &str, update: &str, issued: &str) -> &mut Self {
        let mut data = vec![10];
        data.extend(le_u32(1));
        data.push(1); // EXPP
        data.push(5); // INTU
        data.extend(text(dsnm));
        data.extend(text(edition));
        data.extend(text(update));
        data.extend(fixed_text("", 8));
        data.extend(fixed_text(issued, 8));
        data.extend(fixed_text("03.1", 4));
        data.push(1); // PRSP
        data.extend(text(""));
        data.extend(text("2.0"));
        data.push(1); // PROF
        data.extend(le_u16(550));
        data.extend(text(""));
        self.push(vec![("DSID", data)])
    }

    pub fn dspm(&mut self, comf: u32, somf: u32) -> &mut Self {
        let mut data = vec![20];
        data.extend(le_u32(1));
        data.extend([2, 23, 23]); // HDAT VDAT SDAT
        data.extend(le_u32(22000));
        data.extend([1, 1, 1, 1]); // DUNI HUNI PUNI COUN
        data.extend(le_u32(comf));
        data.extend(le_u32(somf));
        data.extend(text(""));
        self.push(vec![("DSPM", data)])
    }

    fn vrid(rcnm: u8, rcid: u32) -> Vec<u8> {
        let mut data = name(rcnm, rcid);
        data.extend(le_u16(1));
        data.push(1);
        data
    }

    fn sg2d(coords: &[(i32, i32)]) -> Vec<u8> {
        let mut data = Vec::new();
        for &(x, y) in coords {
            data.extend(y.to_le_bytes());
            data.extend(x.to_le_bytes());
        }
        data
    }

    /// Node (isolated 110 or connected 120) at raw (x, y)
    pub fn node(&mut self, rcnm: u8, rcid: u32, x: i32, y: i32) -> &mut Self {
        self.push(vec![
            ("VRID", Self::vrid(rcnm, rcid)),
            ("SG2D", Self::sg2d(&[(x, y)])),
        ])
    }

    /// Isolated node carrying sounding samples (x, y, depth)
    pub fn soundings(&mut self, rcid: u32, samples: &[(i32, i32, i32)]) -> &mut Self {
        let mut data = Vec::new();
        for &(x, y, z) in samples {
            data.extend(y.to_le_bytes());
            data.extend(x.to_le_bytes());
            data.extend(z.to_le_bytes());
        }
        self.push(vec![("VRID", Self::vrid(110, rcid)), ("SG3D", data)])
    }

    /// Edge from connected node `start` to `end` with interior vertices
    pub fn edge(&mut self, rcid: u32, start: u32, end: u32, vertices: &[(i32, i32)]) -> &mut Self {
        let mut vrpt = Vec::new();
        for (node, topi) in [(start, 1u8), (end, 2u8)] {
            vrpt.extend(name(120, node));
            vrpt.extend([255, 255, topi, 255]);
        }
        let mut fields = vec![("VRID", Self::vrid(130, rcid)), ("VRPT", vrpt)];
        if !vertices.is_empty() {
            fields.push(("SG2D", Self::sg2d(vertices)));
        }
        self.push(fields)
    }

    /// Edge with an arbitrary VRPT pointer list
    pub fn edge_with_pointers(&mut self, rcid: u32, nodes: &[(u8, u32)]) -> &mut Self {
        let mut vrpt = Vec::new();
        for &(rcnm, rcid) in nodes {
            vrpt.extend(name(rcnm, rcid));
            vrpt.extend([255, 255, 1, 255]);
        }
        self.push(vec![("VRID", Self::vrid(130, rcid)), ("VRPT", vrpt)])
    }

    /// Raw record with arbitrary fields after the record identifier
    pub fn raw(&mut self, fields: Vec<(&'static str, Vec<u8>)>) -> &mut Self {
        self.push(fields)
    }

    /// Feature record with attributes (ATTL, ATVL) and spatial pointers
    pub fn feature(
        &mut self,
        rcid: u32,
        prim: u8,
        objl: u16,
        attributes: &[(u16, &str)],
        pointers: &[Pointer],
    ) -> &mut Self {
        let mut frid = vec![100];
        frid.extend(le_u32(rcid));
        frid.push(prim);
        frid.push(2); // GRUP
        frid.extend(le_u16(objl));
        frid.extend(le_u16(1));
        frid.push(1);

        let mut foid = le_u16(550);
        foid.extend(le_u32(rcid));
        foid.extend(le_u16(1));

        let mut fields = vec![("FRID", frid), ("FOID", foid)];
        if !attributes.is_empty() {
            let mut attf = Vec::new();
            for &(attl, atvl) in attributes {
                attf.extend(le_u16(attl));
                attf.extend(text(atvl));
            }
            fields.push(("ATTF", attf));
        }
        if !pointers.is_empty() {
            let mut fspt = Vec::new();
            for p in pointers {
                fspt.extend(name(p.rcnm, p.rcid));
                fspt.extend([p.ornt, p.usag, 255]);
            }
            fields.push(("FSPT", fspt));
        }
        self.push(fields)
    }

    /// Serialize DDR plus all records
    pub fn build(&self) -> Vec<u8> {
        self.build_with(S57_DEFINITIONS)
    }

    /// Serialize with a custom DDR
    pub fn build_with(&self, definitions: &[(&str, &str, &str, &str)]) -> Vec<u8> {
        let mut bytes = ddr_record(definitions);
        for fields in &self.records {
            bytes.extend(data_record(fields));
        }
        bytes
    }
}

// ISO 8211 Reader - Streams records out of an ISO 8211 container
// Reads the data descriptive record (DDR) first, then data records in file order

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;
use std::sync::Arc;

use super::format::parse_format_controls;
use super::record::{Field, FieldDefinition, Record, Value};
use super::{Iso8211Error, FIELD_TERMINATOR, LEADER_SIZE, UNIT_TERMINATOR};

/// Tag of the file control field, which carries no data of interest
const FILE_CONTROL_TAG: &str = "0000";

/// Parsed record leader
#[derive(Debug, Clone, Copy)]
struct Leader {
    record_length: usize,
    leader_id: u8,
    field_control_length: usize,
    base_address: usize,
    size_of_length: usize,
    size_of_position: usize,
    size_of_tag: usize,
}

/// Directory entry: where a field lives inside the field area
#[derive(Debug)]
struct DirEntry {
    tag: String,
    length: usize,
    position: usize,
}

/// Sequential reader over an ISO 8211 byte stream
pub struct Iso8211Reader<R: Read> {
    source: R,
    definitions: HashMap<String, Arc<FieldDefinition>>,
    ddr_read: bool,
    error: Option<String>,
}

impl Iso8211Reader<BufReader<File>> {
    /// Open a container file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Iso8211Error> {
        let file = File::open(path.as_ref())?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> Iso8211Reader<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            definitions: HashMap::new(),
            ddr_read: false,
            error: None,
        }
    }

    /// Message of the failure that stopped the reader, if any
    pub fn error_string(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Field definition for a tag, available after the DDR is read
    pub fn definition(&self, tag: &str) -> Option<&FieldDefinition> {
        self.definitions.get(tag).map(Arc::as_ref)
    }

    /// Number of field definitions declared by the DDR
    pub fn definition_count(&self) -> usize {
        self.definitions.len()
    }

    /// Read the data descriptive record. Must be called exactly once,
    /// before the first `read_record`.
    pub fn read_ddr(&mut self) -> Result<(), Iso8211Error> {
        if self.ddr_read {
            return Err(Iso8211Error::DdrAlreadyRead);
        }
        if let Some(msg) = &self.error {
            return Err(Iso8211Error::CorruptData(msg.clone()));
        }

        let result = self.read_ddr_inner();
        self.remember(result)
    }

    /// Read the next data record. Returns `Ok(None)` at end of stream and
    /// after any earlier failure.
    pub fn read_record(&mut self) -> Result<Option<Record>, Iso8211Error> {
        if !self.ddr_read {
            return Err(Iso8211Error::MissingDdr);
        }
        if self.error.is_some() {
            return Ok(None);
        }

        let result = self.read_record_inner();
        self.remember(result)
    }

    fn remember<T>(&mut self, result: Result<T, Iso8211Error>) -> Result<T, Iso8211Error> {
        if let Err(e) = &result {
            log::debug!("[ISO8211] Reader stopped: {}", e);
            self.error = Some(e.to_string());
        }
        result
    }

    fn read_ddr_inner(&mut self) -> Result<(), Iso8211Error> {
        let (leader, body) = match self.read_raw_record()? {
            Some(raw) => raw,
            None => return Err(Iso8211Error::BadLeader("empty container".to_string())),
        };
        if leader.leader_id != b'L' {
            return Err(Iso8211Error::BadLeader(format!(
                "expected DDR leader identifier 'L', found '{}'",
                leader.leader_id as char
            )));
        }

        let control_length = if leader.field_control_length == 0 {
            9
        } else {
            leader.field_control_length
        };

        for entry in parse_directory(&leader, &body)? {
            if entry.tag == FILE_CONTROL_TAG {
                continue;
            }
            let data = field_slice(&leader, &body, &entry)?;
            let definition = parse_definition(&entry.tag, data, control_length)?;
            self.definitions
                .insert(entry.tag.clone(), Arc::new(definition));
        }

        log::debug!(
            "[ISO8211] DDR declares {} field definitions",
            self.definitions.len()
        );
        self.ddr_read = true;
        Ok(())
    }

    fn read_record_inner(&mut self) -> Result<Option<Record>, Iso8211Error> {
        let (leader, body) = match self.read_raw_record()? {
            Some(raw) => raw,
            None => return Ok(None),
        };
        if leader.leader_id != b'D' && leader.leader_id != b'R' {
            return Err(Iso8211Error::BadLeader(format!(
                "unexpected data record leader identifier '{}'",
                leader.leader_id as char
            )));
        }

        let entries = parse_directory(&leader, &body)?;
        if entries.len() < 2 {
            return Err(Iso8211Error::CorruptData(format!(
                "record has {} field(s), at least 2 required",
                entries.len()
            )));
        }

        let mut fields = Vec::with_capacity(entries.len());
        for entry in &entries {
            let definition = match self.definitions.get(&entry.tag) {
                Some(def) => Arc::clone(def),
                None => {
                    log::debug!("[ISO8211] Skipping undeclared field {}", entry.tag);
                    continue;
                }
            };
            let data = field_slice(&leader, &body, entry)?;
            let rows = decode_rows(&definition, data)?;
            fields.push(Field::new(definition, rows));
        }

        Ok(Some(Record::new(fields)))
    }

    /// Read one leader plus the rest of the record. `None` on clean end of stream.
    fn read_raw_record(&mut self) -> Result<Option<(Leader, Vec<u8>)>, Iso8211Error> {
        let mut raw = [0u8; LEADER_SIZE];
        let got = read_fully(&mut self.source, &mut raw)?;
        if got == 0 {
            return Ok(None);
        }
        if got < LEADER_SIZE {
            return Err(Iso8211Error::CorruptData(format!(
                "truncated leader: {} of {} bytes",
                got, LEADER_SIZE
            )));
        }

        let leader = parse_leader(&raw)?;
        let mut body = vec![0u8; leader.record_length - LEADER_SIZE];
        let got = read_fully(&mut self.source, &mut body)?;
        if got < body.len() {
            return Err(Iso8211Error::CorruptData(format!(
                "record declares {} bytes but only {} are available",
                leader.record_length,
                LEADER_SIZE + got
            )));
        }

        Ok(Some((leader, body)))
    }
}

/// Like `read_exact`, but reports how many bytes were read before end of stream
fn read_fully<R: Read>(source: &mut R, buf: &mut [u8]) -> Result<usize, Iso8211Error> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

/// Parse an ASCII decimal number; blanks count as zero
fn parse_number(bytes: &[u8], what: &str) -> Result<usize, Iso8211Error> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| Iso8211Error::BadLeader(format!("{} is not ASCII", what)))?
        .trim();
    if text.is_empty() {
        return Ok(0);
    }
    text.parse::<usize>()
        .map_err(|_| Iso8211Error::BadLeader(format!("{} '{}' is not a number", what, text)))
}

fn parse_leader(raw: &[u8; LEADER_SIZE]) -> Result<Leader, Iso8211Error> {
    let leader = Leader {
        record_length: parse_number(&raw[0..5], "record length")?,
        leader_id: raw[6],
        field_control_length: parse_number(&raw[10..12], "field control length")?,
        base_address: parse_number(&raw[12..17], "base address")?,
        size_of_length: parse_number(&raw[20..21], "size of field length")?,
        size_of_position: parse_number(&raw[21..22], "size of field position")?,
        size_of_tag: parse_number(&raw[23..24], "size of field tag")?,
    };

    if leader.record_length <= LEADER_SIZE {
        return Err(Iso8211Error::CorruptData(format!(
            "record length {} is shorter than the leader",
            leader.record_length
        )));
    }
    if leader.base_address <= LEADER_SIZE || leader.base_address > leader.record_length {
        return Err(Iso8211Error::CorruptData(format!(
            "base address {} outside record of {} bytes",
            leader.base_address, leader.record_length
        )));
    }
    if leader.size_of_length == 0 || leader.size_of_position == 0 || leader.size_of_tag == 0 {
        return Err(Iso8211Error::BadLeader("empty entry map".to_string()));
    }

    Ok(leader)
}

/// Parse the directory that sits between the leader and the field area
fn parse_directory(leader: &Leader, body: &[u8]) -> Result<Vec<DirEntry>, Iso8211Error> {
    let dir_end = leader.base_address - LEADER_SIZE;
    let directory = &body[..dir_end];
    let directory = match directory.last() {
        Some(&FIELD_TERMINATOR) => &directory[..directory.len() - 1],
        _ => {
            return Err(Iso8211Error::CorruptData(
                "directory is not terminated".to_string(),
            ))
        }
    };

    let entry_size = leader.size_of_tag + leader.size_of_length + leader.size_of_position;
    if directory.len() % entry_size != 0 {
        return Err(Iso8211Error::CorruptData(format!(
            "directory of {} bytes is not a multiple of the {} byte entry size",
            directory.len(),
            entry_size
        )));
    }

    directory
        .chunks_exact(entry_size)
        .map(|chunk| {
            let (tag, rest) = chunk.split_at(leader.size_of_tag);
            let (length, position) = rest.split_at(leader.size_of_length);
            Ok(DirEntry {
                tag: String::from_utf8_lossy(tag).into_owned(),
                length: parse_number(length, "field length")
                    .map_err(|_| Iso8211Error::CorruptData("bad field length".to_string()))?,
                position: parse_number(position, "field position")
                    .map_err(|_| Iso8211Error::CorruptData("bad field position".to_string()))?,
            })
        })
        .collect()
}

/// Bytes of one field, bounds checked against the field area
fn field_slice<'a>(
    leader: &Leader,
    body: &'a [u8],
    entry: &DirEntry,
) -> Result<&'a [u8], Iso8211Error> {
    let area = &body[leader.base_address - LEADER_SIZE..];
    let end = entry.position.checked_add(entry.length);
    match end {
        Some(end) if end <= area.len() => Ok(&area[entry.position..end]),
        _ => Err(Iso8211Error::CorruptData(format!(
            "field {} ({} bytes at {}) exceeds field area of {} bytes",
            entry.tag,
            entry.length,
            entry.position,
            area.len()
        ))),
    }
}

/// Parse a DDR field description:
/// controls, name, 0x1f, array descriptor, 0x1f, format controls, 0x1e
fn parse_definition(
    tag: &str,
    data: &[u8],
    control_length: usize,
) -> Result<FieldDefinition, Iso8211Error> {
    if data.len() < control_length {
        return Err(Iso8211Error::CorruptData(format!(
            "field description {} is shorter than its controls",
            tag
        )));
    }

    let data = strip_terminator(&data[control_length..]);
    let mut parts = data.split(|&b| b == UNIT_TERMINATOR);
    let name = parts.next().unwrap_or_default();
    let descriptor = parts.next().unwrap_or_default();
    let controls = parts.next().unwrap_or_default();

    let descriptor = String::from_utf8_lossy(descriptor);
    let (repeating, labels) = match descriptor.strip_prefix('*') {
        Some(rest) => (true, rest),
        None => (false, &descriptor[..]),
    };
    let labels: Vec<String> = labels
        .split('!')
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();

    let mut formats = parse_format_controls(&String::from_utf8_lossy(controls))?;
    if !labels.is_empty() {
        if formats.len() < labels.len() {
            return Err(Iso8211Error::CorruptData(format!(
                "field {} declares {} subfields but only {} formats",
                tag,
                labels.len(),
                formats.len()
            )));
        }
        formats.truncate(labels.len());
    }

    Ok(FieldDefinition {
        tag: tag.to_string(),
        name: String::from_utf8_lossy(name).into_owned(),
        repeating,
        labels,
        formats,
    })
}

fn strip_terminator(data: &[u8]) -> &[u8] {
    match data.last() {
        Some(&FIELD_TERMINATOR) => &data[..data.len() - 1],
        _ => data,
    }
}

/// Decode the subfield rows of one field
fn decode_rows(definition: &FieldDefinition, data: &[u8]) -> Result<Vec<Vec<Value>>, Iso8211Error> {
    let data = strip_terminator(data);

    // Elementary field: one raw value
    if definition.labels.is_empty() {
        return Ok(vec![vec![Value::Bytes(data.to_vec())]]);
    }

    let mut rows = Vec::new();
    let mut pos = 0;
    loop {
        let start = pos;
        let mut row = Vec::with_capacity(definition.formats.len());
        for format in &definition.formats {
            row.push(format.decode(data, &mut pos)?);
        }
        rows.push(row);

        // Zero-width rows would never reach the end of the field
        if !definition.repeating || pos >= data.len() || pos == start {
            break;
        }
    }

    Ok(rows)
}

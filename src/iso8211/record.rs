// ISO 8211 Records
// Typed field/subfield values produced by the record reader

use std::borrow::Cow;
use std::sync::Arc;

use super::format::SubfieldFormat;

/// A single subfield value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Signed binary integer (b21, b22, b24)
    Int(i32),
    /// Unsigned binary integer (b11, b12, b14)
    UInt(u32),
    /// Text (A, I, R, S) or bit string (B) data, uninterpreted
    Bytes(Vec<u8>),
}

impl Value {
    /// Integer view of the value. Text values are parsed as ASCII decimals,
    /// matching how numeric text subfields are stored in S-57 (I format).
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v as i64),
            Value::UInt(v) => Some(*v as i64),
            Value::Bytes(b) => std::str::from_utf8(b).ok()?.trim().parse().ok(),
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        self.as_i64().and_then(|v| i32::try_from(v).ok())
    }

    pub fn as_u32(&self) -> Option<u32> {
        self.as_i64().and_then(|v| u32::try_from(v).ok())
    }

    /// Floating point view; text values are parsed as ASCII reals (R format)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::UInt(v) => Some(*v as f64),
            Value::Bytes(b) => std::str::from_utf8(b).ok()?.trim().parse().ok(),
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Text view of the value. Byte data is decoded as Latin-1, the
    /// lexical level 0/1 character set of S-57.
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Value::Int(v) => Cow::Owned(v.to_string()),
            Value::UInt(v) => Cow::Owned(v.to_string()),
            Value::Bytes(b) => {
                if b.is_ascii() {
                    // ASCII is valid UTF-8
                    Cow::Borrowed(std::str::from_utf8(b).unwrap_or_default())
                } else {
                    Cow::Owned(b.iter().map(|&c| c as char).collect())
                }
            }
        }
    }
}

/// Field definition from the data descriptive record
#[derive(Debug, Clone)]
pub struct FieldDefinition {
    /// Field tag, e.g. "VRID"
    pub tag: String,
    /// Human readable field name
    pub name: String,
    /// True when the subfield group repeats ("*" array descriptor)
    pub repeating: bool,
    /// Subfield labels (empty for elementary fields)
    pub labels: Vec<String>,
    /// Subfield formats, one per label (or one unlabelled for elementary fields)
    pub formats: Vec<SubfieldFormat>,
}

impl FieldDefinition {
    /// Position of a subfield within a row
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }
}

/// A field of a data record: a tag and its subfield rows
#[derive(Debug, Clone)]
pub struct Field {
    definition: Arc<FieldDefinition>,
    rows: Vec<Vec<Value>>,
}

impl Field {
    pub fn new(definition: Arc<FieldDefinition>, rows: Vec<Vec<Value>>) -> Self {
        Self { definition, rows }
    }

    pub fn tag(&self) -> &str {
        &self.definition.tag
    }

    pub fn definition(&self) -> &FieldDefinition {
        &self.definition
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[Value]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Number of subfields in the first row (0 for an empty field)
    pub fn row_width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Value of a named subfield in the first row
    pub fn subfield(&self, label: &str) -> Option<&Value> {
        self.subfield_at(0, label)
    }

    /// Value of a named subfield in the given row
    pub fn subfield_at(&self, row: usize, label: &str) -> Option<&Value> {
        let index = self.definition.index_of(label)?;
        self.rows.get(row)?.get(index)
    }
}

/// A data record: fields in file order
#[derive(Debug, Clone, Default)]
pub struct Record {
    fields: Vec<Field>,
}

impl Record {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// First field with the given tag
    pub fn field(&self, tag: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.tag() == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::Int(-5).as_i64(), Some(-5));
        assert_eq!(Value::UInt(7).as_u32(), Some(7));
        assert_eq!(Value::Int(-1).as_u32(), None);
        assert_eq!(Value::Bytes(b" 42".to_vec()).as_i64(), Some(42));
        assert_eq!(Value::Bytes(b"12.5".to_vec()).as_f64(), Some(12.5));
        assert_eq!(Value::Bytes(b"abc".to_vec()).as_i64(), None);
    }

    #[test]
    fn test_latin1_text() {
        let value = Value::Bytes(vec![b'K', 0xF8, b'g', b'e']);
        assert_eq!(value.to_text(), "Køge");
        assert_eq!(Value::Bytes(b"HARBOUR".to_vec()).to_text(), "HARBOUR");
    }
}

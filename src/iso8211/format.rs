// ISO 8211 Format Controls
// Parses format control strings like "(b11,b14,2b11,A(8),(2b24))" and
// decodes subfield values from field data

use super::record::Value;
use super::{Iso8211Error, FIELD_TERMINATOR, UNIT_TERMINATOR};

/// Subfield data format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubfieldFormat {
    /// Character data (A, I, R, S, C), fixed width or unit-terminator delimited
    Text(Option<usize>),
    /// Bit string (B), width in bytes
    Bits(usize),
    /// Unsigned little-endian binary integer (b1w), width in bytes
    Unsigned(usize),
    /// Signed little-endian binary integer (b2w), width in bytes
    Signed(usize),
}

/// Parse a format control string into a flat list of subfield formats.
/// Repeat counts and parenthesised groups are expanded.
pub fn parse_format_controls(controls: &str) -> Result<Vec<SubfieldFormat>, Iso8211Error> {
    let trimmed = controls.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let inner = strip_parens(trimmed)
        .ok_or_else(|| corrupt(format!("unbalanced format controls '{}'", controls)))?;
    let mut formats = Vec::new();
    expand(inner, &mut formats)?;
    Ok(formats)
}

/// Upper bound on expanded subfield formats per field
const MAX_FORMATS: usize = 1024;

fn corrupt(msg: String) -> Iso8211Error {
    Iso8211Error::CorruptData(msg)
}

/// Strip one level of enclosing parentheses, if the whole string is a group
fn strip_parens(s: &str) -> Option<&str> {
    if !(s.starts_with('(') && s.ends_with(')')) {
        return Some(s);
    }

    let mut depth = 0i32;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 && i != s.len() - 1 {
                    // "(A(2),I(10))" style: the first group closes early
                    return Some(s);
                }
            }
            _ => {}
        }
        if depth < 0 {
            return None;
        }
    }

    if depth != 0 {
        return None;
    }
    Some(&s[1..s.len() - 1])
}

/// Split on commas that are not nested inside parentheses
fn split_top_level(s: &str) -> Result<Vec<&str>, Iso8211Error> {
    let mut items = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(corrupt(format!("unbalanced format controls '{}'", s)));
                }
            }
            ',' if depth == 0 => {
                items.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(corrupt(format!("unbalanced format controls '{}'", s)));
    }
    items.push(s[start..].trim());
    Ok(items.into_iter().filter(|item| !item.is_empty()).collect())
}

fn expand(s: &str, out: &mut Vec<SubfieldFormat>) -> Result<(), Iso8211Error> {
    for item in split_top_level(s)? {
        let digits = item.chars().take_while(|c| c.is_ascii_digit()).count();
        let repeat = if digits > 0 {
            item[..digits]
                .parse::<usize>()
                .map_err(|_| corrupt(format!("bad repeat count in '{}'", item)))?
        } else {
            1
        };
        if repeat > MAX_FORMATS {
            return Err(corrupt(format!("repeat count too large in '{}'", item)));
        }
        let body = &item[digits..];

        if body.starts_with('(') {
            let group = strip_parens(body)
                .filter(|g| g.len() < body.len())
                .ok_or_else(|| corrupt(format!("bad format group '{}'", item)))?;
            for _ in 0..repeat {
                let before = out.len();
                expand(group, out)?;
                if out.len() == before {
                    return Err(corrupt(format!("empty format group '{}'", item)));
                }
            }
        } else {
            let format = parse_single(body)?;
            if out.len() + repeat > MAX_FORMATS {
                return Err(corrupt(format!("too many subfield formats in '{}'", item)));
            }
            out.extend(std::iter::repeat(format).take(repeat));
        }
    }

    Ok(())
}

/// Parse a width given as "(n)"
fn parse_width(s: &str) -> Result<Option<usize>, Iso8211Error> {
    if s.is_empty() {
        return Ok(None);
    }
    let inner = s
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| corrupt(format!("bad subfield width '{}'", s)))?;
    inner
        .trim()
        .parse::<usize>()
        .map(Some)
        .map_err(|_| corrupt(format!("bad subfield width '{}'", s)))
}

fn parse_single(s: &str) -> Result<SubfieldFormat, Iso8211Error> {
    let mut chars = s.chars();
    let kind = chars
        .next()
        .ok_or_else(|| corrupt("empty subfield format".to_string()))?;
    let rest = chars.as_str();

    match kind {
        'A' | 'I' | 'R' | 'S' | 'C' => Ok(SubfieldFormat::Text(parse_width(rest)?)),
        'B' => {
            let bits = parse_width(rest)?
                .ok_or_else(|| corrupt("bit string without width".to_string()))?;
            if bits % 8 != 0 {
                return Err(corrupt(format!("bit string width {} is not byte aligned", bits)));
            }
            Ok(SubfieldFormat::Bits(bits / 8))
        }
        'b' => {
            let mut digits = rest.chars();
            let sign = digits.next();
            let width = digits.next().and_then(|c| c.to_digit(10)).map(|d| d as usize);
            match (sign, width) {
                (Some('1'), Some(w @ (1 | 2 | 4))) => Ok(SubfieldFormat::Unsigned(w)),
                (Some('2'), Some(w @ (1 | 2 | 4))) => Ok(SubfieldFormat::Signed(w)),
                _ => Err(corrupt(format!("unsupported binary format 'b{}'", rest))),
            }
        }
        _ => Err(corrupt(format!("unsupported subfield format '{}'", s))),
    }
}

impl SubfieldFormat {
    /// Decode one value starting at `*pos`, advancing the position
    pub fn decode(&self, data: &[u8], pos: &mut usize) -> Result<Value, Iso8211Error> {
        let remaining = data.len().saturating_sub(*pos);

        match *self {
            SubfieldFormat::Text(Some(width)) | SubfieldFormat::Bits(width) => {
                if width > remaining {
                    return Err(truncated(width, remaining));
                }
                let bytes = data[*pos..*pos + width].to_vec();
                *pos += width;
                Ok(Value::Bytes(bytes))
            }
            SubfieldFormat::Text(None) => {
                let slice = data.get(*pos..).unwrap_or_default();
                let end = slice
                    .iter()
                    .position(|&b| b == UNIT_TERMINATOR || b == FIELD_TERMINATOR)
                    .unwrap_or(slice.len());
                let bytes = slice[..end].to_vec();
                *pos += end;
                // The unit terminator belongs to the subfield, the field
                // terminator belongs to the field.
                if data.get(*pos) == Some(&UNIT_TERMINATOR) {
                    *pos += 1;
                }
                Ok(Value::Bytes(bytes))
            }
            SubfieldFormat::Unsigned(width) => {
                let raw = read_le(data, pos, width)?;
                Ok(Value::UInt(raw))
            }
            SubfieldFormat::Signed(width) => {
                let raw = read_le(data, pos, width)?;
                let shift = 32 - 8 * width as u32;
                Ok(Value::Int(((raw << shift) as i32) >> shift))
            }
        }
    }
}

fn truncated(wanted: usize, remaining: usize) -> Iso8211Error {
    corrupt(format!(
        "subfield needs {} bytes but only {} remain in field",
        wanted, remaining
    ))
}

fn read_le(data: &[u8], pos: &mut usize, width: usize) -> Result<u32, Iso8211Error> {
    let remaining = data.len().saturating_sub(*pos);
    if width > remaining {
        return Err(truncated(width, remaining));
    }
    let value = data[*pos..*pos + width]
        .iter()
        .rev()
        .fold(0u32, |acc, &b| (acc << 8) | b as u32);
    *pos += width;
    Ok(value)
}

// ENC Attribute Tables
// Declarative (object class, attribute) -> role tables and the per-class
// post-processing applied to points, lines and areas

use super::catalogue::attribute_codes::*;
use super::catalogue::object_codes::*;
use super::{ObjectType, Primitive};

/// What an attribute value contributes to a geometry object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeRole {
    /// Value replaces the subtype
    Subtype,
    /// Value is OR-ed into the low byte of the subtype
    SubtypeLow,
    /// Value is OR-ed into the high byte of the subtype
    SubtypeHigh,
    /// Restriction code, remapped to a restricted area subtype
    Restriction,
    /// First numeric/text parameter
    Param0,
    /// Second numeric/text parameter
    Param1,
}

use AttributeRole::*;

/// Point feature attribute roles
pub const POINT_ATTRIBUTES: &[(u16, u16, AttributeRole)] = &[
    (HRBFAC, CATHAF, Subtype),
    (I_HRBFAC, I_CATHAF, Subtype),
    (LNDMRK, CATLMK, Subtype),
    (WRECKS, CATWRK, Subtype),
    (MORFAC, CATMOR, Subtype),
    (UWTROC, WATLEV, Subtype),
    (BUAARE, CATBUA, Subtype),
    (SMCFAC, CATSCF, Subtype),
    (BUISGL, FUNCTN, Subtype),
    (WATTUR, CATWAT, Subtype),
    (SISTAT, CATSIT, Subtype),
    (I_SISTAT, I_CATSIT, Subtype),
    (I_DISMAR, CATDIS, SubtypeLow),
    (I_DISMAR, I_HUNITS, SubtypeHigh),
    (I_DISMAR, I_WTWDIS, Param0),
    (RDOCAL, ORIENT, Param0),
    (I_RDOCAL, ORIENT, Param0),
    (CURENT, ORIENT, Param0),
    (LNDELV, ELEVAT, Param0),
    (RDOCAL, COMCHA, Param1),
    (I_RDOCAL, COMCHA, Param1),
    (CURENT, CURVEL, Param1),
];

/// Line feature attribute roles
pub const LINE_ATTRIBUTES: &[(u16, u16, AttributeRole)] = &[
    (RECTRC, CATTRK, Subtype),
    (RCRTCL, CATTRK, Subtype),
    (DEPCNT, VALDCO, Param0),
    (LNDELV, ELEVAT, Param0),
];

/// Area feature attribute roles
pub const AREA_ATTRIBUTES: &[(u16, u16, AttributeRole)] = &[
    (RESARE, CATREA, Subtype),
    (I_RESARE, CATREA, Subtype),
    (ACHARE, CATACH, Subtype),
    (I_ACHARE, I_CATACH, Subtype),
    (HRBFAC, CATHAF, Subtype),
    (MARCUL, CATMFA, Subtype),
    (I_BERTHS, I_CATBRT, Subtype),
    (RESARE, RESTRN, Restriction),
    (I_RESARE, I_RESTRN, Restriction),
    (TSSLPT, ORIENT, Param0),
    (DEPARE, DRVAL1, Param0),
];

/// Restriction code -> restricted area subtype
pub const RESTRICTION_SUBTYPES: &[(u32, u16)] = &[(1, 2), (7, 17)];

/// Distance mark unit codes
pub const HEIGHT_UNITS: &[(u16, &str)] = &[
    (1, "m"),
    (2, "ft"),
    (3, "km"),
    (4, "hm"),
    (5, "mi"),
    (6, "nm"),
];

/// Signal station category labels
pub const SIGNAL_STATION_LABELS: &[(u16, &str)] = &[
    (1, "SS (Port Control)"),
    (3, "SS (INT)"),
    (6, "SS (Lock)"),
    (8, "SS (Bridge)"),
];

/// Thin space used between values and units
const THIN_SPACE: char = '\u{2009}';

fn role_table(primitive: Primitive) -> &'static [(u16, u16, AttributeRole)] {
    match primitive {
        Primitive::Point => POINT_ATTRIBUTES,
        Primitive::Line => LINE_ATTRIBUTES,
        Primitive::Area => AREA_ATTRIBUTES,
    }
}

/// Attribute values as read from a feature record, before post-processing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureAttributes {
    pub subtype: u32,
    pub label: String,
    /// Empty values are treated as absent
    pub params: [Option<String>; 2],
}

/// Lenient unsigned parse: unparsable text counts as 0
fn parse_code(value: &str) -> u32 {
    value.trim().parse().unwrap_or(0)
}

/// A missing ORIENT leaves the direction unset rather than reading as 0
fn parse_param(value: &Option<String>) -> Option<f64> {
    value.as_deref().and_then(|v| v.trim().parse().ok())
}

/// Apply the role table of a primitive to (ATTL, ATVL) pairs
pub fn extract_attributes(
    primitive: Primitive,
    objl: u16,
    attributes: &[(u16, String)],
) -> FeatureAttributes {
    let table = role_table(primitive);
    let mut out = FeatureAttributes::default();

    for (attl, atvl) in attributes {
        // Areas carry no label
        if *attl == OBJNAM && primitive != Primitive::Area {
            out.label = atvl.clone();
        }

        let role = table
            .iter()
            .find(|(class, attr, _)| *class == objl && attr == attl)
            .map(|(_, _, role)| *role);

        match role {
            Some(Subtype) => out.subtype = parse_code(atvl),
            Some(SubtypeLow) => out.subtype |= parse_code(atvl),
            Some(SubtypeHigh) => out.subtype |= parse_code(atvl) << 8,
            Some(Restriction) => {
                let code = parse_code(atvl);
                if let Some(&(_, subtype)) = RESTRICTION_SUBTYPES.iter().find(|(c, _)| *c == code) {
                    out.subtype = subtype as u32;
                }
            }
            Some(Param0) | Some(Param1) => {
                let index = if role == Some(Param0) { 0 } else { 1 };
                out.params[index] = if atvl.is_empty() { None } else { Some(atvl.clone()) };
            }
            None => {}
        }
    }

    out
}

/// Point under construction by the post-processing rules
#[derive(Debug, Clone, PartialEq)]
pub struct PointProperties {
    pub object_type: ObjectType,
    pub label: String,
    pub param: Option<f64>,
    pub params: [Option<String>; 2],
}

/// Line under construction by the post-processing rules
#[derive(Debug, Clone, PartialEq)]
pub struct LineProperties {
    pub object_type: ObjectType,
    pub label: String,
    pub params: [Option<String>; 2],
}

/// Area under construction by the post-processing rules
#[derive(Debug, Clone, PartialEq)]
pub struct AreaProperties {
    pub object_type: ObjectType,
    pub param: Option<f64>,
    pub params: [Option<String>; 2],
}

type PointRule = fn(&mut PointProperties);
type LineRule = fn(&mut LineProperties);
type AreaRule = fn(&mut AreaProperties);

/// Per-class point post-processing
pub const POINT_RULES: &[(u16, PointRule)] = &[
    (I_DISMAR, distance_mark),
    (RDOCAL, radio_calling_in_point),
    (I_RDOCAL, radio_calling_in_point),
    (CURENT, current),
    (SISTAT, signal_station),
    (I_SISTAT, signal_station),
    (LNDELV, point_elevation),
];

/// Per-class line post-processing
pub const LINE_RULES: &[(u16, LineRule)] = &[(DEPCNT, label_from_param), (LNDELV, label_from_param)];

/// Per-class area post-processing
pub const AREA_RULES: &[(u16, AreaRule)] = &[(DEPARE, depth_area), (TSSLPT, orientation_param)];

fn lookup<T: Copy>(table: &[(u16, T)], key: u16) -> Option<T> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

fn distance_mark(p: &mut PointProperties) {
    let subtype = p.object_type.subtype();
    if let Some(distance) = &p.params[0] {
        p.label = match lookup(HEIGHT_UNITS, (subtype >> 8) & 0xFF) {
            Some(units) => format!("{} {}", units, distance),
            None => distance.clone(),
        };
    }
    p.object_type = ObjectType::new(I_DISMAR, subtype & 0xFF);
}

fn radio_calling_in_point(p: &mut PointProperties) {
    if let Some(channel) = &p.params[1] {
        p.label = format!("VHF {}", channel);
    }
    p.param = parse_param(&p.params[0]);
}

fn current(p: &mut PointProperties) {
    if let Some(velocity) = &p.params[1] {
        p.label = format!("{}{}kt", velocity, THIN_SPACE);
    }
    p.param = parse_param(&p.params[0]);
}

fn signal_station(p: &mut PointProperties) {
    if p.label.is_empty() {
        p.label = lookup(SIGNAL_STATION_LABELS, p.object_type.subtype() & 0xFF)
            .unwrap_or("SS")
            .to_string();
    }
    p.object_type = ObjectType::class_only(SISTAT);
}

fn point_elevation(p: &mut PointProperties) {
    if let Some(elevation) = &p.params[0] {
        if p.label.is_empty() {
            p.label = format!("{}{}m", elevation, THIN_SPACE);
        } else {
            p.label = format!("{}\n({}{}m)", p.label, elevation, THIN_SPACE);
        }
    }
}

fn label_from_param(l: &mut LineProperties) {
    if let Some(value) = &l.params[0] {
        l.label = value.clone();
    }
}

fn depth_area(a: &mut AreaProperties) {
    a.object_type = ObjectType::new(DEPARE, depth_level(a.params[0].as_deref()));
}

fn orientation_param(a: &mut AreaProperties) {
    a.param = parse_param(&a.params[0]);
}

/// Depth band (0..=6) of a minimum depth value; a missing value counts as
/// -1 and unparsable text as 0
pub fn depth_level(value: Option<&str>) -> u16 {
    let depth = match value {
        Some(v) => v.trim().parse::<f64>().unwrap_or(0.0),
        None => -1.0,
    };

    const BANDS: [f64; 6] = [0.0, 2.0, 5.0, 10.0, 20.0, 50.0];
    BANDS.iter().take_while(|&&limit| depth >= limit).count() as u16
}

/// Sounding label: depth with at most six decimals, trailing zeros removed
pub fn depth_label(depth: f64) -> String {
    let text = format!("{:.6}", depth);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" {
        "0".to_string()
    } else {
        text.to_string()
    }
}

/// Final point properties: class subtype from the attributes, then the
/// class rule, if any
pub fn point_properties(objl: u16, attributes: FeatureAttributes) -> PointProperties {
    let mut p = PointProperties {
        object_type: ObjectType::new(objl, attributes.subtype as u16),
        label: attributes.label,
        param: None,
        params: attributes.params,
    };
    if let Some(rule) = lookup(POINT_RULES, objl) {
        rule(&mut p);
    }
    p
}

pub fn line_properties(objl: u16, attributes: FeatureAttributes) -> LineProperties {
    let mut l = LineProperties {
        object_type: ObjectType::new(objl, attributes.subtype as u16),
        label: attributes.label,
        params: attributes.params,
    };
    if let Some(rule) = lookup(LINE_RULES, objl) {
        rule(&mut l);
    }
    l
}

pub fn area_properties(objl: u16, attributes: FeatureAttributes) -> AreaProperties {
    let mut a = AreaProperties {
        object_type: ObjectType::new(objl, attributes.subtype as u16),
        param: None,
        params: attributes.params,
    };
    if let Some(rule) = lookup(AREA_RULES, objl) {
        rule(&mut a);
    }
    a
}

// S-57 ENC Chart Module
// Builds points, lines and polygons out of ISO 8211 encoded ENC cells

mod attributes;
mod builder;
pub mod catalogue;
mod dataset;
pub mod geojson;
mod objects;
mod priority;

pub use attributes::*;
pub use builder::*;
pub use dataset::*;
pub use objects::*;
pub use priority::*;

use std::fmt;

use thiserror::Error;

use crate::iso8211::Iso8211Error;

/// Vector record classes (RCNM)
pub const RCNM_VI: u8 = 110; // Isolated node
pub const RCNM_VC: u8 = 120; // Connected node
pub const RCNM_VE: u8 = 130; // Edge
pub const RCNM_VF: u8 = 140; // Face

/// Feature record primitive (PRIM)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Point = 1,
    Line = 2,
    Area = 3,
}

impl Primitive {
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::Point),
            2 => Some(Self::Line),
            3 => Some(Self::Area),
            _ => None,
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Point => write!(f, "point"),
            Self::Line => write!(f, "line"),
            Self::Area => write!(f, "area"),
        }
    }
}

/// Object type: class code in the high 16 bits, subtype in the low 16
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectType(pub u32);

impl ObjectType {
    pub const fn new(class: u16, subtype: u16) -> Self {
        Self(((class as u32) << 16) | subtype as u32)
    }

    /// Type of a class with no subtype
    pub const fn class_only(class: u16) -> Self {
        Self::new(class, 0)
    }

    pub const fn class(self) -> u16 {
        (self.0 >> 16) as u16
    }

    pub const fn subtype(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    /// Same class, subtype cleared
    pub const fn without_subtype(self) -> Self {
        Self(self.0 & 0xFFFF_0000)
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match catalogue::object_acronym(self.class()) {
            Some(acronym) => write!(f, "{}({})", acronym, self.subtype()),
            None => write!(f, "{}({})", self.class(), self.subtype()),
        }
    }
}

/// ENC dataset errors
#[derive(Error, Debug)]
pub enum EncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Container error: {0}")]
    Format(#[from] Iso8211Error),

    #[error("Invalid S-57 record: {0}")]
    InvalidRecord(String),

    #[error("Invalid geometries bounds: {0:?}")]
    InvalidBounds(crate::geometry::GeoRect),

    #[error("Geometry lock poisoned")]
    LockPoisoned,

    #[error("Background load failed: {0}")]
    Task(String),
}

// ISO/IEC 8211 Container Reader
// Self-describing record format used to package S-57 ENC cells

mod format;
mod reader;
mod record;

#[cfg(test)]
pub(crate) mod testing;

pub use format::*;
pub use reader::*;
pub use record::*;

use thiserror::Error;

/// Subfield delimiter
pub const UNIT_TERMINATOR: u8 = 0x1f;
/// Field delimiter
pub const FIELD_TERMINATOR: u8 = 0x1e;
/// Size of the record leader
pub const LEADER_SIZE: usize = 24;

/// ISO 8211 container errors
#[derive(Error, Debug)]
pub enum Iso8211Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bad record leader: {0}")]
    BadLeader(String),

    #[error("Corrupt data: {0}")]
    CorruptData(String),

    #[error("Data descriptive record has not been read")]
    MissingDdr,

    #[error("Data descriptive record already read")]
    DdrAlreadyRead,
}

// Bit Stream Reader
// MSB-first bit cursor with a 32-bit lookahead register

use super::RasterError;

/// Reads bits MSB first. The register always holds the next 32 bits;
/// positions past the end of the input read as zero.
pub struct BitStream<'a> {
    data: &'a [u8],
    /// Next byte to load into the register
    pos: usize,
    value: u32,
    /// Number of empty low bits in the register
    shift: u32,
    /// Real (non-padding) bits not yet consumed
    remaining: u64,
}

impl<'a> BitStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        let mut bs = Self {
            data,
            pos: 0,
            value: 0,
            shift: 32,
            remaining: data.len() as u64 * 8,
        };
        bs.fill();
        bs
    }

    fn fill(&mut self) {
        while self.shift >= 8 {
            let byte = self.data.get(self.pos).copied().unwrap_or(0);
            self.pos += 1;
            self.shift -= 8;
            self.value |= (byte as u32) << self.shift;
        }
    }

    /// The next 32 bits, first bit in the MSB
    pub fn peek(&self) -> u32 {
        self.value
    }

    /// Real bits left in the input
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Drop `n` (at most 32) bits from the front of the register
    pub fn consume(&mut self, n: u32) -> Result<(), RasterError> {
        if n as u64 > self.remaining || n > 32 {
            return Err(RasterError::TruncatedStream {
                requested: n,
                remaining: self.remaining,
            });
        }
        self.remaining -= n as u64;
        self.value = self.value.checked_shl(n).unwrap_or(0);
        self.shift += n;
        self.fill();
        Ok(())
    }
}

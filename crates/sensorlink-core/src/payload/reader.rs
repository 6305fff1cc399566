use std::ops::Range;

use super::error::DecodeError;
use super::layout::{Layout, Width};

/// Big-endian reads over a borrowed payload.
///
/// The reader is created only after `require_exact_len` succeeded for a
/// validated layout, so field ranges are always in bounds; the checked
/// accessors still return `None` instead of panicking.
pub struct PayloadReader<'a> {
    payload: &'a [u8],
}

impl<'a> PayloadReader<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self { payload }
    }

    pub fn require_exact_len(&self, layout: &Layout) -> Result<(), DecodeError> {
        if self.payload.len() != layout.expected_len() {
            return Err(DecodeError::LengthMismatch {
                layout: layout.name().to_string(),
                expected: layout.expected_len(),
                actual: self.payload.len(),
            });
        }
        Ok(())
    }

    pub fn read_slice(&self, range: Range<usize>) -> Option<&'a [u8]> {
        self.payload.get(range)
    }

    /// Read `width` bytes at `offset` as an unsigned big-endian integer.
    pub fn read_be(&self, offset: usize, width: Width) -> Option<u64> {
        let bytes = self.read_slice(offset..offset.checked_add(width.bytes())?)?;
        Some(fold_be(bytes))
    }
}

/// Most significant byte first, accumulated in a 64-bit register.
fn fold_be(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte))
}

use crate::error::{Asn1CsvError, Result};

/// Forward-only reader over the input bytes.
///
/// The running offset is what the walker compares against block bounds,
/// so every read must advance it by exactly the number of bytes consumed.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.offset >= self.data.len()
    }

    #[inline(always)]
    pub fn read_u8(&mut self) -> Result<u8> {
        let b = *self
            .data
            .get(self.offset)
            .ok_or(Asn1CsvError::TruncatedInput {
                offset: self.offset,
                needed: 1,
            })?;
        self.offset += 1;
        Ok(b)
    }

    /// Borrows the next `n` bytes straight out of the input.
    #[inline(always)]
    pub fn read_slice(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Asn1CsvError::TruncatedInput {
                offset: self.offset,
                needed: n - self.remaining(),
            });
        }
        let slice = &self.data[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }
}

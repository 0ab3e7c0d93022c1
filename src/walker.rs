//! Recursive descent over one top-level value, building the dotted address
//! of every field on the way down.
//!
//! A context-specific tag contributes its number to the address; a universal
//! SEQUENCE contributes `*`, and everything below it counts as repeating.

use log::trace;

use crate::ber::{read_identifier, read_length, Length, TagClass, SEQUENCE};
use crate::cursor::ByteCursor;
use crate::error::{Asn1CsvError, Result};
use crate::parser::ParserOptions;
use crate::record::RecordSet;

pub struct AddressWalker<'a, 'o> {
    cursor: ByteCursor<'a>,
    options: &'o ParserOptions,
    address: String,
}

impl<'a, 'o> AddressWalker<'a, 'o> {
    pub fn new(data: &'a [u8], options: &'o ParserOptions) -> Self {
        Self {
            cursor: ByteCursor::new(data),
            options,
            address: String::with_capacity(64),
        }
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.cursor.is_exhausted()
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.cursor.offset()
    }

    /// Walks exactly one top-level TLV, populating `records` as leaves are found.
    pub fn walk_value(&mut self, records: &mut RecordSet<'_, 'a>) -> Result<u32> {
        self.address.clear();
        self.dig_in(records, 1, 0, false)
    }

    #[inline]
    fn push_segment(&mut self, segment: &str) {
        if !self.address.is_empty() {
            self.address.push('.');
        }
        self.address.push_str(segment);
    }

    fn dig_in(
        &mut self,
        records: &mut RecordSet<'_, 'a>,
        sequence: usize,
        depth: usize,
        repeating: bool,
    ) -> Result<u32> {
        let tag_offset = self.cursor.offset();
        let id = read_identifier(&mut self.cursor)?;
        let length = read_length(&mut self.cursor, self.options.max_length)?;
        let parent_len = self.address.len();
        let mut num = itoa::Buffer::new();

        if id.constructed {
            let child_repeating = match id.class {
                TagClass::Universal if id.tag_num == SEQUENCE => {
                    self.push_segment("*");
                    true
                }
                TagClass::Universal => {
                    return Err(Asn1CsvError::InvalidUniversalType {
                        tag: id.tag_num,
                        offset: tag_offset,
                    })
                }
                TagClass::ContextSpecific => {
                    self.push_segment(num.format(id.tag_num));
                    repeating
                }
                TagClass::Application | TagClass::Private => {
                    return Err(Asn1CsvError::UnsupportedTagClass {
                        class: id.class.name(),
                        offset: tag_offset,
                    })
                }
            };
            let Length::Definite(length) = length else {
                return Err(Asn1CsvError::IndefiniteLength { offset: tag_offset });
            };

            trace!(
                "{:>width$}[{}] {} len={} seq={}",
                "",
                id.tag_num,
                self.address,
                length,
                sequence,
                width = depth * 2
            );
            self.parse_definite_block(records, length, depth + 1, child_repeating)?;
        } else {
            let Length::Definite(length) = length else {
                return Err(Asn1CsvError::IndefiniteLength { offset: tag_offset });
            };
            self.push_segment(num.format(id.tag_num));
            let value = self.cursor.read_slice(length)?;

            trace!(
                "{:>width$}{} len={} seq={}",
                "",
                self.address,
                length,
                sequence,
                width = depth * 2
            );
            if records.schema().has_header(&self.address) {
                if repeating {
                    records.populate_iterated(&self.address, value)?;
                } else {
                    records.populate_master(&self.address, value)?;
                }
            }
        }

        self.address.truncate(parent_len);
        Ok(id.tag_num)
    }

    /// Consumes child fields until `length` bytes past the current offset.
    fn parse_definite_block(
        &mut self,
        records: &mut RecordSet<'_, 'a>,
        length: usize,
        depth: usize,
        repeating: bool,
    ) -> Result<()> {
        if let Some(limit) = self.options.max_depth {
            if depth > limit {
                return Err(Asn1CsvError::NestingTooDeep {
                    offset: self.cursor.offset(),
                    limit,
                });
            }
        }

        let end = self.cursor.offset() + length;
        let mut sequence = 0usize;
        while self.cursor.offset() < end {
            sequence += 1;
            self.dig_in(records, sequence, depth, repeating)?;
        }
        Ok(())
    }
}

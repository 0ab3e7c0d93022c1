//! Identifier and length octets (X.690 8.1.2 / 8.1.3).

use crate::cursor::ByteCursor;
use crate::error::{Asn1CsvError, Result};

pub const CONSTRUCTED: u8 = 0x20;
pub const SEQUENCE: u32 = 0x10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagClass {
    Universal,
    Application,
    ContextSpecific,
    Private,
}

impl TagClass {
    #[inline]
    fn from_identifier(b: u8) -> Self {
        match b >> 6 {
            0 => TagClass::Universal,
            1 => TagClass::Application,
            2 => TagClass::ContextSpecific,
            _ => TagClass::Private,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TagClass::Universal => "UNIVERSAL",
            TagClass::Application => "APPLICATION",
            TagClass::ContextSpecific => "CONTEXT-SPECIFIC",
            TagClass::Private => "PRIVATE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identifier {
    pub class: TagClass,
    pub constructed: bool,
    pub tag_num: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Length {
    Definite(usize),
    /// The 0x80 length octet. Callers decide what to do with it.
    Indefinite,
}

pub fn read_identifier(cursor: &mut ByteCursor<'_>) -> Result<Identifier> {
    let b = cursor.read_u8()?;
    let class = TagClass::from_identifier(b);
    let constructed = (b & CONSTRUCTED) != 0;
    let mut tag_num = (b & 0x1F) as u32;

    if tag_num == 0x1F {
        tag_num = 0;
        let start = cursor.offset();
        let mut next = cursor.read_u8()?;

        // X.690 8.1.2.4.2 c): bits 7 to 1 of the first subsequent octet shall not all be zero
        if next & 0x7F == 0 {
            return Err(Asn1CsvError::InvalidHighTagNumber { offset: start });
        }

        while next & 0x80 != 0 {
            tag_num |= (next & 0x7F) as u32;
            if tag_num > (u32::MAX >> 7) {
                return Err(Asn1CsvError::InvalidHighTagNumber { offset: start });
            }
            tag_num <<= 7;
            next = cursor.read_u8()?;
        }
        tag_num |= (next & 0x7F) as u32;
    }

    Ok(Identifier {
        class,
        constructed,
        tag_num,
    })
}

/// Reads one length. `limit` bounds long-form lengths only; `None` skips the check.
pub fn read_length(cursor: &mut ByteCursor<'_>, limit: Option<usize>) -> Result<Length> {
    let start = cursor.offset();
    let b = cursor.read_u8()?;

    if b == 0x80 {
        return Ok(Length::Indefinite);
    }
    if b & 0x80 == 0 {
        return Ok(Length::Definite(b as usize));
    }

    // the invalid long form 0xFF (X.690 8.1.3.5 c) is caught here too
    let size = (b & 0x7F) as usize;
    if size > 4 {
        return Err(Asn1CsvError::LengthTooLarge { size });
    }

    let mut length: u64 = 0;
    for _ in 0..size {
        length = (length << 8) | cursor.read_u8()? as u64;
    }
    if length > i32::MAX as u64 {
        return Err(Asn1CsvError::NegativeLength { offset: start });
    }

    let length = length as usize;
    if let Some(limit) = limit {
        if length >= limit {
            return Err(Asn1CsvError::LengthOutOfBounds { length, limit });
        }
    }
    Ok(Length::Definite(length))
}

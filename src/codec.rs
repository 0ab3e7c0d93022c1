//! Raw value bytes -> CSV text, one rendering per [`DataType`].

use std::fmt::Write as _;

use crate::error::{Asn1CsvError, Result};
use crate::schema::DataType;

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// Appends the text form of `data` to `out`.
pub fn decode_into(out: &mut String, data: &[u8], data_type: DataType) -> Result<()> {
    match data_type {
        DataType::OctetString => write_hex(out, data),
        DataType::TbcdString => write_tbcd(out, data),
        DataType::Ia5String => write_ia5(out, data),
        DataType::Integer => write_integer(out, data)?,
        DataType::IpString => write_ipv4(out, data)?,
        DataType::Ipv6String => write_ipv6(out, data)?,
        DataType::Boolean => {
            expect_len(data, 1, data_type)?;
            out.push_str(if data[0] == 0xFF { "TRUE" } else { "FALSE" });
        }
    }
    Ok(())
}

pub fn decode(data: &[u8], data_type: DataType) -> Result<String> {
    let mut out = String::with_capacity(data.len() * 2 + 2);
    decode_into(&mut out, data, data_type)?;
    Ok(out)
}

#[inline]
fn expect_len(data: &[u8], expected: usize, data_type: DataType) -> Result<()> {
    if data.len() != expected {
        return Err(Asn1CsvError::InvalidLength {
            data_type,
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

#[inline(always)]
fn write_hex(out: &mut String, data: &[u8]) {
    out.reserve(data.len() * 2);
    for &b in data {
        out.push(HEX_UPPER[(b >> 4) as usize] as char);
        out.push(HEX_UPPER[(b & 0x0F) as usize] as char);
    }
}

/// Low nibble first; 0xF is filler and is dropped.
fn write_tbcd(out: &mut String, data: &[u8]) {
    let mut buf = itoa::Buffer::new();
    for &b in data {
        let lo = b & 0x0F;
        let hi = b >> 4;
        if lo != 0x0F {
            out.push_str(buf.format(lo));
        }
        if hi != 0x0F {
            out.push_str(buf.format(hi));
        }
    }
}

fn write_ia5(out: &mut String, data: &[u8]) {
    out.push('"');
    for ch in String::from_utf8_lossy(data).chars() {
        if ch == '"' {
            out.push('"');
        }
        out.push(ch);
    }
    out.push('"');
}

/// Big-endian two's complement of any length.
fn write_integer(out: &mut String, data: &[u8]) -> Result<()> {
    if data.is_empty() {
        return Err(Asn1CsvError::InvalidLength {
            data_type: DataType::Integer,
            expected: 1,
            actual: 0,
        });
    }
    let negative = data[0] & 0x80 != 0;

    if data.len() <= 16 {
        let mut v: i128 = if negative { -1 } else { 0 };
        for &b in data {
            v = (v << 8) | b as i128;
        }
        out.push_str(itoa::Buffer::new().format(v));
        return Ok(());
    }

    let mut magnitude = data.to_vec();
    if negative {
        for b in magnitude.iter_mut() {
            *b = !*b;
        }
        for b in magnitude.iter_mut().rev() {
            let (v, carry) = b.overflowing_add(1);
            *b = v;
            if !carry {
                break;
            }
        }
    }

    // repeated division by 10^9, least significant chunk first
    const CHUNK: u64 = 1_000_000_000;
    let mut chunks: Vec<u32> = Vec::new();
    let mut start = magnitude.iter().position(|&b| b != 0).unwrap_or(magnitude.len());
    while start < magnitude.len() {
        let mut rem: u64 = 0;
        for b in magnitude[start..].iter_mut() {
            let cur = (rem << 8) | *b as u64;
            *b = (cur / CHUNK) as u8;
            rem = cur % CHUNK;
        }
        chunks.push(rem as u32);
        while start < magnitude.len() && magnitude[start] == 0 {
            start += 1;
        }
    }

    if negative {
        out.push('-');
    }
    match chunks.split_last() {
        None => out.push('0'),
        Some((head, rest)) => {
            out.push_str(itoa::Buffer::new().format(*head));
            for c in rest.iter().rev() {
                let _ = write!(out, "{:09}", c);
            }
        }
    }
    Ok(())
}

fn write_ipv4(out: &mut String, data: &[u8]) -> Result<()> {
    expect_len(data, 4, DataType::IpString)?;
    let mut buf = itoa::Buffer::new();
    for (i, &b) in data.iter().enumerate() {
        if i > 0 {
            out.push('.');
        }
        out.push_str(buf.format(b));
    }
    Ok(())
}

/// Packs 12 bits into two characters from `[0-9A-Za-z!_]`, starting at nibble 8.
fn write_ipv6(out: &mut String, data: &[u8]) -> Result<()> {
    expect_len(data, 16, DataType::Ipv6String)?;

    #[inline(always)]
    fn nibble(data: &[u8], i: usize) -> u8 {
        let b = data[i / 2];
        if i % 2 == 0 {
            b >> 4
        } else {
            b & 0x0F
        }
    }

    let mut index = 8usize;
    for _ in 0..8 {
        let a1 = nibble(data, index);
        let a2 = nibble(data, index + 1);
        let a3 = nibble(data, index + 2);

        let c0 = 4 * a1 + a2 / 4;
        let c1 = 16 * (a2 % 4) + a3;
        for c in [c0, c1] {
            let ch = match c {
                0..=9 => (b'0' + c) as char,
                10..=35 => (b'A' + c - 10) as char,
                36..=61 => (b'a' + c - 36) as char,
                62 => '!',
                63 => '_',
                _ => return Err(Asn1CsvError::InvalidEncodingChar { index, value: c }),
            };
            out.push(ch);
        }
        index += 3;
    }
    Ok(())
}

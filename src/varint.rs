//! Unsigned LEB128-style integers as used by the `BlockData` and `BiomeData`
//! streams: 7 payload bits per byte, least significant group first, high bit
//! set on every byte except the last.

use crate::error::{Result, SchematicError};

/// Appends the encoding of `value` to `buf`.
#[inline]
pub fn write_varint(buf: &mut Vec<u8>, mut value: u32) {
    while value & !0x7F != 0 {
        buf.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

pub fn encode(value: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(encoded_len(value));
    write_varint(&mut buf, value);
    buf
}

/// Number of bytes `value` occupies once encoded (at least 1).
pub fn encoded_len(value: u32) -> usize {
    let bits = (u32::BITS - value.leading_zeros()).max(1) as usize;
    (bits + 6) / 7
}

/// Decodes one value starting at `offset`, returning it together with the
/// number of bytes consumed.
pub fn read_varint(data: &[u8], offset: usize) -> Result<(u32, usize)> {
    let mut value: u32 = 0;
    let mut shift = 0u32;
    let mut pos = offset;
    loop {
        let byte = *data
            .get(pos)
            .ok_or(SchematicError::TruncatedVarInt { offset })?;
        pos += 1;
        // the fifth byte may only carry the top four bits
        if shift == 28 && byte & 0xF0 != 0 {
            return Err(SchematicError::CorruptDocument(format!(
                "varint at byte {} does not fit in 32 bits",
                offset
            )));
        }
        value |= ((byte & 0x7F) as u32) << shift;
        if byte & 0x80 == 0 {
            return Ok((value, pos - offset));
        }
        shift += 7;
    }
}

/// Sequential reader over a varint stream.
pub struct VarIntReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> VarIntReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn next_value(&mut self) -> Result<u32> {
        let (value, read) = read_varint(self.data, self.pos)?;
        self.pos += read;
        Ok(value)
    }
}

/// Decodes the whole buffer.
pub fn decode_all(data: &[u8]) -> Result<Vec<u32>> {
    let mut reader = VarIntReader::new(data);
    let mut values = Vec::new();
    while !reader.is_exhausted() {
        values.push(reader.next_value()?);
    }
    Ok(values)
}

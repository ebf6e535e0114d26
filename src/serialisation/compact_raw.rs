//! Compact variable-length encoding for signed integers.
//!
//! Layout of one encoded value:
//! - values in `-112..=127` are a single byte holding the value itself;
//! - otherwise a header byte followed by big-endian magnitude bytes, minimal count. The header is
//!   `-112 - n` for non-negative values and `-120 - n` for negative values, `n` being the number of
//!   magnitude bytes. Negative values are one's-complemented before the magnitude is written.
//!
//! `0 => [0x00]`, `i32::MAX => [0x8C, 0x7F, 0xFF, 0xFF, 0xFF]`,
//! `i32::MIN => [0x84, 0x7F, 0xFF, 0xFF, 0xFF]`.

use crate::{
    errors::GraphError,
    serialisation::{Serialiser, unsupported},
    value::{PropertyValue, ValueKind},
};

const SINGLE_BYTE_MIN: i64 = -112;
const SINGLE_BYTE_MAX: i64 = 127;
const POSITIVE_HEADER_BASE: i32 = -112;
const NEGATIVE_HEADER_BASE: i32 = -120;

/// Append the compact encoding of `value` to `out`.
pub fn write_long(value: i64, out: &mut Vec<u8>) {
    if (SINGLE_BYTE_MIN..=SINGLE_BYTE_MAX).contains(&value) {
        out.push(value as i8 as u8);
        return;
    }
    let mut magnitude = value;
    let mut header = POSITIVE_HEADER_BASE;
    if magnitude < 0 {
        magnitude ^= -1;
        header = NEGATIVE_HEADER_BASE;
    }
    let mut remaining = magnitude;
    while remaining != 0 {
        remaining >>= 8;
        header -= 1;
    }
    out.push(header as i8 as u8);
    let count = if header < NEGATIVE_HEADER_BASE {
        -(header - NEGATIVE_HEADER_BASE)
    } else {
        -(header - POSITIVE_HEADER_BASE)
    };
    for idx in (1..=count).rev() {
        let shift = (idx - 1) * 8;
        out.push(((magnitude >> shift) & 0xFF) as u8);
    }
}

pub fn encode_long(value: i64) -> Vec<u8> {
    let mut out = Vec::with_capacity(9);
    write_long(value, &mut out);
    out
}

/// Total encoded length (header included) announced by a header byte.
pub fn encoded_size(header: u8) -> usize {
    let header = header as i8 as i32;
    if header >= POSITIVE_HEADER_BASE {
        1
    } else if header < NEGATIVE_HEADER_BASE {
        (NEGATIVE_HEADER_BASE + 1 - header) as usize
    } else {
        (POSITIVE_HEADER_BASE + 1 - header) as usize
    }
}

fn is_negative(header: u8) -> bool {
    let header = header as i8 as i32;
    header < NEGATIVE_HEADER_BASE || (POSITIVE_HEADER_BASE..0).contains(&header)
}

/// Decode one compact value from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed.
pub fn read_long(bytes: &[u8]) -> Result<(i64, usize), GraphError> {
    let Some(&header) = bytes.first() else {
        return Err(GraphError::serialisation(
            "cannot decode a compact integer from empty input",
        ));
    };
    let size = encoded_size(header);
    if size == 1 {
        return Ok((i64::from(header as i8), 1));
    }
    if bytes.len() < size {
        return Err(GraphError::serialisation(format!(
            "compact integer needs {size} bytes, found {}",
            bytes.len()
        )));
    }
    let mut magnitude: i64 = 0;
    for byte in &bytes[1..size] {
        magnitude = (magnitude << 8) | i64::from(*byte);
    }
    let value = if is_negative(header) {
        magnitude ^ -1
    } else {
        magnitude
    };
    Ok((value, size))
}

fn read_exact_long(bytes: &[u8]) -> Result<i64, GraphError> {
    let (value, used) = read_long(bytes)?;
    if used != bytes.len() {
        return Err(GraphError::serialisation(format!(
            "{} trailing bytes after compact integer",
            bytes.len() - used
        )));
    }
    Ok(value)
}

/// Compact encoding of 32-bit integers.
#[derive(Clone, Copy, Debug, Default)]
pub struct CompactRawIntegerSerialiser;

impl CompactRawIntegerSerialiser {
    pub const NAME: &'static str = "compact_raw_integer";
}

impl Serialiser for CompactRawIntegerSerialiser {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn can_handle(&self, kind: ValueKind) -> bool {
        kind == ValueKind::Integer
    }

    fn serialise(&self, value: &PropertyValue) -> Result<Vec<u8>, GraphError> {
        match value {
            PropertyValue::Integer(v) => Ok(encode_long(i64::from(*v))),
            other => Err(unsupported(self, other)),
        }
    }

    fn deserialise(&self, bytes: &[u8]) -> Result<PropertyValue, GraphError> {
        let value = read_exact_long(bytes)?;
        i32::try_from(value)
            .map(PropertyValue::Integer)
            .map_err(|_| GraphError::serialisation(format!("{value} is out of integer range")))
    }
}

/// Compact encoding of 64-bit integers.
#[derive(Clone, Copy, Debug, Default)]
pub struct CompactRawLongSerialiser;

impl CompactRawLongSerialiser {
    pub const NAME: &'static str = "compact_raw_long";
}

impl Serialiser for CompactRawLongSerialiser {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn can_handle(&self, kind: ValueKind) -> bool {
        kind == ValueKind::Long
    }

    fn serialise(&self, value: &PropertyValue) -> Result<Vec<u8>, GraphError> {
        match value {
            PropertyValue::Long(v) => Ok(encode_long(*v)),
            other => Err(unsupported(self, other)),
        }
    }

    fn deserialise(&self, bytes: &[u8]) -> Result<PropertyValue, GraphError> {
        read_exact_long(bytes).map(PropertyValue::Long)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_byte_boundaries() {
        assert_eq!(encode_long(-112), vec![0x90]);
        assert_eq!(encode_long(127), vec![0x7F]);
        assert_eq!(encode_long(128), vec![0x8F, 0x80]);
        assert_eq!(encode_long(-113), vec![0x87, 0x70]);
    }

    #[test]
    fn size_is_announced_by_header() {
        for value in [0, 127, 128, -113, i64::from(i32::MAX), i64::MIN, i64::MAX] {
            let bytes = encode_long(value);
            assert_eq!(encoded_size(bytes[0]), bytes.len(), "{value}");
        }
    }

    #[test]
    fn read_reports_consumed_bytes() {
        let mut buf = encode_long(300);
        buf.extend_from_slice(&[0xAA, 0xBB]);
        assert_eq!(read_long(&buf).expect("decode"), (300, 3));
    }
}

//! Encoding for [`TypeSubTypeValue`] identifiers.
//!
//! Each part is escaped (`0x01 -> 0x01 0x02`, `0x00 -> 0x01 0x01`) and the three parts are joined
//! with a `0x00` delimiter, so an empty part still occupies its slot.

use crate::{
    errors::GraphError,
    serialisation::{Serialiser, unsupported},
    value::{PropertyValue, TypeSubTypeValue, ValueKind},
};

const DELIMITER: u8 = 0x00;
const ESCAPE: u8 = 0x01;
const ESCAPED_DELIMITER: u8 = 0x01;
const ESCAPED_ESCAPE: u8 = 0x02;

fn escape_into(part: &str, out: &mut Vec<u8>) {
    for &byte in part.as_bytes() {
        match byte {
            DELIMITER => out.extend_from_slice(&[ESCAPE, ESCAPED_DELIMITER]),
            ESCAPE => out.extend_from_slice(&[ESCAPE, ESCAPED_ESCAPE]),
            other => out.push(other),
        }
    }
}

fn split_unescaped(bytes: &[u8]) -> Result<Vec<Vec<u8>>, GraphError> {
    let mut parts = vec![Vec::new()];
    let mut iter = bytes.iter();
    while let Some(&byte) = iter.next() {
        match byte {
            DELIMITER => parts.push(Vec::new()),
            ESCAPE => {
                let decoded = match iter.next() {
                    Some(&ESCAPED_DELIMITER) => DELIMITER,
                    Some(&ESCAPED_ESCAPE) => ESCAPE,
                    Some(other) => {
                        return Err(GraphError::serialisation(format!(
                            "invalid escape sequence 0x01 0x{other:02x}"
                        )));
                    }
                    None => {
                        return Err(GraphError::serialisation("dangling escape byte"));
                    }
                };
                if let Some(current) = parts.last_mut() {
                    current.push(decoded);
                }
            }
            other => {
                if let Some(current) = parts.last_mut() {
                    current.push(other);
                }
            }
        }
    }
    Ok(parts)
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TypeSubTypeValueSerialiser;

impl TypeSubTypeValueSerialiser {
    pub const NAME: &'static str = "type_sub_type_value";
}

impl Serialiser for TypeSubTypeValueSerialiser {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn can_handle(&self, kind: ValueKind) -> bool {
        kind == ValueKind::TypeSubTypeValue
    }

    fn serialise(&self, value: &PropertyValue) -> Result<Vec<u8>, GraphError> {
        let PropertyValue::TypeSubTypeValue(tstv) = value else {
            return Err(unsupported(self, value));
        };
        let mut out =
            Vec::with_capacity(tstv.type_.len() + tstv.sub_type.len() + tstv.value.len() + 2);
        escape_into(&tstv.type_, &mut out);
        out.push(DELIMITER);
        escape_into(&tstv.sub_type, &mut out);
        out.push(DELIMITER);
        escape_into(&tstv.value, &mut out);
        Ok(out)
    }

    fn deserialise(&self, bytes: &[u8]) -> Result<PropertyValue, GraphError> {
        let parts = split_unescaped(bytes)?;
        if parts.len() != 3 {
            return Err(GraphError::serialisation(format!(
                "expected 3 delimited parts, found {}",
                parts.len()
            )));
        }
        let mut strings = Vec::with_capacity(3);
        for part in parts {
            strings.push(
                String::from_utf8(part).map_err(|e| GraphError::serialisation(e.to_string()))?,
            );
        }
        let value = strings.pop().unwrap_or_default();
        let sub_type = strings.pop().unwrap_or_default();
        let type_ = strings.pop().unwrap_or_default();
        Ok(PropertyValue::TypeSubTypeValue(TypeSubTypeValue {
            type_,
            sub_type,
            value,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_escaped_and_delimited() {
        let value = PropertyValue::from(TypeSubTypeValue::new("a", "aa", "aaa"));
        let bytes = TypeSubTypeValueSerialiser.serialise(&value).expect("serialise");
        assert_eq!(bytes, b"a\0aa\0aaa".to_vec());
    }

    #[test]
    fn delimiter_inside_a_part_survives() {
        let value = PropertyValue::from(TypeSubTypeValue::new("x\0y", "\u{1}", ""));
        let bytes = TypeSubTypeValueSerialiser.serialise(&value).expect("serialise");
        assert_eq!(bytes, vec![b'x', 0x01, 0x01, b'y', 0x00, 0x01, 0x02, 0x00]);
        let decoded = TypeSubTypeValueSerialiser
            .deserialise(&bytes)
            .expect("deserialise");
        assert_eq!(decoded, value);
    }

    #[test]
    fn wrong_part_count_is_rejected() {
        let err = TypeSubTypeValueSerialiser
            .deserialise(b"only\0two")
            .expect_err("two parts");
        assert!(matches!(err, GraphError::SerialisationError(_)));
    }
}

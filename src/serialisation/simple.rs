use crate::{
    errors::GraphError,
    serialisation::{Serialiser, unsupported},
    value::{PropertyValue, ValueKind},
};

/// UTF-8 bytes of a string value.
#[derive(Clone, Copy, Debug, Default)]
pub struct StringSerialiser;

impl StringSerialiser {
    pub const NAME: &'static str = "string";
}

impl Serialiser for StringSerialiser {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn can_handle(&self, kind: ValueKind) -> bool {
        kind == ValueKind::String
    }

    fn serialise(&self, value: &PropertyValue) -> Result<Vec<u8>, GraphError> {
        match value {
            PropertyValue::String(v) => Ok(v.as_bytes().to_vec()),
            other => Err(unsupported(self, other)),
        }
    }

    fn deserialise(&self, bytes: &[u8]) -> Result<PropertyValue, GraphError> {
        String::from_utf8(bytes.to_vec())
            .map(PropertyValue::String)
            .map_err(|e| GraphError::serialisation(e.to_string()))
    }
}

/// One byte: `1` for true, `0` for false.
#[derive(Clone, Copy, Debug, Default)]
pub struct BooleanSerialiser;

impl BooleanSerialiser {
    pub const NAME: &'static str = "boolean";
}

impl Serialiser for BooleanSerialiser {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn can_handle(&self, kind: ValueKind) -> bool {
        kind == ValueKind::Boolean
    }

    fn serialise(&self, value: &PropertyValue) -> Result<Vec<u8>, GraphError> {
        match value {
            PropertyValue::Boolean(v) => Ok(vec![u8::from(*v)]),
            other => Err(unsupported(self, other)),
        }
    }

    fn deserialise(&self, bytes: &[u8]) -> Result<PropertyValue, GraphError> {
        match bytes {
            [1] => Ok(PropertyValue::Boolean(true)),
            [0] => Ok(PropertyValue::Boolean(false)),
            other => Err(GraphError::serialisation(format!(
                "invalid boolean encoding {other:?}"
            ))),
        }
    }
}

/// Raw bytes, written as-is.
#[derive(Clone, Copy, Debug, Default)]
pub struct BytesSerialiser;

impl BytesSerialiser {
    pub const NAME: &'static str = "bytes";
}

impl Serialiser for BytesSerialiser {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn can_handle(&self, kind: ValueKind) -> bool {
        kind == ValueKind::Bytes
    }

    fn serialise(&self, value: &PropertyValue) -> Result<Vec<u8>, GraphError> {
        match value {
            PropertyValue::Bytes(v) => Ok(v.clone()),
            other => Err(unsupported(self, other)),
        }
    }

    fn deserialise(&self, bytes: &[u8]) -> Result<PropertyValue, GraphError> {
        Ok(PropertyValue::Bytes(bytes.to_vec()))
    }
}

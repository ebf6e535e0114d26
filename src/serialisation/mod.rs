//! Typed codecs mapping property values to canonical bytes.
//!
//! Every codec here has a byte layout that is an external contract: bytes written by a shipped
//! version must stay decodable. New behaviour goes into new codecs, never into a changed layout.

pub mod compact_raw;
mod simple;
mod type_sub_type_value;

use std::fmt;
use std::sync::Arc;

use crate::{
    errors::GraphError,
    value::{PropertyValue, ValueKind},
};

pub use compact_raw::{CompactRawIntegerSerialiser, CompactRawLongSerialiser};
pub use simple::{BooleanSerialiser, BytesSerialiser, StringSerialiser};
pub use type_sub_type_value::TypeSubTypeValueSerialiser;

/// Codec between one [`ValueKind`] and its byte encoding.
pub trait Serialiser: Send + Sync + fmt::Debug {
    /// Stable name used by schema documents.
    fn name(&self) -> &'static str;

    fn can_handle(&self, kind: ValueKind) -> bool;

    fn serialise(&self, value: &PropertyValue) -> Result<Vec<u8>, GraphError>;

    /// Exact inverse of [`Serialiser::serialise`].
    fn deserialise(&self, bytes: &[u8]) -> Result<PropertyValue, GraphError>;
}

pub(crate) fn unsupported(serialiser: &dyn Serialiser, value: &PropertyValue) -> GraphError {
    GraphError::serialisation(format!(
        "{} cannot serialise a {} value",
        serialiser.name(),
        value.kind()
    ))
}

/// Names of the built-in serialisers, in registration order.
pub const BUILT_IN: &[&str] = &[
    CompactRawIntegerSerialiser::NAME,
    CompactRawLongSerialiser::NAME,
    StringSerialiser::NAME,
    BooleanSerialiser::NAME,
    TypeSubTypeValueSerialiser::NAME,
    BytesSerialiser::NAME,
];

/// Resolve a built-in serialiser by its stable name.
pub fn lookup(name: &str) -> Option<Arc<dyn Serialiser>> {
    let serialiser: Arc<dyn Serialiser> = match name {
        CompactRawIntegerSerialiser::NAME => Arc::new(CompactRawIntegerSerialiser),
        CompactRawLongSerialiser::NAME => Arc::new(CompactRawLongSerialiser),
        StringSerialiser::NAME => Arc::new(StringSerialiser),
        BooleanSerialiser::NAME => Arc::new(BooleanSerialiser),
        TypeSubTypeValueSerialiser::NAME => Arc::new(TypeSubTypeValueSerialiser),
        BytesSerialiser::NAME => Arc::new(BytesSerialiser),
        _ => return None,
    };
    Some(serialiser)
}

/// Default serialiser for a value kind.
pub fn default_for(kind: ValueKind) -> Arc<dyn Serialiser> {
    match kind {
        ValueKind::Boolean => Arc::new(BooleanSerialiser),
        ValueKind::Integer => Arc::new(CompactRawIntegerSerialiser),
        ValueKind::Long => Arc::new(CompactRawLongSerialiser),
        ValueKind::String => Arc::new(StringSerialiser),
        ValueKind::TypeSubTypeValue => Arc::new(TypeSubTypeValueSerialiser),
        ValueKind::Bytes => Arc::new(BytesSerialiser),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_built_in_name_resolves() {
        for name in BUILT_IN {
            let serialiser = lookup(name).expect("built-in");
            assert_eq!(serialiser.name(), *name);
        }
        assert!(lookup("no_such_serialiser").is_none());
    }

    #[test]
    fn defaults_handle_their_kind() {
        for kind in [
            ValueKind::Boolean,
            ValueKind::Integer,
            ValueKind::Long,
            ValueKind::String,
            ValueKind::TypeSubTypeValue,
            ValueKind::Bytes,
        ] {
            assert!(default_for(kind).can_handle(kind), "{kind}");
        }
    }
}

//! Typed property and identifier values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Tag naming the kind of a [`PropertyValue`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Boolean,
    Integer,
    Long,
    String,
    TypeSubTypeValue,
    Bytes,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Boolean => "boolean",
            ValueKind::Integer => "integer",
            ValueKind::Long => "long",
            ValueKind::String => "string",
            ValueKind::TypeSubTypeValue => "type_sub_type_value",
            ValueKind::Bytes => "bytes",
        };
        f.write_str(name)
    }
}

/// Three-part identifier value: a type, a sub-type and a value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeSubTypeValue {
    pub type_: String,
    pub sub_type: String,
    pub value: String,
}

impl TypeSubTypeValue {
    pub fn new(
        type_: impl Into<String>,
        sub_type: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            type_: type_.into(),
            sub_type: sub_type.into(),
            value: value.into(),
        }
    }
}

/// A typed value held by a property or used as a vertex identifier.
///
/// Values are totally ordered so undirected edges can be oriented canonically.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PropertyValue {
    Boolean(bool),
    Integer(i32),
    Long(i64),
    String(String),
    TypeSubTypeValue(TypeSubTypeValue),
    Bytes(Vec<u8>),
}

impl PropertyValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            PropertyValue::Boolean(_) => ValueKind::Boolean,
            PropertyValue::Integer(_) => ValueKind::Integer,
            PropertyValue::Long(_) => ValueKind::Long,
            PropertyValue::String(_) => ValueKind::String,
            PropertyValue::TypeSubTypeValue(_) => ValueKind::TypeSubTypeValue,
            PropertyValue::Bytes(_) => ValueKind::Bytes,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(v) => Some(i64::from(*v)),
            PropertyValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Boolean(v) => write!(f, "{v}"),
            PropertyValue::Integer(v) => write!(f, "{v}"),
            PropertyValue::Long(v) => write!(f, "{v}L"),
            PropertyValue::String(v) => write!(f, "{v:?}"),
            PropertyValue::TypeSubTypeValue(v) => {
                write!(f, "{}|{}|{}", v.type_, v.sub_type, v.value)
            }
            PropertyValue::Bytes(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Long(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<TypeSubTypeValue> for PropertyValue {
    fn from(value: TypeSubTypeValue) -> Self {
        PropertyValue::TypeSubTypeValue(value)
    }
}

impl From<Vec<u8>> for PropertyValue {
    fn from(value: Vec<u8>) -> Self {
        PropertyValue::Bytes(value)
    }
}

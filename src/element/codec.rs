//! Schema-driven byte encoding of elements.
//!
//! An element is stored as its group name, one identifier block per vertex (encoded with the
//! identifier type's serialiser) and one properties block. The properties block holds, for every
//! property the group declares and in declaration order, a compact length prefix followed by the
//! serialised value. The prefix is `len + 1` for a present value and `0` for an absent one.
//! Decoding needs the schema the element was encoded with.

use crate::{
    element::{Edge, Element, Entity, Properties},
    errors::GraphError,
    schema::{ElementDefinition, Schema},
    serialisation::compact_raw::{read_long, write_long},
    value::PropertyValue,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedElement {
    pub group: String,
    pub identifiers: Vec<Vec<u8>>,
    pub directed: bool,
    pub properties: Vec<u8>,
}

fn definition<'a>(schema: &'a Schema, group: &str) -> Result<&'a ElementDefinition, GraphError> {
    schema
        .element_definition(group)
        .ok_or_else(|| GraphError::serialisation(format!("group '{group}' is not in the schema")))
}

fn type_serialise(
    schema: &Schema,
    type_name: &str,
    value: &PropertyValue,
) -> Result<Vec<u8>, GraphError> {
    schema
        .type_definition(type_name)
        .ok_or_else(|| GraphError::serialisation(format!("unknown type '{type_name}'")))?
        .serialiser()
        .serialise(value)
}

fn type_deserialise(
    schema: &Schema,
    type_name: &str,
    bytes: &[u8],
) -> Result<PropertyValue, GraphError> {
    schema
        .type_definition(type_name)
        .ok_or_else(|| GraphError::serialisation(format!("unknown type '{type_name}'")))?
        .serialiser()
        .deserialise(bytes)
}

fn write_block(block: Option<&[u8]>, out: &mut Vec<u8>) {
    match block {
        Some(bytes) => {
            write_long(bytes.len() as i64 + 1, out);
            out.extend_from_slice(bytes);
        }
        None => write_long(0, out),
    }
}

fn read_block<'a>(bytes: &'a [u8], offset: &mut usize) -> Result<Option<&'a [u8]>, GraphError> {
    let (prefix, used) = read_long(&bytes[*offset..])?;
    *offset += used;
    if prefix == 0 {
        return Ok(None);
    }
    let len = usize::try_from(prefix - 1)
        .map_err(|_| GraphError::serialisation(format!("negative block length {prefix}")))?;
    let end = offset
        .checked_add(len)
        .filter(|end| *end <= bytes.len())
        .ok_or_else(|| GraphError::serialisation("property block runs past the end of input"))?;
    let block = &bytes[*offset..end];
    *offset = end;
    Ok(Some(block))
}

/// Serialise a vertex value with the type declared at `position` of the group's identifiers.
pub fn encode_identifier(
    schema: &Schema,
    group: &str,
    position: usize,
    value: &PropertyValue,
) -> Result<Vec<u8>, GraphError> {
    let definition = definition(schema, group)?;
    let type_name = definition.identifiers().get(position).ok_or_else(|| {
        GraphError::serialisation(format!("group '{group}' has no identifier {position}"))
    })?;
    type_serialise(schema, type_name, value)
}

pub fn decode_identifier(
    schema: &Schema,
    group: &str,
    position: usize,
    bytes: &[u8],
) -> Result<PropertyValue, GraphError> {
    let definition = definition(schema, group)?;
    let type_name = definition.identifiers().get(position).ok_or_else(|| {
        GraphError::serialisation(format!("group '{group}' has no identifier {position}"))
    })?;
    type_deserialise(schema, type_name, bytes)
}

pub fn encode_properties(
    schema: &Schema,
    group: &str,
    properties: &Properties,
) -> Result<Vec<u8>, GraphError> {
    let definition = definition(schema, group)?;
    if let Some(unknown) = properties.keys().find(|name| !definition.has_property(name)) {
        return Err(GraphError::serialisation(format!(
            "group '{group}' has no property '{unknown}'"
        )));
    }
    let mut out = Vec::new();
    for (name, type_name) in definition.properties() {
        match properties.get(name) {
            Some(value) => {
                let bytes = type_serialise(schema, type_name, value)?;
                write_block(Some(&bytes), &mut out);
            }
            None => write_block(None, &mut out),
        }
    }
    Ok(out)
}

pub fn decode_properties(
    schema: &Schema,
    group: &str,
    bytes: &[u8],
) -> Result<Properties, GraphError> {
    let definition = definition(schema, group)?;
    let mut properties = Properties::new();
    let mut offset = 0;
    for (name, type_name) in definition.properties() {
        if offset >= bytes.len() {
            return Err(GraphError::serialisation(format!(
                "properties block for '{group}' ends before '{name}'"
            )));
        }
        if let Some(block) = read_block(bytes, &mut offset)? {
            properties.insert(name.clone(), type_deserialise(schema, type_name, block)?);
        }
    }
    if offset != bytes.len() {
        return Err(GraphError::serialisation(format!(
            "{} trailing bytes in properties block for '{group}'",
            bytes.len() - offset
        )));
    }
    Ok(properties)
}

pub fn encode_element(schema: &Schema, element: &Element) -> Result<EncodedElement, GraphError> {
    let group = element.group();
    let (identifiers, directed) = match element {
        Element::Entity(entity) => (vec![encode_identifier(schema, group, 0, entity.vertex())?], false),
        Element::Edge(edge) => (
            vec![
                encode_identifier(schema, group, 0, edge.source())?,
                encode_identifier(schema, group, 1, edge.destination())?,
            ],
            edge.is_directed(),
        ),
    };
    Ok(EncodedElement {
        group: group.to_string(),
        identifiers,
        directed,
        properties: encode_properties(schema, group, element.properties())?,
    })
}

pub fn decode_element(schema: &Schema, encoded: &EncodedElement) -> Result<Element, GraphError> {
    let group = encoded.group.as_str();
    let properties = decode_properties(schema, group, &encoded.properties)?;
    match encoded.identifiers.as_slice() {
        [vertex] => Ok(Element::Entity(Entity::new(
            group,
            decode_identifier(schema, group, 0, vertex)?,
            properties,
        ))),
        [source, destination] => Ok(Element::Edge(Edge::new(
            group,
            decode_identifier(schema, group, 0, source)?,
            decode_identifier(schema, group, 1, destination)?,
            encoded.directed,
            properties,
        ))),
        other => Err(GraphError::serialisation(format!(
            "expected 1 or 2 identifier blocks, found {}",
            other.len()
        ))),
    }
}

/// Bytes identifying the aggregation slot of an element: group, identifiers, direction and the
/// values of the group-by properties.
pub fn element_key(schema: &Schema, element: &Element) -> Result<Vec<u8>, GraphError> {
    let encoded = encode_element(schema, element)?;
    let definition = definition(schema, &encoded.group)?;
    let mut key = Vec::new();
    write_block(Some(encoded.group.as_bytes()), &mut key);
    for identifier in &encoded.identifiers {
        write_block(Some(identifier), &mut key);
    }
    key.push(u8::from(encoded.directed));
    for name in definition.group_by() {
        match element.property(name) {
            Some(value) => {
                let type_name = definition.property_type(name).unwrap_or_default();
                let bytes = type_serialise(schema, type_name, value)?;
                write_block(Some(&bytes), &mut key);
            }
            None => write_block(None, &mut key),
        }
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        schema::{AggregateFunction, TypeDefinition},
        value::ValueKind,
    };

    fn schema() -> Schema {
        Schema::new(
            [
                ("vertex", TypeDefinition::of(ValueKind::String)),
                ("count", TypeDefinition::aggregated(ValueKind::Integer, AggregateFunction::Sum)),
                ("label", TypeDefinition::of(ValueKind::String)),
            ],
            [(
                "link",
                ElementDefinition::edge(
                    "vertex",
                    "vertex",
                    None,
                    &[("count", "count"), ("label", "label")],
                    &["label"],
                ),
            )],
        )
        .expect("schema")
    }

    #[test]
    fn properties_follow_declared_order() {
        let schema = schema();
        let properties = Properties::from([
            ("label".to_string(), PropertyValue::from("x")),
            ("count".to_string(), PropertyValue::Integer(2)),
        ]);
        let bytes = encode_properties(&schema, "link", &properties).expect("encode");
        assert_eq!(bytes, vec![0x02, 0x02, 0x02, b'x']);
    }

    #[test]
    fn absent_and_empty_values_differ() {
        let schema = schema();
        let empty = Properties::from([("label".to_string(), PropertyValue::from(""))]);
        let bytes = encode_properties(&schema, "link", &empty).expect("encode");
        assert_eq!(bytes, vec![0x00, 0x01]);
        let decoded = decode_properties(&schema, "link", &bytes).expect("decode");
        assert_eq!(decoded, empty);
    }

    #[test]
    fn element_decodes_to_itself() {
        let schema = schema();
        let edge = Element::Edge(Edge::new(
            "link",
            "b",
            "a",
            false,
            Properties::from([("count".to_string(), PropertyValue::Integer(7))]),
        ));
        let encoded = encode_element(&schema, &edge).expect("encode");
        assert_eq!(decode_element(&schema, &encoded).expect("decode"), edge);
    }

    #[test]
    fn truncated_block_is_malformed() {
        let schema = schema();
        let err = decode_properties(&schema, "link", &[0x05, 0x01]).expect_err("truncated");
        assert!(matches!(err, GraphError::SerialisationError(_)));
    }

    #[test]
    fn key_ignores_aggregated_properties() {
        let schema = schema();
        let make = |count: i32| {
            Element::Edge(Edge::new(
                "link",
                "a",
                "b",
                true,
                Properties::from([
                    ("count".to_string(), PropertyValue::Integer(count)),
                    ("label".to_string(), PropertyValue::from("x")),
                ]),
            ))
        };
        assert_eq!(
            element_key(&schema, &make(1)).expect("key"),
            element_key(&schema, &make(9)).expect("key")
        );
    }
}

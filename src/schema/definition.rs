use std::fmt;
use std::sync::Arc;

use crate::{
    predicate::Predicate,
    schema::aggregate::AggregateFunction,
    serialisation::{self, Serialiser},
    value::ValueKind,
};

/// How values of one named type are encoded, aggregated and validated.
#[derive(Clone)]
pub struct TypeDefinition {
    value_kind: ValueKind,
    serialiser: Arc<dyn Serialiser>,
    aggregate: Option<AggregateFunction>,
    validator: Option<Predicate>,
}

impl TypeDefinition {
    pub fn new(
        value_kind: ValueKind,
        serialiser: Arc<dyn Serialiser>,
        aggregate: Option<AggregateFunction>,
        validator: Option<Predicate>,
    ) -> Self {
        Self {
            value_kind,
            serialiser,
            aggregate,
            validator,
        }
    }

    /// Type with the default serialiser for `value_kind` and no aggregation or validation.
    pub fn of(value_kind: ValueKind) -> Self {
        Self::new(value_kind, serialisation::default_for(value_kind), None, None)
    }

    /// Type with the default serialiser and the given aggregate function.
    pub fn aggregated(value_kind: ValueKind, aggregate: AggregateFunction) -> Self {
        Self::new(
            value_kind,
            serialisation::default_for(value_kind),
            Some(aggregate),
            None,
        )
    }

    pub fn value_kind(&self) -> ValueKind {
        self.value_kind
    }

    pub fn serialiser(&self) -> &Arc<dyn Serialiser> {
        &self.serialiser
    }

    pub fn aggregate(&self) -> Option<AggregateFunction> {
        self.aggregate
    }

    pub fn validator(&self) -> Option<&Predicate> {
        self.validator.as_ref()
    }

    /// Same value kind, codec and aggregation. Validators may differ.
    pub fn is_compatible_with(&self, other: &TypeDefinition) -> bool {
        self.value_kind == other.value_kind
            && self.serialiser.name() == other.serialiser.name()
            && self.aggregate == other.aggregate
    }

    pub(crate) fn with_validator(mut self, validator: Option<Predicate>) -> Self {
        self.validator = validator;
        self
    }
}

impl fmt::Debug for TypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDefinition")
            .field("value_kind", &self.value_kind)
            .field("serialiser", &self.serialiser.name())
            .field("aggregate", &self.aggregate)
            .field("validator", &self.validator)
            .finish()
    }
}

impl PartialEq for TypeDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.is_compatible_with(other) && self.validator == other.validator
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Entity,
    Edge,
}

/// Definition of one element group.
///
/// `identifiers` holds one type name for entities (the vertex) and two for edges (source then
/// destination). Properties keep their declared order, which fixes the encoded layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElementDefinition {
    kind: ElementKind,
    identifiers: Vec<String>,
    properties: Vec<(String, String)>,
    group_by: Vec<String>,
    directed: Option<bool>,
    aggregate: bool,
}

fn owned_pairs(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(name, type_name)| (name.to_string(), type_name.to_string()))
        .collect()
}

fn owned_names(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

impl ElementDefinition {
    pub fn entity(vertex_type: &str, properties: &[(&str, &str)], group_by: &[&str]) -> Self {
        Self {
            kind: ElementKind::Entity,
            identifiers: vec![vertex_type.to_string()],
            properties: owned_pairs(properties),
            group_by: owned_names(group_by),
            directed: None,
            aggregate: true,
        }
    }

    /// Edge group. `directed` of `None` accepts both directed and undirected edges.
    pub fn edge(
        source_type: &str,
        destination_type: &str,
        directed: Option<bool>,
        properties: &[(&str, &str)],
        group_by: &[&str],
    ) -> Self {
        Self {
            kind: ElementKind::Edge,
            identifiers: vec![source_type.to_string(), destination_type.to_string()],
            properties: owned_pairs(properties),
            group_by: owned_names(group_by),
            directed,
            aggregate: true,
        }
    }

    pub(crate) fn from_parts(
        kind: ElementKind,
        identifiers: Vec<String>,
        properties: Vec<(String, String)>,
        group_by: Vec<String>,
        directed: Option<bool>,
        aggregate: bool,
    ) -> Self {
        Self {
            kind,
            identifiers,
            properties,
            group_by,
            directed,
            aggregate,
        }
    }

    /// Switch off backend aggregation for this group.
    pub fn without_aggregation(mut self) -> Self {
        self.aggregate = false;
        self
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    pub fn properties(&self) -> &[(String, String)] {
        &self.properties
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|(name, _)| name.as_str())
    }

    pub fn property_type(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(property, _)| property == name)
            .map(|(_, type_name)| type_name.as_str())
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.property_type(name).is_some()
    }

    pub fn group_by(&self) -> &[String] {
        &self.group_by
    }

    pub fn directed(&self) -> Option<bool> {
        self.directed
    }

    pub fn aggregate(&self) -> bool {
        self.aggregate
    }

    pub(crate) fn type_names(&self) -> impl Iterator<Item = &str> {
        self.identifiers
            .iter()
            .map(String::as_str)
            .chain(self.properties.iter().map(|(_, type_name)| type_name.as_str()))
    }
}

//! Immutable schema: element groups, property types, aggregation and validation rules.

pub mod aggregate;
mod definition;
pub mod document;

use std::collections::BTreeMap;

use crate::{
    element::{Element, Properties},
    errors::GraphError,
    predicate::Predicate,
    serialisation,
    value::PropertyValue,
};

pub use aggregate::AggregateFunction;
pub use definition::{ElementDefinition, ElementKind, TypeDefinition};
pub use document::{EdgeDocument, EntityDocument, SchemaDocument, TypeDocument};

/// Group and type declarations shared read-only by every execution against a store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Schema {
    types: BTreeMap<String, TypeDefinition>,
    groups: BTreeMap<String, ElementDefinition>,
}

impl Schema {
    /// Build and check a schema.
    ///
    /// Fails when a group references an undeclared type, declares a property twice, groups by an
    /// unknown property, or when a type's serialiser or aggregate function cannot handle its kind.
    pub fn new<T, G, S1, S2>(types: T, groups: G) -> Result<Self, GraphError>
    where
        T: IntoIterator<Item = (S1, TypeDefinition)>,
        G: IntoIterator<Item = (S2, ElementDefinition)>,
        S1: Into<String>,
        S2: Into<String>,
    {
        let mut type_map = BTreeMap::new();
        for (name, definition) in types {
            let name = name.into();
            if type_map.insert(name.clone(), definition).is_some() {
                return Err(GraphError::schema(format!("type '{name}' declared twice")));
            }
        }
        let mut group_map = BTreeMap::new();
        for (group, definition) in groups {
            let group = group.into();
            if group_map.insert(group.clone(), definition).is_some() {
                return Err(GraphError::schema(format!("group '{group}' declared twice")));
            }
        }
        let schema = Self {
            types: type_map,
            groups: group_map,
        };
        schema.check()?;
        Ok(schema)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a JSON schema document and resolve it with [`Schema::from_document`].
    pub fn from_json_str(json: &str) -> Result<Self, GraphError> {
        let document: SchemaDocument =
            serde_json::from_str(json).map_err(|e| GraphError::schema(e.to_string()))?;
        Self::from_document(document)
    }

    /// Resolve a schema document's serialiser names and check the result.
    pub fn from_document(document: SchemaDocument) -> Result<Self, GraphError> {
        let mut types = Vec::with_capacity(document.types.len());
        for (name, doc) in document.types {
            let serialiser = match doc.serialiser.as_deref() {
                Some(serialiser_name) => serialisation::lookup(serialiser_name).ok_or_else(|| {
                    GraphError::schema(format!(
                        "type '{name}' names unknown serialiser '{serialiser_name}'"
                    ))
                })?,
                None => serialisation::default_for(doc.value_kind),
            };
            types.push((
                name,
                TypeDefinition::new(doc.value_kind, serialiser, doc.aggregate_function, doc.validator),
            ));
        }
        let mut groups = Vec::new();
        for (group, doc) in document.entities {
            groups.push((
                group,
                ElementDefinition::from_parts(
                    ElementKind::Entity,
                    vec![doc.vertex_type],
                    doc.properties.into_iter().collect(),
                    doc.group_by,
                    None,
                    doc.aggregate,
                ),
            ));
        }
        for (group, doc) in document.edges {
            groups.push((
                group,
                ElementDefinition::from_parts(
                    ElementKind::Edge,
                    vec![doc.source_type, doc.destination_type],
                    doc.properties.into_iter().collect(),
                    doc.group_by,
                    doc.directed,
                    doc.aggregate,
                ),
            ));
        }
        Self::new(types, groups)
    }

    fn check(&self) -> Result<(), GraphError> {
        for (name, definition) in &self.types {
            let kind = definition.value_kind();
            if !definition.serialiser().can_handle(kind) {
                return Err(GraphError::schema(format!(
                    "type '{name}': serialiser {} cannot handle {kind} values",
                    definition.serialiser().name()
                )));
            }
            if let Some(function) = definition.aggregate()
                && !function.supports(kind)
            {
                return Err(GraphError::schema(format!(
                    "type '{name}': {function:?} cannot aggregate {kind} values"
                )));
            }
        }
        for (group, definition) in &self.groups {
            if group.trim().is_empty() {
                return Err(GraphError::schema("group names must be set"));
            }
            for type_name in definition.type_names() {
                if !self.types.contains_key(type_name) {
                    return Err(GraphError::schema(format!(
                        "group '{group}' references undeclared type '{type_name}'"
                    )));
                }
            }
            let mut seen = Vec::with_capacity(definition.properties().len());
            for name in definition.property_names() {
                if seen.contains(&name) {
                    return Err(GraphError::schema(format!(
                        "group '{group}' declares property '{name}' twice"
                    )));
                }
                seen.push(name);
            }
            for name in definition.group_by() {
                if !definition.has_property(name) {
                    return Err(GraphError::schema(format!(
                        "group '{group}' groups by unknown property '{name}'"
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn types(&self) -> &BTreeMap<String, TypeDefinition> {
        &self.types
    }

    pub fn type_definition(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    pub fn element_definition(&self, group: &str) -> Option<&ElementDefinition> {
        self.groups.get(group)
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, &ElementDefinition)> {
        self.groups
            .iter()
            .map(|(group, definition)| (group.as_str(), definition))
    }

    pub fn entity_groups(&self) -> impl Iterator<Item = &str> {
        self.groups_of(ElementKind::Entity)
    }

    pub fn edge_groups(&self) -> impl Iterator<Item = &str> {
        self.groups_of(ElementKind::Edge)
    }

    fn groups_of(&self, kind: ElementKind) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .filter(move |(_, definition)| definition.kind() == kind)
            .map(|(group, _)| group.as_str())
    }

    fn definition_for(&self, element: &Element) -> Result<&ElementDefinition, GraphError> {
        let definition = self.groups.get(element.group()).ok_or_else(|| {
            GraphError::validation(format!("group '{}' is not in the schema", element.group()))
        })?;
        let expected = if element.is_entity() {
            ElementKind::Entity
        } else {
            ElementKind::Edge
        };
        if definition.kind() != expected {
            return Err(GraphError::validation(format!(
                "group '{}' is declared as {:?}, not {expected:?}",
                element.group(),
                definition.kind()
            )));
        }
        Ok(definition)
    }

    fn check_value(
        &self,
        group: &str,
        slot: &str,
        type_name: &str,
        value: Option<&PropertyValue>,
    ) -> Result<(), GraphError> {
        let definition = self.types.get(type_name).ok_or_else(|| {
            GraphError::validation(format!("type '{type_name}' is not in the schema"))
        })?;
        if let Some(value) = value
            && value.kind() != definition.value_kind()
        {
            return Err(GraphError::validation(format!(
                "{group}.{slot}: expected {} but got {}",
                definition.value_kind(),
                value.kind()
            )));
        }
        if let Some(validator) = definition.validator()
            && !validator.test(value)
        {
            return Err(GraphError::validation(format!(
                "{group}.{slot}: value rejected by validator of type '{type_name}'"
            )));
        }
        Ok(())
    }

    /// Check group existence, identifier and property kinds, and type validators.
    pub fn validate(&self, element: &Element) -> Result<(), GraphError> {
        let definition = self.definition_for(element)?;
        let group = element.group();
        match element {
            Element::Entity(entity) => {
                self.check_value(group, "vertex", &definition.identifiers()[0], Some(entity.vertex()))?;
            }
            Element::Edge(edge) => {
                self.check_value(group, "source", &definition.identifiers()[0], Some(edge.source()))?;
                self.check_value(
                    group,
                    "destination",
                    &definition.identifiers()[1],
                    Some(edge.destination()),
                )?;
                if let Some(directed) = definition.directed()
                    && directed != edge.is_directed()
                {
                    return Err(GraphError::validation(format!(
                        "group '{group}' requires directed={directed}"
                    )));
                }
            }
        }
        for name in element.properties().keys() {
            if !definition.has_property(name) {
                return Err(GraphError::validation(format!(
                    "group '{group}' has no property '{name}'"
                )));
            }
        }
        for (name, type_name) in definition.properties() {
            self.check_value(group, name, type_name, element.property(name))?;
        }
        Ok(())
    }

    /// Combine two schemas into one view across both.
    ///
    /// Shared type names must agree on value kind, serialiser and aggregate function; their
    /// validators are and-ed. Shared groups must agree on kind, identifiers, grouping and
    /// direction; their properties are unioned when no property changes type.
    pub fn merge(&self, other: &Schema) -> Result<Schema, GraphError> {
        let mut types = self.types.clone();
        for (name, theirs) in &other.types {
            match types.get(name) {
                None => {
                    types.insert(name.clone(), theirs.clone());
                }
                Some(ours) if !ours.is_compatible_with(theirs) => {
                    return Err(GraphError::schema(format!(
                        "type '{name}' has incompatible definitions: {ours:?} vs {theirs:?}"
                    )));
                }
                Some(ours) => {
                    let validator = match (ours.validator(), theirs.validator()) {
                        (Some(a), Some(b)) if a != b => {
                            Some(Predicate::And(vec![a.clone(), b.clone()]))
                        }
                        (Some(a), _) => Some(a.clone()),
                        (None, b) => b.cloned(),
                    };
                    let merged = ours.clone().with_validator(validator);
                    types.insert(name.clone(), merged);
                }
            }
        }

        let mut groups = self.groups.clone();
        for (group, theirs) in &other.groups {
            let Some(ours) = groups.get(group) else {
                groups.insert(group.clone(), theirs.clone());
                continue;
            };
            if ours.kind() != theirs.kind()
                || ours.identifiers() != theirs.identifiers()
                || ours.group_by() != theirs.group_by()
                || ours.directed() != theirs.directed()
                || ours.aggregate() != theirs.aggregate()
            {
                return Err(GraphError::schema(format!(
                    "group '{group}' has incompatible definitions"
                )));
            }
            let mut properties = ours.properties().to_vec();
            for (name, type_name) in theirs.properties() {
                match ours.property_type(name) {
                    Some(existing) if existing != type_name => {
                        return Err(GraphError::schema(format!(
                            "group '{group}' property '{name}' is '{existing}' in one schema and '{type_name}' in the other"
                        )));
                    }
                    Some(_) => {}
                    None => properties.push((name.clone(), type_name.clone())),
                }
            }
            let merged = ElementDefinition::from_parts(
                ours.kind(),
                ours.identifiers().to_vec(),
                properties,
                ours.group_by().to_vec(),
                ours.directed(),
                ours.aggregate(),
            );
            groups.insert(group.clone(), merged);
        }

        let schema = Schema { types, groups };
        schema.check()?;
        Ok(schema)
    }

    /// Whether backends combine elements of `group` that share a key.
    ///
    /// Requires aggregation to be enabled for the group and an aggregate function on the type of
    /// every property outside the group-by set.
    pub fn is_aggregating(&self, group: &str) -> bool {
        let Some(definition) = self.groups.get(group) else {
            return false;
        };
        definition.aggregate()
            && definition
                .properties()
                .iter()
                .filter(|(name, _)| !definition.group_by().contains(name))
                .all(|(_, type_name)| {
                    self.types
                        .get(type_name)
                        .is_some_and(|definition| definition.aggregate().is_some())
                })
    }

    /// Combine two elements sharing group and key into one.
    ///
    /// Group-by properties come from `left`; every other property is folded with its type's
    /// aggregate function, or taken from whichever side has it.
    pub fn aggregate(&self, left: Element, right: &Element) -> Result<Element, GraphError> {
        if left.group() != right.group() {
            return Err(GraphError::operation(format!(
                "cannot aggregate group '{}' with group '{}'",
                left.group(),
                right.group()
            )));
        }
        let definition = self.definition_for(&left)?;
        let mut properties = Properties::new();
        for (name, type_name) in definition.properties() {
            let ours = left.property(name);
            let theirs = right.property(name);
            let value = if definition.group_by().contains(name) {
                ours.cloned()
            } else {
                match (ours, theirs) {
                    (Some(a), Some(b)) => {
                        let function = self
                            .types
                            .get(type_name)
                            .and_then(TypeDefinition::aggregate)
                            .ok_or_else(|| {
                                GraphError::operation(format!(
                                    "type '{type_name}' has no aggregate function"
                                ))
                            })?;
                        Some(function.apply(a, b)?)
                    }
                    (Some(a), None) => Some(a.clone()),
                    (None, b) => b.cloned(),
                }
            };
            if let Some(value) = value {
                properties.insert(name.clone(), value);
            }
        }
        Ok(left.with_properties(properties))
    }
}

//! Per-query group selection, property filtering and projection.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    element::{Element, Properties},
    errors::GraphError,
    predicate::Predicate,
    schema::{ElementKind, Schema},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyFilter {
    pub property: String,
    pub predicate: Predicate,
}

impl PropertyFilter {
    pub fn new(property: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            property: property.into(),
            predicate,
        }
    }
}

/// Filters and projection for one group of a view.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewElementDefinition {
    #[serde(default)]
    pub filters: Vec<PropertyFilter>,
    /// Properties to keep; all when absent.
    #[serde(default)]
    pub properties: Option<Vec<String>>,
    #[serde(default)]
    pub exclude_properties: Vec<String>,
}

impl ViewElementDefinition {
    pub fn filtered(filters: Vec<PropertyFilter>) -> Self {
        Self {
            filters,
            ..Self::default()
        }
    }

    pub fn projected(properties: &[&str]) -> Self {
        Self {
            properties: Some(properties.iter().map(|p| p.to_string()).collect()),
            ..Self::default()
        }
    }

    fn referenced_properties(&self) -> impl Iterator<Item = &str> {
        self.filters
            .iter()
            .map(|filter| filter.property.as_str())
            .chain(self.properties.iter().flatten().map(String::as_str))
            .chain(self.exclude_properties.iter().map(String::as_str))
    }

    fn accepts(&self, element: &Element) -> bool {
        self.filters
            .iter()
            .all(|filter| filter.predicate.test(element.property(&filter.property)))
    }

    fn project(&self, element: Element) -> Element {
        if self.properties.is_none() && self.exclude_properties.is_empty() {
            return element;
        }
        let properties: Properties = element
            .properties()
            .iter()
            .filter(|(name, _)| {
                self.properties
                    .as_ref()
                    .is_none_or(|keep| keep.contains(*name))
                    && !self.exclude_properties.contains(*name)
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        element.with_properties(properties)
    }
}

/// A view; an empty view selects every group with every property.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    #[serde(default)]
    entities: BTreeMap<String, ViewElementDefinition>,
    #[serde(default)]
    edges: BTreeMap<String, ViewElementDefinition>,
}

impl View {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new<E, D, S1, S2>(entities: E, edges: D) -> Self
    where
        E: IntoIterator<Item = (S1, ViewElementDefinition)>,
        D: IntoIterator<Item = (S2, ViewElementDefinition)>,
        S1: Into<String>,
        S2: Into<String>,
    {
        Self {
            entities: entities.into_iter().map(|(g, d)| (g.into(), d)).collect(),
            edges: edges.into_iter().map(|(g, d)| (g.into(), d)).collect(),
        }
    }

    /// View of the given edge groups, unfiltered.
    pub fn edges(groups: &[&str]) -> Self {
        Self {
            entities: BTreeMap::new(),
            edges: groups
                .iter()
                .map(|g| (g.to_string(), ViewElementDefinition::default()))
                .collect(),
        }
    }

    /// View of the given entity groups, unfiltered.
    pub fn entities(groups: &[&str]) -> Self {
        Self {
            entities: groups
                .iter()
                .map(|g| (g.to_string(), ViewElementDefinition::default()))
                .collect(),
            edges: BTreeMap::new(),
        }
    }

    pub fn is_all(&self) -> bool {
        self.entities.is_empty() && self.edges.is_empty()
    }

    pub fn groups(&self) -> impl Iterator<Item = &str> {
        self.entities
            .keys()
            .chain(self.edges.keys())
            .map(String::as_str)
    }

    pub fn definition(&self, element: &Element) -> Option<&ViewElementDefinition> {
        if element.is_entity() {
            self.entities.get(element.group())
        } else {
            self.edges.get(element.group())
        }
    }

    pub fn includes_group(&self, element: &Element) -> bool {
        self.is_all() || self.definition(element).is_some()
    }

    /// Filter and project one element; `None` when the view rejects it.
    pub fn apply(&self, element: Element) -> Option<Element> {
        if self.is_all() {
            return Some(element);
        }
        let definition = self.definition(&element)?;
        if !definition.accepts(&element) {
            return None;
        }
        Some(definition.project(element))
    }

    fn kinds(&self) -> impl Iterator<Item = (ElementKind, &String, &ViewElementDefinition)> {
        self.entities
            .iter()
            .map(|(g, d)| (ElementKind::Entity, g, d))
            .chain(self.edges.iter().map(|(g, d)| (ElementKind::Edge, g, d)))
    }

    /// Check every group and property the view names against `schema`.
    pub fn validate(&self, schema: &Schema) -> Result<(), GraphError> {
        for (kind, group, definition) in self.kinds() {
            let element = schema.element_definition(group).ok_or_else(|| {
                GraphError::validation(format!("view group '{group}' is not in the schema"))
            })?;
            if element.kind() != kind {
                return Err(GraphError::validation(format!(
                    "view lists '{group}' as {kind:?} but the schema declares {:?}",
                    element.kind()
                )));
            }
            if let Some(property) = definition
                .referenced_properties()
                .find(|property| !element.has_property(property))
            {
                return Err(GraphError::validation(format!(
                    "view group '{group}' references unknown property '{property}'"
                )));
            }
        }
        Ok(())
    }

    /// Restrict the view to what `schema` can answer.
    ///
    /// Groups missing from the schema, or referencing properties it does not declare, are dropped.
    /// Returns `None` when a non-empty view has nothing left.
    pub fn bind_to(&self, schema: &Schema) -> Option<View> {
        if self.is_all() {
            return Some(self.clone());
        }
        let mut bound = View::default();
        for (kind, group, definition) in self.kinds() {
            let Some(element) = schema.element_definition(group) else {
                continue;
            };
            if element.kind() != kind
                || definition
                    .referenced_properties()
                    .any(|property| !element.has_property(property))
            {
                continue;
            }
            let target = match kind {
                ElementKind::Entity => &mut bound.entities,
                ElementKind::Edge => &mut bound.edges,
            };
            target.insert(group.clone(), definition.clone());
        }
        if bound.is_all() { None } else { Some(bound) }
    }
}

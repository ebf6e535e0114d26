//! Entity and edge value types.

pub mod codec;
mod id;
pub mod walk;

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::value::PropertyValue;

pub use id::{EdgeId, ElementId, EntityId};
pub use walk::{Walk, extract_walk_edges};

/// Property name to value. Names are unique; iteration order is by name.
pub type Properties = BTreeMap<String, PropertyValue>;

/// Which endpoint of a returned edge matched the query seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchedVertex {
    Source,
    Destination,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    group: String,
    vertex: PropertyValue,
    properties: Properties,
}

impl Entity {
    pub fn new(group: impl Into<String>, vertex: impl Into<PropertyValue>, properties: Properties) -> Self {
        Self {
            group: group.into(),
            vertex: vertex.into(),
            properties,
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn vertex(&self) -> &PropertyValue {
        &self.vertex
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }
}

/// Whether an undirected pair must swap to reach its canonical orientation.
pub(crate) fn reorders(
    directed: bool,
    source: &PropertyValue,
    destination: &PropertyValue,
) -> bool {
    !directed && source.kind() == destination.kind() && source > destination
}

/// A directed or undirected edge between two vertices.
///
/// Undirected edges whose endpoints share a value kind are stored with `source <= destination`, so
/// both orientations of the same undirected edge construct equal values. Endpoints of different
/// kinds keep the orientation they were given, which is the orientation the schema declares.
/// `matched_vertex` does not take part in equality.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Edge {
    group: String,
    source: PropertyValue,
    destination: PropertyValue,
    directed: bool,
    matched_vertex: Option<MatchedVertex>,
    properties: Properties,
}

impl Edge {
    pub fn new(
        group: impl Into<String>,
        source: impl Into<PropertyValue>,
        destination: impl Into<PropertyValue>,
        directed: bool,
        properties: Properties,
    ) -> Self {
        let mut source = source.into();
        let mut destination = destination.into();
        if reorders(directed, &source, &destination) {
            std::mem::swap(&mut source, &mut destination);
        }
        Self {
            group: group.into(),
            source,
            destination,
            directed,
            matched_vertex: None,
            properties,
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn source(&self) -> &PropertyValue {
        &self.source
    }

    pub fn destination(&self) -> &PropertyValue {
        &self.destination
    }

    pub fn is_directed(&self) -> bool {
        self.directed
    }

    pub fn matched_vertex(&self) -> Option<MatchedVertex> {
        self.matched_vertex
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// The same edge, marked with the endpoint that matched a query seed.
    pub fn with_matched_vertex(mut self, matched: Option<MatchedVertex>) -> Self {
        self.matched_vertex = matched;
        self
    }

    /// Vertex on the matched side, or the source when unmarked.
    pub fn matched_vertex_value(&self) -> &PropertyValue {
        match self.matched_vertex {
            Some(MatchedVertex::Destination) => &self.destination,
            _ => &self.source,
        }
    }

    /// Vertex on the side opposite the matched one.
    pub fn adjacent_vertex_value(&self) -> &PropertyValue {
        match self.matched_vertex {
            Some(MatchedVertex::Destination) => &self.source,
            _ => &self.destination,
        }
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.group == other.group
            && self.source == other.source
            && self.destination == other.destination
            && self.directed == other.directed
            && self.properties == other.properties
    }
}

impl Eq for Edge {}

impl Hash for Edge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.group.hash(state);
        self.source.hash(state);
        self.destination.hash(state);
        self.directed.hash(state);
        self.properties.hash(state);
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Element {
    Entity(Entity),
    Edge(Edge),
}

impl Element {
    pub fn group(&self) -> &str {
        match self {
            Element::Entity(entity) => entity.group(),
            Element::Edge(edge) => edge.group(),
        }
    }

    pub fn properties(&self) -> &Properties {
        match self {
            Element::Entity(entity) => entity.properties(),
            Element::Edge(edge) => edge.properties(),
        }
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties().get(name)
    }

    pub fn is_entity(&self) -> bool {
        matches!(self, Element::Entity(_))
    }

    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            Element::Edge(edge) => Some(edge),
            Element::Entity(_) => None,
        }
    }

    /// Identity of this element, usable as a query seed.
    pub fn id(&self) -> ElementId {
        match self {
            Element::Entity(entity) => ElementId::entity(entity.vertex().clone()),
            Element::Edge(edge) => ElementId::edge(
                edge.source().clone(),
                edge.destination().clone(),
                edge.is_directed(),
            ),
        }
    }

    /// The same element with its properties replaced.
    pub fn with_properties(self, properties: Properties) -> Element {
        match self {
            Element::Entity(entity) => Element::Entity(Entity {
                properties,
                ..entity
            }),
            Element::Edge(edge) => Element::Edge(Edge { properties, ..edge }),
        }
    }
}

impl From<Entity> for Element {
    fn from(value: Entity) -> Self {
        Element::Entity(value)
    }
}

impl From<Edge> for Element {
    fn from(value: Edge) -> Self {
        Element::Edge(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undirected_orientation_does_not_matter() {
        let forward = Edge::new("road", "a", "b", false, Properties::new());
        let backward = Edge::new("road", "b", "a", false, Properties::new());
        assert_eq!(forward, backward);
        assert_eq!(backward.source(), &PropertyValue::from("a"));
    }

    #[test]
    fn directed_orientation_matters() {
        let forward = Edge::new("road", "a", "b", true, Properties::new());
        let backward = Edge::new("road", "b", "a", true, Properties::new());
        assert_ne!(forward, backward);
    }

    #[test]
    fn matched_vertex_is_not_identity() {
        let edge = Edge::new("road", "a", "b", true, Properties::new());
        let marked = edge.clone().with_matched_vertex(Some(MatchedVertex::Destination));
        assert_eq!(edge, marked);
        assert_eq!(marked.adjacent_vertex_value(), &PropertyValue::from("a"));
    }
}

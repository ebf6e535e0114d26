use serde::{Deserialize, Serialize};

use crate::value::PropertyValue;

use super::Edge;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    pub vertex: PropertyValue,
}

/// Edge seed; undirected seeds are oriented like undirected edges.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId {
    pub source: PropertyValue,
    pub destination: PropertyValue,
    pub directed: bool,
}

impl EdgeId {
    /// Whether `edge` has this seed's endpoints and direction. Undirected edges match in either
    /// orientation.
    pub fn matches(&self, edge: &Edge) -> bool {
        if edge.is_directed() != self.directed {
            return false;
        }
        let forward = edge.source() == &self.source && edge.destination() == &self.destination;
        forward
            || (!self.directed
                && edge.source() == &self.destination
                && edge.destination() == &self.source)
    }
}

/// Identity of an element, used as a query seed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementId {
    Entity(EntityId),
    Edge(EdgeId),
}

impl ElementId {
    pub fn entity(vertex: impl Into<PropertyValue>) -> Self {
        ElementId::Entity(EntityId {
            vertex: vertex.into(),
        })
    }

    pub fn edge(
        source: impl Into<PropertyValue>,
        destination: impl Into<PropertyValue>,
        directed: bool,
    ) -> Self {
        let mut source = source.into();
        let mut destination = destination.into();
        if super::reorders(directed, &source, &destination) {
            std::mem::swap(&mut source, &mut destination);
        }
        ElementId::Edge(EdgeId {
            source,
            destination,
            directed,
        })
    }

    /// Vertices named by this seed.
    pub fn vertices(&self) -> Vec<&PropertyValue> {
        match self {
            ElementId::Entity(id) => vec![&id.vertex],
            ElementId::Edge(id) => vec![&id.source, &id.destination],
        }
    }
}

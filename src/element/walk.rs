//! Ordered walks through a graph.

use crate::{
    element::{Edge, Entity},
    errors::GraphError,
    value::PropertyValue,
};

/// A walk: one set of parallel edges per hop, plus entities seen at each vertex.
///
/// Every edge in hop `i` leaves vertex `i` and arrives at vertex `i + 1`. Traversal direction is
/// read through the matched vertex, so an edge walked against its stored orientation still
/// connects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Walk {
    edges: Vec<Vec<Edge>>,
    entities: Vec<Vec<Entity>>,
}

fn hop_endpoints(hop: &[Edge], index: usize) -> Result<(&PropertyValue, &PropertyValue), GraphError> {
    let Some(first) = hop.first() else {
        return Err(GraphError::invalid_input(format!("walk hop {index} has no edges")));
    };
    let from = first.matched_vertex_value();
    let to = first.adjacent_vertex_value();
    for edge in &hop[1..] {
        if edge.matched_vertex_value() != from || edge.adjacent_vertex_value() != to {
            return Err(GraphError::invalid_input(format!(
                "walk hop {index} mixes edges between different vertices"
            )));
        }
    }
    Ok((from, to))
}

impl Walk {
    /// Build a walk from its hops. `entities`, when non-empty, holds one entry per vertex.
    pub fn new(edges: Vec<Vec<Edge>>, entities: Vec<Vec<Entity>>) -> Result<Self, GraphError> {
        let mut previous: Option<&PropertyValue> = None;
        for (index, hop) in edges.iter().enumerate() {
            let (from, to) = hop_endpoints(hop, index)?;
            if let Some(prev) = previous
                && prev != from
            {
                return Err(GraphError::invalid_input(format!(
                    "walk hop {index} starts at {from} but the previous hop ended at {prev}"
                )));
            }
            previous = Some(to);
        }
        let vertex_count = if edges.is_empty() { 0 } else { edges.len() + 1 };
        if !entities.is_empty() && entities.len() != vertex_count {
            return Err(GraphError::invalid_input(format!(
                "walk has {vertex_count} vertices but {} entity sets",
                entities.len()
            )));
        }
        Ok(Self { edges, entities })
    }

    pub fn from_edges(edges: Vec<Vec<Edge>>) -> Result<Self, GraphError> {
        Self::new(edges, Vec::new())
    }

    pub fn edges(&self) -> &[Vec<Edge>] {
        &self.edges
    }

    pub fn entities(&self) -> &[Vec<Entity>] {
        &self.entities
    }

    /// Number of hops.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Vertices visited, in order.
    pub fn vertices(&self) -> Vec<&PropertyValue> {
        let mut vertices = Vec::with_capacity(self.edges.len() + 1);
        for (index, hop) in self.edges.iter().enumerate() {
            if let Some(edge) = hop.first() {
                if index == 0 {
                    vertices.push(edge.matched_vertex_value());
                }
                vertices.push(edge.adjacent_vertex_value());
            }
        }
        vertices
    }
}

/// Edge sets of a walk, in walk order.
pub fn extract_walk_edges(walk: Option<&Walk>) -> Result<Vec<Vec<Edge>>, GraphError> {
    match walk {
        Some(walk) => Ok(walk.edges.clone()),
        None => Err(GraphError::invalid_input("walk cannot be absent")),
    }
}

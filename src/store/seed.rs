//! Seed matching shared by every backend.
//!
//! Backends only find candidate elements touching a seed vertex. Whether a candidate matches, and
//! which endpoint of an edge matched, is decided here so that every store marks the same logical
//! data the same way regardless of how it oriented the edge on disk.

use crate::{
    element::{Edge, Element, ElementId, MatchedVertex},
    operation::{IncludeIncomingOutgoing, SeedMatching, SeedQuery},
    value::PropertyValue,
};

fn edge_at_vertex(
    edge: Edge,
    vertex: &PropertyValue,
    direction: IncludeIncomingOutgoing,
) -> Option<Edge> {
    let directed = edge.is_directed();
    let outgoing = !directed
        || matches!(
            direction,
            IncludeIncomingOutgoing::Either | IncludeIncomingOutgoing::Outgoing
        );
    let incoming = !directed
        || matches!(
            direction,
            IncludeIncomingOutgoing::Either | IncludeIncomingOutgoing::Incoming
        );
    if outgoing && edge.source() == vertex {
        return Some(edge.with_matched_vertex(Some(MatchedVertex::Source)));
    }
    if incoming && edge.destination() == vertex {
        return Some(edge.with_matched_vertex(Some(MatchedVertex::Destination)));
    }
    None
}

/// Decide whether `element` answers `seed` under `query`, marking matched edges.
///
/// Entity seeds match the entity at their vertex and, in related mode, every edge with an endpoint
/// there that the direction allows; the source side is tried first. Edge seeds match the edge with
/// the same endpoints and direction, marked as matched at its source, and in related mode also the
/// entities at both endpoints.
pub fn seed_matching(seed: &ElementId, element: Element, query: &SeedQuery) -> Option<Element> {
    let related = query.seed_matching == SeedMatching::Related;
    match element {
        Element::Entity(entity) => {
            let matches = match seed {
                ElementId::Entity(id) => entity.vertex() == &id.vertex,
                ElementId::Edge(id) => {
                    related && (entity.vertex() == &id.source || entity.vertex() == &id.destination)
                }
            };
            matches.then_some(Element::Entity(entity))
        }
        Element::Edge(edge) => {
            if !query.directed_type.accepts(edge.is_directed()) {
                return None;
            }
            match seed {
                ElementId::Entity(id) if related => {
                    edge_at_vertex(edge, &id.vertex, query.direction).map(Element::Edge)
                }
                ElementId::Entity(_) => None,
                ElementId::Edge(id) => id
                    .matches(&edge)
                    .then(|| Element::Edge(edge.with_matched_vertex(Some(MatchedVertex::Source)))),
            }
        }
    }
}

/// Mark an edge from an unseeded retrieval as matched at its source.
pub fn mark_unseeded(element: Element) -> Element {
    match element {
        Element::Edge(edge) if edge.matched_vertex().is_none() => {
            Element::Edge(edge.with_matched_vertex(Some(MatchedVertex::Source)))
        }
        other => other,
    }
}

/// Re-derive the marker of an edge returned for one of `seeds`.
///
/// A marker that points at a seed vertex is kept; otherwise the first seed that matches decides.
/// Elements no seed matches pass through unchanged.
pub fn normalise_matched_vertex(
    seeds: &[ElementId],
    element: Element,
    query: &SeedQuery,
) -> Element {
    let Element::Edge(edge) = element else {
        return element;
    };
    if let Some(marked) = edge.matched_vertex() {
        let vertex = edge.matched_vertex_value();
        let consistent = seeds.iter().any(|seed| match seed {
            ElementId::Entity(id) => &id.vertex == vertex,
            ElementId::Edge(id) => {
                marked == MatchedVertex::Source && id.matches(&edge)
            }
        });
        if consistent {
            return Element::Edge(edge);
        }
    }
    seeds
        .iter()
        .find_map(|seed| seed_matching(seed, Element::Edge(edge.clone()), query))
        .unwrap_or(Element::Edge(edge))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Properties;
    use crate::operation::DirectedType;

    fn directed(source: &str, destination: &str) -> Element {
        Element::Edge(Edge::new("e", source, destination, true, Properties::new()))
    }

    fn marker(element: Option<Element>) -> Option<MatchedVertex> {
        element.and_then(|e| e.as_edge().and_then(Edge::matched_vertex))
    }

    #[test]
    fn direction_controls_directed_edges() {
        let seed = ElementId::entity("b");
        let mut query = SeedQuery::default();
        assert_eq!(
            marker(seed_matching(&seed, directed("a", "b"), &query)),
            Some(MatchedVertex::Destination)
        );
        query.direction = IncludeIncomingOutgoing::Outgoing;
        assert!(seed_matching(&seed, directed("a", "b"), &query).is_none());
        query.direction = IncludeIncomingOutgoing::Incoming;
        assert!(seed_matching(&seed, directed("a", "b"), &query).is_some());
    }

    #[test]
    fn undirected_edges_match_either_endpoint() {
        let edge = Element::Edge(Edge::new("e", "b", "a", false, Properties::new()));
        let query = SeedQuery {
            direction: IncludeIncomingOutgoing::Outgoing,
            ..SeedQuery::default()
        };
        assert_eq!(
            marker(seed_matching(&ElementId::entity("a"), edge.clone(), &query)),
            Some(MatchedVertex::Source)
        );
        assert_eq!(
            marker(seed_matching(&ElementId::entity("b"), edge, &query)),
            Some(MatchedVertex::Destination)
        );
    }

    #[test]
    fn equal_mode_excludes_neighbours() {
        let query = SeedQuery {
            seed_matching: SeedMatching::Equal,
            ..SeedQuery::default()
        };
        assert!(seed_matching(&ElementId::entity("a"), directed("a", "b"), &query).is_none());
        let seed = ElementId::edge("a", "b", true);
        assert_eq!(
            marker(seed_matching(&seed, directed("a", "b"), &query)),
            Some(MatchedVertex::Source)
        );
    }

    #[test]
    fn directed_type_filters_edges() {
        let query = SeedQuery {
            directed_type: DirectedType::Undirected,
            ..SeedQuery::default()
        };
        assert!(seed_matching(&ElementId::entity("a"), directed("a", "b"), &query).is_none());
    }

    #[test]
    fn normalising_fixes_a_wrong_marker() {
        let query = SeedQuery::default();
        let Element::Edge(edge) = directed("a", "b") else {
            unreachable!()
        };
        let wrong = Element::Edge(edge.with_matched_vertex(Some(MatchedVertex::Source)));
        let fixed = normalise_matched_vertex(&[ElementId::entity("b")], wrong, &query);
        assert_eq!(
            fixed.as_edge().and_then(Edge::matched_vertex),
            Some(MatchedVertex::Destination)
        );
    }
}

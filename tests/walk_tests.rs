use fedgraph::{
    Edge, Entity, MatchedVertex, PropertyValue,
    element::{Properties, Walk, extract_walk_edges},
};

fn edge(source: &str, destination: &str) -> Edge {
    Edge::new("road", source, destination, true, Properties::new())
}

fn walked_backwards(source: &str, destination: &str) -> Edge {
    edge(source, destination).with_matched_vertex(Some(MatchedVertex::Destination))
}

fn town(name: &str) -> Entity {
    Entity::new("town", name, Properties::new())
}

#[test]
fn walk_lists_vertices_in_order() {
    let walk = Walk::new(
        vec![vec![edge("a", "b")], vec![edge("b", "c"), edge("b", "c")]],
        vec![vec![town("a")], vec![], vec![town("c")]],
    )
    .expect("walk");
    assert_eq!(walk.len(), 2);
    assert_eq!(
        walk.vertices(),
        vec![
            &PropertyValue::from("a"),
            &PropertyValue::from("b"),
            &PropertyValue::from("c")
        ]
    );
    assert_eq!(walk.entities()[2], vec![town("c")]);
}

#[test]
fn edges_walked_against_their_orientation_still_connect() {
    let walk = Walk::from_edges(vec![vec![edge("a", "b")], vec![walked_backwards("c", "b")]])
        .expect("walk");
    assert_eq!(walk.vertices().last(), Some(&&PropertyValue::from("c")));
}

#[test]
fn disconnected_hops_are_rejected() {
    assert!(Walk::from_edges(vec![vec![edge("a", "b")], vec![edge("c", "d")]]).is_err());
    assert!(Walk::from_edges(vec![vec![edge("a", "b"), edge("a", "c")]]).is_err());
    assert!(Walk::from_edges(vec![vec![]]).is_err());
}

#[test]
fn entity_sets_must_match_vertices() {
    let err = Walk::new(vec![vec![edge("a", "b")]], vec![vec![town("a")]]).expect_err("one set");
    assert!(matches!(err, fedgraph::GraphError::InvalidInput(_)));
}

#[test]
fn extracting_edges_needs_a_walk() {
    let walk = Walk::from_edges(vec![vec![edge("a", "b")]]).expect("walk");
    assert_eq!(
        extract_walk_edges(Some(&walk)).expect("edges"),
        vec![vec![edge("a", "b")]]
    );
    assert!(extract_walk_edges(None).is_err());
    assert!(Walk::from_edges(Vec::new()).expect("empty").is_empty());
}

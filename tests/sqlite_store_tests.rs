use std::collections::BTreeMap;

use fedgraph::{
    Context, Edge, Element, ElementId, Entity, Operation, PropertyValue, Schema, SqliteConfig,
    SqliteStore, Store,
    element::Properties,
    schema::{AggregateFunction, ElementDefinition, TypeDefinition},
    value::ValueKind,
};
use tempfile::tempdir;

fn schema() -> Schema {
    Schema::new(
        [
            ("id", TypeDefinition::of(ValueKind::Long)),
            (
                "count",
                TypeDefinition::aggregated(ValueKind::Long, AggregateFunction::Sum),
            ),
            ("label", TypeDefinition::of(ValueKind::String)),
        ],
        [
            (
                "node",
                ElementDefinition::entity("id", &[("count", "count")], &[]),
            ),
            (
                "tag",
                ElementDefinition::entity("id", &[("label", "label")], &[]).without_aggregation(),
            ),
            (
                "link",
                ElementDefinition::edge("id", "id", Some(false), &[("count", "count")], &[]),
            ),
        ],
    )
    .expect("schema")
}

fn counted(count: i64) -> Properties {
    let mut properties = Properties::new();
    properties.insert("count".to_string(), count.into());
    properties
}

fn node(id: i64, count: i64) -> Element {
    Element::Entity(Entity::new("node", id, counted(count)))
}

fn all(store: &SqliteStore) -> Vec<Element> {
    store
        .execute_operation(Operation::get_all_elements(), &Context::default())
        .expect("get all")
        .into_elements()
        .expect("elements")
        .collect_all()
        .expect("stream")
}

fn add(store: &SqliteStore, elements: Vec<Element>) {
    store
        .execute_operation(Operation::add_elements(elements), &Context::default())
        .expect("add");
}

#[test]
fn pages_through_rows_lazily() {
    let config = SqliteConfig {
        page_size: 2,
        ..SqliteConfig::default()
    };
    let store = SqliteStore::open("paged", schema(), &config).expect("store");
    add(&store, (0..7).map(|i| node(i, 1)).collect());
    let calls_before = store.metrics().backend_calls;

    let mut stream = store
        .execute_operation(Operation::get_all_elements(), &Context::default())
        .expect("get all")
        .into_elements()
        .expect("elements");
    assert_eq!(store.metrics().backend_calls, calls_before);
    stream.next().expect("first").expect("ok");
    assert_eq!(store.metrics().backend_calls, calls_before + 1);
    assert_eq!(store.metrics().cursors_open, 1);
    stream.close();
    assert_eq!(store.metrics().cursors_open, 0);

    assert_eq!(all(&store), (0..7).map(|i| node(i, 1)).collect::<Vec<_>>());
}

#[test]
fn aggregating_groups_fold_on_insert() {
    let store = SqliteStore::in_memory("agg", schema()).expect("store");
    add(&store, vec![node(1, 2), node(1, 3)]);
    add(&store, vec![node(1, 5)]);
    assert_eq!(store.row_count().expect("rows"), 1);
    assert_eq!(all(&store), vec![node(1, 10)]);

    let mut label = Properties::new();
    label.insert("label".to_string(), "x".into());
    let tag = Element::Entity(Entity::new("tag", 1i64, label));
    add(&store, vec![tag.clone(), tag.clone()]);
    assert_eq!(store.row_count().expect("rows"), 3);
}

#[test]
fn skip_invalid_drops_bad_elements() {
    let store = SqliteStore::in_memory("skip", schema()).expect("store");
    let bad = Element::Entity(Entity::new("node", "not-a-long", counted(1)));
    let err = store
        .execute_operation(
            Operation::add_elements(vec![node(1, 1), bad.clone()]),
            &Context::default(),
        )
        .expect_err("invalid");
    assert!(matches!(err, fedgraph::GraphError::ValidationError(_)));
    assert_eq!(store.row_count().expect("rows"), 0);

    store
        .execute_operation(
            Operation::add_elements(vec![node(1, 1), bad]).with_skip_invalid(true),
            &Context::default(),
        )
        .expect("skip invalid");
    assert_eq!(all(&store), vec![node(1, 1)]);
}

#[test]
fn data_survives_reopening() {
    let dir = tempdir().expect("tempdir");
    let config = SqliteConfig {
        path: Some(dir.path().join("graph.db")),
        pragma_settings: BTreeMap::from([("foreign_keys".to_string(), "ON".to_string())]),
        ..SqliteConfig::default()
    };
    {
        let store = SqliteStore::open("disk", schema(), &config).expect("store");
        add(&store, vec![node(1, 1), node(2, 1)]);
    }
    let reopened = SqliteStore::open("disk", schema(), &config).expect("reopen");
    assert_eq!(all(&reopened), vec![node(1, 1), node(2, 1)]);
    add(&reopened, vec![node(1, 4)]);
    assert_eq!(all(&reopened), vec![node(1, 5), node(2, 1)]);
}

#[test]
fn undirected_edges_are_stored_in_byte_order() {
    let store = SqliteStore::in_memory("orientation", schema()).expect("store");
    let edges = vec![
        Element::Edge(Edge::new("link", -1i64, 300i64, false, counted(1))),
        Element::Edge(Edge::new("link", 500i64, 2i64, false, counted(1))),
        Element::Edge(Edge::new("link", i64::MIN, i64::MAX, false, counted(1))),
    ];
    add(&store, edges.clone());
    for (vertex_a, vertex_b) in store.stored_orientations().expect("rows") {
        let vertex_b = vertex_b.expect("edge rows carry two identifiers");
        assert!(vertex_a <= vertex_b);
    }
    assert_eq!(all(&store), edges);

    let seeded = store
        .execute_operation(
            Operation::get_elements(vec![ElementId::entity(-1i64)]),
            &Context::default(),
        )
        .expect("seeded")
        .into_elements()
        .expect("elements")
        .collect_all()
        .expect("stream");
    assert_eq!(seeded, vec![edges[0].clone()]);
    let edge = seeded[0].as_edge().expect("edge");
    assert_eq!(edge.matched_vertex_value(), &PropertyValue::Long(-1));
}

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use fedgraph::{
    Context, Edge, Element, ElementId, ElementMerge, Entity, FederatedConfig, FederatedStore,
    Graph, GraphAccess, GraphError, MapStore, MergePolicy, Operation, OperationChain,
    OperationKind, OperationOutput, PropertyValue, Schema, Store, StoreMetricsSnapshot, User, View,
    element::Properties,
    schema::{AggregateFunction, ElementDefinition, TypeDefinition},
    stream::ResultStream,
    value::ValueKind,
};

fn schema() -> Schema {
    Schema::new(
        [
            ("vertex", TypeDefinition::of(ValueKind::String)),
            (
                "count",
                TypeDefinition::aggregated(ValueKind::Long, AggregateFunction::Sum),
            ),
        ],
        [
            (
                "person",
                ElementDefinition::entity("vertex", &[("count", "count")], &[]),
            ),
            (
                "knows",
                ElementDefinition::edge("vertex", "vertex", Some(true), &[("count", "count")], &[]),
            ),
        ],
    )
    .expect("schema")
}

fn software_schema() -> Schema {
    Schema::new(
        [("vertex", TypeDefinition::of(ValueKind::String))],
        [("software", ElementDefinition::entity("vertex", &[], &[]))],
    )
    .expect("schema")
}

fn counted(count: i64) -> Properties {
    let mut properties = Properties::new();
    properties.insert("count".to_string(), count.into());
    properties
}

fn person(vertex: &str, count: i64) -> Element {
    Element::Entity(Entity::new("person", vertex, counted(count)))
}

fn knows(source: &str, destination: &str, count: i64) -> Element {
    Element::Edge(Edge::new("knows", source, destination, true, counted(count)))
}

fn map_graph(graph_id: &str, schema: Schema, elements: Vec<Element>) -> Arc<Graph> {
    let graph = Graph::new(Arc::new(MapStore::new(graph_id, schema, &Default::default())));
    if !elements.is_empty() {
        graph
            .execute_operation(Operation::add_elements(elements), &Context::default())
            .expect("seed delegate");
    }
    Arc::new(graph)
}

#[derive(Debug, Clone, Copy)]
enum Failure {
    OnExecute,
    WhileStreaming,
}

/// A delegate whose backend breaks.
#[derive(Debug)]
struct BrokenStore {
    graph_id: String,
    schema: Arc<Schema>,
    failure: Failure,
}

impl Store for BrokenStore {
    fn initialise(
        _graph_id: &str,
        _schema: Schema,
        _properties: &fedgraph::StoreProperties,
    ) -> Result<Self, GraphError> {
        Err(GraphError::store("not constructible from properties"))
    }

    fn graph_id(&self) -> &str {
        &self.graph_id
    }

    fn schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    fn execute(
        &self,
        _chain: &OperationChain,
        _context: &Context,
    ) -> Result<OperationOutput, GraphError> {
        match self.failure {
            Failure::OnExecute => Err(GraphError::store("backend unavailable")),
            Failure::WhileStreaming => Ok(OperationOutput::Elements(ResultStream::from_results(
                vec![
                    Ok(person("ghost", 1)),
                    Err(GraphError::store("connection reset")),
                ]
                .into_iter(),
            ))),
        }
    }

    fn supports(&self, _kind: OperationKind) -> bool {
        true
    }

    fn metrics(&self) -> StoreMetricsSnapshot {
        StoreMetricsSnapshot::default()
    }
}

fn broken_graph(graph_id: &str, failure: Failure) -> Arc<Graph> {
    Arc::new(Graph::new(Arc::new(BrokenStore {
        graph_id: graph_id.to_string(),
        schema: Arc::new(schema()),
        failure,
    })))
}

fn federation(config: FederatedConfig) -> Graph {
    Graph::new(Arc::new(FederatedStore::new("federation", &config).expect("federated store")))
}

fn add(federation: &Graph, graph: Arc<Graph>, access: GraphAccess) {
    federation
        .execute_operation(Operation::add_graph(graph, access), &Context::default())
        .expect("add graph");
}

fn elements(output: OperationOutput) -> Vec<Element> {
    output
        .into_elements()
        .expect("elements")
        .collect_all()
        .expect("stream")
}

fn three_delegates(middle: Arc<Graph>) -> Graph {
    let federation = federation(FederatedConfig::default());
    add(
        &federation,
        map_graph("a", schema(), vec![person("alice", 1)]),
        GraphAccess::public(),
    );
    add(&federation, middle, GraphAccess::public());
    add(
        &federation,
        map_graph("c", schema(), vec![person("alice", 2), person("carol", 1)]),
        GraphAccess::public(),
    );
    federation
}

#[test]
fn concatenates_delegates_in_registration_order() {
    let federation = three_delegates(map_graph("b", schema(), vec![person("bob", 1)]));
    let found = elements(
        federation
            .execute_operation(Operation::get_all_elements(), &Context::default())
            .expect("get all"),
    );
    assert_eq!(
        found,
        vec![
            person("alice", 1),
            person("bob", 1),
            person("alice", 2),
            person("carol", 1)
        ]
    );
}

#[test]
fn skip_policy_drops_failing_delegate_and_reports_it() {
    let federation = three_delegates(broken_graph("b", Failure::OnExecute));
    let found = elements(
        federation
            .execute_operation(
                Operation::get_elements(vec![ElementId::entity("alice")]),
                &Context::default(),
            )
            .expect("skip keeps going"),
    );
    assert_eq!(found, vec![person("alice", 1), person("alice", 2)]);
}

#[test]
fn fan_out_reports_skipped_delegates() {
    let store = FederatedStore::new("federation", &FederatedConfig::default()).expect("store");
    store
        .add_graph(map_graph("a", schema(), vec![person("alice", 1)]), GraphAccess::public())
        .expect("a");
    store
        .add_graph(broken_graph("b", Failure::OnExecute), GraphAccess::public())
        .expect("b");
    store
        .add_graph(broken_graph("c", Failure::WhileStreaming), GraphAccess::public())
        .expect("c");

    let result = store
        .fan_out(&Operation::get_all_elements(), None, &Context::default())
        .expect("fan out");
    assert_eq!(result.failures.graph_ids(), vec!["b"]);
    let found = result.stream.collect_all().expect("skip hides lazy failures");
    assert_eq!(found, vec![person("alice", 1), person("ghost", 1)]);
    assert_eq!(result.failures.graph_ids(), vec!["b", "c"]);
}

#[test]
fn fail_fast_names_the_failing_delegate() {
    let federation = three_delegates(broken_graph("b", Failure::OnExecute));
    let err = federation
        .execute_operation(
            Operation::get_all_elements().with_merge_policy(MergePolicy::FailFast),
            &Context::default(),
        )
        .expect_err("fail fast");
    assert_eq!(err.graph_id(), Some("b"));
    assert!(err.is_operation());
}

#[test]
fn fail_fast_surfaces_lazy_failures_and_stops() {
    let federation = three_delegates(broken_graph("b", Failure::WhileStreaming));
    let mut stream = federation
        .execute_operation(
            Operation::get_all_elements().with_merge_policy(MergePolicy::FailFast),
            &Context::default(),
        )
        .expect("delegates opened")
        .into_elements()
        .expect("elements");
    assert_eq!(stream.next().expect("a").expect("ok"), person("alice", 1));
    assert_eq!(stream.next().expect("b").expect("ok"), person("ghost", 1));
    let err = stream.next().expect("failure").expect_err("b fails");
    assert_eq!(err.graph_id(), Some("b"));
    assert!(stream.next().is_none());
}

#[test]
fn configured_policy_applies_when_operation_has_none() {
    let federation = federation(FederatedConfig {
        max_workers: 2,
        merge_policy: MergePolicy::FailFast,
    });
    add(&federation, broken_graph("b", Failure::OnExecute), GraphAccess::public());
    assert!(
        federation
            .execute_operation(Operation::get_all_elements(), &Context::default())
            .is_err()
    );
    let skipped = federation
        .execute_operation(
            Operation::get_all_elements().with_merge_policy(MergePolicy::Skip),
            &Context::default(),
        )
        .expect("operation overrides config");
    assert!(elements(skipped).is_empty());
}

#[test]
fn partial_consumption_closes_every_delegate_cursor() {
    let a = map_graph("a", schema(), (0..50).map(|i| person(&format!("a{i}"), 1)).collect());
    let b = map_graph("b", schema(), (0..50).map(|i| person(&format!("b{i}"), 1)).collect());
    let c = map_graph("c", schema(), vec![person("carol", 1)]);
    let federation = federation(FederatedConfig::default());
    for delegate in [&a, &b, &c] {
        add(&federation, Arc::clone(delegate), GraphAccess::public());
    }

    let mut stream = federation
        .execute_operation(Operation::get_all_elements(), &Context::default())
        .expect("get all")
        .into_elements()
        .expect("elements");
    for _ in 0..3 {
        stream.next().expect("element").expect("ok");
    }
    assert!(a.store().metrics().cursors_open > 0);
    stream.close();
    assert!(stream.is_closed());
    for delegate in [&a, &b, &c] {
        assert_eq!(delegate.store().metrics().cursors_open, 0);
    }
    assert_eq!(federation.store().metrics().cursors_open, 0);
}

#[test]
fn limit_closes_delegates_it_never_reaches() {
    let a = map_graph("a", schema(), vec![person("alice", 1), person("amy", 1)]);
    let b = map_graph("b", schema(), vec![person("bob", 1)]);
    let federation = federation(FederatedConfig::default());
    add(&federation, Arc::clone(&a), GraphAccess::public());
    add(&federation, Arc::clone(&b), GraphAccess::public());

    let chain = OperationChain::new(vec![Operation::get_all_elements(), Operation::limit(1)])
        .expect("chain");
    let found = elements(federation.execute(&chain, &Context::default()).expect("limit"));
    assert_eq!(found.len(), 1);
    assert_eq!(a.store().metrics().cursors_open, 0);
    assert_eq!(b.store().metrics().cursors_open, 0);
}

#[test]
fn access_controls_which_delegates_answer() {
    let federation = federation(FederatedConfig::default());
    let alice = Context::new(User::new("alice", ["team"]));
    let bob = Context::new(User::named("bob"));
    federation
        .execute_operation(
            Operation::add_graph(
                map_graph("private", schema(), vec![person("secret", 1)]),
                GraphAccess::default(),
            ),
            &alice,
        )
        .expect("owned by the adding user");
    add(
        &federation,
        map_graph("team", schema(), vec![person("shared", 1)]),
        GraphAccess::with_auths(None, ["team"]),
    );

    let ids = |context: &Context| {
        federation
            .execute_operation(Operation::get_all_graph_ids(), context)
            .expect("ids")
            .into_graph_ids()
            .expect("graph ids")
    };
    assert_eq!(ids(&alice), vec!["private", "team"]);
    assert!(ids(&bob).is_empty());

    let seen_by_bob = elements(
        federation
            .execute_operation(Operation::get_all_elements(), &bob)
            .expect("no visible delegates"),
    );
    assert!(seen_by_bob.is_empty());

    let err = federation
        .execute_operation(Operation::remove_graph("private"), &bob)
        .expect_err("hidden");
    assert!(matches!(err, GraphError::NotFound(_)));
    federation
        .execute_operation(Operation::remove_graph("private"), &alice)
        .expect("owner removes");
    assert_eq!(ids(&alice), vec!["team"]);
}

#[test]
fn explicit_graph_ids_narrow_the_targets() {
    let federation = three_delegates(map_graph("b", schema(), vec![person("bob", 1)]));
    let found = elements(
        federation
            .execute_operation(
                Operation::get_all_elements().with_graph_ids(["c", "missing"]),
                &Context::default(),
            )
            .expect("subset"),
    );
    assert_eq!(found, vec![person("alice", 2), person("carol", 1)]);

    let none = elements(
        federation
            .execute_operation(
                Operation::get_all_elements().with_graph_ids(["missing"]),
                &Context::default(),
            )
            .expect("empty intersection"),
    );
    assert!(none.is_empty());
}

#[test]
fn views_bind_to_each_delegate_schema() {
    let federation = federation(FederatedConfig::default());
    let people = map_graph("people", schema(), vec![person("alice", 1)]);
    let software = map_graph(
        "software",
        software_schema(),
        vec![Element::Entity(Entity::new("software", "fedgraph", Properties::new()))],
    );
    add(&federation, Arc::clone(&people), GraphAccess::public());
    add(&federation, Arc::clone(&software), GraphAccess::public());

    let found = elements(
        federation
            .execute_operation(
                Operation::get_all_elements().with_view(View::entities(&["software"])),
                &Context::default(),
            )
            .expect("bound view"),
    );
    assert_eq!(
        found,
        vec![Element::Entity(Entity::new("software", "fedgraph", Properties::new()))]
    );
    assert_eq!(people.store().metrics().chains_executed, 1);
    assert_eq!(software.store().metrics().chains_executed, 2);
}

#[test]
fn aggregate_merge_folds_duplicates_across_delegates() {
    let federation = three_delegates(map_graph("b", schema(), vec![person("bob", 1)]));
    let default_merge = elements(
        federation
            .execute_operation(
                Operation::get_elements(vec![ElementId::entity("alice")]),
                &Context::default(),
            )
            .expect("concatenate"),
    );
    assert_eq!(default_merge.len(), 2);

    let merged = elements(
        federation
            .execute_operation(
                Operation::get_elements(vec![ElementId::entity("alice")])
                    .with_element_merge(ElementMerge::Aggregate),
                &Context::default(),
            )
            .expect("aggregate"),
    );
    assert_eq!(merged, vec![person("alice", 3)]);
}

#[test]
fn seeded_edges_are_marked_at_the_seed() {
    let federation = federation(FederatedConfig::default());
    add(
        &federation,
        map_graph("a", schema(), vec![knows("alice", "bob", 1)]),
        GraphAccess::public(),
    );
    add(
        &federation,
        map_graph("b", schema(), vec![knows("carol", "bob", 1)]),
        GraphAccess::public(),
    );
    let found = elements(
        federation
            .execute_operation(
                Operation::get_elements(vec![ElementId::entity("bob")]),
                &Context::default(),
            )
            .expect("seeded"),
    );
    assert_eq!(found.len(), 2);
    for element in &found {
        let edge = element.as_edge().expect("edge");
        assert_eq!(edge.matched_vertex_value(), &PropertyValue::from("bob"));
    }

    let adjacent = federation
        .execute_operation(
            Operation::get_adjacent_ids(vec![ElementId::entity("bob")]),
            &Context::default(),
        )
        .expect("adjacent")
        .into_element_ids()
        .expect("ids")
        .collect_all()
        .expect("stream");
    assert_eq!(
        adjacent,
        vec![ElementId::entity("alice"), ElementId::entity("carol")]
    );
}

#[test]
fn add_elements_routes_by_delegate_schema() {
    let federation = federation(FederatedConfig::default());
    let people = map_graph("people", schema(), vec![]);
    let software = map_graph("software", software_schema(), vec![]);
    add(&federation, Arc::clone(&people), GraphAccess::public());
    add(&federation, Arc::clone(&software), GraphAccess::public());

    federation
        .execute_operation(
            Operation::add_elements(vec![
                person("alice", 1),
                Element::Entity(Entity::new("software", "fedgraph", Properties::new())),
            ]),
            &Context::default(),
        )
        .expect("routed add");
    let count = |graph: &Arc<Graph>| {
        graph
            .execute(
                &OperationChain::new(vec![Operation::get_all_elements(), Operation::count()])
                    .expect("chain"),
                &Context::default(),
            )
            .expect("count")
            .into_count()
            .expect("count output")
    };
    assert_eq!(count(&people), 1);
    assert_eq!(count(&software), 1);
}

#[test]
fn conflicting_schemas_are_rejected() {
    let federation = federation(FederatedConfig::default());
    add(&federation, map_graph("a", schema(), vec![]), GraphAccess::public());
    let clashing = Schema::new(
        [("vertex", TypeDefinition::of(ValueKind::Long))],
        [("person", ElementDefinition::entity("vertex", &[], &[]))],
    )
    .expect("schema");
    let err = federation
        .execute_operation(
            Operation::add_graph(map_graph("b", clashing, vec![]), GraphAccess::public()),
            &Context::default(),
        )
        .expect_err("conflict");
    assert!(matches!(err, GraphError::SchemaError(_)));

    let duplicate = federation
        .execute_operation(
            Operation::add_graph(map_graph("a", schema(), vec![]), GraphAccess::public()),
            &Context::default(),
        )
        .expect_err("duplicate id");
    assert!(matches!(duplicate, GraphError::InvalidInput(_)));
}

#[test]
fn merged_schema_follows_membership() {
    let federation = federation(FederatedConfig::default());
    assert!(!federation.schema().has_group("person"));
    add(&federation, map_graph("a", schema(), vec![]), GraphAccess::public());
    add(&federation, map_graph("s", software_schema(), vec![]), GraphAccess::public());
    let merged = federation
        .execute_operation(Operation::get_schema(), &Context::default())
        .expect("schema")
        .into_schema()
        .expect("schema output");
    assert!(merged.has_group("person"));
    assert!(merged.has_group("software"));

    federation
        .execute_operation(Operation::remove_graph("s"), &Context::default())
        .expect("public graphs are removable by anyone who sees them");
    assert!(!federation.schema().has_group("software"));
    assert!(federation.schema().has_group("person"));
}

/// A delegate that holds each call open briefly and records how many calls overlap.
#[derive(Debug)]
struct SlowStore {
    graph_id: String,
    schema: Arc<Schema>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Store for SlowStore {
    fn initialise(
        _graph_id: &str,
        _schema: Schema,
        _properties: &fedgraph::StoreProperties,
    ) -> Result<Self, GraphError> {
        Err(GraphError::store("not constructible from properties"))
    }

    fn graph_id(&self) -> &str {
        &self.graph_id
    }

    fn schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    fn execute(
        &self,
        _chain: &OperationChain,
        _context: &Context,
    ) -> Result<OperationOutput, GraphError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(40));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(OperationOutput::Elements(ResultStream::from_vec(vec![
            person(&self.graph_id, 1),
        ])))
    }

    fn supports(&self, _kind: OperationKind) -> bool {
        true
    }

    fn metrics(&self) -> StoreMetricsSnapshot {
        StoreMetricsSnapshot::default()
    }
}

#[test]
fn fan_out_overlaps_delegates_up_to_the_worker_limit() {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let federation = federation(FederatedConfig {
        max_workers: 2,
        merge_policy: MergePolicy::FailFast,
    });
    let ids: Vec<String> = (0..6).map(|i| format!("slow{i}")).collect();
    for graph_id in &ids {
        let slow = SlowStore {
            graph_id: graph_id.clone(),
            schema: Arc::new(schema()),
            in_flight: Arc::clone(&in_flight),
            peak: Arc::clone(&peak),
        };
        add(&federation, Arc::new(Graph::new(Arc::new(slow))), GraphAccess::public());
    }

    let found = elements(
        federation
            .execute_operation(Operation::get_all_elements(), &Context::default())
            .expect("get all"),
    );
    assert_eq!(
        found,
        ids.iter().map(|graph_id| person(graph_id, 1)).collect::<Vec<_>>()
    );
    let peak = peak.load(Ordering::SeqCst);
    assert!(peak > 1, "delegates ran one at a time");
    assert!(peak <= 2, "{peak} calls overlapped with two workers");
    assert_eq!(in_flight.load(Ordering::SeqCst), 0);
}

#[test]
fn open_streams_keep_delegates_removed_after_they_started() {
    let federation = federation(FederatedConfig::default());
    add(
        &federation,
        map_graph("a", schema(), vec![person("alice", 1)]),
        GraphAccess::public(),
    );
    add(
        &federation,
        map_graph("b", schema(), vec![person("bob", 1), person("bea", 1)]),
        GraphAccess::public(),
    );

    let mut stream = federation
        .execute_operation(Operation::get_all_elements(), &Context::default())
        .expect("get all")
        .into_elements()
        .expect("elements");
    assert_eq!(stream.next().expect("a").expect("ok"), person("alice", 1));

    federation
        .execute_operation(Operation::remove_graph("b"), &Context::default())
        .expect("remove b");
    add(
        &federation,
        map_graph("c", schema(), vec![person("carol", 1)]),
        GraphAccess::public(),
    );

    let rest = stream.collect_all().expect("stream");
    assert_eq!(rest, vec![person("bob", 1), person("bea", 1)]);

    let now = elements(
        federation
            .execute_operation(Operation::get_all_elements(), &Context::default())
            .expect("get all"),
    );
    assert_eq!(now, vec![person("alice", 1), person("carol", 1)]);
}

#[test]
fn routed_writes_report_skipped_delegates() {
    let store = FederatedStore::new("federation", &FederatedConfig::default()).expect("store");
    let people = map_graph("a", schema(), vec![]);
    store
        .add_graph(Arc::clone(&people), GraphAccess::public())
        .expect("a");
    store
        .add_graph(broken_graph("b", Failure::OnExecute), GraphAccess::public())
        .expect("b");

    let write = Operation::add_elements(vec![person("alice", 1)]);
    let failures = store
        .add_elements(&write, None, &Context::default())
        .expect("skip keeps the healthy write");
    assert_eq!(failures.graph_ids(), vec!["b"]);
    assert_eq!(
        elements(
            people
                .execute_operation(Operation::get_all_elements(), &Context::default())
                .expect("get all")
        ),
        vec![person("alice", 1)]
    );

    let err = store
        .add_elements(
            &write.with_merge_policy(MergePolicy::FailFast),
            None,
            &Context::default(),
        )
        .expect_err("fail fast");
    assert_eq!(err.graph_id(), Some("b"));
}

use std::{sync::Arc, time::Duration};

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use fedgraph::{
    Context, Edge, Element, ElementId, Entity, FederatedConfig, FederatedStore, Graph,
    GraphAccess, MapStore, Operation, OperationChain, Schema,
    element::Properties,
    schema::{AggregateFunction, ElementDefinition, TypeDefinition},
    value::ValueKind,
};
use rand::{Rng, SeedableRng, rngs::StdRng};

const SEED: u64 = 0xFED0;
const SAMPLE_SIZE: usize = 20;
const WARM_UP: Duration = Duration::from_millis(300);
const MEASURE: Duration = Duration::from_millis(500);

fn vertices_per_delegate() -> usize {
    #[cfg(feature = "bench-ci")]
    {
        500
    }
    #[cfg(not(feature = "bench-ci"))]
    {
        5_000
    }
}

fn schema() -> Schema {
    Schema::new(
        [
            ("vertex", TypeDefinition::of(ValueKind::Long)),
            (
                "count",
                TypeDefinition::aggregated(ValueKind::Long, AggregateFunction::Sum),
            ),
        ],
        [
            (
                "node",
                ElementDefinition::entity("vertex", &[("count", "count")], &[]),
            ),
            (
                "link",
                ElementDefinition::edge("vertex", "vertex", Some(true), &[("count", "count")], &[]),
            ),
        ],
    )
    .expect("schema")
}

fn counted() -> Properties {
    let mut properties = Properties::new();
    properties.insert("count".to_string(), 1i64.into());
    properties
}

fn delegate(graph_id: String, seed: u64) -> Arc<Graph> {
    let nodes = vertices_per_delegate() as i64;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut elements: Vec<Element> = (0..nodes)
        .map(|v| Element::Entity(Entity::new("node", v, counted())))
        .collect();
    for _ in 0..nodes * 3 {
        let source = rng.gen_range(0..nodes);
        let destination = rng.gen_range(0..nodes);
        elements.push(Element::Edge(Edge::new("link", source, destination, true, counted())));
    }
    let graph = Graph::new(Arc::new(MapStore::new(graph_id, schema(), &Default::default())));
    graph
        .execute_operation(Operation::add_elements(elements), &Context::default())
        .expect("populate delegate");
    Arc::new(graph)
}

fn federation(delegates: usize) -> Graph {
    let config = FederatedConfig {
        max_workers: delegates,
        ..FederatedConfig::default()
    };
    let store = FederatedStore::new("bench", &config).expect("federation");
    for index in 0..delegates {
        store
            .add_graph(
                delegate(format!("delegate-{index}"), SEED + index as u64),
                GraphAccess::public(),
            )
            .expect("add delegate");
    }
    Graph::new(Arc::new(store))
}

fn bench_seeded_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("federated_get_elements");
    group.sample_size(SAMPLE_SIZE);
    group.warm_up_time(WARM_UP);
    group.measurement_time(MEASURE);
    let mut rng = StdRng::seed_from_u64(SEED);
    for delegates in [1usize, 4, 8] {
        let graph = federation(delegates);
        let seeds: Vec<ElementId> = (0..32)
            .map(|_| ElementId::entity(rng.gen_range(0..vertices_per_delegate() as i64)))
            .collect();
        group.bench_function(BenchmarkId::from_parameter(delegates), |b| {
            b.iter(|| {
                graph
                    .execute_operation(Operation::get_elements(seeds.clone()), &Context::default())
                    .expect("fan out")
                    .into_elements()
                    .expect("elements")
                    .collect_all()
                    .expect("stream")
            });
        });
    }
    group.finish();
}

fn bench_count_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("federated_count_all");
    group.sample_size(SAMPLE_SIZE);
    group.warm_up_time(WARM_UP);
    group.measurement_time(MEASURE);
    for delegates in [1usize, 4, 8] {
        let graph = federation(delegates);
        let chain = OperationChain::new(vec![Operation::get_all_elements(), Operation::count()])
            .expect("chain");
        group.bench_function(BenchmarkId::from_parameter(delegates), |b| {
            b.iter(|| {
                graph
                    .execute(&chain, &Context::default())
                    .expect("count")
                    .into_count()
                    .expect("count output")
            });
        });
    }
    group.finish();
}

criterion_group!(
    name = federation_benches;
    config = Criterion::default();
    targets = bench_seeded_fan_out, bench_count_all
);
criterion_main!(federation_benches);

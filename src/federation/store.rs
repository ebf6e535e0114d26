use std::sync::Arc;

use parking_lot::Mutex;
use rayon::prelude::*;
use tracing::debug;

use crate::{
    config::{FederatedConfig, StoreProperties},
    context::{Context, User},
    element::{Element, ElementId},
    errors::GraphError,
    federation::{
        ElementMerge, FailureLog, GraphAccess, GraphRegistry, MergePolicy,
        handlers::register_federated_handlers,
        merge::{FederatedCursor, aggregate_elements, settle},
        registry::RegistrySnapshot,
    },
    graph::Graph,
    operation::{
        HandlerRegistry, Operation, OperationChain, OperationKind, OperationOutput, Request,
        SeedQuery, handlers,
    },
    schema::Schema,
    store::{
        Store, StoreMetrics, StoreMetricsSnapshot, mark_unseeded, normalise_matched_vertex,
    },
    stream::ResultStream,
};

/// Merged elements of a fan-out, and the delegate failures skipped while producing them.
///
/// Failures met while the stream is being read are added to `failures` as they happen.
#[derive(Debug)]
pub struct FanOutResult {
    pub stream: ResultStream<Element>,
    pub failures: FailureLog,
}

/// One delegate call of a fan-out.
pub(crate) struct DelegateCall {
    pub(crate) graph_id: String,
    pub(crate) graph: Arc<Graph>,
    pub(crate) operation: Operation,
}

/// Delegate calls for one operation, planned against one registry snapshot.
pub(crate) struct Plan {
    pub(crate) snapshot: Arc<RegistrySnapshot>,
    pub(crate) calls: Vec<DelegateCall>,
    /// Seeds of a seeded retrieval, materialised once for every delegate.
    pub(crate) seeds: Option<(Arc<Vec<ElementId>>, Arc<SeedQuery>)>,
}

/// A store presenting named delegate graphs as one graph.
pub struct FederatedStore {
    graph_id: String,
    config: FederatedConfig,
    registry: GraphRegistry,
    pool: rayon::ThreadPool,
    metrics: Arc<StoreMetrics>,
    handlers: HandlerRegistry<FederatedStore>,
}

impl std::fmt::Debug for FederatedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FederatedStore")
            .field("graph_id", &self.graph_id)
            .field("config", &self.config)
            .field("delegates", &self.registry.snapshot().delegates().len())
            .finish()
    }
}

impl FederatedStore {
    pub fn new(graph_id: impl Into<String>, config: &FederatedConfig) -> Result<Self, GraphError> {
        Self::with_schema(graph_id, Schema::empty(), config)
    }

    /// A federation whose merged schema starts from `base_schema`.
    pub fn with_schema(
        graph_id: impl Into<String>,
        base_schema: Schema,
        config: &FederatedConfig,
    ) -> Result<Self, GraphError> {
        let graph_id = graph_id.into();
        let workers = config.max_workers.max(1);
        let pool_name = graph_id.clone();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(move |i| format!("{pool_name}-fanout-{i}"))
            .build()
            .map_err(|e| GraphError::store(e.to_string()))?;

        let mut handlers = HandlerRegistry::new();
        handlers::register_defaults(&mut handlers);
        register_federated_handlers(&mut handlers);
        Ok(Self {
            graph_id,
            config: config.clone(),
            registry: GraphRegistry::new(base_schema),
            pool,
            metrics: Arc::new(StoreMetrics::default()),
            handlers,
        })
    }

    pub fn add_graph(&self, graph: Arc<Graph>, access: GraphAccess) -> Result<(), GraphError> {
        self.registry.add(graph, access)
    }

    pub fn remove_graph(&self, graph_id: &str) -> Result<(), GraphError> {
        self.registry.remove(graph_id)
    }

    /// Ids of the delegates `user` may see, in registration order.
    pub fn graph_ids(&self, user: &User) -> Vec<String> {
        self.registry.graph_ids_visible_to(user)
    }

    pub(crate) fn registry(&self) -> &GraphRegistry {
        &self.registry
    }

    pub fn default_merge_policy(&self) -> MergePolicy {
        self.config.merge_policy
    }

    pub(crate) fn policy_for(&self, operation: &Operation) -> MergePolicy {
        operation
            .options()
            .merge_policy()
            .unwrap_or(self.config.merge_policy)
    }

    /// Resolve targets and bind the view to each delegate's schema.
    pub(crate) fn plan(
        &self,
        operation: &Operation,
        input: Option<OperationOutput>,
        context: &Context,
    ) -> Result<Plan, GraphError> {
        let snapshot = self.registry.snapshot();
        let (request, seeds) = match operation.request() {
            Request::GetElements(query) | Request::GetAdjacentIds(query) => {
                let seeds = match &query.seeds {
                    Some(seeds) => seeds.clone(),
                    None => input
                        .ok_or_else(|| {
                            GraphError::operation(format!(
                                "{} requires an input",
                                operation.kind()
                            ))
                        })?
                        .into_element_ids()?
                        .collect_all()?,
                };
                let mut query = query.clone();
                query.seeds = Some(seeds.clone());
                let request = if operation.kind() == OperationKind::GetElements {
                    Request::GetElements(query.clone())
                } else {
                    Request::GetAdjacentIds(query.clone())
                };
                (request, Some((Arc::new(seeds), Arc::new(query))))
            }
            other => (other.clone(), None),
        };

        let mut calls = Vec::new();
        for delegate in snapshot.targets(operation.options().graph_ids(), context.user()) {
            let graph_id = delegate.graph.graph_id().to_string();
            let mut delegated = operation.for_delegate(request.clone());
            if let Some(view) = operation.view() {
                match view.bind_to(&delegate.graph.schema()) {
                    Some(bound) => delegated = delegated.with_view(bound),
                    None => {
                        debug!(graph_id = %graph_id, "view selects nothing in delegate schema");
                        continue;
                    }
                }
            }
            calls.push(DelegateCall {
                graph_id,
                graph: delegate.graph,
                operation: delegated,
            });
        }
        Ok(Plan {
            snapshot,
            calls,
            seeds,
        })
    }

    /// Execute every call on the worker pool and join the outcomes in call order.
    pub(crate) fn run(
        &self,
        calls: &[DelegateCall],
        context: &Context,
    ) -> Vec<(String, Result<OperationOutput, GraphError>)> {
        let results: Vec<Mutex<Option<Result<OperationOutput, GraphError>>>> =
            calls.iter().map(|_| Mutex::new(None)).collect();
        self.pool.install(|| {
            calls.par_iter().enumerate().for_each(|(slot, call)| {
                let outcome = OperationChain::single(call.operation.clone())
                    .and_then(|chain| call.graph.execute(&chain, context))
                    .map_err(|e| GraphError::delegate(call.graph_id.clone(), e));
                *results[slot].lock() = Some(outcome);
            });
        });
        calls
            .iter()
            .zip(results)
            .map(|(call, cell)| {
                let outcome = cell.into_inner().unwrap_or_else(|| {
                    Err(GraphError::delegate(
                        call.graph_id.clone(),
                        GraphError::operation("delegate produced no outcome"),
                    ))
                });
                (call.graph_id.clone(), outcome)
            })
            .collect()
    }

    /// Run one retrieval on every target delegate and merge the element streams.
    ///
    /// Targets are the visible delegates, narrowed to the operation's graph ids when it names
    /// any; no target yields an empty stream. Returned edges carry the matched-vertex marker
    /// re-derived from the seeds.
    pub fn fan_out(
        &self,
        operation: &Operation,
        input: Option<OperationOutput>,
        context: &Context,
    ) -> Result<FanOutResult, GraphError> {
        if !matches!(
            operation.kind(),
            OperationKind::GetElements | OperationKind::GetAllElements
        ) {
            return Err(GraphError::operation(format!(
                "fan_out retrieves elements, not {}",
                operation.kind()
            )));
        }
        let plan = self.plan(operation, input, context)?;
        let policy = self.policy_for(operation);
        let failures = FailureLog::default();
        let outcomes = self
            .run(&plan.calls, context)
            .into_iter()
            .map(|(graph_id, outcome)| {
                let stream = outcome.and_then(OperationOutput::into_elements);
                (graph_id, stream)
            })
            .collect();
        let settled = settle(outcomes, policy, &failures)?;

        let parts = settled
            .into_iter()
            .map(|(graph_id, stream)| {
                let stream = match &plan.seeds {
                    Some((seeds, query)) => {
                        let seeds = Arc::clone(seeds);
                        let query = Arc::clone(query);
                        stream.map(move |element| normalise_matched_vertex(&seeds, element, &query))
                    }
                    None => stream.map(mark_unseeded),
                };
                (graph_id, stream)
            })
            .collect();
        let guard = self.metrics.open_cursor();
        let merged = FederatedCursor::stream(parts, policy, failures.clone()).on_close(move || {
            drop(guard);
        });

        let stream = match operation.options().element_merge() {
            ElementMerge::Concatenate => merged,
            ElementMerge::Aggregate => {
                let schema = plan.snapshot.schema();
                ResultStream::from_vec(aggregate_elements(&schema, merged.collect_all()?)?)
            }
        };
        Ok(FanOutResult { stream, failures })
    }

    /// Route an AddElements operation to its target delegates.
    ///
    /// Each target receives the elements whose group its schema declares. An element no target
    /// accepts fails the whole operation before any delegate is written. Under skip-on-error the
    /// returned log names the delegates whose writes failed.
    pub fn add_elements(
        &self,
        operation: &Operation,
        input: Option<OperationOutput>,
        context: &Context,
    ) -> Result<FailureLog, GraphError> {
        let Request::AddElements {
            elements,
            skip_invalid,
        } = operation.request()
        else {
            return Err(GraphError::operation(format!(
                "add_elements cannot run {}",
                operation.kind()
            )));
        };
        let elements = match elements {
            Some(elements) => elements.clone(),
            None => input
                .ok_or_else(|| GraphError::operation("AddElements requires elements or an input"))?
                .into_elements()?
                .collect_all()?,
        };

        let snapshot = self.registry().snapshot();
        let targets = snapshot.targets(operation.options().graph_ids(), context.user());
        if let Some(orphan) = elements.iter().find(|element| {
            !targets
                .iter()
                .any(|delegate| delegate.graph.schema().has_group(element.group()))
        }) {
            return Err(GraphError::operation(format!(
                "no target graph accepts group '{}'",
                orphan.group()
            )));
        }

        let calls: Vec<DelegateCall> = targets
            .into_iter()
            .filter_map(|delegate| {
                let schema = delegate.graph.schema();
                let accepted: Vec<_> = elements
                    .iter()
                    .filter(|element| schema.has_group(element.group()))
                    .cloned()
                    .collect();
                if accepted.is_empty() {
                    return None;
                }
                Some(DelegateCall {
                    graph_id: delegate.graph.graph_id().to_string(),
                    operation: operation.for_delegate(Request::AddElements {
                        elements: Some(accepted),
                        skip_invalid: *skip_invalid,
                    }),
                    graph: delegate.graph,
                })
            })
            .collect();

        let failures = FailureLog::default();
        settle(
            self.run(&calls, context),
            self.policy_for(operation),
            &failures,
        )?;
        Ok(failures)
    }
}

impl Store for FederatedStore {
    fn initialise(
        graph_id: &str,
        schema: Schema,
        properties: &StoreProperties,
    ) -> Result<Self, GraphError> {
        Self::with_schema(graph_id, schema, &properties.federated)
    }

    fn graph_id(&self) -> &str {
        &self.graph_id
    }

    fn schema(&self) -> Arc<Schema> {
        self.registry.snapshot().schema()
    }

    fn execute(
        &self,
        chain: &OperationChain,
        context: &Context,
    ) -> Result<OperationOutput, GraphError> {
        self.metrics.record_chain(chain.len());
        self.handlers.execute(chain, context, self, &self.graph_id)
    }

    fn supports(&self, kind: OperationKind) -> bool {
        self.handlers.is_supported(kind)
    }

    fn metrics(&self) -> StoreMetricsSnapshot {
        self.metrics.snapshot()
    }
}

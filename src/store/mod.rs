//! The store contract and the backends implementing it.
//!
//! A [`Store`] binds a schema to a backend and a handler registry. Element backends only provide
//! storage primitives through [`ElementBackend`]; the retrieval and mutation handlers built on
//! them are shared, so every backend answers the same query with structurally identical elements.

mod map;
mod metrics;
mod retrieval;
mod seed;
#[cfg(feature = "sqlite-backend")]
mod sqlite;

use std::fmt;
use std::sync::Arc;

use crate::{
    config::StoreProperties,
    context::Context,
    element::Element,
    errors::GraphError,
    operation::{Operation, OperationChain, OperationKind, OperationOutput},
    schema::Schema,
    stream::ResultStream,
    value::PropertyValue,
};

pub use map::MapStore;
pub use metrics::{CursorGuard, StoreMetrics, StoreMetricsSnapshot};
pub use seed::{mark_unseeded, normalise_matched_vertex, seed_matching};
#[cfg(feature = "sqlite-backend")]
pub use sqlite::SqliteStore;

pub(crate) use retrieval::register_element_handlers;

/// Backend execution engine bound to one schema.
pub trait Store: Send + Sync + fmt::Debug {
    /// Create a store for `graph_id` from its schema and backend properties.
    fn initialise(
        graph_id: &str,
        schema: Schema,
        properties: &StoreProperties,
    ) -> Result<Self, GraphError>
    where
        Self: Sized;

    fn graph_id(&self) -> &str;

    fn schema(&self) -> Arc<Schema>;

    /// Run a type-checked chain. Streaming results are lazy and must be closed or dropped.
    fn execute(
        &self,
        chain: &OperationChain,
        context: &Context,
    ) -> Result<OperationOutput, GraphError>;

    fn supports(&self, kind: OperationKind) -> bool;

    fn metrics(&self) -> StoreMetricsSnapshot;

    fn execute_operation(
        &self,
        operation: Operation,
        context: &Context,
    ) -> Result<OperationOutput, GraphError> {
        self.execute(&OperationChain::single(operation)?, context)
    }
}

/// Lazy reads over stored elements, owned independently of the store borrow.
pub trait ElementScan: Send + Sync {
    /// Every stored element.
    fn scan_all(&self) -> Result<ResultStream<Element>, GraphError>;

    /// Every stored element with `vertex` as its vertex or as an edge endpoint.
    fn scan_vertex(&self, vertex: &PropertyValue) -> Result<ResultStream<Element>, GraphError>;
}

/// Storage primitives the shared element handlers run on.
pub trait ElementBackend: Store {
    /// Store `elements`, combining those that share a key in aggregating groups.
    fn insert(&self, elements: Vec<Element>) -> Result<(), GraphError>;

    fn scanner(&self) -> Arc<dyn ElementScan>;
}

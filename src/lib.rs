//! Schema-driven property graphs with typed operation chains and federated fan-out.
//!
//! A [`Graph`] wraps one [`Store`]: an in-memory [`MapStore`], a SQLite-backed [`SqliteStore`],
//! or a [`FederatedStore`] that merges several delegate graphs into one view. Work is expressed
//! as an [`OperationChain`], type-checked when it is built and run step by step by the store's
//! handlers; streaming results come back as lazy [`ResultStream`]s.
//! Run Criterion benchmarks with `cargo bench` to inspect reports under `target/criterion`.

pub mod config;
pub mod context;
pub mod element;
pub mod errors;
pub mod federation;
pub mod graph;
pub mod operation;
pub mod predicate;
pub mod schema;
pub mod serialisation;
pub mod store;
pub mod stream;
pub mod value;
pub mod view;

pub use crate::config::{
    BackendKind, FederatedConfig, MapConfig, SqliteConfig, StoreProperties, open_store,
};
pub use crate::context::{Context, User};
pub use crate::element::{Edge, EdgeId, Element, ElementId, Entity, EntityId, MatchedVertex};
pub use crate::errors::GraphError;
pub use crate::federation::{
    ElementMerge, FailureLog, FanOutResult, FederatedStore, GraphAccess, MergePolicy,
};
pub use crate::graph::Graph;
pub use crate::operation::{
    Operation, OperationChain, OperationKind, OperationOutput, Request,
};
pub use crate::predicate::Predicate;
pub use crate::schema::Schema;
pub use crate::store::{MapStore, Store, StoreMetricsSnapshot};
#[cfg(feature = "sqlite-backend")]
pub use crate::store::SqliteStore;
pub use crate::stream::ResultStream;
pub use crate::value::PropertyValue;
pub use crate::view::View;

//! A store that answers operations by fanning them out to registered delegate graphs.
//!
//! Delegates run concurrently on a bounded worker pool. Their lazy streams are concatenated in
//! registration order and pulled on the caller's thread, so closing the merged stream closes
//! every delegate stream and leaves no work running.

mod access;
mod handlers;
mod merge;
mod registry;
mod store;

pub use access::GraphAccess;
pub use handlers::{
    AddGraphHandler, FederatedAddElementsHandler, FederatedRetrievalHandler,
    GetAllGraphIdsHandler, RemoveGraphHandler,
};
pub use merge::{DelegateFailure, ElementMerge, FailureLog, MergePolicy};
pub use registry::{Delegate, GraphRegistry, RegistrySnapshot};
pub use store::{FanOutResult, FederatedStore};

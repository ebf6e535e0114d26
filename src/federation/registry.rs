//! The federation's delegate registry.
//!
//! Readers take an immutable snapshot with one atomic load and keep it for a whole fan-out, so an
//! in-flight operation never sees graphs come or go. Writers serialise on a mutex, build the next
//! snapshot (including the merged schema) and publish it with one store.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::info;

use crate::{
    context::User,
    errors::GraphError,
    federation::GraphAccess,
    graph::Graph,
    schema::Schema,
};

#[derive(Clone, Debug)]
pub struct Delegate {
    pub graph: Arc<Graph>,
    pub access: GraphAccess,
}

/// Delegates in registration order, and the merge of their schemas.
#[derive(Debug)]
pub struct RegistrySnapshot {
    delegates: Vec<Delegate>,
    schema: Arc<Schema>,
}

impl RegistrySnapshot {
    pub fn schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    pub fn delegates(&self) -> &[Delegate] {
        &self.delegates
    }

    pub fn get(&self, graph_id: &str) -> Option<&Delegate> {
        self.delegates
            .iter()
            .find(|delegate| delegate.graph.graph_id() == graph_id)
    }

    /// Delegates `user` may read, restricted to `explicit` when given, in registration order.
    ///
    /// Ids in `explicit` that are unknown or hidden from the user are ignored.
    pub fn targets(&self, explicit: Option<&[String]>, user: &User) -> Vec<Delegate> {
        self.delegates
            .iter()
            .filter(|delegate| delegate.access.is_visible_to(user))
            .filter(|delegate| {
                explicit.is_none_or(|ids| ids.iter().any(|id| id == delegate.graph.graph_id()))
            })
            .cloned()
            .collect()
    }
}

#[derive(Debug)]
pub struct GraphRegistry {
    base_schema: Arc<Schema>,
    snapshot: ArcSwap<RegistrySnapshot>,
    writer: Mutex<()>,
}

impl GraphRegistry {
    /// An empty registry whose merged schema starts as `base_schema`.
    pub fn new(base_schema: Schema) -> Self {
        let base_schema = Arc::new(base_schema);
        Self {
            snapshot: ArcSwap::from_pointee(RegistrySnapshot {
                delegates: Vec::new(),
                schema: Arc::clone(&base_schema),
            }),
            base_schema,
            writer: Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.snapshot.load_full()
    }

    /// Register a delegate; rejected when the id is taken or its schema conflicts.
    pub fn add(&self, graph: Arc<Graph>, access: GraphAccess) -> Result<(), GraphError> {
        let _writer = self.writer.lock();
        let current = self.snapshot.load_full();
        let graph_id = graph.graph_id().to_string();
        if current.get(&graph_id).is_some() {
            return Err(GraphError::invalid_input(format!(
                "graph '{graph_id}' is already registered"
            )));
        }
        let schema = current.schema.merge(&graph.schema())?;
        let mut delegates = current.delegates.clone();
        delegates.push(Delegate { graph, access });
        self.snapshot.store(Arc::new(RegistrySnapshot {
            delegates,
            schema: Arc::new(schema),
        }));
        info!(graph_id = %graph_id, "graph added to federation");
        Ok(())
    }

    pub fn remove(&self, graph_id: &str) -> Result<(), GraphError> {
        self.remove_if(graph_id, |_| true)
    }

    /// Remove a delegate `user` can see; a hidden delegate is reported as missing.
    pub fn remove_visible_to(&self, graph_id: &str, user: &User) -> Result<(), GraphError> {
        self.remove_if(graph_id, |delegate| delegate.access.is_visible_to(user))
    }

    /// The check and the removal happen under one writer lock.
    fn remove_if<F>(&self, graph_id: &str, allowed: F) -> Result<(), GraphError>
    where
        F: Fn(&Delegate) -> bool,
    {
        let _writer = self.writer.lock();
        let current = self.snapshot.load_full();
        if !current.get(graph_id).is_some_and(allowed) {
            return Err(GraphError::not_found(format!("graph '{graph_id}'")));
        }
        let delegates: Vec<Delegate> = current
            .delegates
            .iter()
            .filter(|delegate| delegate.graph.graph_id() != graph_id)
            .cloned()
            .collect();
        let mut schema = (*self.base_schema).clone();
        for delegate in &delegates {
            schema = schema.merge(&delegate.graph.schema())?;
        }
        self.snapshot.store(Arc::new(RegistrySnapshot {
            delegates,
            schema: Arc::new(schema),
        }));
        info!(graph_id = %graph_id, "graph removed from federation");
        Ok(())
    }

    pub fn graph_ids_visible_to(&self, user: &User) -> Vec<String> {
        self.snapshot()
            .targets(None, user)
            .iter()
            .map(|delegate| delegate.graph.graph_id().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MapStore;

    fn delegate(graph_id: &str) -> Arc<Graph> {
        Arc::new(Graph::new(Arc::new(MapStore::new(
            graph_id,
            Schema::empty(),
            &Default::default(),
        ))))
    }

    #[test]
    fn hidden_delegates_survive_removal_attempts() {
        let registry = GraphRegistry::new(Schema::empty());
        registry
            .add(delegate("private"), GraphAccess::owned_by("alice"))
            .expect("add");

        let err = registry
            .remove_visible_to("private", &User::named("mallory"))
            .expect_err("hidden from mallory");
        assert!(matches!(err, GraphError::NotFound(_)));
        assert!(registry.snapshot().get("private").is_some());

        registry
            .remove_visible_to("private", &User::named("alice"))
            .expect("owner removes");
        assert!(registry.snapshot().get("private").is_none());
    }

    #[test]
    fn snapshots_taken_before_a_removal_keep_the_delegate() {
        let registry = GraphRegistry::new(Schema::empty());
        registry.add(delegate("a"), GraphAccess::public()).expect("add");
        let before = registry.snapshot();
        registry.remove("a").expect("remove");
        assert_eq!(before.delegates().len(), 1);
        assert!(registry.snapshot().delegates().is_empty());
    }
}

//! User-facing entry point over one store.

use std::sync::Arc;

use crate::{
    config::{StoreProperties, open_store},
    context::Context,
    errors::GraphError,
    operation::{Operation, OperationChain, OperationOutput, Request},
    schema::Schema,
    store::Store,
};

/// A named graph: one store and its schema.
///
/// Chains are checked against the schema before the store sees them: elements being added must
/// validate, views must only name groups and properties the schema declares, and every step
/// must have a handler. Nothing executes when a check fails.
#[derive(Clone, Debug)]
pub struct Graph {
    store: Arc<dyn Store>,
}

impl Graph {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn from_properties(
        graph_id: &str,
        schema: Schema,
        properties: &StoreProperties,
    ) -> Result<Self, GraphError> {
        Ok(Self::new(open_store(graph_id, schema, properties)?))
    }

    pub fn graph_id(&self) -> &str {
        self.store.graph_id()
    }

    pub fn schema(&self) -> Arc<Schema> {
        self.store.schema()
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn validate(&self, chain: &OperationChain) -> Result<(), GraphError> {
        let schema = self.store.schema();
        for operation in chain.operations() {
            if !self.store.supports(operation.kind()) {
                return Err(GraphError::operation(format!(
                    "graph '{}' does not support {}",
                    self.graph_id(),
                    operation.kind()
                )));
            }
            if let Request::AddElements {
                elements: Some(elements),
                skip_invalid: false,
            } = operation.request()
            {
                for element in elements {
                    schema.validate(element)?;
                }
            }
            if let Some(view) = operation.view() {
                view.validate(&schema)?;
            }
        }
        Ok(())
    }

    pub fn execute(
        &self,
        chain: &OperationChain,
        context: &Context,
    ) -> Result<OperationOutput, GraphError> {
        self.validate(chain)?;
        self.store.execute(chain, context)
    }

    pub fn execute_operation(
        &self,
        operation: Operation,
        context: &Context,
    ) -> Result<OperationOutput, GraphError> {
        self.execute(&OperationChain::single(operation)?, context)
    }
}

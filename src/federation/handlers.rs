//! Handlers the federated store registers on top of the transform defaults.

use std::sync::Arc;

use tracing::info;

use crate::{
    context::Context,
    element::ElementId,
    errors::GraphError,
    federation::{
        FailureLog, FederatedStore,
        merge::{FederatedCursor, settle},
    },
    operation::{HandlerRegistry, Operation, OperationHandler, OperationKind, OperationOutput, Request},
    stream::ResultStream,
};

pub(crate) fn register_federated_handlers(registry: &mut HandlerRegistry<FederatedStore>) {
    registry.register(OperationKind::Retrieval, FederatedRetrievalHandler);
    registry.register(OperationKind::AddElements, FederatedAddElementsHandler);
    registry.register(OperationKind::AddGraph, AddGraphHandler);
    registry.register(OperationKind::RemoveGraph, RemoveGraphHandler);
    registry.register(OperationKind::GetAllGraphIds, GetAllGraphIdsHandler);
}

/// Fans every retrieval out to the target delegates.
pub struct FederatedRetrievalHandler;

impl OperationHandler<FederatedStore> for FederatedRetrievalHandler {
    fn do_operation(
        &self,
        operation: &Operation,
        input: Option<OperationOutput>,
        context: &Context,
        store: &FederatedStore,
    ) -> Result<OperationOutput, GraphError> {
        match operation.kind() {
            OperationKind::GetElements | OperationKind::GetAllElements => {
                let result = store.fan_out(operation, input, context)?;
                Ok(OperationOutput::Elements(result.stream))
            }
            OperationKind::GetAdjacentIds => adjacent_ids(operation, input, context, store),
            other => Err(GraphError::operation(format!(
                "federated retrieval cannot run {other}"
            ))),
        }
    }
}

fn adjacent_ids(
    operation: &Operation,
    input: Option<OperationOutput>,
    context: &Context,
    store: &FederatedStore,
) -> Result<OperationOutput, GraphError> {
    let plan = store.plan(operation, input, context)?;
    let policy = store.policy_for(operation);
    let failures = FailureLog::default();
    let outcomes = store
        .run(&plan.calls, context)
        .into_iter()
        .map(|(graph_id, outcome)| (graph_id, outcome.and_then(OperationOutput::into_element_ids)))
        .collect();
    let parts: Vec<(String, ResultStream<ElementId>)> = settle(outcomes, policy, &failures)?;
    Ok(OperationOutput::ElementIds(FederatedCursor::stream(
        parts, policy, failures,
    )))
}

/// Sends each element to every target delegate whose schema declares its group.
///
/// Skipped delegate failures are logged; callers that need them use
/// [`FederatedStore::add_elements`].
pub struct FederatedAddElementsHandler;

impl OperationHandler<FederatedStore> for FederatedAddElementsHandler {
    fn do_operation(
        &self,
        operation: &Operation,
        input: Option<OperationOutput>,
        context: &Context,
        store: &FederatedStore,
    ) -> Result<OperationOutput, GraphError> {
        store.add_elements(operation, input, context)?;
        Ok(OperationOutput::Void)
    }
}

pub struct AddGraphHandler;

impl OperationHandler<FederatedStore> for AddGraphHandler {
    fn do_operation(
        &self,
        operation: &Operation,
        _input: Option<OperationOutput>,
        context: &Context,
        store: &FederatedStore,
    ) -> Result<OperationOutput, GraphError> {
        let Request::AddGraph { graph, access } = operation.request() else {
            return Err(GraphError::operation(format!(
                "AddGraphHandler cannot run {}",
                operation.kind()
            )));
        };
        let access = access.clone().or_owned_by(context.user().user_id());
        store.add_graph(Arc::clone(graph), access)?;
        Ok(OperationOutput::Void)
    }
}

/// Removes a delegate the user can see; hidden delegates are reported as missing.
pub struct RemoveGraphHandler;

impl OperationHandler<FederatedStore> for RemoveGraphHandler {
    fn do_operation(
        &self,
        operation: &Operation,
        _input: Option<OperationOutput>,
        context: &Context,
        store: &FederatedStore,
    ) -> Result<OperationOutput, GraphError> {
        let Request::RemoveGraph { graph_id } = operation.request() else {
            return Err(GraphError::operation(format!(
                "RemoveGraphHandler cannot run {}",
                operation.kind()
            )));
        };
        store.registry().remove_visible_to(graph_id, context.user())?;
        info!(graph_id = %graph_id, user = context.user().user_id(), "graph removed by user");
        Ok(OperationOutput::Void)
    }
}

pub struct GetAllGraphIdsHandler;

impl OperationHandler<FederatedStore> for GetAllGraphIdsHandler {
    fn do_operation(
        &self,
        _operation: &Operation,
        _input: Option<OperationOutput>,
        context: &Context,
        store: &FederatedStore,
    ) -> Result<OperationOutput, GraphError> {
        Ok(OperationOutput::GraphIds(store.graph_ids(context.user())))
    }
}

//! Handlers that transform a previous step's output and work on any store.

use crate::{
    context::Context,
    element::{Element, ElementId},
    errors::GraphError,
    operation::{
        EdgeVertices, GroupCounts, HandlerRegistry, Operation, OperationHandler, OperationKind,
        OperationOutput, Request,
    },
    store::Store,
};

fn expect_input(
    operation: &Operation,
    input: Option<OperationOutput>,
) -> Result<OperationOutput, GraphError> {
    input.ok_or_else(|| GraphError::operation(format!("{} requires an input", operation.kind())))
}

fn wrong_request(operation: &Operation, handler: &str) -> GraphError {
    GraphError::operation(format!("{handler} cannot run {}", operation.kind()))
}

pub struct LimitHandler;

impl<S: ?Sized> OperationHandler<S> for LimitHandler {
    fn do_operation(
        &self,
        operation: &Operation,
        input: Option<OperationOutput>,
        _context: &Context,
        _store: &S,
    ) -> Result<OperationOutput, GraphError> {
        let Request::Limit { limit } = operation.request() else {
            return Err(wrong_request(operation, "LimitHandler"));
        };
        let limit = *limit;
        match expect_input(operation, input)? {
            OperationOutput::Elements(stream) => Ok(OperationOutput::Elements(stream.take(limit))),
            OperationOutput::ElementIds(stream) => {
                Ok(OperationOutput::ElementIds(stream.take(limit)))
            }
            OperationOutput::GraphIds(mut ids) => {
                ids.truncate(limit);
                Ok(OperationOutput::GraphIds(ids))
            }
            other => Err(GraphError::operation(format!(
                "Limit cannot truncate {}",
                other.io_type()
            ))),
        }
    }
}

pub struct CountHandler;

impl<S: ?Sized> OperationHandler<S> for CountHandler {
    fn do_operation(
        &self,
        operation: &Operation,
        input: Option<OperationOutput>,
        _context: &Context,
        _store: &S,
    ) -> Result<OperationOutput, GraphError> {
        let count = match expect_input(operation, input)? {
            OperationOutput::Elements(stream) => drain_count(stream)?,
            OperationOutput::ElementIds(stream) => drain_count(stream)?,
            OperationOutput::GraphIds(ids) => ids.len() as u64,
            other => {
                return Err(GraphError::operation(format!(
                    "Count cannot count {}",
                    other.io_type()
                )));
            }
        };
        Ok(OperationOutput::Count(count))
    }
}

fn drain_count<T>(stream: impl Iterator<Item = Result<T, GraphError>>) -> Result<u64, GraphError> {
    let mut count = 0u64;
    for item in stream {
        item?;
        count += 1;
    }
    Ok(count)
}

pub struct CountGroupsHandler;

impl<S: ?Sized> OperationHandler<S> for CountGroupsHandler {
    fn do_operation(
        &self,
        operation: &Operation,
        input: Option<OperationOutput>,
        _context: &Context,
        _store: &S,
    ) -> Result<OperationOutput, GraphError> {
        let Request::CountGroups { limit } = operation.request() else {
            return Err(wrong_request(operation, "CountGroupsHandler"));
        };
        let mut stream = expect_input(operation, input)?.into_elements()?;
        let mut counts = GroupCounts::default();
        let mut seen = 0usize;
        for element in stream.by_ref() {
            let element = element?;
            if limit.is_some_and(|limit| seen >= limit) {
                counts.limit_hit = true;
                break;
            }
            seen += 1;
            let target = if element.is_entity() {
                &mut counts.entities
            } else {
                &mut counts.edges
            };
            *target.entry(element.group().to_string()).or_default() += 1;
        }
        stream.close();
        Ok(OperationOutput::GroupCounts(counts))
    }
}

pub struct ToVerticesHandler;

fn edge_vertices(element: &Element, which: EdgeVertices) -> Vec<ElementId> {
    let edge = match element {
        Element::Entity(entity) => return vec![ElementId::entity(entity.vertex().clone())],
        Element::Edge(edge) => edge,
    };
    let vertices = match which {
        EdgeVertices::Source => vec![edge.source()],
        EdgeVertices::Destination => vec![edge.destination()],
        EdgeVertices::Both => vec![edge.source(), edge.destination()],
        EdgeVertices::Matched => vec![edge.matched_vertex_value()],
        EdgeVertices::Opposite => vec![edge.adjacent_vertex_value()],
    };
    vertices
        .into_iter()
        .map(|vertex| ElementId::entity(vertex.clone()))
        .collect()
}

impl<S: ?Sized> OperationHandler<S> for ToVerticesHandler {
    fn do_operation(
        &self,
        operation: &Operation,
        input: Option<OperationOutput>,
        _context: &Context,
        _store: &S,
    ) -> Result<OperationOutput, GraphError> {
        let Request::ToVertices { edge_vertices: which } = operation.request() else {
            return Err(wrong_request(operation, "ToVerticesHandler"));
        };
        let which = *which;
        let stream = expect_input(operation, input)?.into_elements()?;
        Ok(OperationOutput::ElementIds(stream.flat_map(move |element| {
            Ok(crate::stream::ResultStream::from_vec(edge_vertices(
                &element, which,
            )))
        })))
    }
}

pub struct DiscardOutputHandler;

impl<S: ?Sized> OperationHandler<S> for DiscardOutputHandler {
    fn do_operation(
        &self,
        _operation: &Operation,
        _input: Option<OperationOutput>,
        _context: &Context,
        _store: &S,
    ) -> Result<OperationOutput, GraphError> {
        Ok(OperationOutput::Void)
    }
}

pub struct GetSchemaHandler;

impl<S: Store + ?Sized> OperationHandler<S> for GetSchemaHandler {
    fn do_operation(
        &self,
        _operation: &Operation,
        _input: Option<OperationOutput>,
        _context: &Context,
        store: &S,
    ) -> Result<OperationOutput, GraphError> {
        Ok(OperationOutput::Schema(store.schema()))
    }
}

/// Register the store-independent handlers every store supports.
pub fn register_defaults<S: Store + ?Sized>(registry: &mut HandlerRegistry<S>) {
    registry.register(OperationKind::Limit, LimitHandler);
    registry.register(OperationKind::Count, CountHandler);
    registry.register(OperationKind::CountGroups, CountGroupsHandler);
    registry.register(OperationKind::ToVertices, ToVerticesHandler);
    registry.register(OperationKind::DiscardOutput, DiscardOutputHandler);
    registry.register(OperationKind::GetSchema, GetSchemaHandler);
}

//! Element handlers shared by every [`ElementBackend`].

use std::sync::Arc;

use tracing::debug;

use crate::{
    context::Context,
    element::{Element, ElementId},
    errors::GraphError,
    operation::{
        HandlerRegistry, Operation, OperationHandler, OperationKind, OperationOutput, Request,
        SeedMatching, SeedQuery,
    },
    store::{ElementBackend, ElementScan, mark_unseeded, seed_matching},
    stream::ResultStream,
};

fn piped_input(
    operation: &Operation,
    input: Option<OperationOutput>,
) -> Result<OperationOutput, GraphError> {
    input.ok_or_else(|| GraphError::operation(format!("{} requires an input", operation.kind())))
}

fn seeds_of(
    operation: &Operation,
    query: &SeedQuery,
    input: Option<OperationOutput>,
) -> Result<ResultStream<ElementId>, GraphError> {
    match &query.seeds {
        Some(seeds) => Ok(ResultStream::from_vec(seeds.clone())),
        None => piped_input(operation, input)?.into_element_ids(),
    }
}

/// Candidate elements for one seed; an edge seed also reads entities at its destination.
fn candidates(
    scanner: &dyn ElementScan,
    seed: &ElementId,
    query: &SeedQuery,
) -> Result<ResultStream<Element>, GraphError> {
    match seed {
        ElementId::Entity(id) => scanner.scan_vertex(&id.vertex),
        ElementId::Edge(id) => {
            let at_source = scanner.scan_vertex(&id.source)?;
            if query.seed_matching == SeedMatching::Equal || id.source == id.destination {
                return Ok(at_source);
            }
            let at_destination = scanner
                .scan_vertex(&id.destination)?
                .filter_map(|element| element.is_entity().then_some(element));
            Ok(ResultStream::concat(vec![at_source, at_destination]))
        }
    }
}

/// Lazily look up every seed, keeping matches the view accepts.
pub(crate) fn seeded_elements(
    scanner: Arc<dyn ElementScan>,
    seeds: ResultStream<ElementId>,
    query: SeedQuery,
) -> ResultStream<Element> {
    let query = Arc::new(query);
    seeds.flat_map(move |seed| {
        let found = candidates(scanner.as_ref(), &seed, &query)?;
        let query = Arc::clone(&query);
        Ok(found.filter_map(move |element| {
            seed_matching(&seed, element, &query).and_then(|matched| query.view.apply(matched))
        }))
    })
}

struct AddElementsHandler;

impl<B: ElementBackend + ?Sized> OperationHandler<B> for AddElementsHandler {
    fn do_operation(
        &self,
        operation: &Operation,
        input: Option<OperationOutput>,
        _context: &Context,
        store: &B,
    ) -> Result<OperationOutput, GraphError> {
        let Request::AddElements {
            elements,
            skip_invalid,
        } = operation.request()
        else {
            return Err(GraphError::operation("AddElementsHandler cannot run this request"));
        };
        let elements = match elements {
            Some(elements) => elements.clone(),
            None => piped_input(operation, input)?.into_elements()?.collect_all()?,
        };
        let schema = store.schema();
        let mut valid = Vec::with_capacity(elements.len());
        for element in elements {
            match schema.validate(&element) {
                Ok(()) => valid.push(element),
                Err(err) if *skip_invalid => {
                    debug!(store = store.graph_id(), error = %err, "skipping invalid element");
                }
                Err(err) => return Err(err),
            }
        }
        store.insert(valid)?;
        Ok(OperationOutput::Void)
    }
}

struct GetElementsHandler;

impl<B: ElementBackend + ?Sized> OperationHandler<B> for GetElementsHandler {
    fn do_operation(
        &self,
        operation: &Operation,
        input: Option<OperationOutput>,
        _context: &Context,
        store: &B,
    ) -> Result<OperationOutput, GraphError> {
        let Request::GetElements(query) = operation.request() else {
            return Err(GraphError::operation("GetElementsHandler cannot run this request"));
        };
        let seeds = seeds_of(operation, query, input)?;
        Ok(OperationOutput::Elements(seeded_elements(
            store.scanner(),
            seeds,
            query.clone(),
        )))
    }
}

struct GetAllElementsHandler;

impl<B: ElementBackend + ?Sized> OperationHandler<B> for GetAllElementsHandler {
    fn do_operation(
        &self,
        operation: &Operation,
        _input: Option<OperationOutput>,
        _context: &Context,
        store: &B,
    ) -> Result<OperationOutput, GraphError> {
        let Request::GetAllElements {
            view,
            directed_type,
        } = operation.request()
        else {
            return Err(GraphError::operation("GetAllElementsHandler cannot run this request"));
        };
        let view = view.clone();
        let directed_type = *directed_type;
        let stream = store.scanner().scan_all()?.filter_map(move |element| {
            let keep = element
                .as_edge()
                .is_none_or(|edge| directed_type.accepts(edge.is_directed()));
            if !keep {
                return None;
            }
            view.apply(mark_unseeded(element))
        });
        Ok(OperationOutput::Elements(stream))
    }
}

struct GetAdjacentIdsHandler;

impl<B: ElementBackend + ?Sized> OperationHandler<B> for GetAdjacentIdsHandler {
    fn do_operation(
        &self,
        operation: &Operation,
        input: Option<OperationOutput>,
        _context: &Context,
        store: &B,
    ) -> Result<OperationOutput, GraphError> {
        let Request::GetAdjacentIds(query) = operation.request() else {
            return Err(GraphError::operation("GetAdjacentIdsHandler cannot run this request"));
        };
        let seeds = seeds_of(operation, query, input)?
            .filter_map(|seed| matches!(seed, ElementId::Entity(_)).then_some(seed));
        let mut query = query.clone();
        query.seed_matching = SeedMatching::Related;
        let adjacent = seeded_elements(store.scanner(), seeds, query).filter_map(|element| {
            element
                .as_edge()
                .map(|edge| ElementId::entity(edge.adjacent_vertex_value().clone()))
        });
        Ok(OperationOutput::ElementIds(adjacent))
    }
}

/// Register the element handlers on a backend's registry.
pub(crate) fn register_element_handlers<B: ElementBackend + ?Sized>(
    registry: &mut HandlerRegistry<B>,
) {
    registry.register(OperationKind::AddElements, AddElementsHandler);
    registry.register(OperationKind::GetElements, GetElementsHandler);
    registry.register(OperationKind::GetAllElements, GetAllElementsHandler);
    registry.register(OperationKind::GetAdjacentIds, GetAdjacentIdsHandler);
}

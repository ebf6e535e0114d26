//! Typed operations, chains, and the handler registry that executes them against a store.

mod chain;
pub(crate) mod handlers;
mod kind;
mod output;
mod registry;
mod request;

use std::sync::Arc;

use crate::{
    element::{Element, ElementId},
    federation::{ElementMerge, GraphAccess, MergePolicy},
    graph::Graph,
    view::View,
};

pub use chain::{InputType, IoType, OperationChain};
pub use kind::OperationKind;
pub use output::{GroupCounts, OperationOutput};
pub use registry::{HandlerRegistry, OperationHandler};
pub use request::{
    DirectedType, EdgeVertices, IncludeIncomingOutgoing, Request, SeedMatching, SeedQuery,
};

/// Options every operation carries, read by federating stores.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OperationOptions {
    graph_ids: Option<Vec<String>>,
    merge_policy: Option<MergePolicy>,
    element_merge: ElementMerge,
}

impl OperationOptions {
    /// Explicit subset of delegate graphs; all visible graphs when absent.
    pub fn graph_ids(&self) -> Option<&[String]> {
        self.graph_ids.as_deref()
    }

    /// Per-operation override of the store's merge policy.
    pub fn merge_policy(&self) -> Option<MergePolicy> {
        self.merge_policy
    }

    pub fn element_merge(&self) -> ElementMerge {
        self.element_merge
    }
}

/// One immutable unit of work.
#[derive(Clone, Debug)]
pub struct Operation {
    request: Request,
    options: OperationOptions,
}

impl Operation {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            options: OperationOptions::default(),
        }
    }

    pub fn add_elements(elements: Vec<Element>) -> Self {
        Self::new(Request::AddElements {
            elements: Some(elements),
            skip_invalid: false,
        })
    }

    pub fn add_elements_from_input() -> Self {
        Self::new(Request::AddElements {
            elements: None,
            skip_invalid: false,
        })
    }

    pub fn get_elements(seeds: Vec<ElementId>) -> Self {
        Self::new(Request::GetElements(SeedQuery::new(Some(seeds))))
    }

    pub fn get_elements_from_input() -> Self {
        Self::new(Request::GetElements(SeedQuery::new(None)))
    }

    pub fn get_all_elements() -> Self {
        Self::new(Request::GetAllElements {
            view: View::all(),
            directed_type: DirectedType::Either,
        })
    }

    pub fn get_adjacent_ids(seeds: Vec<ElementId>) -> Self {
        Self::new(Request::GetAdjacentIds(SeedQuery::new(Some(seeds))))
    }

    pub fn get_adjacent_ids_from_input() -> Self {
        Self::new(Request::GetAdjacentIds(SeedQuery::new(None)))
    }

    pub fn to_vertices(edge_vertices: EdgeVertices) -> Self {
        Self::new(Request::ToVertices { edge_vertices })
    }

    pub fn limit(limit: usize) -> Self {
        Self::new(Request::Limit { limit })
    }

    pub fn count() -> Self {
        Self::new(Request::Count)
    }

    pub fn count_groups(limit: Option<usize>) -> Self {
        Self::new(Request::CountGroups { limit })
    }

    pub fn discard_output() -> Self {
        Self::new(Request::DiscardOutput)
    }

    pub fn get_schema() -> Self {
        Self::new(Request::GetSchema)
    }

    pub fn add_graph(graph: Arc<Graph>, access: GraphAccess) -> Self {
        Self::new(Request::AddGraph { graph, access })
    }

    pub fn remove_graph(graph_id: impl Into<String>) -> Self {
        Self::new(Request::RemoveGraph {
            graph_id: graph_id.into(),
        })
    }

    pub fn get_all_graph_ids() -> Self {
        Self::new(Request::GetAllGraphIds)
    }

    /// Set the view of a retrieval. Other requests are returned unchanged.
    pub fn with_view(mut self, view: View) -> Self {
        match &mut self.request {
            Request::GetElements(query) | Request::GetAdjacentIds(query) => query.view = view,
            Request::GetAllElements { view: current, .. } => *current = view,
            _ => {}
        }
        self
    }

    pub fn with_direction(mut self, direction: IncludeIncomingOutgoing) -> Self {
        if let Request::GetElements(query) | Request::GetAdjacentIds(query) = &mut self.request {
            query.direction = direction;
        }
        self
    }

    pub fn with_directed_type(mut self, directed_type: DirectedType) -> Self {
        match &mut self.request {
            Request::GetElements(query) | Request::GetAdjacentIds(query) => {
                query.directed_type = directed_type
            }
            Request::GetAllElements {
                directed_type: current,
                ..
            } => *current = directed_type,
            _ => {}
        }
        self
    }

    pub fn with_seed_matching(mut self, seed_matching: SeedMatching) -> Self {
        if let Request::GetElements(query) | Request::GetAdjacentIds(query) = &mut self.request {
            query.seed_matching = seed_matching;
        }
        self
    }

    pub fn with_skip_invalid(mut self, skip: bool) -> Self {
        if let Request::AddElements { skip_invalid, .. } = &mut self.request {
            *skip_invalid = skip;
        }
        self
    }

    pub fn with_graph_ids<I, S>(mut self, graph_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.graph_ids = Some(graph_ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_merge_policy(mut self, policy: MergePolicy) -> Self {
        self.options.merge_policy = Some(policy);
        self
    }

    pub fn with_element_merge(mut self, merge: ElementMerge) -> Self {
        self.options.element_merge = merge;
        self
    }

    pub fn kind(&self) -> OperationKind {
        self.request.kind()
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn options(&self) -> &OperationOptions {
        &self.options
    }

    pub fn view(&self) -> Option<&View> {
        match &self.request {
            Request::GetElements(query) | Request::GetAdjacentIds(query) => Some(&query.view),
            Request::GetAllElements { view, .. } => Some(view),
            _ => None,
        }
    }

    /// A copy carrying `request` for one delegate graph, without the graph-id subset.
    pub(crate) fn for_delegate(&self, request: Request) -> Operation {
        Operation {
            request,
            options: OperationOptions {
                graph_ids: None,
                ..self.options.clone()
            },
        }
    }
}

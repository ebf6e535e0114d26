use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    element::{Element, ElementId},
    federation::GraphAccess,
    graph::Graph,
    operation::OperationKind,
    view::View,
};

/// Which edges a seeded query follows relative to the seed vertex.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncludeIncomingOutgoing {
    #[default]
    Either,
    Incoming,
    Outgoing,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DirectedType {
    #[default]
    Either,
    Directed,
    Undirected,
}

impl DirectedType {
    pub fn accepts(self, directed: bool) -> bool {
        match self {
            DirectedType::Either => true,
            DirectedType::Directed => directed,
            DirectedType::Undirected => !directed,
        }
    }
}

/// `Related` returns everything touching a seed; `Equal` only elements identical to it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeedMatching {
    #[default]
    Related,
    Equal,
}

/// Vertices `ToVertices` extracts from an edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeVertices {
    Source,
    Destination,
    Both,
    #[default]
    Matched,
    Opposite,
}

/// Parameters shared by seeded retrievals.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeedQuery {
    /// Seeds to look up; taken from the previous step's output when absent.
    pub seeds: Option<Vec<ElementId>>,
    pub view: View,
    pub direction: IncludeIncomingOutgoing,
    pub directed_type: DirectedType,
    pub seed_matching: SeedMatching,
}

impl SeedQuery {
    pub fn new(seeds: Option<Vec<ElementId>>) -> Self {
        Self {
            seeds,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug)]
pub enum Request {
    AddElements {
        /// Elements to add; taken from the previous step's output when absent.
        elements: Option<Vec<Element>>,
        /// Drop elements that fail schema validation instead of rejecting the whole request.
        skip_invalid: bool,
    },
    GetElements(SeedQuery),
    GetAllElements {
        view: View,
        directed_type: DirectedType,
    },
    GetAdjacentIds(SeedQuery),
    ToVertices {
        edge_vertices: EdgeVertices,
    },
    Limit {
        limit: usize,
    },
    Count,
    CountGroups {
        limit: Option<usize>,
    },
    DiscardOutput,
    GetSchema,
    AddGraph {
        graph: Arc<Graph>,
        access: GraphAccess,
    },
    RemoveGraph {
        graph_id: String,
    },
    GetAllGraphIds,
}

impl Request {
    pub fn kind(&self) -> OperationKind {
        match self {
            Request::AddElements { .. } => OperationKind::AddElements,
            Request::GetElements(_) => OperationKind::GetElements,
            Request::GetAllElements { .. } => OperationKind::GetAllElements,
            Request::GetAdjacentIds(_) => OperationKind::GetAdjacentIds,
            Request::ToVertices { .. } => OperationKind::ToVertices,
            Request::Limit { .. } => OperationKind::Limit,
            Request::Count => OperationKind::Count,
            Request::CountGroups { .. } => OperationKind::CountGroups,
            Request::DiscardOutput => OperationKind::DiscardOutput,
            Request::GetSchema => OperationKind::GetSchema,
            Request::AddGraph { .. } => OperationKind::AddGraph,
            Request::RemoveGraph { .. } => OperationKind::RemoveGraph,
            Request::GetAllGraphIds => OperationKind::GetAllGraphIds,
        }
    }
}

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Tag identifying an operation kind.
///
/// Concrete kinds name real requests. Abstract kinds name capabilities and exist only so a handler
/// can be registered for a whole family of requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum OperationKind {
    AddElements,
    GetElements,
    GetAllElements,
    GetAdjacentIds,
    ToVertices,
    Limit,
    Count,
    CountGroups,
    DiscardOutput,
    GetSchema,
    AddGraph,
    RemoveGraph,
    GetAllGraphIds,
    Retrieval,
    Seeded,
    Mutation,
    Transform,
    Administrative,
    Any,
}

impl OperationKind {
    pub const CONCRETE: [OperationKind; 13] = [
        OperationKind::AddElements,
        OperationKind::GetElements,
        OperationKind::GetAllElements,
        OperationKind::GetAdjacentIds,
        OperationKind::ToVertices,
        OperationKind::Limit,
        OperationKind::Count,
        OperationKind::CountGroups,
        OperationKind::DiscardOutput,
        OperationKind::GetSchema,
        OperationKind::AddGraph,
        OperationKind::RemoveGraph,
        OperationKind::GetAllGraphIds,
    ];

    pub fn is_abstract(self) -> bool {
        matches!(
            self,
            OperationKind::Retrieval
                | OperationKind::Seeded
                | OperationKind::Mutation
                | OperationKind::Transform
                | OperationKind::Administrative
                | OperationKind::Any
        )
    }

    /// Direct capabilities of this kind.
    pub fn parents(self) -> &'static [OperationKind] {
        use OperationKind::*;
        match self {
            GetElements | GetAdjacentIds => &[Seeded],
            Seeded | GetAllElements => &[Retrieval],
            AddElements => &[Mutation],
            ToVertices | Limit | Count | CountGroups | DiscardOutput => &[Transform],
            GetSchema | AddGraph | RemoveGraph | GetAllGraphIds => &[Administrative],
            Retrieval | Mutation | Transform | Administrative => &[Any],
            Any => &[],
        }
    }

    /// Every capability of this kind, nearest first, excluding the kind itself.
    pub fn ancestors(self) -> Vec<OperationKind> {
        let mut found = Vec::new();
        let mut queue: VecDeque<OperationKind> = self.parents().iter().copied().collect();
        while let Some(kind) = queue.pop_front() {
            if !found.contains(&kind) {
                found.push(kind);
                queue.extend(kind.parents().iter().copied());
            }
        }
        found
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

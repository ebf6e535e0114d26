use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    element::{Element, ElementId},
    errors::GraphError,
    operation::IoType,
    schema::Schema,
    stream::ResultStream,
};

/// Element counts per group.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCounts {
    pub entities: BTreeMap<String, u64>,
    pub edges: BTreeMap<String, u64>,
    /// Counting stopped early because the limit was exceeded.
    pub limit_hit: bool,
}

impl GroupCounts {
    pub fn total(&self) -> u64 {
        self.entities.values().chain(self.edges.values()).sum()
    }
}

/// Result of one step, and of a whole chain.
#[derive(Debug)]
pub enum OperationOutput {
    Void,
    Elements(ResultStream<Element>),
    ElementIds(ResultStream<ElementId>),
    Count(u64),
    GroupCounts(GroupCounts),
    Schema(Arc<Schema>),
    GraphIds(Vec<String>),
}

impl OperationOutput {
    pub fn io_type(&self) -> IoType {
        match self {
            OperationOutput::Void => IoType::None,
            OperationOutput::Elements(_) => IoType::Elements,
            OperationOutput::ElementIds(_) => IoType::ElementIds,
            OperationOutput::Count(_) => IoType::Count,
            OperationOutput::GroupCounts(_) => IoType::GroupCounts,
            OperationOutput::Schema(_) => IoType::Schema,
            OperationOutput::GraphIds(_) => IoType::GraphIds,
        }
    }

    fn unexpected(self, expected: IoType) -> GraphError {
        GraphError::operation(format!(
            "expected {expected} output, found {}",
            self.io_type()
        ))
    }

    pub fn into_elements(self) -> Result<ResultStream<Element>, GraphError> {
        match self {
            OperationOutput::Elements(stream) => Ok(stream),
            other => Err(other.unexpected(IoType::Elements)),
        }
    }

    /// Seeds carried by this output; elements convert to their ids.
    pub fn into_element_ids(self) -> Result<ResultStream<ElementId>, GraphError> {
        match self {
            OperationOutput::ElementIds(stream) => Ok(stream),
            OperationOutput::Elements(stream) => Ok(stream.map(|element| element.id())),
            other => Err(other.unexpected(IoType::ElementIds)),
        }
    }

    pub fn into_count(self) -> Result<u64, GraphError> {
        match self {
            OperationOutput::Count(count) => Ok(count),
            other => Err(other.unexpected(IoType::Count)),
        }
    }

    pub fn into_group_counts(self) -> Result<GroupCounts, GraphError> {
        match self {
            OperationOutput::GroupCounts(counts) => Ok(counts),
            other => Err(other.unexpected(IoType::GroupCounts)),
        }
    }

    pub fn into_schema(self) -> Result<Arc<Schema>, GraphError> {
        match self {
            OperationOutput::Schema(schema) => Ok(schema),
            other => Err(other.unexpected(IoType::Schema)),
        }
    }

    pub fn into_graph_ids(self) -> Result<Vec<String>, GraphError> {
        match self {
            OperationOutput::GraphIds(ids) => Ok(ids),
            other => Err(other.unexpected(IoType::GraphIds)),
        }
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    errors::GraphError,
    operation::{Operation, Request},
};

/// Type of the value flowing between chain steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IoType {
    None,
    Elements,
    ElementIds,
    Count,
    GroupCounts,
    Schema,
    GraphIds,
}

impl IoType {
    /// Elements can stand in for their ids; every other type only for itself.
    pub fn is_assignable_to(self, target: IoType) -> bool {
        self == target || (self == IoType::Elements && target == IoType::ElementIds)
    }
}

impl fmt::Display for IoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What an operation consumes from the previous step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputType {
    /// The operation carries its own input; whatever precedes it is closed and discarded.
    Ignored,
    /// One of these types must precede it.
    Accepts(&'static [IoType]),
}

impl Operation {
    pub fn input_type(&self) -> InputType {
        const ELEMENTS: &[IoType] = &[IoType::Elements];
        const SEEDS: &[IoType] = &[IoType::ElementIds];
        const SEQUENCES: &[IoType] = &[IoType::Elements, IoType::ElementIds, IoType::GraphIds];
        match self.request() {
            Request::AddElements { elements: None, .. } => InputType::Accepts(ELEMENTS),
            Request::GetElements(query) | Request::GetAdjacentIds(query)
                if query.seeds.is_none() =>
            {
                InputType::Accepts(SEEDS)
            }
            Request::ToVertices { .. } | Request::CountGroups { .. } => {
                InputType::Accepts(ELEMENTS)
            }
            Request::Limit { .. } | Request::Count => InputType::Accepts(SEQUENCES),
            _ => InputType::Ignored,
        }
    }

    /// Output type given the type flowing in.
    pub fn output_type(&self, input: IoType) -> IoType {
        match self.request() {
            Request::AddElements { .. }
            | Request::DiscardOutput
            | Request::AddGraph { .. }
            | Request::RemoveGraph { .. } => IoType::None,
            Request::GetElements(_) | Request::GetAllElements { .. } => IoType::Elements,
            Request::GetAdjacentIds(_) | Request::ToVertices { .. } => IoType::ElementIds,
            Request::Limit { .. } => input,
            Request::Count => IoType::Count,
            Request::CountGroups { .. } => IoType::GroupCounts,
            Request::GetSchema => IoType::Schema,
            Request::GetAllGraphIds => IoType::GraphIds,
        }
    }
}

/// A non-empty sequence of operations whose step types line up.
#[derive(Clone, Debug)]
pub struct OperationChain {
    operations: Vec<Operation>,
    output: IoType,
}

impl OperationChain {
    /// Type-check and build a chain. Nothing executes here.
    pub fn new(operations: Vec<Operation>) -> Result<Self, GraphError> {
        if operations.is_empty() {
            return Err(GraphError::operation("operation chain is empty"));
        }
        let mut current = IoType::None;
        for (step, operation) in operations.iter().enumerate() {
            if let InputType::Accepts(accepted) = operation.input_type() {
                if !accepted.iter().any(|target| current.is_assignable_to(*target)) {
                    return Err(GraphError::operation(format!(
                        "step {step} ({}) accepts {accepted:?} but receives {current}",
                        operation.kind()
                    )));
                }
            }
            current = operation.output_type(current);
        }
        Ok(Self {
            operations,
            output: current,
        })
    }

    pub fn single(operation: Operation) -> Result<Self, GraphError> {
        Self::new(vec![operation])
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn output_type(&self) -> IoType {
        self.output
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementId;

    #[test]
    fn elements_feed_seeded_retrieval() {
        let chain = OperationChain::new(vec![
            Operation::get_elements(vec![ElementId::entity("a")]),
            Operation::get_elements_from_input(),
            Operation::limit(3),
            Operation::count(),
        ])
        .expect("chain");
        assert_eq!(chain.output_type(), IoType::Count);
    }

    #[test]
    fn count_cannot_seed_a_retrieval() {
        let err = OperationChain::new(vec![
            Operation::get_all_elements(),
            Operation::count(),
            Operation::get_elements_from_input(),
        ])
        .expect_err("mismatch");
        assert!(err.is_operation());
    }

    #[test]
    fn first_step_cannot_require_input() {
        assert!(OperationChain::single(Operation::to_vertices(Default::default())).is_err());
        assert!(OperationChain::new(Vec::new()).is_err());
    }

    #[test]
    fn limit_preserves_its_input_type() {
        let chain = OperationChain::new(vec![
            Operation::get_adjacent_ids(vec![ElementId::entity("a")]),
            Operation::limit(1),
        ])
        .expect("chain");
        assert_eq!(chain.output_type(), IoType::ElementIds);
    }
}

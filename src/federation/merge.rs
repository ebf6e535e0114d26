//! Combining delegate outcomes into one result.

use std::collections::VecDeque;
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::{
    element::{Element, codec::element_key},
    errors::GraphError,
    schema::Schema,
    stream::Cursor,
    stream::ResultStream,
};

/// What a delegate failure does to the whole operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Record the failure and return what the other delegates produce.
    #[default]
    Skip,
    /// Abort on the first failure and close every other delegate stream.
    FailFast,
}

/// How equal elements from different delegates are combined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementMerge {
    /// Every delegate's elements, in delegate order, duplicates included.
    #[default]
    Concatenate,
    /// Fold elements sharing a key with the merged schema's aggregate functions. Reads every
    /// delegate stream to the end before yielding.
    Aggregate,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DelegateFailure {
    pub graph_id: String,
    pub message: String,
}

/// Failures skipped during one fan-out, including those found while streaming.
#[derive(Clone, Debug, Default)]
pub struct FailureLog {
    entries: Arc<Mutex<Vec<DelegateFailure>>>,
}

impl FailureLog {
    pub(crate) fn record(&self, graph_id: &str, err: &GraphError) {
        warn!(graph_id, error = %err, "skipping failed delegate");
        self.entries.lock().push(DelegateFailure {
            graph_id: graph_id.to_string(),
            message: err.to_string(),
        });
    }

    pub fn failures(&self) -> Vec<DelegateFailure> {
        self.entries.lock().clone()
    }

    pub fn graph_ids(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .map(|failure| failure.graph_id.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// Apply `policy` to the joined delegate outcomes, which arrive in registration order.
///
/// Under fail-fast the first failure is returned and every successful output is dropped, which
/// closes its streams.
pub(crate) fn settle<T>(
    outcomes: Vec<(String, Result<T, GraphError>)>,
    policy: MergePolicy,
    failures: &FailureLog,
) -> Result<Vec<(String, T)>, GraphError> {
    let mut succeeded = Vec::with_capacity(outcomes.len());
    for (graph_id, outcome) in outcomes {
        match outcome {
            Ok(output) => succeeded.push((graph_id, output)),
            Err(err) => match policy {
                MergePolicy::Skip => failures.record(&graph_id, &err),
                MergePolicy::FailFast => {
                    error!(graph_id = %graph_id, error = %err, "delegate failed, aborting fan-out");
                    drop(succeeded);
                    return Err(GraphError::delegate(graph_id, err));
                }
            },
        }
    }
    Ok(succeeded)
}

/// Concatenation of delegate streams that applies the merge policy to errors met while pulling.
pub(crate) struct FederatedCursor<T> {
    parts: VecDeque<(String, ResultStream<T>)>,
    policy: MergePolicy,
    failures: FailureLog,
}

impl<T: Send + 'static> FederatedCursor<T> {
    pub(crate) fn stream(
        parts: Vec<(String, ResultStream<T>)>,
        policy: MergePolicy,
        failures: FailureLog,
    ) -> ResultStream<T> {
        ResultStream::new(FederatedCursor {
            parts: parts.into(),
            policy,
            failures,
        })
    }
}

impl<T: Send> Cursor<T> for FederatedCursor<T> {
    fn advance(&mut self) -> Option<Result<T, GraphError>> {
        loop {
            let (graph_id, part) = self.parts.front_mut()?;
            match part.next() {
                Some(Ok(item)) => return Some(Ok(item)),
                Some(Err(err)) => {
                    let graph_id = graph_id.clone();
                    self.parts.pop_front();
                    match self.policy {
                        MergePolicy::Skip => self.failures.record(&graph_id, &err),
                        MergePolicy::FailFast => {
                            error!(graph_id = %graph_id, error = %err, "delegate stream failed, aborting");
                            self.close();
                            return Some(Err(GraphError::delegate(graph_id, err)));
                        }
                    }
                }
                None => {
                    self.parts.pop_front();
                }
            }
        }
    }

    fn close(&mut self) {
        let open = self.parts.len();
        for (_, mut part) in self.parts.drain(..) {
            part.close();
        }
        debug!(open, "federated cursor closed");
    }
}

/// Fold elements that share a key in an aggregating group, keeping first-seen order.
pub(crate) fn aggregate_elements(
    schema: &Schema,
    elements: Vec<Element>,
) -> Result<Vec<Element>, GraphError> {
    let mut merged: Vec<Element> = Vec::with_capacity(elements.len());
    let mut slots: AHashMap<Vec<u8>, usize> = AHashMap::new();
    for element in elements {
        if !schema.is_aggregating(element.group()) {
            merged.push(element);
            continue;
        }
        let key = element_key(schema, &element)?;
        match slots.get(&key) {
            Some(&slot) => {
                let combined = schema.aggregate(merged[slot].clone(), &element)?;
                merged[slot] = combined;
            }
            None => {
                slots.insert(key, merged.len());
                merged.push(element);
            }
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_records_and_keeps_the_rest() {
        let failures = FailureLog::default();
        let outcomes = vec![
            ("a".to_string(), Ok(1)),
            ("b".to_string(), Err(GraphError::store("down"))),
            ("c".to_string(), Ok(3)),
        ];
        let settled = settle(outcomes, MergePolicy::Skip, &failures).expect("skip");
        assert_eq!(settled.len(), 2);
        assert_eq!(failures.graph_ids(), vec!["b"]);
    }

    #[test]
    fn fail_fast_reports_the_first_failure_in_order() {
        let failures = FailureLog::default();
        let outcomes: Vec<(String, Result<i32, GraphError>)> = vec![
            ("a".to_string(), Ok(1)),
            ("b".to_string(), Err(GraphError::store("first"))),
            ("c".to_string(), Err(GraphError::store("second"))),
        ];
        let err = settle(outcomes, MergePolicy::FailFast, &failures).expect_err("abort");
        assert_eq!(err.graph_id(), Some("b"));
        assert!(err.is_operation());
        assert!(failures.is_empty());
    }

    #[test]
    fn lazy_failure_under_skip_moves_on() {
        let failures = FailureLog::default();
        let broken = ResultStream::from_results(
            vec![Ok(1), Err(GraphError::store("lost connection"))].into_iter(),
        );
        let stream = FederatedCursor::stream(
            vec![
                ("a".to_string(), broken),
                ("b".to_string(), ResultStream::from_vec(vec![2, 3])),
            ],
            MergePolicy::Skip,
            failures.clone(),
        );
        assert_eq!(stream.collect_all().expect("items"), vec![1, 2, 3]);
        assert_eq!(failures.graph_ids(), vec!["a"]);
    }

    #[test]
    fn lazy_failure_under_fail_fast_is_tagged() {
        let broken = ResultStream::from_results(vec![Err(GraphError::store("boom"))].into_iter());
        let mut stream = FederatedCursor::stream(
            vec![
                ("a".to_string(), ResultStream::from_vec(vec![1])),
                ("b".to_string(), broken),
                ("c".to_string(), ResultStream::from_vec(vec![9])),
            ],
            MergePolicy::FailFast,
            FailureLog::default(),
        );
        assert_eq!(stream.next().expect("first").expect("ok"), 1);
        let err = stream.next().expect("second").expect_err("failure");
        assert_eq!(err.graph_id(), Some("b"));
        assert!(stream.next().is_none());
    }
}

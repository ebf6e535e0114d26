use std::sync::Arc;

use ahash::AHashMap;
use tracing::debug;

use crate::{
    context::Context,
    errors::GraphError,
    operation::{InputType, Operation, OperationChain, OperationKind, OperationOutput},
};

/// Executes one family of operations against stores of type `S`.
pub trait OperationHandler<S: ?Sized>: Send + Sync {
    /// `input` is the previous step's output, or `None` for the first step and for operations
    /// that carry their own input.
    fn do_operation(
        &self,
        operation: &Operation,
        input: Option<OperationOutput>,
        context: &Context,
        store: &S,
    ) -> Result<OperationOutput, GraphError>;
}

/// Handlers keyed by operation kind.
///
/// Handlers may be registered for abstract kinds. Each registration recomputes, for every
/// concrete kind, the handler of the kind itself or of its nearest registered ancestor, so
/// dispatch is a single lookup.
pub struct HandlerRegistry<S: ?Sized> {
    declared: AHashMap<OperationKind, Arc<dyn OperationHandler<S>>>,
    resolved: AHashMap<OperationKind, Arc<dyn OperationHandler<S>>>,
}

impl<S: ?Sized> Default for HandlerRegistry<S> {
    fn default() -> Self {
        Self {
            declared: AHashMap::new(),
            resolved: AHashMap::new(),
        }
    }
}

impl<S: ?Sized> std::fmt::Debug for HandlerRegistry<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut declared: Vec<_> = self.declared.keys().collect();
        declared.sort();
        f.debug_struct("HandlerRegistry")
            .field("declared", &declared)
            .finish()
    }
}

impl<S: ?Sized> HandlerRegistry<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`, replacing any earlier handler for that exact kind.
    pub fn register<H>(&mut self, kind: OperationKind, handler: H)
    where
        H: OperationHandler<S> + 'static,
    {
        self.declared.insert(kind, Arc::new(handler));
        self.resolve_all();
    }

    fn resolve_all(&mut self) {
        self.resolved.clear();
        for kind in OperationKind::CONCRETE {
            let handler = std::iter::once(kind)
                .chain(kind.ancestors())
                .find_map(|candidate| self.declared.get(&candidate));
            if let Some(handler) = handler {
                self.resolved.insert(kind, Arc::clone(handler));
            }
        }
    }

    pub fn resolve(&self, kind: OperationKind) -> Option<Arc<dyn OperationHandler<S>>> {
        self.resolved.get(&kind).cloned()
    }

    pub fn is_supported(&self, kind: OperationKind) -> bool {
        self.resolved.contains_key(&kind)
    }

    pub fn supported_kinds(&self) -> Vec<OperationKind> {
        let mut kinds: Vec<_> = self.resolved.keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Run `chain` step by step against `store`.
    ///
    /// Every handler is resolved before the first step runs. A failing step drops the output it
    /// was handed, which closes any stream inside it.
    pub fn execute(
        &self,
        chain: &OperationChain,
        context: &Context,
        store: &S,
        store_id: &str,
    ) -> Result<OperationOutput, GraphError> {
        let handlers = chain
            .operations()
            .iter()
            .map(|operation| {
                self.resolve(operation.kind()).ok_or_else(|| {
                    GraphError::operation(format!(
                        "store '{store_id}' has no handler for {}",
                        operation.kind()
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut current: Option<OperationOutput> = None;
        for (step, (operation, handler)) in chain.operations().iter().zip(handlers).enumerate() {
            debug!(store = store_id, step, operation = %operation.kind(), "executing chain step");
            let input = match operation.input_type() {
                InputType::Ignored => {
                    drop(current.take());
                    None
                }
                InputType::Accepts(_) => current.take(),
            };
            current = Some(handler.do_operation(operation, input, context, store)?);
        }
        Ok(current.unwrap_or(OperationOutput::Void))
    }
}

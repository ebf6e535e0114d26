use thiserror::Error;

/// Error type for fedgraph operations.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("schema error: {0}")]
    SchemaError(String),
    #[error("serialisation error: {0}")]
    SerialisationError(String),
    #[error("operation error: {0}")]
    OperationError(String),
    #[error("graph '{graph_id}' failed: {source}")]
    DelegateError {
        graph_id: String,
        #[source]
        source: Box<GraphError>,
    },
    #[error("store error: {0}")]
    StoreError(String),
    #[error("validation error: {0}")]
    ValidationError(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl GraphError {
    pub fn schema<T: Into<String>>(msg: T) -> Self {
        GraphError::SchemaError(msg.into())
    }

    pub fn serialisation<T: Into<String>>(msg: T) -> Self {
        GraphError::SerialisationError(msg.into())
    }

    pub fn operation<T: Into<String>>(msg: T) -> Self {
        GraphError::OperationError(msg.into())
    }

    pub fn store<T: Into<String>>(msg: T) -> Self {
        GraphError::StoreError(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        GraphError::ValidationError(msg.into())
    }

    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        GraphError::InvalidInput(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        GraphError::NotFound(msg.into())
    }

    /// Tag a failure with the delegate graph it came from.
    ///
    /// Already-tagged errors keep their original graph id.
    pub fn delegate<T: Into<String>>(graph_id: T, source: GraphError) -> Self {
        match source {
            tagged @ GraphError::DelegateError { .. } => tagged,
            other => GraphError::DelegateError {
                graph_id: graph_id.into(),
                source: Box::new(other),
            },
        }
    }

    /// Id of the delegate graph that raised this error, if any.
    pub fn graph_id(&self) -> Option<&str> {
        match self {
            GraphError::DelegateError { graph_id, .. } => Some(graph_id),
            _ => None,
        }
    }

    pub fn is_operation(&self) -> bool {
        matches!(
            self,
            GraphError::OperationError(_) | GraphError::DelegateError { .. }
        )
    }
}

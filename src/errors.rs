use serde::Serialize;
use thiserror::Error;

/// One schema rule broken by a create or update body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub path: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self { path: path.into(), message: message.into() }
    }
}

fn join_messages(violations: &[FieldViolation]) -> String {
    violations.iter().map(|v| v.message.as_str()).collect::<Vec<_>>().join(". ")
}

/// Failures raised by a persistence collaborator behind the model capability.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Cast failed for value {value:?} at path {path:?}")]
    Cast { path: String, value: String },

    #[error("Duplicate key {field}: {value}")]
    Duplicate { field: String, value: String },

    #[error("Validation failed: {}", join_messages(.0))]
    Validation(Vec<FieldViolation>),

    #[error("Unknown query operator: {0}")]
    InvalidOperator(String),

    #[error("Projection error: {0}")]
    Projection(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Errors surfaced by the resource handlers.
///
/// Handlers never render these; [`crate::response::ErrorTranslator`] is the
/// single place that turns them into a reply.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("Invalid input data. {}", join_messages(.0))]
    ValidationFailed(Vec<FieldViolation>),

    #[error("Query execution failed: {0}")]
    ExecutionFailed(#[source] ModelError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Serde JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<ModelError> for AppError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Validation(violations) => Self::ValidationFailed(violations),
            other => Self::ExecutionFailed(other),
        }
    }
}

impl AppError {
    pub fn no_document() -> Self {
        Self::NotFound("No document found with that ID".into())
    }

    /// HTTP-style status code the error maps to.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::ValidationFailed(_) | Self::BadRequest(_) => 400,
            Self::ExecutionFailed(inner) => match inner {
                ModelError::Storage(_) => 500,
                _ => 400,
            },
            Self::Serialization(_) => 500,
        }
    }

    /// Operational errors are caused by the client and safe to report verbatim.
    #[must_use]
    pub const fn is_operational(&self) -> bool {
        self.status_code() < 500
    }

    /// Message shown to API clients for operational errors.
    #[must_use]
    pub fn client_message(&self) -> String {
        match self {
            Self::ExecutionFailed(ModelError::Cast { path, value }) => {
                format!("Invalid {path}: {value}.")
            }
            Self::ExecutionFailed(ModelError::Duplicate { value, .. }) => {
                format!("Duplicate field value: {value}. Please use another value!")
            }
            Self::ExecutionFailed(ModelError::Validation(v)) => {
                format!("Invalid input data. {}", join_messages(v))
            }
            Self::ExecutionFailed(ModelError::InvalidOperator(op)) => {
                format!("Invalid query operator: {op}")
            }
            Self::ExecutionFailed(ModelError::Projection(msg)) => msg.clone(),
            Self::BadRequest(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

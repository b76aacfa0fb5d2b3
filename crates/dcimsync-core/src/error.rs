use thiserror::Error;

/// Core error types for definition handling
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Unknown entity kind: {0}")]
    UnknownEntityKind(String),

    #[error("Unknown component section: {0}")]
    UnknownComponentKind(String),

    #[error("Empty definition document: {0}")]
    EmptyDocument(String),

    #[error("Invalid definition document: {message}")]
    InvalidDocument { message: String },

    #[error("Missing required field '{field}' for {kind}")]
    MissingField { kind: String, field: String },

    #[error("Invalid value for field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Time formatting error: {0}")]
    TimeError(#[from] time::error::Format),
}

impl CoreError {
    /// Create a new UnknownEntityKind error
    pub fn unknown_entity_kind(kind: impl Into<String>) -> Self {
        Self::UnknownEntityKind(kind.into())
    }

    /// Create a new UnknownComponentKind error
    pub fn unknown_component_kind(kind: impl Into<String>) -> Self {
        Self::UnknownComponentKind(kind.into())
    }

    /// Create a new EmptyDocument error
    pub fn empty_document(source: impl Into<String>) -> Self {
        Self::EmptyDocument(source.into())
    }

    /// Create a new InvalidDocument error
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }

    /// Create a new MissingField error
    pub fn missing_field(kind: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            kind: kind.into(),
            field: field.into(),
        }
    }

    /// Create a new InvalidField error
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Check if this error means the document itself is unusable
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyDocument(_)
                | Self::InvalidDocument { .. }
                | Self::MissingField { .. }
                | Self::InvalidField { .. }
        )
    }

    /// Get error category for logging/monitoring
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownEntityKind(_) | Self::UnknownComponentKind(_) => {
                ErrorCategory::Configuration
            }
            Self::EmptyDocument(_)
            | Self::InvalidDocument { .. }
            | Self::MissingField { .. }
            | Self::InvalidField { .. } => ErrorCategory::Validation,
            Self::JsonError(_) => ErrorCategory::Serialization,
            Self::TimeError(_) => ErrorCategory::System,
        }
    }
}

/// Error categories for monitoring and classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Serialization,
    System,
    Configuration,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Serialization => write!(f, "serialization"),
            Self::System => write!(f, "system"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

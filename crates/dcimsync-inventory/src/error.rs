//! Error types for the remote inventory abstraction.

use std::fmt;

/// Errors that can occur while talking to the remote inventory.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InventoryError {
    /// The inventory refused a write or query (validation, permissions).
    #[error("Rejected by {endpoint} (HTTP {status}): {message}")]
    Rejected {
        /// Endpoint path the request was sent to.
        endpoint: String,
        /// Status code returned by the inventory.
        status: u16,
        /// Body or summarized error returned by the inventory.
        message: String,
    },

    /// A `get` matched more than one record.
    #[error("Expected one result from {endpoint}, got {count}")]
    MultipleResults {
        /// Endpoint path that was queried.
        endpoint: String,
        /// Number of records returned.
        count: usize,
    },

    /// The inventory answered with something that is not a record.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// What was wrong with the response.
        message: String,
    },

    /// The inventory could not be reached.
    #[error("Connection error: {message}")]
    Connection {
        /// Description of the transport failure.
        message: String,
    },

    /// An internal client error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl InventoryError {
    /// Creates a new `Rejected` error.
    #[must_use]
    pub fn rejected(endpoint: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            endpoint: endpoint.into(),
            status,
            message: message.into(),
        }
    }

    /// Creates a new `MultipleResults` error.
    #[must_use]
    pub fn multiple_results(endpoint: impl Into<String>, count: usize) -> Self {
        Self::MultipleResults {
            endpoint: endpoint.into(),
            count,
        }
    }

    /// Creates a new `InvalidResponse` error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Creates a new `Connection` error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if the inventory itself refused the request.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// Returns `true` if the inventory could not be reached.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Rejected { .. } => ErrorCategory::Rejected,
            Self::MultipleResults { .. } => ErrorCategory::Ambiguous,
            Self::InvalidResponse { .. } => ErrorCategory::Protocol,
            Self::Connection { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of inventory errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Request refused by the inventory.
    Rejected,
    /// Lookup matched several records.
    Ambiguous,
    /// Unexpected response shape.
    Protocol,
    /// Infrastructure/connection error.
    Infrastructure,
    /// Internal error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected => write!(f, "rejected"),
            Self::Ambiguous => write!(f, "ambiguous"),
            Self::Protocol => write!(f, "protocol"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

use std::fmt;
use std::path::PathBuf;

use dcimsync_core::{ComponentKind, CoreError};
use dcimsync_inventory::{Endpoint, InventoryError};

/// Errors raised while reconciling one definition or component template.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Validation(#[from] CoreError),

    #[error("Manufacturer '{name}' not present in the inventory")]
    ManufacturerUnresolved { name: String },

    #[error("{} '{template}': {field} '{target}' not found", .kind.label())]
    ReferenceResolution {
        kind: ComponentKind,
        template: String,
        field: &'static str,
        target: String,
    },

    #[error("Lookup on {endpoint} failed: {source}")]
    LookupFailed {
        endpoint: Endpoint,
        #[source]
        source: InventoryError,
    },

    #[error("Write to {endpoint} failed: {source}")]
    RemoteWrite {
        endpoint: Endpoint,
        #[source]
        source: InventoryError,
    },
}

impl ReconcileError {
    pub fn manufacturer_unresolved(name: impl Into<String>) -> Self {
        Self::ManufacturerUnresolved { name: name.into() }
    }

    pub fn reference(
        kind: ComponentKind,
        template: impl Into<String>,
        field: &'static str,
        target: impl Into<String>,
    ) -> Self {
        Self::ReferenceResolution {
            kind,
            template: template.into(),
            field,
            target: target.into(),
        }
    }

    pub fn lookup(endpoint: Endpoint, source: InventoryError) -> Self {
        Self::LookupFailed { endpoint, source }
    }

    pub fn write(endpoint: Endpoint, source: InventoryError) -> Self {
        Self::RemoteWrite { endpoint, source }
    }

    /// Validation failures mark an item skipped rather than failed.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) => ErrorCategory::Validation,
            Self::ManufacturerUnresolved { .. } => ErrorCategory::Gating,
            Self::ReferenceResolution { .. } => ErrorCategory::Reference,
            Self::LookupFailed { .. } | Self::RemoteWrite { .. } => ErrorCategory::Remote,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Validation,
    Gating,
    Reference,
    Remote,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "validation"),
            Self::Gating => write!(f, "gating"),
            Self::Reference => write!(f, "reference"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

/// Ledger persistence failures. These are logged, never fatal to a run.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Failed to read ledger {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write ledger {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed ledger: {0}")]
    Format(#[from] serde_json::Error),
}

/// Failures reading a definition document from storage.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

impl LoadError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Unparsable documents are a content problem, not an I/O one.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcimsync_core::EntityKind;

    #[test]
    fn test_reconcile_error_display() {
        let err = ReconcileError::reference(ComponentKind::FrontPorts, "1", "rear_port", "R9");
        assert_eq!(err.to_string(), "FrontPortTemplate '1': rear_port 'R9' not found");
        assert_eq!(err.category(), ErrorCategory::Reference);

        let err = ReconcileError::manufacturer_unresolved("Acme");
        assert_eq!(
            err.to_string(),
            "Manufacturer 'Acme' not present in the inventory"
        );
        assert!(!err.is_validation_error());
    }

    #[test]
    fn test_reconcile_error_keeps_source() {
        use std::error::Error as _;

        let err = ReconcileError::write(
            Endpoint::Entity(EntityKind::DeviceType),
            InventoryError::rejected("dcim/device-types", 400, "bad slug"),
        );
        assert!(err.to_string().starts_with("Write to dcim/device-types failed"));
        assert!(err.source().is_some());
        assert_eq!(err.category(), ErrorCategory::Remote);
    }

    #[test]
    fn test_validation_from_core() {
        let err: ReconcileError = CoreError::missing_field("device-types", "model").into();
        assert!(err.is_validation_error());
        assert_eq!(err.to_string(), "Missing required field 'model' for device-types");
    }
}

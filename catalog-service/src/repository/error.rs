//! Repository error types
//!
//! ```rust
//! use catalog_service::repository::{RepositoryError, RepositoryErrorKind};
//!
//! let error = RepositoryError::not_found("Product", "prod_01h455vb4pex5vsknk084sn02q");
//! assert!(matches!(error.kind, RepositoryErrorKind::NotFound));
//! assert!(error.entity_id.is_some());
//! ```

use std::fmt;

use crate::schema::{FieldError, PayloadError, ValidationError};
use crate::store::StorageError;

/// Operation being performed when the repository error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    FindById,
    List,
    Create,
    Update,
    Delete,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FindById => write!(f, "find_by_id"),
            Self::List => write!(f, "list"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// Category of repository error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// No entity with that id
    NotFound,
    /// The id is not a well-formed id for this collection
    InvalidId,
    /// Payload or query parameters failed validation
    ValidationFailed,
    /// An update carried no fields
    EmptyUpdate,
    /// The document store could not serve the request
    StorageUnavailable,
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::InvalidId => write!(f, "invalid_id"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::EmptyUpdate => write!(f, "empty_update"),
            Self::StorageUnavailable => write!(f, "storage_unavailable"),
        }
    }
}

/// Structured repository error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryError {
    /// The operation being performed when the error occurred
    pub operation: RepositoryOperation,
    /// The category of error
    pub kind: RepositoryErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The type of entity involved (e.g., "Product")
    pub entity_type: Option<String>,
    /// The ID of the entity involved
    pub entity_id: Option<String>,
    /// Per-field problems, for `ValidationFailed`
    pub field_errors: Vec<FieldError>,
}

impl RepositoryError {
    pub fn new(operation: RepositoryOperation, kind: RepositoryErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
            field_errors: Vec::new(),
        }
    }

    /// Create a "not found" error with entity context
    pub fn not_found(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        let entity_type = entity_type.into();
        let message = format!("{} not found", entity_type);
        Self::new(RepositoryOperation::FindById, RepositoryErrorKind::NotFound, message)
            .with_entity(entity_type, entity_id)
    }

    /// The id failed to parse for this collection
    pub fn invalid_id(entity_type: impl Into<String>, entity_id: impl Into<String>, reason: impl fmt::Display) -> Self {
        let entity_type = entity_type.into();
        let message = format!("Invalid {} ID: {}", entity_type, reason);
        Self::new(RepositoryOperation::FindById, RepositoryErrorKind::InvalidId, message)
            .with_entity(entity_type, entity_id)
    }

    pub fn validation_failed(operation: RepositoryOperation, err: ValidationError) -> Self {
        let mut error = Self::new(operation, RepositoryErrorKind::ValidationFailed, "Validation failed");
        error.field_errors = err.errors;
        error
    }

    pub fn storage_unavailable(operation: RepositoryOperation, err: &StorageError) -> Self {
        Self::new(operation, RepositoryErrorKind::StorageUnavailable, err.to_string())
    }

    /// Map a rejected update payload
    pub fn from_payload(operation: RepositoryOperation, err: PayloadError) -> Self {
        match err {
            PayloadError::EmptyUpdate => Self::new(operation, RepositoryErrorKind::EmptyUpdate, err.to_string()),
            PayloadError::Invalid(v) => Self::validation_failed(operation, v),
        }
    }

    /// Add entity context to an existing error
    #[must_use]
    pub fn with_entity(mut self, entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Set the operation that caused the error
    #[must_use]
    pub fn with_operation(mut self, operation: RepositoryOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Check if this error is retriable
    pub fn is_retriable(&self) -> bool {
        matches!(self.kind, RepositoryErrorKind::StorageUnavailable)
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Repository {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let (Some(ref entity_type), Some(ref entity_id)) = (&self.entity_type, &self.entity_id) {
            write!(f, " [{}: {}]", entity_type, entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for RepositoryError {}

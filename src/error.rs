//! Error types for linked-service lifecycle operations

use std::fmt;

use thiserror::Error;

use crate::azure::http::ApiError;

/// A single schema validation failure, tied to the offending field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Identity triple used in error messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub resource_group: String,
    pub workspace: String,
    pub linked_service: String,
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Linked Service {:?} (Workspace {:?} / Resource Group {:?})",
            self.linked_service, self.workspace, self.resource_group
        )
    }
}

/// Main error type for linked-service operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration failed schema validation
    #[error("validation failed: {}", join_field_errors(.0))]
    Validation(Vec<FieldError>),

    /// A persisted identifier could not be decomposed
    #[error("parsing resource id {id:?}: {reason}")]
    InvalidId { id: String, reason: String },

    /// The remote object exists but is not tracked yet
    #[error(
        "a resource with the ID {id:?} already exists - to be managed via {resource_type} \
         it needs to be imported into the state"
    )]
    AlreadyExists { resource_type: &'static str, id: String },

    /// Import was requested for an object that does not exist remotely
    #[error("cannot import non-existent remote object {id:?}")]
    NotImported { id: String },

    /// Any remote API failure other than an expected not-found
    #[error("error {operation} {identity}: {source}")]
    Remote {
        operation: &'static str,
        identity: Identity,
        #[source]
        source: ApiError,
    },

    /// A write reported success but the follow-up read did not confirm it
    #[error("cannot read {identity} after write: {reason}")]
    PostWriteVerification { identity: Identity, reason: String },

    /// The caller cancelled the operation
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Create a validation error for a single field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    /// Create an identifier parse error
    pub fn invalid_id(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidId {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// True for errors raised before any remote call was made
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidId { .. })
    }
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity {
            resource_group: "rg1".to_string(),
            workspace: "ws1".to_string(),
            linked_service: "automation".to_string(),
        }
    }

    #[test]
    fn test_validation_message_lists_every_field() {
        let err = Error::Validation(vec![
            FieldError::new("workspace_name", "too short"),
            FieldError::new("tags", "too many tags"),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("workspace_name: too short"));
        assert!(msg.contains("tags: too many tags"));
        assert!(err.is_validation());
    }

    #[test]
    fn test_already_exists_points_at_import() {
        let err = Error::AlreadyExists {
            resource_type: "azurerm_log_analytics_workspace_linked_service",
            id: "/subscriptions/x".to_string(),
        };
        assert!(err.to_string().contains("needs to be imported"));
        assert!(!err.is_validation());
    }

    #[test]
    fn test_remote_error_names_full_identity() {
        let err = Error::Remote {
            operation: "deleting",
            identity: identity(),
            source: ApiError::Status {
                status: 500,
                code: Some("InternalError".to_string()),
                message: "boom".to_string(),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("\"automation\""));
        assert!(msg.contains("\"ws1\""));
        assert!(msg.contains("\"rg1\""));
        assert!(msg.contains("boom"));
    }
}

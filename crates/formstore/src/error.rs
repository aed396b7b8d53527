#![forbid(unsafe_code)]

//! Error types for the field store.
//!
//! Every store operation reports failure through [`StoreError`]. The variants
//! map onto the three failure classes a caller has to tell apart:
//!
//! - **Lookup**: the operation named a field id that is not in the store.
//! - **Reference**: the operation tried to select an option id that is not in
//!   the field's current option set.
//! - **Configuration**: the store or a field is set up in a way the operation
//!   cannot work with (no refresh function, dependency cycle, bad seed).
//!
//! A refresh collaborator reports its own failures as [`RefreshError`], which
//! the store wraps into [`StoreError::Refresh`] together with the field id.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Failure reported by a field's refresh function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RefreshError {
    message: String,
}

impl RefreshError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Wrap any displayable collaborator error.
    #[must_use]
    pub fn from_display(error: impl std::fmt::Display) -> Self {
        Self::new(error.to_string())
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("field not found: {field_id}")]
    Lookup { field_id: String },

    #[error("option {option_id:?} is not offered by field {field_id}")]
    Reference { field_id: String, option_id: String },

    #[error("field {field_id} is misconfigured: {reason}")]
    Configuration { field_id: String, reason: String },

    #[error("refresh of field {field_id} failed: {source}")]
    Refresh {
        field_id: String,
        #[source]
        source: RefreshError,
    },

    #[error("executor rejected the refresh task for field {field_id}")]
    Spawn { field_id: String },
}

impl StoreError {
    #[must_use]
    pub fn lookup(field_id: impl Into<String>) -> Self {
        Self::Lookup {
            field_id: field_id.into(),
        }
    }

    #[must_use]
    pub fn reference(field_id: impl Into<String>, option_id: impl Into<String>) -> Self {
        Self::Reference {
            field_id: field_id.into(),
            option_id: option_id.into(),
        }
    }

    #[must_use]
    pub fn configuration(field_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            field_id: field_id.into(),
            reason: reason.into(),
        }
    }

    /// Id of the field the failed operation targeted.
    #[must_use]
    pub fn field_id(&self) -> &str {
        match self {
            Self::Lookup { field_id }
            | Self::Reference { field_id, .. }
            | Self::Configuration { field_id, .. }
            | Self::Refresh { field_id, .. }
            | Self::Spawn { field_id } => field_id,
        }
    }

    #[must_use]
    pub fn is_lookup(&self) -> bool {
        matches!(self, Self::Lookup { .. })
    }

    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self, Self::Reference { .. })
    }

    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

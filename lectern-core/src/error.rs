//! Error taxonomy for domain operations.
//!
//! Every guarded operation in the platform fails with one of these
//! categories. The web layer maps each category to an HTTP status and a
//! `{ "message": ... }` body; the message strings here are user-facing and
//! surfaced verbatim by the frontend, so they are part of the API contract.

use thiserror::Error;

/// Result type alias for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;

/// Failure categories for domain operations.
///
/// Categories, not messages, decide the HTTP status:
///
/// | Category        | Status | Meaning                                       |
/// |-----------------|--------|-----------------------------------------------|
/// | `Validation`    | 400    | Missing or malformed field                    |
/// | `Authorization` | 403    | Principal's role is not allowed the operation |
/// | `Ownership`     | 403    | Principal is not the record's owner           |
/// | `NotFound`      | 404    | Identifier does not resolve                   |
/// | `Conflict`      | 400    | Uniqueness violation                          |
/// | `InvalidState`  | 400    | Operation not permitted in current status     |
/// | `Capacity`      | 400    | A ceiling would be exceeded                   |
/// | `Unexpected`    | 500    | Storage or runtime failure                    |
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A field is missing or malformed.
    #[error("{0}")]
    Validation(String),

    /// The principal's role does not permit the operation.
    #[error("{0}")]
    Authorization(String),

    /// The principal is not the owner of the record.
    #[error("{0}")]
    Ownership(String),

    /// The identifier does not resolve to a record.
    #[error("{resource} not found")]
    NotFound {
        /// Human-readable name of the missing resource
        resource: &'static str,
    },

    /// A uniqueness constraint would be violated.
    #[error("{0}")]
    Conflict(String),

    /// The operation is not permitted in the record's current status.
    #[error("{0}")]
    InvalidState(String),

    /// An attendee or speaker ceiling would be exceeded.
    #[error("{0}")]
    Capacity(String),

    /// Storage or runtime failure outside the domain's control.
    #[error("{0}")]
    Unexpected(String),
}

impl DomainError {
    /// Construct a [`DomainError::Validation`].
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Construct a [`DomainError::Authorization`].
    #[must_use]
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization(message.into())
    }

    /// Construct a [`DomainError::Ownership`].
    #[must_use]
    pub fn ownership(message: impl Into<String>) -> Self {
        Self::Ownership(message.into())
    }

    /// Construct a [`DomainError::NotFound`].
    #[must_use]
    pub const fn not_found(resource: &'static str) -> Self {
        Self::NotFound { resource }
    }

    /// Construct a [`DomainError::Conflict`].
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Construct a [`DomainError::InvalidState`].
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Construct a [`DomainError::Capacity`].
    #[must_use]
    pub fn capacity(message: impl Into<String>) -> Self {
        Self::Capacity(message.into())
    }

    /// Construct a [`DomainError::Unexpected`].
    #[must_use]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_surface_verbatim() {
        let err = DomainError::capacity("This event has reached its speaker limit");
        assert_eq!(err.to_string(), "This event has reached its speaker limit");
    }

    #[test]
    fn not_found_names_the_resource() {
        let err = DomainError::not_found("Event request");
        assert_eq!(err.to_string(), "Event request not found");
    }
}
